use core::fmt;
use volatile::Volatile;
use spin::Mutex;
use lazy_static::lazy_static;
use crate::constants::vga::{BUFFER_HEIGHT, BUFFER_WIDTH, BUFFER_ADDR, UNPRINTABLE_GLYPH};

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    LightMagenta = 13,
    Yellow = 14,
    White = 15,
}

/// Attribute byte: foreground in bits 0-3, background in bits 4-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ColorCode(u8);

impl ColorCode {
    pub const fn new(foreground: Color, background: Color) -> ColorCode {
        ColorCode((foreground as u8) | ((background as u8) << 4))
    }

    pub const fn from_byte(attribute: u8) -> ColorCode {
        ColorCode(attribute)
    }

    pub const fn as_byte(self) -> u8 {
        self.0
    }
}

pub const DEFAULT_COLOR: ColorCode = ColorCode::new(Color::LightGreen, Color::Black);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ScreenChar {
    pub ascii_character: u8,
    pub color_code: ColorCode,
}

impl ScreenChar {
    pub const fn blank(color_code: ColorCode) -> ScreenChar {
        ScreenChar {
            ascii_character: b' ',
            color_code,
        }
    }

    /// The 16-bit value the hardware sees for this cell.
    pub const fn encode(self) -> u16 {
        (self.ascii_character as u16) | ((self.color_code.0 as u16) << 8)
    }
}

/// A grid of character cells the terminal draws into.
pub trait CellSurface {
    fn read(&self, row: usize, col: usize) -> ScreenChar;
    fn write(&mut self, row: usize, col: usize, ch: ScreenChar);
}

impl<T: CellSurface + ?Sized> CellSurface for &mut T {
    fn read(&self, row: usize, col: usize) -> ScreenChar {
        (**self).read(row, col)
    }

    fn write(&mut self, row: usize, col: usize, ch: ScreenChar) {
        (**self).write(row, col, ch)
    }
}

/// The memory-mapped text buffer.
#[repr(transparent)]
pub struct Buffer {
    chars: [[Volatile<ScreenChar>; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

impl CellSurface for Buffer {
    fn read(&self, row: usize, col: usize) -> ScreenChar {
        self.chars[row][col].read()
    }

    fn write(&mut self, row: usize, col: usize, ch: ScreenChar) {
        self.chars[row][col].write(ch);
    }
}

/// Plain RAM stand-in for the text buffer.
#[derive(Clone)]
pub struct MemoryBuffer {
    chars: [[ScreenChar; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

impl MemoryBuffer {
    pub const fn new() -> MemoryBuffer {
        MemoryBuffer {
            chars: [[ScreenChar { ascii_character: 0, color_code: ColorCode(0) }; BUFFER_WIDTH];
                BUFFER_HEIGHT],
        }
    }
}

impl Default for MemoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CellSurface for MemoryBuffer {
    fn read(&self, row: usize, col: usize) -> ScreenChar {
        self.chars[row][col]
    }

    fn write(&mut self, row: usize, col: usize, ch: ScreenChar) {
        self.chars[row][col] = ch;
    }
}

/// Cursor, current color and the surface they apply to.
pub struct Writer<S: CellSurface> {
    column_position: usize,
    row_position: usize,
    color_code: ColorCode,
    buffer: S,
}

impl<S: CellSurface> Writer<S> {
    /// Wraps a surface without touching its contents; call `initialize` to clear it.
    pub const fn new(buffer: S) -> Writer<S> {
        Writer {
            column_position: 0,
            row_position: 0,
            color_code: DEFAULT_COLOR,
            buffer,
        }
    }

    pub fn initialize(&mut self) {
        self.row_position = 0;
        self.column_position = 0;
        self.color_code = DEFAULT_COLOR;
        for row in 0..BUFFER_HEIGHT {
            self.clear_row(row);
        }
    }

    pub fn set_color(&mut self, color_code: ColorCode) {
        self.color_code = color_code;
    }

    pub fn color(&self) -> ColorCode {
        self.color_code
    }

    /// (row, column) of the next cell to be written.
    pub fn position(&self) -> (usize, usize) {
        (self.row_position, self.column_position)
    }

    /// Moves the cursor, clamping to the last row/column.
    pub fn set_position(&mut self, row: usize, col: usize) {
        self.row_position = row.min(BUFFER_HEIGHT - 1);
        self.column_position = col.min(BUFFER_WIDTH - 1);
    }

    pub fn surface(&self) -> &S {
        &self.buffer
    }

    pub fn put_char(&mut self, byte: u8) {
        if byte == b'\n' {
            self.new_line();
            return;
        }

        let row = self.row_position;
        let col = self.column_position;
        self.buffer.write(row, col, ScreenChar {
            ascii_character: byte,
            color_code: self.color_code,
        });

        // Running off the bottom wraps to the top without scrolling;
        // only an explicit newline scrolls.
        self.column_position += 1;
        if self.column_position == BUFFER_WIDTH {
            self.column_position = 0;
            self.row_position += 1;
            if self.row_position == BUFFER_HEIGHT {
                self.row_position = 0;
            }
        }
    }

    fn new_line(&mut self) {
        self.column_position = 0;
        if self.row_position < BUFFER_HEIGHT - 1 {
            self.row_position += 1;
            return;
        }

        // Scroll: move everything up
        for row in 1..BUFFER_HEIGHT {
            for col in 0..BUFFER_WIDTH {
                let character = self.buffer.read(row, col);
                self.buffer.write(row - 1, col, character);
            }
        }
        self.clear_row(BUFFER_HEIGHT - 1);
    }

    fn clear_row(&mut self, row: usize) {
        let blank = ScreenChar::blank(self.color_code);
        for col in 0..BUFFER_WIDTH {
            self.buffer.write(row, col, blank);
        }
    }

    /// Writes up to the first NUL, if any.
    pub fn write_string(&mut self, s: &str) {
        for byte in s.bytes() {
            match byte {
                0 => break,
                0x20..=0x7e | b'\n' => self.put_char(byte),
                _ => self.put_char(UNPRINTABLE_GLYPH),
            }
        }
    }

    pub fn write_hex(&mut self, value: u32) {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

        self.write_string("0x");
        for shift in (0..8).rev().map(|nibble| nibble * 4) {
            self.put_char(DIGITS[((value >> shift) & 0xF) as usize]);
        }
    }

    pub fn write_decimal(&mut self, mut value: u32) {
        if value == 0 {
            self.put_char(b'0');
            return;
        }

        // u32::MAX has 10 digits
        let mut digits = [0u8; 10];
        let mut len = 0;
        while value > 0 {
            digits[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
        for &digit in digits[..len].iter().rev() {
            self.put_char(digit);
        }
    }

    // remove last printed character (for backspace)
    pub fn backspace(&mut self) {
        if self.column_position > 0 {
            self.column_position -= 1;
            let row = self.row_position;
            let col = self.column_position;
            self.buffer.write(row, col, ScreenChar::blank(self.color_code));
        }
    }

    /// Paints a rectangle of blanks in `color_code`, clipped to the screen.
    /// The cursor does not move.
    pub fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, color_code: ColorCode) {
        let blank = ScreenChar::blank(color_code);
        for row in y..(y + height).min(BUFFER_HEIGHT) {
            for col in x..(x + width).min(BUFFER_WIDTH) {
                self.buffer.write(row, col, blank);
            }
        }
    }
}

lazy_static! {
    pub static ref WRITER: Mutex<Writer<&'static mut Buffer>> =
        Mutex::new(Writer::new(unsafe { &mut *(BUFFER_ADDR as *mut Buffer) }));
}

impl<S: CellSurface> fmt::Write for Writer<S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_string(s);
        Ok(())
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::vga_buffer::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

#[doc(hidden)]
pub fn _print(args: core::fmt::Arguments) {
    use core::fmt::Write;
    let _ = WRITER.lock().write_fmt(args);
}

/// helpers used during boot
pub fn initialize() {
    WRITER.lock().initialize();
}

pub fn set_color(color_code: ColorCode) {
    WRITER.lock().set_color(color_code);
}

pub fn write_hex(value: u32) {
    WRITER.lock().write_hex(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String;

    fn new_writer() -> Writer<MemoryBuffer> {
        let mut writer = Writer::new(MemoryBuffer::new());
        writer.initialize();
        writer
    }

    fn row_text(writer: &Writer<MemoryBuffer>, row: usize) -> String {
        let text: String = (0..BUFFER_WIDTH)
            .map(|col| writer.surface().read(row, col).ascii_character as char)
            .collect();
        text.trim_end().into()
    }

    #[test]
    fn initialize_blanks_every_cell_with_default_color() {
        let mut writer = Writer::new(MemoryBuffer::new());
        writer.set_color(ColorCode::new(Color::Red, Color::Blue));
        writer.set_position(7, 9);
        writer.initialize();

        assert_eq!(writer.position(), (0, 0));
        assert_eq!(writer.color(), DEFAULT_COLOR);
        for row in 0..BUFFER_HEIGHT {
            for col in 0..BUFFER_WIDTH {
                assert_eq!(writer.surface().read(row, col), ScreenChar::blank(DEFAULT_COLOR));
            }
        }
    }

    #[test]
    fn cell_encoding_puts_attribute_in_high_byte() {
        let ch = ScreenChar {
            ascii_character: b'A',
            color_code: ColorCode::new(Color::White, Color::Blue),
        };
        assert_eq!(ch.encode(), 0x1F41);
        assert_eq!(ScreenChar::blank(DEFAULT_COLOR).encode(), 0x0A20);
    }

    #[test]
    fn printable_char_advances_column_only() {
        let mut writer = new_writer();
        writer.set_position(3, 0);
        for col in 0..79 {
            writer.put_char(b'x');
            assert_eq!(writer.position(), (3, col + 1));
        }
    }

    #[test]
    fn put_char_uses_current_color_and_set_color_is_not_retroactive() {
        let mut writer = new_writer();
        writer.put_char(b'a');
        let yellow = ColorCode::new(Color::Yellow, Color::Black);
        writer.set_color(yellow);
        writer.put_char(b'b');

        assert_eq!(writer.surface().read(0, 0).color_code, DEFAULT_COLOR);
        assert_eq!(writer.surface().read(0, 1).color_code, yellow);
    }

    #[test]
    fn set_color_accepts_any_byte() {
        let mut writer = new_writer();
        writer.set_color(ColorCode::from_byte(0xFF));
        writer.put_char(b'q');
        assert_eq!(writer.surface().read(0, 0).encode(), 0xFF71);
    }

    #[test]
    fn eighty_chars_wrap_to_next_row() {
        let mut writer = new_writer();
        for _ in 0..BUFFER_WIDTH {
            writer.put_char(b'#');
        }
        assert_eq!(writer.position(), (1, 0));
    }

    #[test]
    fn full_screen_of_chars_wraps_to_top_without_scrolling() {
        let mut writer = new_writer();
        writer.put_char(b'F');
        for _ in 1..BUFFER_WIDTH * BUFFER_HEIGHT {
            writer.put_char(b'.');
        }

        assert_eq!(writer.position(), (0, 0));
        // Nothing was scrolled away.
        assert_eq!(writer.surface().read(0, 0).ascii_character, b'F');
    }

    #[test]
    fn newline_on_last_row_scrolls_and_discards_top_line() {
        let mut writer = new_writer();
        writer.write_string("first\n");
        writer.write_string("second");
        for _ in 0..BUFFER_HEIGHT - 1 {
            writer.put_char(b'\n');
        }

        assert_eq!(writer.position(), (BUFFER_HEIGHT - 1, 0));
        assert_eq!(row_text(&writer, 0), "second");
        for row in 0..BUFFER_HEIGHT {
            assert_ne!(row_text(&writer, row), "first");
        }
    }

    #[test]
    fn scroll_shifts_rows_up_and_blanks_last_row_in_current_color() {
        let mut writer = new_writer();
        for row in 0..BUFFER_HEIGHT - 1 {
            writer.put_char(b'a' + row as u8);
            writer.put_char(b'\n');
        }
        writer.put_char(b'z');
        let blue = ColorCode::new(Color::LightGray, Color::Blue);
        writer.set_color(blue);
        writer.put_char(b'\n');

        assert_eq!(row_text(&writer, 0), "b");
        assert_eq!(row_text(&writer, BUFFER_HEIGHT - 2), "z");
        assert_eq!(row_text(&writer, BUFFER_HEIGHT - 1), "");
        assert_eq!(writer.surface().read(BUFFER_HEIGHT - 1, 40), ScreenChar::blank(blue));
    }

    #[test]
    fn write_string_replaces_unprintable_bytes() {
        let mut writer = new_writer();
        writer.write_string("a\u{e9}\tb");
        // U+00E9 is two UTF-8 bytes
        let cells: Vec<u8> = (0..5).map(|col| writer.surface().read(0, col).ascii_character).collect();
        assert_eq!(cells, [b'a', 0xfe, 0xfe, 0xfe, b'b']);
    }

    #[test]
    fn write_string_stops_at_nul() {
        let mut writer = new_writer();
        writer.write_string("ab\0cd");
        assert_eq!(writer.position(), (0, 2));
        assert_eq!(row_text(&writer, 0), "ab");
    }

    #[test]
    fn decimal_and_hex_rendering() {
        let mut writer = new_writer();
        writer.write_decimal(0);
        writer.put_char(b' ');
        writer.write_decimal(4294967295);
        writer.put_char(b' ');
        writer.write_decimal(1200);
        writer.put_char(b' ');
        writer.write_hex(255);
        writer.put_char(b' ');
        writer.write_hex(0xDEADBEEF);

        assert_eq!(row_text(&writer, 0), "0 4294967295 1200 0x000000FF 0xDEADBEEF");
    }

    #[test]
    fn backspace_erases_previous_cell() {
        let mut writer = new_writer();
        writer.write_string("ab");
        writer.backspace();
        assert_eq!(writer.position(), (0, 1));
        assert_eq!(row_text(&writer, 0), "a");
    }

    #[test]
    fn backspace_at_column_zero_does_nothing() {
        let mut writer = new_writer();
        writer.write_string("ab\n");
        writer.backspace();
        assert_eq!(writer.position(), (1, 0));
        assert_eq!(row_text(&writer, 0), "ab");
    }

    #[test]
    fn fill_rect_is_clipped_and_leaves_cursor() {
        let mut writer = new_writer();
        let box_color = ColorCode::new(Color::White, Color::Blue);
        writer.fill_rect(75, 22, 20, 5, box_color);

        assert_eq!(writer.position(), (0, 0));
        assert_eq!(writer.surface().read(22, 75).color_code, box_color);
        assert_eq!(writer.surface().read(24, 79).color_code, box_color);
        assert_eq!(writer.surface().read(21, 75).color_code, DEFAULT_COLOR);
        assert_eq!(writer.surface().read(22, 74).color_code, DEFAULT_COLOR);
    }

    #[test]
    fn set_position_clamps_to_grid() {
        let mut writer = new_writer();
        writer.set_position(100, 200);
        assert_eq!(writer.position(), (BUFFER_HEIGHT - 1, BUFFER_WIDTH - 1));
    }

    #[test]
    fn fmt_write_goes_through_terminal() {
        use core::fmt::Write;
        let mut writer = new_writer();
        write!(writer, "ticks={}", 42).unwrap();
        assert_eq!(row_text(&writer, 0), "ticks=42");
    }
}
