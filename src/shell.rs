use core::str;
use crate::constants::shell::{LINE_BUF_LEN, MAX_LINE_CHARS, PROMPT};
use crate::cpu;
use crate::interrupts::TickCounter;
use crate::keyboard::KeySource;
use crate::vga_buffer::{CellSurface, Color, ColorCode, Writer};

const PROMPT_COLOR: ColorCode = ColorCode::new(Color::LightBlue, Color::Black);
const INPUT_COLOR: ColorCode = ColorCode::new(Color::White, Color::Black);
const GREETING_COLOR: ColorCode = ColorCode::new(Color::LightGreen, Color::Black);
const ALERT_COLOR: ColorCode = ColorCode::new(Color::LightRed, Color::Black);
const HEADING_COLOR: ColorCode = ColorCode::new(Color::Yellow, Color::Black);
const INFO_COLOR: ColorCode = ColorCode::new(Color::LightCyan, Color::Black);
const BOX_COLOR: ColorCode = ColorCode::new(Color::White, Color::Blue);

/// Returned when a bounded buffer has no room left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError;

/// Fixed-capacity line of printable ASCII. The last slot of the backing
/// array stays free for the terminator, so at most `MAX_LINE_CHARS` fit.
#[derive(Clone)]
pub struct LineBuffer {
    buf: [u8; LINE_BUF_LEN],
    len: usize,
}

impl LineBuffer {
    pub const fn new() -> LineBuffer {
        LineBuffer {
            buf: [0; LINE_BUF_LEN],
            len: 0,
        }
    }

    pub fn push(&mut self, c: u8) -> Result<(), CapacityError> {
        if self.len >= MAX_LINE_CHARS {
            return Err(CapacityError);
        }
        self.buf[self.len] = c;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.buf[self.len])
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_str(&self) -> &str {
        // Only printable ASCII is ever pushed.
        str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a line into the command (up to the first space) and the rest,
/// with the run of spaces between them dropped. The rest is kept verbatim.
pub fn tokenize(line: &str) -> (&str, &str) {
    match line.find(' ') {
        Some(split) => (&line[..split], line[split..].trim_start_matches(' ')),
        None => (line, ""),
    }
}

/// What the prompt loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Help,
    Clear,
    Echo,
    Time,
    SysInfo,
    Colors,
    Box,
    Banner,
    Shutdown,
}

/// Command registry entry
struct Command {
    name: &'static str,
    help: &'static str,
    kind: CommandKind,
}

/// Command dispatch table - add new commands here
const COMMANDS: &[Command] = &[
    Command { name: "help", help: "Show this help message", kind: CommandKind::Help },
    Command { name: "clear", help: "Clear the screen", kind: CommandKind::Clear },
    Command { name: "echo", help: "Echo text back", kind: CommandKind::Echo },
    Command { name: "time", help: "Show system uptime", kind: CommandKind::Time },
    Command { name: "sysinfo", help: "Show system information", kind: CommandKind::SysInfo },
    Command { name: "colors", help: "Display all VGA colors", kind: CommandKind::Colors },
    Command { name: "box", help: "Draw a colored box", kind: CommandKind::Box },
    Command { name: "banner", help: "Show kernel banner", kind: CommandKind::Banner },
    Command { name: "shutdown", help: "Halt the system", kind: CommandKind::Shutdown },
];

/// Find command by name (exact, case-sensitive)
fn find_command(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|cmd| cmd.name == name)
}

pub struct Shell<'a, S: CellSurface, K: KeySource> {
    terminal: &'a mut Writer<S>,
    keyboard: K,
    ticks: &'a TickCounter,
    line: LineBuffer,
}

impl<'a, S: CellSurface, K: KeySource> Shell<'a, S, K> {
    pub fn new(terminal: &'a mut Writer<S>, keyboard: K, ticks: &'a TickCounter) -> Self {
        Shell {
            terminal,
            keyboard,
            ticks,
            line: LineBuffer::new(),
        }
    }

    /// Runs the prompt loop until `shutdown`, then parks the CPU.
    pub fn run(&mut self) -> ! {
        self.greet();
        while self.step() == Flow::Continue {}
        cpu::halt_forever()
    }

    pub fn greet(&mut self) {
        self.terminal.set_color(GREETING_COLOR);
        self.terminal.write_string("\nWelcome to SimpleOS Shell!\n");
        self.terminal.write_string("Type 'help' for available commands.\n\n");
    }

    /// One prompt cycle: prompt, read a line, dispatch it.
    pub fn step(&mut self) -> Flow {
        self.prompt();
        self.read_line();
        if self.line.is_empty() {
            return Flow::Continue;
        }

        let (name, args) = tokenize(self.line.as_str());
        execute_command(self.terminal, self.ticks, name, args)
    }

    fn prompt(&mut self) {
        self.terminal.set_color(PROMPT_COLOR);
        self.terminal.write_string(PROMPT);
        self.terminal.set_color(INPUT_COLOR);
    }

    fn read_line(&mut self) {
        self.line.clear();
        loop {
            let c = self.keyboard.read_char();
            if self.process_key(c) {
                return;
            }
        }
    }

    /// Applies one key to the line being edited. Returns true once the line is complete.
    fn process_key(&mut self, c: char) -> bool {
        match c {
            '\n' => {
                self.terminal.put_char(b'\n');
                true
            }
            '\u{8}' => {
                // Visual erase only works within the current row.
                if self.line.pop().is_some() {
                    self.terminal.backspace();
                }
                false
            }
            ' '..='~' => {
                // A full line silently drops further input.
                if self.line.push(c as u8).is_ok() {
                    self.terminal.put_char(c as u8);
                }
                false
            }
            _ => false,
        }
    }
}

fn execute_command<S: CellSurface>(
    terminal: &mut Writer<S>,
    ticks: &TickCounter,
    name: &str,
    args: &str,
) -> Flow {
    let Some(cmd) = find_command(name) else {
        terminal.set_color(ALERT_COLOR);
        terminal.write_string("Unknown command: ");
        terminal.write_string(name);
        terminal.write_string("\nType 'help' for available commands.\n");
        terminal.set_color(INPUT_COLOR);
        return Flow::Continue;
    };

    match cmd.kind {
        CommandKind::Help => cmd_help(terminal),
        CommandKind::Clear => terminal.initialize(),
        CommandKind::Echo => cmd_echo(terminal, args),
        CommandKind::Time => cmd_time(terminal, ticks),
        CommandKind::SysInfo => cmd_sysinfo(terminal, ticks),
        CommandKind::Colors => cmd_colors(terminal),
        CommandKind::Box => cmd_box(terminal),
        CommandKind::Banner => cmd_banner(terminal),
        CommandKind::Shutdown => {
            cmd_shutdown(terminal);
            return Flow::Halt;
        }
    }
    Flow::Continue
}

// ============================================================================
// Command implementations
// ============================================================================

fn cmd_help<S: CellSurface>(terminal: &mut Writer<S>) {
    terminal.set_color(HEADING_COLOR);
    terminal.write_string("Available commands:\n");
    terminal.set_color(INPUT_COLOR);
    for cmd in COMMANDS {
        terminal.write_string("  ");
        terminal.write_string(cmd.name);
        for _ in cmd.name.len()..10 {
            terminal.put_char(b' ');
        }
        terminal.write_string("- ");
        terminal.write_string(cmd.help);
        terminal.put_char(b'\n');
    }
}

fn cmd_echo<S: CellSurface>(terminal: &mut Writer<S>, args: &str) {
    terminal.write_string(args);
    terminal.put_char(b'\n');
}

fn cmd_time<S: CellSurface>(terminal: &mut Writer<S>, ticks: &TickCounter) {
    terminal.write_string("System uptime: ");
    terminal.write_decimal(ticks.seconds());
    terminal.write_string(" seconds\n");
}

fn cmd_sysinfo<S: CellSurface>(terminal: &mut Writer<S>, ticks: &TickCounter) {
    terminal.set_color(INFO_COLOR);
    terminal.write_string("System Information:\n");
    terminal.set_color(INPUT_COLOR);
    terminal.write_string("  Kernel: SimpleOS v1.0\n");
    terminal.write_string("  Architecture: x86 (32-bit)\n");
    terminal.write_string("  Display: VGA Text Mode (80x25)\n");
    terminal.write_string("  Timer ticks: ");
    terminal.write_decimal(ticks.get());
    terminal.put_char(b'\n');
}

fn cmd_colors<S: CellSurface>(terminal: &mut Writer<S>) {
    terminal.write_string("VGA Color Palette:\n");
    for i in 0..16u8 {
        terminal.set_color(ColorCode::from_byte(i | ((Color::Black as u8) << 4)));
        terminal.write_string("Color ");
        terminal.write_decimal(u32::from(i));
        terminal.write_string("  ");
    }
    terminal.put_char(b'\n');
    terminal.set_color(GREETING_COLOR);
}

fn cmd_box<S: CellSurface>(terminal: &mut Writer<S>) {
    let (x, y, width, height) = (10, 10, 20, 5);
    terminal.fill_rect(x, y, width, height, BOX_COLOR);
    terminal.set_position(y + height + 1, 0);
    terminal.write_string("Drew a box at (10, 10) with size 20x5\n");
}

fn cmd_banner<S: CellSurface>(terminal: &mut Writer<S>) {
    terminal.initialize();
    write_banner(terminal);
    terminal.set_color(GREETING_COLOR);
    terminal.write_string("Enhanced Interactive Kernel\n\n");
}

fn cmd_shutdown<S: CellSurface>(terminal: &mut Writer<S>) {
    terminal.set_color(ALERT_COLOR);
    terminal.write_string("\nShutting down...\n");
    terminal.write_string("System halted. You can close the window now.\n");
}

/// The boxed kernel title shown at boot and by `banner`.
pub fn write_banner<S: CellSurface>(terminal: &mut Writer<S>) {
    terminal.set_color(INFO_COLOR);
    terminal.write_string("========================================\n");
    terminal.set_color(HEADING_COLOR);
    terminal.write_string("   SimpleOS Kernel v1.0\n");
    terminal.set_color(INFO_COLOR);
    terminal.write_string("========================================\n");
}
