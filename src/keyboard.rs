use crate::constants::keyboard::{DATA_PORT, RELEASE_BIT, STATUS_OUTPUT_BUFFER_FULL, STATUS_PORT};
use crate::port::Port;

/// US layout, unshifted, scan code set 1 key-press codes 0x00..=0x39.
/// Zero marks keys without a plain ASCII form (Esc, Ctrl, Shift, Alt).
const SCANCODE_MAP: [u8; 58] = [
    0, 0, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08,
    b'\t', b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n',
    0, b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`',
    0, b'\\', b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/', 0,
    b'*', 0, b' ',
];

pub fn scancode_to_ascii(scancode: u8) -> Option<char> {
    match SCANCODE_MAP.get(scancode as usize) {
        Some(&0) | None => None,
        Some(&ascii) => Some(ascii as char),
    }
}

/// Status and data registers of a keyboard controller.
pub trait KeyboardController {
    fn status(&mut self) -> u8;
    fn read_data(&mut self) -> u8;
}

/// The PS/2 controller behind ports 0x64/0x60.
pub struct Ps2Controller {
    status_port: Port,
    data_port: Port,
}

impl Ps2Controller {
    pub const fn new() -> Ps2Controller {
        Ps2Controller {
            status_port: Port::new(STATUS_PORT),
            data_port: Port::new(DATA_PORT),
        }
    }
}

impl Default for Ps2Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardController for Ps2Controller {
    fn status(&mut self) -> u8 {
        unsafe { self.status_port.read() }
    }

    fn read_data(&mut self) -> u8 {
        unsafe { self.data_port.read() }
    }
}

/// Anything the shell can pull characters from.
pub trait KeySource {
    /// Blocks until a character is available.
    fn read_char(&mut self) -> char;
}

pub struct Keyboard<C: KeyboardController> {
    controller: C,
}

impl<C: KeyboardController> Keyboard<C> {
    pub const fn new(controller: C) -> Keyboard<C> {
        Keyboard { controller }
    }

    /// Get a character from the controller if one is waiting (POLLING MODE).
    ///
    /// Key releases and presses of keys without a mapping are consumed and
    /// yield `None`.
    pub fn poll(&mut self) -> Option<char> {
        if self.controller.status() & STATUS_OUTPUT_BUFFER_FULL == 0 {
            return None;
        }

        let scancode = self.controller.read_data();
        if scancode & RELEASE_BIT != 0 {
            return None;
        }
        scancode_to_ascii(scancode)
    }
}

impl<C: KeyboardController> KeySource for Keyboard<C> {
    fn read_char(&mut self) -> char {
        loop {
            if let Some(c) = self.poll() {
                return c;
            }
            core::hint::spin_loop();
        }
    }
}
