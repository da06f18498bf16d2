// Byte-wide x86 I/O port access.
use core::arch::asm;

/// # Safety
/// The caller must know that reading `port` has no unwanted side effects.
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    asm!(
        "inb %dx, %al",
        in("dx") port,
        out("al") value,
        options(att_syntax, nomem, nostack, preserves_flags)
    );
    value
}

/// # Safety
/// The caller must know that writing `value` to `port` is valid for the device behind it.
pub unsafe fn outb(port: u16, value: u8) {
    asm!(
        "outb %al, %dx",
        in("dx") port,
        in("al") value,
        options(att_syntax, nomem, nostack, preserves_flags)
    );
}

/// A single 8-bit I/O port.
#[derive(Debug, Clone, Copy)]
pub struct Port {
    port: u16,
}

impl Port {
    pub const fn new(port: u16) -> Port {
        Port { port }
    }

    /// # Safety
    /// See [`inb`].
    pub unsafe fn read(&mut self) -> u8 {
        inb(self.port)
    }

    /// # Safety
    /// See [`outb`].
    pub unsafe fn write(&mut self, value: u8) {
        outb(self.port, value);
    }
}
