/// System-wide constants to avoid magic numbers

/// VGA text mode constants
pub mod vga {
    /// VGA text buffer physical address
    pub const BUFFER_ADDR: usize = 0xb8000;

    /// VGA text mode dimensions
    pub const BUFFER_HEIGHT: usize = 25;
    pub const BUFFER_WIDTH: usize = 80;

    /// Glyph written for bytes that have no printable ASCII form
    pub const UNPRINTABLE_GLYPH: u8 = 0xfe;
}

/// PS/2 Keyboard controller constants
pub mod keyboard {
    /// PS/2 keyboard data port
    pub const DATA_PORT: u16 = 0x60;

    /// PS/2 keyboard status/command port
    pub const STATUS_PORT: u16 = 0x64;

    /// Status register bit flags
    pub const STATUS_OUTPUT_BUFFER_FULL: u8 = 0x01;

    /// Set on scan codes reporting a key release
    pub const RELEASE_BIT: u8 = 0x80;
}

/// Segment descriptor table constants
pub mod gdt {
    pub const ENTRY_COUNT: usize = 3;

    pub const KERNEL_CODE_INDEX: u16 = 1;
    pub const KERNEL_DATA_INDEX: u16 = 2;

    // Access byte
    pub const ACCESS_PRESENT: u8 = 1 << 7;
    pub const ACCESS_RING0: u8 = 0 << 5;
    pub const ACCESS_CODE_OR_DATA: u8 = 1 << 4;
    pub const ACCESS_EXECUTABLE: u8 = 1 << 3;
    /// Readable for code segments, writable for data segments
    pub const ACCESS_READ_WRITE: u8 = 1 << 1;

    // Flags nibble (upper half of the granularity byte)
    pub const FLAG_GRANULARITY_4K: u8 = 1 << 7;
    pub const FLAG_32BIT: u8 = 1 << 6;

    pub const FLAT_BASE: u32 = 0;
    pub const FLAT_LIMIT: u32 = 0xFFFF_FFFF;
}

/// Interrupt descriptor table constants
pub mod idt {
    pub const ENTRY_COUNT: usize = 256;

    /// Present, ring 0, 32-bit interrupt gate
    pub const GATE_INTERRUPT_32: u8 = 0x8E;

    /// CPU exception vectors wired to the tick handler
    pub const DIVIDE_ERROR_VECTOR: u8 = 0;
    pub const DEBUG_VECTOR: u8 = 1;
}

/// Tick counter constants
pub mod timer {
    /// Assumed tick rate used to turn ticks into seconds
    pub const TICKS_PER_SECOND: u32 = 100;
}

/// Command shell constants
pub mod shell {
    /// Line buffer size; the last slot is reserved for the terminator
    pub const LINE_BUF_LEN: usize = 256;
    pub const MAX_LINE_CHARS: usize = LINE_BUF_LEN - 1;

    pub const PROMPT: &str = "shell> ";
}

/// Multiboot (v1) constants
pub mod multiboot {
    pub const HEADER_MAGIC: u32 = 0x1BAD_B002;
    pub const HEADER_FLAGS: u32 = 0;
    pub const HEADER_CHECKSUM: u32 = 0u32.wrapping_sub(HEADER_MAGIC.wrapping_add(HEADER_FLAGS));

    /// Value a compliant loader leaves in EAX
    pub const BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;
}
