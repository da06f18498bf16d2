#![cfg_attr(not(test), no_std)]

pub mod constants;
pub mod vga_buffer;
pub mod port;
pub mod cpu;
pub mod keyboard;
pub mod gdt;
pub mod interrupts;
pub mod shell;
