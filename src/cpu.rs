use core::arch::asm;

/// Halts the CPU until the next interrupt.
pub fn hlt() {
    unsafe {
        asm!("hlt", options(att_syntax, nomem, nostack, preserves_flags));
    }
}

/// Parks the CPU for good. Interrupts are never enabled by this kernel,
/// so the loop only matters if something wakes the core anyway.
pub fn halt_forever() -> ! {
    loop {
        hlt();
    }
}
