use core::mem::size_of;
use core::sync::atomic::{AtomicU32, Ordering};
use crate::constants::idt::{DEBUG_VECTOR, DIVIDE_ERROR_VECTOR, ENTRY_COUNT, GATE_INTERRUPT_32};
use crate::constants::timer::TICKS_PER_SECOND;
use crate::gdt::{DescriptorTablePointer, SegmentSelector};

/// One 8-byte gate in the 32-bit interrupt descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    always_zero: u8,
    flags: u8,
    offset_high: u16,
}

impl GateDescriptor {
    /// Not present: any vector pointing here raises a fault instead of jumping.
    pub const MISSING: GateDescriptor = GateDescriptor {
        offset_low: 0,
        selector: 0,
        always_zero: 0,
        flags: 0,
        offset_high: 0,
    };

    pub const fn new(handler: u32, selector: SegmentSelector, flags: u8) -> GateDescriptor {
        GateDescriptor {
            offset_low: (handler & 0xFFFF) as u16,
            selector: selector.as_u16(),
            always_zero: 0,
            flags,
            offset_high: ((handler >> 16) & 0xFFFF) as u16,
        }
    }

    pub fn handler_address(&self) -> u32 {
        u32::from(self.offset_low) | (u32::from(self.offset_high) << 16)
    }

    pub fn selector(&self) -> u16 {
        self.selector
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn is_present(&self) -> bool {
        self.flags & 0x80 != 0
    }

    pub fn to_bytes(self) -> [u8; 8] {
        let low = self.offset_low.to_le_bytes();
        let selector = self.selector.to_le_bytes();
        let high = self.offset_high.to_le_bytes();
        [low[0], low[1], selector[0], selector[1], self.always_zero, self.flags, high[0], high[1]]
    }
}

#[derive(Debug, Clone)]
#[repr(C, align(8))]
pub struct InterruptDescriptorTable {
    entries: [GateDescriptor; ENTRY_COUNT],
}

impl InterruptDescriptorTable {
    pub const fn new() -> InterruptDescriptorTable {
        InterruptDescriptorTable {
            entries: [GateDescriptor::MISSING; ENTRY_COUNT],
        }
    }

    /// All gates cleared, then vectors 0 and 1 routed to `handlers` through
    /// the code segment `selector`.
    pub fn with_exception_handlers(selector: SegmentSelector, handlers: [u32; 2]) -> InterruptDescriptorTable {
        let mut idt = InterruptDescriptorTable::new();
        idt.set_gate(DIVIDE_ERROR_VECTOR, handlers[0], selector, GATE_INTERRUPT_32);
        idt.set_gate(DEBUG_VECTOR, handlers[1], selector, GATE_INTERRUPT_32);
        idt
    }

    pub fn set_gate(&mut self, vector: u8, handler: u32, selector: SegmentSelector, flags: u8) {
        self.entries[usize::from(vector)] = GateDescriptor::new(handler, selector, flags);
    }

    pub fn entries(&self) -> &[GateDescriptor; ENTRY_COUNT] {
        &self.entries
    }

    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            limit: (size_of::<[GateDescriptor; ENTRY_COUNT]>() - 1) as u16,
            base: self.entries.as_ptr() as usize as u32,
        }
    }

    /// # Safety
    /// Every present gate must name a valid handler and code selector.
    #[cfg(target_arch = "x86")]
    pub unsafe fn load(&'static self) {
        use core::arch::asm;

        let pointer = self.pointer();
        asm!(
            "lidt ({ptr})",
            ptr = in(reg) &pointer,
            options(att_syntax, readonly, nostack, preserves_flags),
        );
    }
}

impl Default for InterruptDescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts handler invocations. Wraps silently at 2^32.
#[derive(Debug)]
pub struct TickCounter(AtomicU32);

impl TickCounter {
    pub const fn new() -> TickCounter {
        TickCounter(AtomicU32::new(0))
    }

    pub fn tick(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Whole seconds, assuming a 100 Hz source.
    pub fn seconds(&self) -> u32 {
        self.get() / TICKS_PER_SECOND
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

pub static TICKS: TickCounter = TickCounter::new();

/// Common body behind the vector 0 and 1 entry stubs.
#[no_mangle]
pub extern "C" fn isr_handler() {
    TICKS.tick();
}

// Entry stubs: save the general registers, run the common handler, return
// from the interrupt. No interrupt controller is acknowledged.
#[cfg(target_arch = "x86")]
core::arch::global_asm!(
    ".section .text",
    ".global isr0",
    ".global isr1",
    "isr0:",
    "    pushal",
    "    cld",
    "    call isr_handler",
    "    popal",
    "    iretl",
    "isr1:",
    "    pushal",
    "    cld",
    "    call isr_handler",
    "    popal",
    "    iretl",
    options(att_syntax),
);

#[cfg(target_arch = "x86")]
extern "C" {
    fn isr0();
    fn isr1();
}

#[cfg(target_arch = "x86")]
static IDT: spin::Once<InterruptDescriptorTable> = spin::Once::new();

/// Build and load the IDT. Takes the selectors handed out by `gdt::init`
/// so it cannot run before the segment table is live.
#[cfg(target_arch = "x86")]
pub fn init(selectors: crate::gdt::Selectors) {
    if IDT.is_completed() {
        return;
    }

    let idt = IDT.call_once(|| {
        InterruptDescriptorTable::with_exception_handlers(
            selectors.code(),
            [isr0 as usize as u32, isr1 as usize as u32],
        )
    });
    unsafe { idt.load() };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gdt::KERNEL_CODE_SELECTOR;

    const HANDLERS: [u32; 2] = [0x0010_2040, 0x0010_2050];

    #[test]
    fn gate_is_eight_bytes() {
        assert_eq!(size_of::<GateDescriptor>(), 8);
        assert_eq!(size_of::<InterruptDescriptorTable>(), 256 * 8);
    }

    #[test]
    fn exception_vectors_are_wired() {
        let idt = InterruptDescriptorTable::with_exception_handlers(KERNEL_CODE_SELECTOR, HANDLERS);

        for (vector, &handler) in HANDLERS.iter().enumerate() {
            let gate = idt.entries()[vector];
            assert_ne!(gate.handler_address(), 0);
            assert_eq!(gate.handler_address(), handler);
            assert_eq!(gate.selector(), 0x08);
            assert_eq!(gate.flags(), 0x8E);
            assert!(gate.is_present());
        }
        assert_eq!(
            idt.entries()[0].to_bytes(),
            [0x40, 0x20, 0x08, 0x00, 0x00, 0x8E, 0x10, 0x00]
        );
    }

    #[test]
    fn remaining_vectors_are_not_present() {
        let idt = InterruptDescriptorTable::with_exception_handlers(KERNEL_CODE_SELECTOR, HANDLERS);
        for gate in &idt.entries()[2..] {
            assert_eq!(gate.to_bytes(), [0u8; 8]);
            assert!(!gate.is_present());
        }
    }

    #[test]
    fn pointer_covers_all_gates() {
        let idt = InterruptDescriptorTable::new();
        assert_eq!({ idt.pointer().limit }, 256 * 8 - 1);
    }

    #[test]
    fn tick_counter_counts_and_converts_to_seconds() {
        let ticks = TickCounter::new();
        for _ in 0..250 {
            ticks.tick();
        }
        assert_eq!(ticks.get(), 250);
        assert_eq!(ticks.seconds(), 2);
    }

    #[test]
    fn tick_counter_wraps() {
        let ticks = TickCounter(AtomicU32::new(u32::MAX));
        ticks.tick();
        assert_eq!(ticks.get(), 0);
    }

    #[test]
    fn isr_handler_advances_global_counter() {
        let before = TICKS.get();
        isr_handler();
        assert_eq!(TICKS.get(), before.wrapping_add(1));
    }
}
