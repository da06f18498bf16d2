use core::mem::size_of;
use lazy_static::lazy_static;
use crate::constants::gdt::{
    ACCESS_CODE_OR_DATA, ACCESS_EXECUTABLE, ACCESS_PRESENT, ACCESS_READ_WRITE, ACCESS_RING0,
    ENTRY_COUNT, FLAG_32BIT, FLAG_GRANULARITY_4K, FLAT_BASE, FLAT_LIMIT, KERNEL_CODE_INDEX,
    KERNEL_DATA_INDEX,
};

/// One 8-byte segment descriptor in the legacy 32-bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct SegmentDescriptor {
    limit_low: u16,
    base_low: u16,
    base_middle: u8,
    access: u8,
    /// Low nibble: limit bits 16-19. High nibble: flags.
    granularity: u8,
    base_high: u8,
}

impl SegmentDescriptor {
    pub const NULL: SegmentDescriptor = SegmentDescriptor::new(0, 0, 0, 0);

    /// Only bits 0-19 of `limit` and the upper nibble of `flags` are encoded.
    pub const fn new(base: u32, limit: u32, access: u8, flags: u8) -> SegmentDescriptor {
        SegmentDescriptor {
            limit_low: (limit & 0xFFFF) as u16,
            base_low: (base & 0xFFFF) as u16,
            base_middle: ((base >> 16) & 0xFF) as u8,
            access,
            granularity: (((limit >> 16) & 0x0F) as u8) | (flags & 0xF0),
            base_high: ((base >> 24) & 0xFF) as u8,
        }
    }

    /// Flat 4 GiB ring-0 code segment, execute/read.
    pub const fn kernel_code_segment() -> SegmentDescriptor {
        SegmentDescriptor::new(
            FLAT_BASE,
            FLAT_LIMIT,
            ACCESS_PRESENT | ACCESS_RING0 | ACCESS_CODE_OR_DATA | ACCESS_EXECUTABLE | ACCESS_READ_WRITE,
            FLAG_GRANULARITY_4K | FLAG_32BIT,
        )
    }

    /// Flat 4 GiB ring-0 data segment, read/write.
    pub const fn kernel_data_segment() -> SegmentDescriptor {
        SegmentDescriptor::new(
            FLAT_BASE,
            FLAT_LIMIT,
            ACCESS_PRESENT | ACCESS_RING0 | ACCESS_CODE_OR_DATA | ACCESS_READ_WRITE,
            FLAG_GRANULARITY_4K | FLAG_32BIT,
        )
    }

    pub fn base(&self) -> u32 {
        u32::from(self.base_low) | (u32::from(self.base_middle) << 16) | (u32::from(self.base_high) << 24)
    }

    /// The 20-bit limit field as stored.
    pub fn raw_limit(&self) -> u32 {
        u32::from(self.limit_low) | (u32::from(self.granularity & 0x0F) << 16)
    }

    /// Highest addressable offset, after applying granularity.
    pub fn byte_limit(&self) -> u32 {
        if self.is_page_granular() {
            (self.raw_limit() << 12) | 0xFFF
        } else {
            self.raw_limit()
        }
    }

    pub fn access(&self) -> u8 {
        self.access
    }

    pub fn flags(&self) -> u8 {
        self.granularity & 0xF0
    }

    pub fn is_page_granular(&self) -> bool {
        self.granularity & FLAG_GRANULARITY_4K != 0
    }

    pub fn is_32bit(&self) -> bool {
        self.granularity & FLAG_32BIT != 0
    }

    /// The descriptor exactly as it sits in memory.
    pub fn to_bytes(self) -> [u8; 8] {
        let limit = self.limit_low.to_le_bytes();
        let base = self.base_low.to_le_bytes();
        [
            limit[0],
            limit[1],
            base[0],
            base[1],
            self.base_middle,
            self.access,
            self.granularity,
            self.base_high,
        ]
    }
}

/// Index into the descriptor table plus requested privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SegmentSelector(u16);

impl SegmentSelector {
    pub const fn new(index: u16, rpl: u8) -> SegmentSelector {
        SegmentSelector((index << 3) | (rpl as u16 & 0b11))
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    pub const fn index(self) -> u16 {
        self.0 >> 3
    }
}

pub const KERNEL_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(KERNEL_CODE_INDEX, 0);
pub const KERNEL_DATA_SELECTOR: SegmentSelector = SegmentSelector::new(KERNEL_DATA_INDEX, 0);

/// Operand of `lgdt`/`lidt`.
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct DescriptorTablePointer {
    pub limit: u16,
    pub base: u32,
}

#[derive(Debug, Clone)]
#[repr(C, align(8))]
pub struct GlobalDescriptorTable {
    entries: [SegmentDescriptor; ENTRY_COUNT],
}

impl GlobalDescriptorTable {
    /// A table holding only null descriptors.
    pub const fn new() -> GlobalDescriptorTable {
        GlobalDescriptorTable {
            entries: [SegmentDescriptor::NULL; ENTRY_COUNT],
        }
    }

    /// Null, flat kernel code, flat kernel data.
    pub fn flat() -> GlobalDescriptorTable {
        let mut gdt = GlobalDescriptorTable::new();
        gdt.set_gate(0, SegmentDescriptor::NULL);
        gdt.set_gate(KERNEL_CODE_INDEX as usize, SegmentDescriptor::kernel_code_segment());
        gdt.set_gate(KERNEL_DATA_INDEX as usize, SegmentDescriptor::kernel_data_segment());
        gdt
    }

    pub fn set_gate(&mut self, index: usize, descriptor: SegmentDescriptor) {
        self.entries[index] = descriptor;
    }

    pub fn entries(&self) -> &[SegmentDescriptor; ENTRY_COUNT] {
        &self.entries
    }

    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            limit: (size_of::<[SegmentDescriptor; ENTRY_COUNT]>() - 1) as u16,
            base: self.entries.as_ptr() as usize as u32,
        }
    }

    /// Loads the table and reloads every segment register from it.
    ///
    /// # Safety
    /// The table must hold valid flat code and data descriptors at the
    /// kernel selector indices; anything else faults on the reload.
    #[cfg(target_arch = "x86")]
    pub unsafe fn load(&'static self) {
        use core::arch::asm;

        let pointer = self.pointer();
        asm!(
            "lgdt ({ptr})",
            "mov {data:x}, %ds",
            "mov {data:x}, %es",
            "mov {data:x}, %fs",
            "mov {data:x}, %gs",
            "mov {data:x}, %ss",
            "ljmp ${code}, $2f",
            "2:",
            ptr = in(reg) &pointer,
            data = in(reg) u32::from(KERNEL_DATA_SELECTOR.as_u16()),
            code = const KERNEL_CODE_SELECTOR.as_u16(),
            options(att_syntax, preserves_flags),
        );
    }
}

impl Default for GlobalDescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof that the segment table is live; gates may reference `code`.
#[derive(Debug, Clone, Copy)]
pub struct Selectors {
    code: SegmentSelector,
    data: SegmentSelector,
}

impl Selectors {
    pub fn code(&self) -> SegmentSelector {
        self.code
    }

    pub fn data(&self) -> SegmentSelector {
        self.data
    }
}

lazy_static! {
    static ref GDT: GlobalDescriptorTable = GlobalDescriptorTable::flat();
}

#[cfg(target_arch = "x86")]
static SELECTORS: spin::Once<Selectors> = spin::Once::new();

/// Initialize the GDT. Later calls return the same selectors without reloading.
#[cfg(target_arch = "x86")]
pub fn init() -> Selectors {
    *SELECTORS.call_once(|| {
        unsafe { GDT.load() };
        Selectors {
            code: KERNEL_CODE_SELECTOR,
            data: KERNEL_DATA_SELECTOR,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_is_eight_bytes() {
        assert_eq!(size_of::<SegmentDescriptor>(), 8);
        assert_eq!(size_of::<DescriptorTablePointer>(), 6);
    }

    #[test]
    fn null_entry_is_all_zero() {
        let gdt = GlobalDescriptorTable::flat();
        assert_eq!(gdt.entries()[0].to_bytes(), [0u8; 8]);
    }

    #[test]
    fn code_and_data_are_flat_page_granular_32bit() {
        let gdt = GlobalDescriptorTable::flat();
        for descriptor in &gdt.entries()[1..] {
            assert_eq!(descriptor.base(), 0);
            assert_eq!(descriptor.raw_limit(), 0xF_FFFF);
            assert_eq!(descriptor.byte_limit(), 0xFFFF_FFFF);
            assert!(descriptor.is_page_granular());
            assert!(descriptor.is_32bit());
        }
    }

    #[test]
    fn access_bytes_match_ring0_code_and_data() {
        let gdt = GlobalDescriptorTable::flat();
        assert_eq!(gdt.entries()[1].access(), 0x9A);
        assert_eq!(gdt.entries()[2].access(), 0x92);
        assert_eq!(
            gdt.entries()[1].to_bytes(),
            [0xFF, 0xFF, 0x00, 0x00, 0x00, 0x9A, 0xCF, 0x00]
        );
        assert_eq!(
            gdt.entries()[2].to_bytes(),
            [0xFF, 0xFF, 0x00, 0x00, 0x00, 0x92, 0xCF, 0x00]
        );
    }

    #[test]
    fn base_and_limit_are_split_across_fields() {
        let descriptor = SegmentDescriptor::new(0x1234_5678, 0xABCDE, 0x92, 0x40);
        assert_eq!(descriptor.base(), 0x1234_5678);
        assert_eq!(descriptor.raw_limit(), 0xABCDE);
        assert_eq!(descriptor.byte_limit(), 0xABCDE);
        assert_eq!(descriptor.flags(), 0x40);
        assert_eq!(
            descriptor.to_bytes(),
            [0xDE, 0xBC, 0x78, 0x56, 0x34, 0x92, 0x4A, 0x12]
        );
    }

    #[test]
    fn pointer_covers_three_entries() {
        let gdt = GlobalDescriptorTable::flat();
        let pointer = gdt.pointer();
        assert_eq!({ pointer.limit }, 3 * 8 - 1);
    }

    #[test]
    fn kernel_selectors() {
        assert_eq!(KERNEL_CODE_SELECTOR.as_u16(), 0x08);
        assert_eq!(KERNEL_DATA_SELECTOR.as_u16(), 0x10);
        assert_eq!(KERNEL_CODE_SELECTOR.index(), 1);
    }

    #[test]
    fn lazily_built_table_is_flat() {
        assert_eq!(GDT.entries(), GlobalDescriptorTable::flat().entries());
    }
}
