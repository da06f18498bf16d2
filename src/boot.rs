// Multiboot v1 entry: the loader jumps here in 32-bit protected mode with
// paging off, EAX = loader magic, EBX = info structure, and no usable stack.
use simpleos::constants::multiboot::{HEADER_CHECKSUM, HEADER_FLAGS, HEADER_MAGIC};

#[used]
#[link_section = ".multiboot"]
static MULTIBOOT_HEADER: [u32; 3] = [HEADER_MAGIC, HEADER_FLAGS, HEADER_CHECKSUM];

const BOOT_STACK_SIZE: usize = 16 * 1024;

core::arch::global_asm!(
    ".section .bss",
    ".align 16",
    "boot_stack_bottom:",
    ".skip {stack_size}",
    "boot_stack_top:",
    ".section .text",
    ".global _start",
    "_start:",
    "    mov $boot_stack_top, %esp",
    "    push %ebx",
    "    push %eax",
    "    call kernel_main",
    "    cli",
    "2:  hlt",
    "    jmp 2b",
    stack_size = const BOOT_STACK_SIZE,
    options(att_syntax),
);
