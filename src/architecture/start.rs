//! The very first instructions executed: parking secondary cores, standing
//! up a boot stack, and handing the firmware's five boot arguments to
//! [`boot_kernel`].
//!
//! Built on this crate's `_start`/linker-script conventions
//! (`__boot_core_stack_end`, the higher-half absolute-jump trick already
//! documented in `architecture::mmu`).

use crate::architecture::{boot, bump_allocator::PageBumpAllocator, mmu};
use crate::config::VA_START;
use crate::kernel;
use crate::memory::PhysicalAddress;
use core::arch::global_asm;

extern "Rust" {
    static __pg_dir: core::cell::UnsafeCell<()>;
    static __pg_dir_end: core::cell::UnsafeCell<()>;
    static __bss_start: core::cell::UnsafeCell<u64>;
    static __bss_end_inclusive: core::cell::UnsafeCell<u64>;
}

/// Zeroes the `.bss` region between the linker-provided start/end symbols.
/// Must run before any code reads a `static` whose initializer is the
/// all-zero bit pattern (the compiler is free to place those in `.bss`
/// rather than `.data`, and a raw binary load does not zero that memory).
unsafe fn zero_bss() {
    let mut cursor: *mut u64 = __bss_start.get();
    let end: *mut u64 = __bss_end_inclusive.get();
    while cursor <= end {
        unsafe {
            cursor.write_volatile(0);
            cursor = cursor.add(1);
        }
    }
}

/// Called from `_start` with the firmware's boot arguments untouched:
/// builds the initial mapping, turns the MMU on, jumps into the kernel's
/// higher-half window, and hands off to [`kernel::init::kmain`].
///
/// # Safety
/// Must be called exactly once, by `_start`, before any other kernel code
/// runs.
#[no_mangle]
unsafe extern "C" fn boot_kernel(dtb_phys: u32, r1: u64, r2: u64, r3: u64, start_phys: u32) -> ! {
    unsafe { zero_bss() };

    unsafe { boot::switch_to_el1() };

    let pg_dir_start = PhysicalAddress::new(unsafe { __pg_dir.get() } as usize as u64);
    let pg_dir_end = PhysicalAddress::new(unsafe { __pg_dir_end.get() } as usize as u64);
    let mut allocator = PageBumpAllocator::new(pg_dir_start, pg_dir_end);
    let pgd = mmu::build_boot_tables(&mut allocator);

    unsafe { mmu::enable(pgd) };

    // The MMU is on. The kernel image is linked at a single (physical)
    // address range and reachable both through the identity mapping (low
    // VA) and the higher-half window (VA_START + phys) built above, so an
    // indirect branch to the very next instruction is enough to jump into
    // the higher half without a second, higher-half-linked copy of the
    // kernel's own code. `sp` is then explicitly moved into the
    // higher-half window, so everything from here on addresses its own
    // stack through the kernel window like every other kernel-owned frame.
    unsafe {
        core::arch::asm!(
            "adr x9, 1f",
            "br x9",
            "1:",
            "add sp, sp, {offset}",
            offset = in(reg) VA_START,
            out("x9") _,
            options(nomem, nostack),
        );
    }

    kernel::init::kmain(dtb_phys, r1, r2, r3, start_phys)
}

global_asm!(
    r#"
.section .text._start

.global _start
_start:
    // Only core 0 boots the kernel; the others park themselves — this
    // kernel is single hardware thread, no SMP.
    mrs x9, mpidr_el1
    and x9, x9, #3
    cbz x9, 2f
1:
    wfe
    b 1b
2:
    ldr x9, =__boot_core_stack_end
    mov sp, x9

    // The firmware-supplied boot arguments (x0-x3) are passed through
    // untouched; x4 is this core's own physical entry address, computed
    // here rather than trusted from firmware.
    adr x4, _start
    bl boot_kernel
    // boot_kernel never returns.
"#
);
