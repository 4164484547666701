//! Boot MMU setup: the initial identity + higher-half mapping, and turning
//! the MMU on.
//!
//! Table construction happens before the MMU is live, so frames are
//! touched through their raw physical address rather than
//! `memory::task_memory`'s kernel-window accessor, which only becomes
//! valid once `enable` below has run.

use crate::config::{
    ATTR_DEVICE_NGNRNE, ATTR_NORMAL_NC, DEVICE_BASE, MAIR_DEVICE_NGNRNE, MAIR_NORMAL_NC, PHYS_MEMORY_SIZE, SECTION_SIZE,
};
use crate::memory::descriptor::{AccessPermission, LeafAttributes, MemoryAttribute};
use crate::memory::table::{Level0Descriptor, Level0View, Level12Descriptor, Level12View, PageTable};
use crate::memory::{PhysicalAddress, VirtualAddress};
use aarch64_cpu::asm::barrier;
use aarch64_cpu::registers::{MAIR_EL1, SCTLR_EL1, TCR_EL1, TTBR0_EL1, TTBR1_EL1};
use tock_registers::interfaces::{ReadWriteable, Writeable};

use crate::architecture::bump_allocator::PageBumpAllocator;

fn table_at(phys: PhysicalAddress) -> &'static mut PageTable {
    unsafe { &mut *(phys.as_u64() as *mut PageTable) }
}

/// Builds the three fixed boot tables out of `allocator` and returns the
/// physical address of the level-0 table (the PGD), ready to be installed
/// into both translation-base registers.
///
/// Both the identity range (physical addresses as-is) and the higher-half
/// range (`VA_START` onward) resolve to index 0 at every level, since
/// `VA_START`'s low 48 bits are all zero — one set of tables serves both.
pub fn build_boot_tables(allocator: &mut PageBumpAllocator) -> PhysicalAddress {
    let pgd_frame = allocator.allocate();
    let pud_frame = allocator.allocate();
    let pmd_frame = allocator.allocate();

    let block_count = (PHYS_MEMORY_SIZE / SECTION_SIZE) as usize;
    let mut pmd_view = Level12View::level2(table_at(pmd_frame));
    for index in 0..block_count {
        let phys = index as u64 * SECTION_SIZE;
        let memory_attribute = if phys >= DEVICE_BASE {
            MemoryAttribute::Device
        } else {
            MemoryAttribute::NormalNonCacheable
        };
        pmd_view.set_entry_at(
            index,
            Level12Descriptor::Block(LeafAttributes {
                addr: PhysicalAddress::new(phys),
                memory_attribute,
                access_permission: AccessPermission::KernelRwUserNone,
                access_flag: true,
            }),
        );
    }

    let zero_va = VirtualAddress::new(0);
    let mut pud_view = Level12View::level1(table_at(pud_frame));
    pud_view.set_entry_for(zero_va, Level12Descriptor::Table(pmd_frame));

    let mut pgd_view = Level0View::new(table_at(pgd_frame));
    pgd_view.set_entry_for(zero_va, Level0Descriptor::Table(pud_frame));

    pgd_frame
}

/// Programs `MAIR_EL1`/`TCR_EL1`/`TTBR{0,1}_EL1` with `pgd` and sets
/// `SCTLR_EL1.M`, bracketed by the barriers a translation-table change
/// followed by an instruction-stream switch requires.
///
/// # Safety
/// `pgd` must be the physical address of a fully constructed, legally
/// formed level-0 table, and this must run at EL1 before any code depends
/// on virtual addressing being active.
pub unsafe fn enable(pgd: PhysicalAddress) {
    // One byte per attribute index: 0 = device-nGnRnE (0x00), 1 = normal-NC (0x44).
    let mair = (MAIR_DEVICE_NGNRNE << (8 * ATTR_DEVICE_NGNRNE)) | (MAIR_NORMAL_NC << (8 * ATTR_NORMAL_NC));
    MAIR_EL1.set(mair);

    TCR_EL1.write(
        TCR_EL1::TG0::KiB_4 + TCR_EL1::TG1::KiB_4 + TCR_EL1::T0SZ.val(16) + TCR_EL1::T1SZ.val(16) + TCR_EL1::IPS.val(0b101),
    );

    TTBR0_EL1.set_baddr(pgd.as_u64());
    TTBR1_EL1.set_baddr(pgd.as_u64());

    barrier::isb(barrier::SY);

    SCTLR_EL1.modify(SCTLR_EL1::M::Enable);

    barrier::isb(barrier::SY);
}
