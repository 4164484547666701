//! Per-task address space management: the four-level mapping algorithm,
//! fork-style copying, and translation-fault handling.
//!
//! Walks the page-global directory one level at a time, allocating a
//! fresh table whenever a level's entry is still `Fault`, then installs
//! the leaf `Page` descriptor. Every owned table and user page is recorded
//! in a fixed-capacity list so a task's address space can be torn down or
//! copied without a heap.

use crate::config::{MAX_TASK_PAGES, PAGE_SIZE};
use crate::memory::address::{PhysicalAddress, VirtualAddress};
use crate::memory::descriptor::{AccessPermission, LeafAttributes, MemoryAttribute};
use crate::memory::frame_allocator;
use crate::memory::table::{Level0Descriptor, Level0View, Level12Descriptor, Level12View, Level3Descriptor, Level3View, PageTable};

/// A single user page owned by a task: where it lives physically, and
/// which user virtual address it is mapped at.
#[derive(Clone, Copy, Debug)]
pub struct UserPage {
    pub physical: PhysicalAddress,
    pub virtual_address: VirtualAddress,
}

/// A task's address-space bookkeeping: its page-global directory and the
/// fixed-capacity lists of pages it owns.
#[derive(Clone, Copy)]
pub struct MemoryState {
    page_global_directory: Option<PhysicalAddress>,
    kernel_pages: [PhysicalAddress; MAX_TASK_PAGES],
    kernel_pages_count: usize,
    user_pages: [UserPage; MAX_TASK_PAGES],
    user_pages_count: usize,
}

impl MemoryState {
    pub const fn new() -> Self {
        Self {
            page_global_directory: None,
            kernel_pages: [PhysicalAddress::new(0); MAX_TASK_PAGES],
            kernel_pages_count: 0,
            user_pages: [UserPage {
                physical: PhysicalAddress::new(0),
                virtual_address: VirtualAddress::new(0),
            }; MAX_TASK_PAGES],
            user_pages_count: 0,
        }
    }

    pub fn page_global_directory(&self) -> Option<PhysicalAddress> {
        self.page_global_directory
    }

    pub fn user_pages(&self) -> &[UserPage] {
        &self.user_pages[..self.user_pages_count]
    }

    fn push_kernel_page(&mut self, frame: PhysicalAddress) {
        assert!(
            self.kernel_pages_count < MAX_TASK_PAGES,
            "task exceeded its fixed kernel-page-table capacity"
        );
        self.kernel_pages[self.kernel_pages_count] = frame;
        self.kernel_pages_count += 1;
    }

    fn push_user_page(&mut self, page: UserPage) {
        assert!(
            self.user_pages_count < MAX_TASK_PAGES,
            "task exceeded its fixed user-page capacity"
        );
        self.user_pages[self.user_pages_count] = page;
        self.user_pages_count += 1;
    }
}

fn table_at(phys: PhysicalAddress) -> &'static mut PageTable {
    unsafe { &mut *(phys.to_kernel_virtual().as_mut_ptr::<PageTable>()) }
}

fn user_leaf_attributes(physical: PhysicalAddress) -> LeafAttributes {
    LeafAttributes {
        addr: physical,
        memory_attribute: MemoryAttribute::NormalNonCacheable,
        access_permission: AccessPermission::KernelRwUserRw,
        access_flag: true,
    }
}

/// Walks one level of the table, allocating a fresh next-level table if the
/// entry is currently `Fault`. Records any newly allocated table in `state`.
fn map_table(state: &mut MemoryState, table: Level0Descriptor) -> Option<PhysicalAddress> {
    match table {
        Level0Descriptor::Table(pa) => Some(pa),
        Level0Descriptor::Fault => {
            let frame = frame_allocator::allocate_frame()?;
            state.push_kernel_page(frame);
            Some(frame)
        }
    }
}

fn map_table12(state: &mut MemoryState, entry: Level12Descriptor) -> Option<PhysicalAddress> {
    match entry {
        Level12Descriptor::Table(pa) => Some(pa),
        Level12Descriptor::Fault => {
            let frame = frame_allocator::allocate_frame()?;
            state.push_kernel_page(frame);
            Some(frame)
        }
        Level12Descriptor::Block(_) => panic!("page table walk hit an unexpected block mapping"),
    }
}

/// Maps `physical` at `virtual_address` within the task described by
/// `state`, allocating a page-global directory and any intermediate
/// tables as needed. Returns `None` only on physical-memory exhaustion.
pub fn map_page(state: &mut MemoryState, virtual_address: VirtualAddress, physical: PhysicalAddress) -> Option<()> {
    if state.page_global_directory.is_none() {
        let pgd = frame_allocator::allocate_frame()?;
        state.page_global_directory = Some(pgd);
        state.push_kernel_page(pgd);
    }
    let pgd = state.page_global_directory.unwrap();

    let pud_phys = {
        let mut pgd_view = Level0View::new(table_at(pgd));
        let entry = pgd_view.entry_for(virtual_address);
        let pud = map_table(state, entry)?;
        if matches!(entry, Level0Descriptor::Fault) {
            pgd_view.set_entry_for(virtual_address, Level0Descriptor::Table(pud));
        }
        pud
    };

    let pmd_phys = {
        let mut pud_view = Level12View::level1(table_at(pud_phys));
        let entry = pud_view.entry_for(virtual_address);
        let pmd = map_table12(state, entry)?;
        if matches!(entry, Level12Descriptor::Fault) {
            pud_view.set_entry_for(virtual_address, Level12Descriptor::Table(pmd));
        }
        pmd
    };

    let pte_phys = {
        let mut pmd_view = Level12View::level2(table_at(pmd_phys));
        let entry = pmd_view.entry_for(virtual_address);
        let pte = map_table12(state, entry)?;
        if matches!(entry, Level12Descriptor::Fault) {
            pmd_view.set_entry_for(virtual_address, Level12Descriptor::Table(pte));
        }
        pte
    };

    let mut pte_view = Level3View::new(table_at(pte_phys));
    pte_view.set_entry_for(
        virtual_address,
        Level3Descriptor::Page(user_leaf_attributes(physical)),
    );

    state.push_user_page(UserPage {
        physical,
        virtual_address,
    });
    Some(())
}

/// Allocates a zeroed page for the kernel's own use and returns its
/// kernel-window virtual address. Not tracked in any task's page lists.
pub fn allocate_kernel_page() -> Option<VirtualAddress> {
    frame_allocator::allocate_frame().map(PhysicalAddress::to_kernel_virtual)
}

/// Allocates a zeroed physical page, maps it into the task's address space
/// at `virtual_address`, and returns its kernel-window virtual address
/// (so the kernel can populate it before the task ever runs).
pub fn allocate_user_page(state: &mut MemoryState, virtual_address: VirtualAddress) -> Option<VirtualAddress> {
    let physical = frame_allocator::allocate_frame()?;
    map_page(state, virtual_address, physical)?;
    Some(physical.to_kernel_virtual())
}

/// Copies every user page owned by `source` into `destination`, byte for
/// byte, allocating fresh physical frames for the copy (fork semantics).
/// Returns `false` if physical memory ran out partway through.
pub fn copy_virtual_memory(destination: &mut MemoryState, source: &MemoryState) -> bool {
    for page in source.user_pages() {
        let Some(dest_kernel_va) = allocate_user_page(destination, page.virtual_address) else {
            return false;
        };
        let src_kernel_va = page.physical.to_kernel_virtual();
        unsafe {
            core::ptr::copy_nonoverlapping(
                src_kernel_va.as_ptr::<u8>(),
                dest_kernel_va.as_mut_ptr::<u8>(),
                PAGE_SIZE as usize,
            );
        }
    }
    true
}

/// Programs `TTBR0_EL1` with the given task's page-global directory,
/// switching the active user address space.
pub fn set_page_global_directory(pgd: PhysicalAddress) {
    use aarch64_cpu::registers::TTBR0_EL1;
    use tock_registers::interfaces::Writeable;

    TTBR0_EL1.set_baddr(pgd.as_u64());
    unsafe { core::arch::asm!("isb") };
}

/// Handles a translation fault at `faulting_address` by demand-allocating
/// and mapping the containing page, mirroring `do_mem_abort`'s handling of
/// DFSC codes `1xx` (translation fault at some level). Returns `Err(())`
/// if no physical memory remains to service the fault.
pub fn handle_translation_fault(state: &mut MemoryState, faulting_address: VirtualAddress) -> Result<(), ()> {
    let page_address = faulting_address.align_down(PAGE_SIZE);
    allocate_user_page(state, page_address).map(|_| ()).ok_or(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    #[kernel_test]
    fn map_page_is_visible_through_the_walked_tables() {
        let mut state = MemoryState::new();
        let physical = frame_allocator::allocate_frame().expect("test arena should have frames");
        let va = VirtualAddress::new(0x1000);
        assert!(map_page(&mut state, va, physical).is_some());

        let pgd = state.page_global_directory().unwrap();
        let pgd_view = Level0View::new(table_at(pgd));
        let Level0Descriptor::Table(pud) = pgd_view.entry_for(va) else {
            panic!("expected PGD entry to be a Table descriptor");
        };
        let pud_view = Level12View::level1(table_at(pud));
        let Level12Descriptor::Table(pmd) = pud_view.entry_for(va) else {
            panic!("expected PUD entry to be a Table descriptor");
        };
        let pmd_view = Level12View::level2(table_at(pmd));
        let Level12Descriptor::Table(pte) = pmd_view.entry_for(va) else {
            panic!("expected PMD entry to be a Table descriptor");
        };
        let pte_view = Level3View::new(table_at(pte));
        match pte_view.entry_for(va) {
            Level3Descriptor::Page(attrs) => assert_eq!(attrs.addr, physical),
            Level3Descriptor::Fault => panic!("expected a Page descriptor"),
        }
    }

    #[kernel_test]
    fn copy_virtual_memory_duplicates_contents() {
        let mut source = MemoryState::new();
        let va = VirtualAddress::new(0x2000);
        let source_kernel_va = allocate_user_page(&mut source, va).unwrap();
        unsafe { source_kernel_va.as_mut_ptr::<u8>().write(0x42) };

        let mut destination = MemoryState::new();
        assert!(copy_virtual_memory(&mut destination, &source));

        let copied = destination.user_pages()[0];
        assert_eq!(copied.virtual_address, va);
        let copied_kernel_va = copied.physical.to_kernel_virtual();
        assert_ne!(copied.physical, source.user_pages()[0].physical);
        unsafe { assert_eq!(*copied_kernel_va.as_ptr::<u8>(), 0x42) };
    }
}
