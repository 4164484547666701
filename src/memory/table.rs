//! Level-typed views over a single translation table page.
//!
//! Each of the four translation levels only accepts a subset of
//! [`Descriptor`] variants. Rather than a runtime visitor over a
//! generic entry type, this expresses the legal subset as its own small
//! enum per level — passing an illegal variant to `set_entry_for` is then
//! a Rust type error instead of a runtime check.

use crate::config::{ENTRIES_PER_TABLE, L0_SHIFT, L1_SHIFT, L2_SHIFT, L3_SHIFT};
use crate::memory::address::{PhysicalAddress, VirtualAddress};
use crate::memory::descriptor::{Descriptor, LeafAttributes};

/// Raw storage for one level of translation table: exactly one 4 KiB page
/// of 512 64-bit descriptors.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [u64; ENTRIES_PER_TABLE],
}

impl PageTable {
    /// A table with every entry set to `Fault`.
    pub const fn zeroed() -> Self {
        Self {
            entries: [0; ENTRIES_PER_TABLE],
        }
    }
}

/// The descriptor variants legal at level 0 (the PGD).
#[derive(Clone, Copy, Debug)]
pub enum Level0Descriptor {
    Fault,
    Table(PhysicalAddress),
}

impl Level0Descriptor {
    fn to_generic(self) -> Descriptor {
        match self {
            Self::Fault => Descriptor::Fault,
            Self::Table(pa) => Descriptor::Table(pa),
        }
    }

    fn from_generic(descriptor: Descriptor) -> Self {
        match descriptor {
            Descriptor::Fault => Self::Fault,
            Descriptor::Table(pa) => Self::Table(pa),
            other => unreachable!("illegal descriptor variant {other:?} at level 0"),
        }
    }

    /// Dispatches to the handler arm matching the variant actually present.
    pub fn visit<R>(self, on_fault: impl FnOnce() -> R, on_table: impl FnOnce(PhysicalAddress) -> R) -> R {
        match self {
            Self::Fault => on_fault(),
            Self::Table(pa) => on_table(pa),
        }
    }
}

/// The descriptor variants legal at levels 1 and 2 (the PUD and PMD).
#[derive(Clone, Copy, Debug)]
pub enum Level12Descriptor {
    Fault,
    Table(PhysicalAddress),
    Block(LeafAttributes),
}

impl Level12Descriptor {
    fn to_generic(self) -> Descriptor {
        match self {
            Self::Fault => Descriptor::Fault,
            Self::Table(pa) => Descriptor::Table(pa),
            Self::Block(attrs) => Descriptor::Block(attrs),
        }
    }

    fn from_generic(descriptor: Descriptor) -> Self {
        match descriptor {
            Descriptor::Fault => Self::Fault,
            Descriptor::Table(pa) => Self::Table(pa),
            Descriptor::Block(attrs) => Self::Block(attrs),
            other => unreachable!("illegal descriptor variant {other:?} at levels 1-2"),
        }
    }

    /// Dispatches to the handler arm matching the variant actually present.
    pub fn visit<R>(
        self,
        on_fault: impl FnOnce() -> R,
        on_table: impl FnOnce(PhysicalAddress) -> R,
        on_block: impl FnOnce(LeafAttributes) -> R,
    ) -> R {
        match self {
            Self::Fault => on_fault(),
            Self::Table(pa) => on_table(pa),
            Self::Block(attrs) => on_block(attrs),
        }
    }
}

/// The descriptor variants legal at level 3 (the PTE).
#[derive(Clone, Copy, Debug)]
pub enum Level3Descriptor {
    Fault,
    Page(LeafAttributes),
}

impl Level3Descriptor {
    fn to_generic(self) -> Descriptor {
        match self {
            Self::Fault => Descriptor::Fault,
            Self::Page(attrs) => Descriptor::Page(attrs),
        }
    }

    fn from_generic(descriptor: Descriptor) -> Self {
        match descriptor {
            Descriptor::Fault => Self::Fault,
            Descriptor::Page(attrs) => Self::Page(attrs),
            other => unreachable!("illegal descriptor variant {other:?} at level 3"),
        }
    }

    /// Dispatches to the handler arm matching the variant actually present.
    pub fn visit<R>(self, on_fault: impl FnOnce() -> R, on_page: impl FnOnce(LeafAttributes) -> R) -> R {
        match self {
            Self::Fault => on_fault(),
            Self::Page(attrs) => on_page(attrs),
        }
    }
}

/// A typed borrow over level 0 (the PGD).
pub struct Level0View<'a> {
    table: &'a mut PageTable,
}

impl<'a> Level0View<'a> {
    pub fn new(table: &'a mut PageTable) -> Self {
        Self { table }
    }

    pub fn entry_for(&self, va: VirtualAddress) -> Level0Descriptor {
        let bits = self.table.entries[va.table_index(L0_SHIFT)];
        Level0Descriptor::from_generic(
            Descriptor::from_bits(bits, false).expect("corrupt PGD descriptor"),
        )
    }

    pub fn set_entry_for(&mut self, va: VirtualAddress, descriptor: Level0Descriptor) {
        self.table.entries[va.table_index(L0_SHIFT)] = descriptor.to_generic().to_bits();
    }
}

/// A typed borrow over level 1 or level 2 (the PUD / PMD), which share the
/// same legal variant set.
pub struct Level12View<'a> {
    table: &'a mut PageTable,
    shift: u32,
}

impl<'a> Level12View<'a> {
    /// Views `table` as a level-1 table (the PUD).
    pub fn level1(table: &'a mut PageTable) -> Self {
        Self {
            table,
            shift: L1_SHIFT,
        }
    }

    /// Views `table` as a level-2 table (the PMD).
    pub fn level2(table: &'a mut PageTable) -> Self {
        Self {
            table,
            shift: L2_SHIFT,
        }
    }

    pub fn entry_for(&self, va: VirtualAddress) -> Level12Descriptor {
        let bits = self.table.entries[va.table_index(self.shift)];
        Level12Descriptor::from_generic(
            Descriptor::from_bits(bits, false).expect("corrupt PUD/PMD descriptor"),
        )
    }

    pub fn set_entry_for(&mut self, va: VirtualAddress, descriptor: Level12Descriptor) {
        self.table.entries[va.table_index(self.shift)] = descriptor.to_generic().to_bits();
    }

    /// Installs `descriptor` directly at `index`, bypassing VA derivation.
    /// Used by the boot MMU setup, which builds block maps index-by-index
    /// over a contiguous range rather than one VA at a time.
    pub fn set_entry_at(&mut self, index: usize, descriptor: Level12Descriptor) {
        self.table.entries[index] = descriptor.to_generic().to_bits();
    }
}

/// A typed borrow over level 3 (the PTE).
pub struct Level3View<'a> {
    table: &'a mut PageTable,
}

impl<'a> Level3View<'a> {
    pub fn new(table: &'a mut PageTable) -> Self {
        Self { table }
    }

    pub fn entry_for(&self, va: VirtualAddress) -> Level3Descriptor {
        let bits = self.table.entries[va.table_index(L3_SHIFT)];
        Level3Descriptor::from_generic(
            Descriptor::from_bits(bits, true).expect("corrupt PTE descriptor"),
        )
    }

    pub fn set_entry_for(&mut self, va: VirtualAddress, descriptor: Level3Descriptor) {
        self.table.entries[va.table_index(L3_SHIFT)] = descriptor.to_generic().to_bits();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;
    use crate::memory::descriptor::{AccessPermission, MemoryAttribute};

    #[kernel_test]
    fn level0_round_trips_table_descriptor() {
        let mut table = PageTable::zeroed();
        let mut view = Level0View::new(&mut table);
        let va = VirtualAddress::new(0xFFFF_0000_0000_0000);
        let pud = PhysicalAddress::new(0x9000);
        view.set_entry_for(va, Level0Descriptor::Table(pud));
        match view.entry_for(va) {
            Level0Descriptor::Table(addr) => assert_eq!(addr, pud),
            Level0Descriptor::Fault => panic!("expected Table"),
        }
    }

    #[kernel_test]
    fn block_map_covers_expected_indices() {
        let mut table = PageTable::zeroed();
        let mut pmd = Level12View::level2(&mut table);
        let count = 4;
        for i in 0..count {
            pmd.set_entry_at(
                i,
                Level12Descriptor::Block(LeafAttributes {
                    addr: PhysicalAddress::new(i as u64 * crate::config::SECTION_SIZE),
                    memory_attribute: MemoryAttribute::NormalNonCacheable,
                    access_permission: AccessPermission::KernelRwUserNone,
                    access_flag: true,
                }),
            );
        }
        for i in 0..count {
            let va = VirtualAddress::new(i as u64 * crate::config::SECTION_SIZE);
            match pmd.entry_for(va) {
                Level12Descriptor::Block(attrs) => {
                    assert_eq!(attrs.addr, PhysicalAddress::new(i as u64 * crate::config::SECTION_SIZE))
                }
                other => panic!("expected Block, got {other:?}"),
            }
        }
    }

    #[kernel_test]
    fn level3_entry_defaults_to_fault() {
        let mut table = PageTable::zeroed();
        let view = Level3View::new(&mut table);
        let va = VirtualAddress::new(0x40_0000);
        assert!(matches!(view.entry_for(va), Level3Descriptor::Fault));
    }
}
