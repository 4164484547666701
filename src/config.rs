//! Board and memory-layout constants shared across the boot, MMU, and
//! scheduler subsystems.

/// Kernel higher-half base. Also the fixed offset from a physical address
/// to the kernel-window virtual address that maps it (invariant 4).
pub const VA_START: u64 = 0xFFFF_0000_0000_0000;

/// First device MMIO address on the BCM2837.
pub const DEVICE_BASE: u64 = 0x3F00_0000;

/// Assumed RAM size.
pub const PHYS_MEMORY_SIZE: u64 = 0x4000_0000;

/// Granule size used throughout (4 KiB pages).
pub const PAGE_SIZE: u64 = 4096;
/// `log2(PAGE_SIZE)`.
pub const PAGE_SHIFT: u32 = 12;

/// Size of a level 1/2 block mapping (2 MiB).
pub const SECTION_SIZE: u64 = 2 * 1024 * 1024;

/// Reserved for the kernel image; the page-frame arena starts after this,
/// rounded up to the next `SECTION_SIZE` boundary.
pub const LOW_MEMORY: u64 = 4 * 1024 * 1024;

/// Number of index bits per translation table level.
pub const TABLE_INDEX_BITS: u32 = 9;
/// Entries per table (one 4 KiB page of 64-bit descriptors).
pub const ENTRIES_PER_TABLE: usize = 1 << TABLE_INDEX_BITS;

/// Shift to the level-0 (PGD) index field of a virtual address.
pub const L0_SHIFT: u32 = PAGE_SHIFT + 3 * TABLE_INDEX_BITS;
/// Shift to the level-1 (PUD) index field.
pub const L1_SHIFT: u32 = PAGE_SHIFT + 2 * TABLE_INDEX_BITS;
/// Shift to the level-2 (PMD) index field.
pub const L2_SHIFT: u32 = PAGE_SHIFT + TABLE_INDEX_BITS;
/// Shift to the level-3 (PTE) index field.
pub const L3_SHIFT: u32 = PAGE_SHIFT;

/// `MAIR_EL1` index for device-nGnRnE memory.
pub const ATTR_DEVICE_NGNRNE: u64 = 0;
/// `MAIR_EL1` index for normal non-cacheable memory.
pub const ATTR_NORMAL_NC: u64 = 1;
/// `MAIR_EL1` encoding for device-nGnRnE.
pub const MAIR_DEVICE_NGNRNE: u64 = 0x00;
/// `MAIR_EL1` encoding for normal non-cacheable.
pub const MAIR_NORMAL_NC: u64 = 0x44;

/// Fixed capacity of the task table.
pub const MAX_TASKS: usize = 64;
/// Fixed per-task capacity of the owned-kernel-pages and user-pages lists.
pub const MAX_TASK_PAGES: usize = 16;
/// Number of defined system calls.
pub const SYSCALL_COUNT: usize = 3;
/// Approximate preemption period for the system timer.
pub const TIMER_PERIOD_MICROS: u64 = 200_000;
