//! Virtual memory: address types, translation-table descriptors and
//! level-typed views, the page-frame allocator, and per-task memory
//! management built on top of them.

pub mod address;
pub mod descriptor;
pub mod frame_allocator;
pub mod table;
pub mod task_memory;

pub use address::{PhysicalAddress, VirtualAddress};
pub use descriptor::{AccessPermission, Descriptor, LeafAttributes, MemoryAttribute};
pub use frame_allocator::FRAME_ALLOCATOR;
pub use table::PageTable;
