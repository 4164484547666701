//! Bitmap page-frame allocator.
//!
//! A flat bitmap over the physical frames following the kernel image,
//! scanned for the first clear bit. Wrapped in `SpinLock` the way
//! `board::uart::Uart` wraps its register block.

use crate::architecture::spinlock::SpinLock;
use crate::config::{LOW_MEMORY, PAGE_SIZE, PHYS_MEMORY_SIZE, SECTION_SIZE};
use crate::kernel::Mutex;
use crate::memory::address::PhysicalAddress;

const ARENA_START: u64 = align_up(LOW_MEMORY, SECTION_SIZE);
const FRAME_COUNT: usize = ((PHYS_MEMORY_SIZE - ARENA_START) / PAGE_SIZE) as usize;
const BITMAP_WORDS: usize = (FRAME_COUNT + 63) / 64;

const fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

struct Bitmap {
    words: [u64; BITMAP_WORDS],
}

impl Bitmap {
    const fn new() -> Self {
        Self {
            words: [0; BITMAP_WORDS],
        }
    }

    fn is_set(&self, index: usize) -> bool {
        self.words[index / 64] & (1 << (index % 64)) != 0
    }

    fn set(&mut self, index: usize) {
        self.words[index / 64] |= 1 << (index % 64);
    }

    fn clear(&mut self, index: usize) {
        self.words[index / 64] &= !(1 << (index % 64));
    }

    /// Scans for the first clear bit, in frame order.
    fn first_free(&self) -> Option<usize> {
        for (word_index, word) in self.words.iter().enumerate() {
            if *word != u64::MAX {
                let bit = word.trailing_ones() as usize;
                let index = word_index * 64 + bit;
                if index < FRAME_COUNT {
                    return Some(index);
                }
                return None;
            }
        }
        None
    }
}

/// Allocates and frees whole physical page frames from the paging arena
/// that starts just past the kernel image.
pub struct PageFrameAllocator {
    bitmap: Bitmap,
}

impl PageFrameAllocator {
    const fn new() -> Self {
        Self {
            bitmap: Bitmap::new(),
        }
    }

    fn frame_address(index: usize) -> PhysicalAddress {
        PhysicalAddress::new(ARENA_START + (index as u64) * PAGE_SIZE)
    }

    /// Finds the first free frame, marks it used, and zeroes it through the
    /// kernel's higher-half window before returning its physical address.
    fn allocate(&mut self) -> Option<PhysicalAddress> {
        let index = self.bitmap.first_free()?;
        self.bitmap.set(index);
        let frame = Self::frame_address(index);

        let kernel_va = frame.to_kernel_virtual();
        unsafe {
            let ptr = kernel_va.as_mut_ptr::<u8>();
            core::ptr::write_bytes(ptr, 0, PAGE_SIZE as usize);
        }
        Some(frame)
    }

    /// Returns a previously allocated frame to the free pool. Unused by
    /// the current boot/fork/exit paths, but retained
    /// as a primitive operation for future callers (e.g. a reclaiming exit).
    fn free(&mut self, frame: PhysicalAddress) {
        debug_assert!(frame.is_aligned(PAGE_SIZE));
        let index = ((frame.as_u64() - ARENA_START) / PAGE_SIZE) as usize;
        self.bitmap.clear(index);
    }
}

/// The system-wide page-frame allocator.
pub static FRAME_ALLOCATOR: SpinLock<PageFrameAllocator> = SpinLock::new(PageFrameAllocator::new());

/// Allocates a zeroed physical frame, or `None` if the arena is exhausted.
pub fn allocate_frame() -> Option<PhysicalAddress> {
    FRAME_ALLOCATOR.lock(|allocator| allocator.allocate())
}

/// Returns `frame` to the free pool.
pub fn free_frame(frame: PhysicalAddress) {
    FRAME_ALLOCATOR.lock(|allocator| allocator.free(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    #[kernel_test]
    fn allocated_frames_are_distinct_and_aligned() {
        let mut allocator = PageFrameAllocator::new();
        let first = allocator.allocate().expect("arena should not start exhausted");
        let second = allocator.allocate().expect("arena should not start exhausted");
        assert_ne!(first, second);
        assert!(first.is_aligned(PAGE_SIZE));
        assert!(second.is_aligned(PAGE_SIZE));
    }

    #[kernel_test]
    fn freed_frame_is_reused() {
        let mut allocator = PageFrameAllocator::new();
        let frame = allocator.allocate().unwrap();
        allocator.free(frame);
        let expected_index = ((frame.as_u64() - ARENA_START) / PAGE_SIZE) as usize;
        assert_eq!(allocator.bitmap.first_free(), Some(expected_index));
    }
}
