//! A shared MMIO register wrapper, and the BCM2837 peripheral base address
//! every device register block is offset from.
//!
//! Based on `board::uart`'s own local `Mmio<T>` (a raw, volatile
//! read/write register block), pulled out here so `board::timer` and
//! `board::irq` share it instead of each re-declaring the same wrapper.

use core::ops;

/// The base of the BCM2837's peripheral MMIO window, as seen from the ARM
/// core, on a Raspberry Pi 3.
pub const DEVICE_BASE: usize = crate::config::DEVICE_BASE as usize;

/// A raw pointer to a register block, offering only volatile reads/writes
/// through `Deref`. Carries no ownership of the memory it points at; two
/// `Mmio<T>` instances may legally alias the same address only if callers
/// uphold single-owner discipline themselves (as `board::init` does by
/// constructing each device's singleton exactly once).
pub struct Mmio<T> {
    start_addr: *mut T,
}

impl<T> Mmio<T> {
    /// # Safety
    /// `start_addr` must be the correct, live address of a `T`-shaped
    /// register block, and no other code may alias this range.
    pub const unsafe fn new(start_addr: *mut T) -> Self {
        Self { start_addr }
    }
}

impl<T> ops::Deref for Mmio<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.start_addr }
    }
}

unsafe impl<T> Send for Mmio<T> {}
unsafe impl<T> Sync for Mmio<T> {}
