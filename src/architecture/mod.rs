//! CPU- and board-adjacent architecture concerns: register access, boot,
//! the MMU, exceptions, and the timer.

pub mod boot;
pub mod bump_allocator;
pub mod context;
pub mod exception;
pub mod exception_handlers;
pub mod machine;
pub mod mmu;
pub mod regs;
pub mod shutdown;
pub mod spinlock;
pub mod start;
pub mod timer;
pub mod trap_frame;

pub use shutdown::shutdown;
pub use spinlock::SpinLock;

/// One-time, architecture-level initialization. Runs before `board::init`.
pub fn init() {
    exception::init();
    exception::per_core_init();
}
