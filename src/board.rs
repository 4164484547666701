//! Board-specific (BCM2837) devices: the mini-UART, the system timer, and
//! the legacy interrupt controller.

pub mod irq;
pub mod mmio;
pub mod timer;
mod uart;

pub use uart::serial;

use crate::call_once;

/// One-time, board-level initialization. Only the mini-UART and the
/// periodic timer tick are brought up; this board runs a single hardware
/// thread, so there is no secondary-core wakeup sequence.
pub fn init() {
    call_once!();
    serial().init();
    irq::init();
}
