//! The BCM2837 system timer: a free-running 64-bit counter with four
//! compare channels, each wired to its own legacy IRQ line.
//!
//! This crate only drives channel 1, reserved for the scheduler's
//! periodic preemption tick, at `config::TIMER_PERIOD_MICROS`.

use crate::board::mmio::{Mmio, DEVICE_BASE};
use crate::config::TIMER_PERIOD_MICROS;
use tock_registers::{
    interfaces::{Readable, Writeable},
    register_structs,
    registers::{ReadOnly, ReadWrite},
};

const TIMER_BASE: usize = DEVICE_BASE + 0x3000;

/// Channel 1's bit in `ControlStatus`/`IRQPending1`/`InterruptEnable1`.
const CHANNEL_1: u32 = 1 << 1;

register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x00 => ControlStatus: ReadWrite<u32>),
        (0x04 => CounterLow: ReadOnly<u32>),
        (0x08 => CounterHigh: ReadOnly<u32>),
        (0x0C => Compare0: ReadWrite<u32>),
        (0x10 => Compare1: ReadWrite<u32>),
        (0x14 => Compare2: ReadWrite<u32>),
        (0x18 => Compare3: ReadWrite<u32>),
        (0x1C => @END),
    }
}

type Registers = Mmio<RegisterBlock>;

/// The system-wide system-timer device.
static TIMER: Registers = unsafe { Registers::new(TIMER_BASE as *mut RegisterBlock) };

/// Arms channel 1 to fire `TIMER_PERIOD_MICROS` from now, and every
/// `TIMER_PERIOD_MICROS` thereafter via repeated calls from the IRQ
/// handler.
pub fn init() {
    arm_next_tick(TIMER.CounterLow.get());
}

/// Re-arms channel 1 `TIMER_PERIOD_MICROS` past `from`, then clears
/// channel 1's pending status so the same edge is not re-delivered.
pub fn arm_next_tick(from: u32) {
    TIMER.Compare1.set(from.wrapping_add(TIMER_PERIOD_MICROS as u32));
}

/// Acknowledges channel 1's interrupt and re-arms it for the next period.
/// Called from `board::irq::dispatch_irq` once it has confirmed channel 1
/// is the pending source.
pub fn acknowledge_and_rearm() {
    let now = TIMER.CounterLow.get();
    TIMER.ControlStatus.set(CHANNEL_1);
    arm_next_tick(now);
}
