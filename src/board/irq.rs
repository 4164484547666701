//! The BCM2837's legacy interrupt controller: IRQ pending/enable registers,
//! not a GICv2 — this board has no GIC.
//!
//! Only the system timer's channel-1 line is enabled; every other source
//! is left masked, since nothing else in this kernel needs to interrupt
//! and a general device-driver surface is out of scope here.

use crate::board::mmio::{Mmio, DEVICE_BASE};
use crate::board::timer;
use crate::kernel::scheduler;
use tock_registers::{
    interfaces::{Readable, Writeable},
    register_structs,
    registers::{ReadOnly, WriteOnly},
};

const IRQ_BASE: usize = DEVICE_BASE + 0xB200;

/// The system timer's channel 1 delivers on legacy IRQ line 1.
const SYSTEM_TIMER_CHANNEL_1: u32 = 1 << 1;

register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x00 => BasicPending: ReadOnly<u32>),
        (0x04 => Pending1: ReadOnly<u32>),
        (0x08 => Pending2: ReadOnly<u32>),
        (0x0C => FIQSource: ReadOnly<u32>),
        (0x10 => Enable1: WriteOnly<u32>),
        (0x14 => Enable2: WriteOnly<u32>),
        (0x18 => BasicEnable: WriteOnly<u32>),
        (0x1C => @END),
    }
}

type Registers = Mmio<RegisterBlock>;

static IRQ: Registers = unsafe { Registers::new(IRQ_BASE as *mut RegisterBlock) };

/// Enables the system timer's channel-1 line and arms the first tick.
/// Leaves every other IRQ source masked.
pub fn init() {
    IRQ.Enable1.set(SYSTEM_TIMER_CHANNEL_1);
    timer::init();
}

/// Routes a pending IRQ to its handler. Called from both exception-vector
/// classes that can observe an IRQ (`curr_elx_irq`, `lower_el_irq_64`):
/// the source doesn't depend on which privilege level was interrupted.
pub fn dispatch_irq() {
    let pending = IRQ.Pending1.get();
    if pending & SYSTEM_TIMER_CHANNEL_1 != 0 {
        timer::acknowledge_and_rearm();
        scheduler::timer_tick();
    }
}
