//! Typed wrappers over the handful of system registers `aarch64-cpu`
//! doesn't already expose, following that crate's own `Readable`/
//! `Writeable` interfaces so call sites read identically to e.g.
//! `HCR_EL2.modify(...)`.

use tock_registers::interfaces::{Readable, Writeable};

/// `HSTR_EL2`: Hypervisor System Trap Register. Controls which EL1
/// accesses to coprocessor-style system registers trap to EL2; zeroing it
/// is part of disabling EL2 traps during the EL2 → EL1 lowering.
pub struct HstrEl2;

pub static HSTR_EL2: HstrEl2 = HstrEl2;

impl Readable for HstrEl2 {
    type T = u64;
    type R = ();

    fn get(&self) -> u64 {
        let value: u64;
        unsafe { core::arch::asm!("mrs {}, hstr_el2", out(reg) value, options(nomem, nostack)) };
        value
    }
}

impl Writeable for HstrEl2 {
    type T = u64;
    type R = ();

    fn set(&self, value: u64) {
        unsafe { core::arch::asm!("msr hstr_el2, {}", in(reg) value, options(nomem, nostack)) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    #[kernel_test]
    fn hstr_el2_round_trips_a_write() {
        let original = HSTR_EL2.get();
        HSTR_EL2.set(0);
        assert_eq!(HSTR_EL2.get(), 0);
        HSTR_EL2.set(original);
    }
}
