//! Exception-level lowering: EL3/EL2 → EL1.
//!
//! Reworked onto this crate's own `el2_init`-style entry point, which
//! already drives the `HCR_EL2`/`SPSR_EL2`/`SP_EL1`/`eret` sequence
//! through `aarch64-cpu`.

use crate::architecture::regs::HSTR_EL2;
use crate::kernel::exception::PrivilegeLevel;
use aarch64_cpu::registers::{CPACR_EL1, CPTR_EL2, CurrentEL, HCR_EL2, SPSR_EL2, SP, SP_EL1};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

fn current_level() -> PrivilegeLevel {
    match CurrentEL.read(CurrentEL::EL) {
        0 => PrivilegeLevel::User,
        1 => PrivilegeLevel::Kernel,
        2 => PrivilegeLevel::Hypervisor,
        _ => PrivilegeLevel::Unknown,
    }
}

/// Brings the core from its firmware-entry exception level down to EL1h,
/// with SIMD/FP traps disabled.
///
/// # Safety
/// Must be called exactly once, before any exception vector is installed
/// and before any code relies on running at EL1.
pub unsafe fn switch_to_el1() {
    match current_level() {
        PrivilegeLevel::Kernel => {}
        PrivilegeLevel::Hypervisor => unsafe { switch_from_el2_to_el1() },
        _ => fail_fast(),
    }

    // Un-trap SVE/FP/SIMD for EL1 and EL0.
    CPACR_EL1.modify(CPACR_EL1::FPEN::TrapNothing);
}

/// EL3 is unsupported and anything below EL1 cannot run this code at all;
/// both are a fatal spin.
fn fail_fast() -> ! {
    loop {
        aarch64_cpu::asm::wfe();
    }
}

unsafe fn switch_from_el2_to_el1() {
    // Select AArch64 at EL1, route general exceptions to EL1 rather than EL2.
    HCR_EL2.modify(HCR_EL2::RW::EL1IsAarch64 + HCR_EL2::TGE::DisableTrapGeneralExceptionsToEl2);

    // Disable coprocessor/SIMD traps for EL1 and below.
    CPTR_EL2.set(0);
    HSTR_EL2.set(0);

    // Mask all exceptions and select SP_EL1 for the EL1 we are about to enter.
    SPSR_EL2.modify(
        SPSR_EL2::D::Masked + SPSR_EL2::A::Masked + SPSR_EL2::I::Masked + SPSR_EL2::F::Masked + SPSR_EL2::M::EL1h,
    );

    // Carry the current stack pointer over to EL1h.
    SP_EL1.set(SP.get());

    // Resume at the instruction right after `eret`, now running at EL1.
    unsafe {
        core::arch::asm!(
            "adr {tmp}, 1f",
            "msr elr_el2, {tmp}",
            "eret",
            "1:",
            tmp = out(reg) _,
            options(nomem, nostack),
        );
    }
}
