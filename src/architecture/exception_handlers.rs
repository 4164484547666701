//! The sixteen exception-vector handlers, dispatched from `exception.s`'s
//! `CALL_WITH_CONTEXT` with a pointer to the saved register file in `x0`.
//!
//! A handler per vector class and source, diagnostics for anything
//! unexpected, and the two paths this kernel actually services from a
//! lower EL — `SVC` (the syscall table) and a translation-fault data
//! abort (demand paging).

use aarch64_cpu::registers::{ESR_EL1, FAR_EL1};
use tock_registers::{interfaces::Readable, register_bitfields};

use crate::architecture::trap_frame::TrapFrame;
use crate::kernel::{scheduler, syscall};
use crate::{board, log};

fn diagnostic_halt(name: &str, frame: &TrapFrame) -> ! {
    log!(
        "{} exception: ELR={:#018x} ESR={:#010x} FAR={:#018x}",
        name,
        frame.elr_el1,
        ESR_EL1.get(),
        FAR_EL1.get()
    );
    panic!("Unhandled {} exception", name);
}

#[no_mangle]
extern "C" fn curr_el0_sync(frame: &mut TrapFrame) {
    diagnostic_halt("synchronous, taken with SP_EL0", frame);
}

#[no_mangle]
extern "C" fn curr_el0_irq(frame: &mut TrapFrame) {
    diagnostic_halt("IRQ, taken with SP_EL0", frame);
}

#[no_mangle]
extern "C" fn curr_el0_fiq(frame: &mut TrapFrame) {
    diagnostic_halt("FIQ, taken with SP_EL0", frame);
}

#[no_mangle]
extern "C" fn curr_el0_other(frame: &mut TrapFrame) {
    diagnostic_halt("miscellaneous, taken with SP_EL0", frame);
}

#[no_mangle]
extern "C" fn curr_elx_sync(frame: &mut TrapFrame) {
    match ESR_EL1.read_as_enum(ESR_EL1::EC) {
        Some(ESR_EL1::EC::Value::InstrAbortCurrentEL) => handle_instruction_abort(frame),
        Some(ESR_EL1::EC::Value::DataAbortCurrentEL) => handle_data_abort(frame),
        _ => diagnostic_halt("synchronous, taken with SP_ELX", frame),
    };
}

register_bitfields![u64, DataAbortISS [
    VALID OFFSET(24) NUMBITS(1) [
        INVALID = 0b0,
        VALID = 0b1,
    ],
    SAS OFFSET(22) NUMBITS(2) [
        BYTE = 0b00,
        HALFWORD = 0b01,
        WORD = 0b10,
        DOUBLEWORD = 0b11,
    ],
    DFSC OFFSET(0) NUMBITS(6) [
        ALIGNMENT_FAULT = 0b100001,
    ]
]];

fn handle_instruction_abort(frame: &mut TrapFrame) -> ! {
    log!(
        "Instruction abort taken from the current EL: {:b}",
        ESR_EL1.read(ESR_EL1::ISS)
    );
    diagnostic_halt("instruction abort, taken with SP_ELX", frame);
}

fn handle_data_abort(frame: &mut TrapFrame) -> ! {
    log!(
        "Data abort taken from the current EL: {:b}",
        ESR_EL1.read(ESR_EL1::ISS)
    );
    match ESR_EL1.read_as_enum::<DataAbortISS::DFSC::Value>(ESR_EL1::ISS) {
        Some(DataAbortISS::DFSC::Value::ALIGNMENT_FAULT) => log!("Reason: alignment fault"),
        _ => log!("Unhandled status code"),
    }
    diagnostic_halt("data abort, taken with SP_ELX", frame);
}

#[no_mangle]
extern "C" fn curr_elx_irq(frame: &mut TrapFrame) {
    let _ = frame;
    board::irq::dispatch_irq();
}

#[no_mangle]
extern "C" fn curr_elx_fiq(frame: &mut TrapFrame) {
    diagnostic_halt("FIQ, taken with SP_ELX", frame);
}

#[no_mangle]
extern "C" fn curr_elx_other(frame: &mut TrapFrame) {
    diagnostic_halt("miscellaneous, taken with SP_ELX", frame);
}

/// Services the two synchronous exceptions a lower EL can raise that this
/// kernel actually handles — `SVC` and a translation-fault data abort — and
/// halts with a diagnostic for anything else.
#[no_mangle]
extern "C" fn lower_el_sync_64(frame: &mut TrapFrame) {
    match ESR_EL1.read_as_enum(ESR_EL1::EC) {
        Some(ESR_EL1::EC::Value::SVC64) => syscall::dispatch(frame),
        Some(ESR_EL1::EC::Value::DataAbortLowerEL) => handle_data_abort_lower_el(frame),
        _ => diagnostic_halt("synchronous, taken from a lower EL in AArch64", frame),
    }
}

/// Mirrors `do_mem_abort`: a translation fault (DFSC bits 5:2 == `0b0001`,
/// any level) is demand-paged in and the faulting instruction retried by
/// simply returning; anything else is a genuine fault.
fn handle_data_abort_lower_el(frame: &mut TrapFrame) {
    let dfsc = ESR_EL1.get() & 0b11_1111;
    if dfsc & 0b11_1100 == 0b00_0100 {
        if scheduler::handle_translation_fault(crate::memory::address::VirtualAddress::new(FAR_EL1.get())).is_ok() {
            return;
        }
    }
    diagnostic_halt("data abort, taken from a lower EL", frame);
}

#[no_mangle]
extern "C" fn lower_el_irq_64(frame: &mut TrapFrame) {
    let _ = frame;
    board::irq::dispatch_irq();
}

#[no_mangle]
extern "C" fn lower_el_fiq_64(frame: &mut TrapFrame) {
    diagnostic_halt("FIQ, taken from a lower EL in AArch64", frame);
}

#[no_mangle]
extern "C" fn lower_el_other_64(frame: &mut TrapFrame) {
    diagnostic_halt("miscellaneous, taken from a lower EL in AArch64", frame);
}

#[no_mangle]
extern "C" fn lower_el_sync_32(frame: &mut TrapFrame) {
    diagnostic_halt("synchronous, taken from a lower EL in AArch32", frame);
}

#[no_mangle]
extern "C" fn lower_el_irq_32(frame: &mut TrapFrame) {
    diagnostic_halt("IRQ, taken from a lower EL in AArch32", frame);
}

#[no_mangle]
extern "C" fn lower_el_fiq_32(frame: &mut TrapFrame) {
    diagnostic_halt("FIQ, taken from a lower EL in AArch32", frame);
}

#[no_mangle]
extern "C" fn lower_el_other_32(frame: &mut TrapFrame) {
    diagnostic_halt("miscellaneous, taken from a lower EL in AArch32", frame);
}
