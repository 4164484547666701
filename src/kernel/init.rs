//! The boot-to-running handoff: brings up the architecture and board
//! layers, starts the scheduler, and creates the first task.
//!
//! This kernel runs a single hardware thread, so there is no second-core
//! rendezvous, only one straight-line bring-up into an always-present
//! initial task.

use crate::{architecture, board, kernel, log};

extern "Rust" {
    /// The kernel's own entry point, defined by the binary crate (or, under
    /// the test harness, by `test_main`).
    fn kernel_main();
}

/// Entered from [`architecture::start::boot_kernel`] with the MMU already
/// enabled and running out of the higher-half window. Never returns: once
/// the scheduler has a second task to run, this call stack becomes the
/// idle task's.
#[no_mangle]
pub extern "C" fn kmain(dtb_phys: u32, r1: u64, r2: u64, r3: u64, start_phys: u32) -> ! {
    // The firmware boot arguments aren't consumed by anything in this
    // kernel (no device-tree parser); kept as parameters so the boot
    // handoff's calling convention stays visible.
    let _ = (dtb_phys, r1, r2, r3, start_phys);

    crate::call_once!();

    architecture::init();
    board::init();
    kernel::scheduler::init();

    log!("board brought up, starting the scheduler");

    kernel::scheduler::create_kernel_task(run_kernel_main, 0)
        .expect("failed to create the kernel's first task");

    architecture::exception::enable();

    idle_loop();
}

/// The body of the first task the scheduler creates: just calls through to
/// whatever `kernel_main` the binary (or test harness) defines.
extern "C" fn run_kernel_main(_arg: u64) {
    unsafe { kernel_main() };
}

/// What the boot task becomes once there is other work to elect: spin,
/// yielding at every opportunity, so it never starves a runnable task yet
/// is always available if everything else exits.
fn idle_loop() -> ! {
    loop {
        kernel::scheduler::schedule();
        aarch64_cpu::asm::wfe();
    }
}
