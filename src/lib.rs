//! The initialization sequences

#![no_main]
#![no_std]
#![feature(format_args_nl)]
#![feature(panic_info_message)]
#![feature(const_option)]
#![feature(once_cell)]
#![feature(ptr_to_from_bits)]
#![feature(custom_test_frameworks)]
#![forbid(unsafe_op_in_unsafe_fn)]
// etc
#![reexport_test_harness_main = "test_main"]
#![test_runner(crate::test_runner)]

pub mod architecture;
pub mod board;
pub mod config;
pub mod kernel;
pub mod memory;

/// The default runner for unit tests.
///
/// The timeout watchdog is itself a kernel task, created through the real
/// scheduler rather than a standalone thread pool — this kernel is
/// single-hardware-thread by design, so there is no multi-core thread
/// pool to borrow for the job.
pub fn test_runner(tests: &[&test_types::UnitTest]) -> ! {
    use crate::kernel::timer::now;
    use core::time::Duration;

    const NUM_LOOPS: u64 = 10;

    extern "C" fn watch_for_timeout(_arg: u64) {
        let start = now();
        let timeout: Duration = Duration::from_secs(NUM_LOOPS * 5);
        loop {
            assert!(now() - start < timeout, "Test timed out");
            kernel::scheduler::schedule();
        }
    }
    kernel::scheduler::create_kernel_task(watch_for_timeout, 0)
        .expect("failed to create the test timeout watchdog task");

    // This line will be printed as the test headers
    println!("Running {} tests", tests.len());
    // println!()

    for test in tests {
        for i in 1..=NUM_LOOPS {
            println!("[{}/{}] {}:", i, NUM_LOOPS, test.name);

            // Run the actual test.
            (test.test_func)();

            println!(".... PASSED")
        }
    }

    architecture::shutdown(0);
}

#[cfg(test)]
#[no_mangle]
fn kernel_main() -> () {
    test_main();
}
