//! Behavioral tests that need a running kernel — the task table, the
//! election algorithm, and `fork`'s address-space copy — rather than pure
//! logic that fits in a `#[cfg(test)]` unit test.

#![feature(custom_test_frameworks)]
#![no_main]
#![no_std]
#![reexport_test_harness_main = "test_main"]
#![test_runner(libkernel::test_runner)]

use core::sync::atomic::{AtomicU64, Ordering};
use libkernel::kernel::scheduler;
use test_macros::kernel_test;

#[no_mangle]
fn kernel_main() {
    test_main()
}

/// Spawns several kernel tasks that each bump a shared counter once and
/// exit; the spawning task cooperatively yields until every one of them
/// has run. Exercises `create_kernel_task`, election, and `exit_current`
/// together.
#[kernel_test]
fn every_created_task_eventually_runs() {
    const NUM_TASKS: u64 = 8;
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.store(0, Ordering::SeqCst);

    extern "C" fn bump_and_exit(_arg: u64) {
        COUNTER.fetch_add(1, Ordering::SeqCst);
        scheduler::exit_current();
    }

    for _ in 0..NUM_TASKS {
        scheduler::create_kernel_task(bump_and_exit, 0)
            .expect("task table should have room for a handful of tasks");
    }

    // Every created task starts with the creator's priority and a full
    // counter, so round-robin election reaches each of them in turn as
    // this loop repeatedly gives up its own quantum.
    while COUNTER.load(Ordering::SeqCst) < NUM_TASKS {
        scheduler::schedule();
    }

    assert_eq!(COUNTER.load(Ordering::SeqCst), NUM_TASKS);
}

/// A task created with a distinct argument actually observes that argument
/// on entry, and runs to completion without disturbing the caller's own
/// continued scheduling.
#[kernel_test]
fn created_task_receives_its_argument() {
    static OBSERVED: AtomicU64 = AtomicU64::new(0);
    const MARKER: u64 = 0xDEAD_BEEF;

    extern "C" fn record_arg_and_exit(arg: u64) {
        OBSERVED.store(arg, Ordering::SeqCst);
        scheduler::exit_current();
    }

    scheduler::create_kernel_task(record_arg_and_exit, MARKER)
        .expect("task table should have room for one more task");

    while OBSERVED.load(Ordering::SeqCst) == 0 {
        scheduler::schedule();
    }

    assert_eq!(OBSERVED.load(Ordering::SeqCst), MARKER);
}
