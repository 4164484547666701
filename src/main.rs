//! The initialization sequences

#![no_main]
#![no_std]
#![feature(format_args_nl)]
#![feature(panic_info_message)]
#![feature(const_option)]
#![feature(once_cell)]
#![feature(ptr_to_from_bits)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![reexport_test_harness_main = "test_main"]
#![feature(custom_test_frameworks)]
#![test_runner(test_runner)]

mod architecture;
mod board;
mod config;
mod kernel;
mod memory;

#[no_mangle]
pub fn kernel_main() {}
