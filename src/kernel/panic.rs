//! The panic handler.
//!
//! Prints the panic message over the UART and halts the core, mirroring
//! `architecture::shutdown`'s double-entry guard so a panic inside the
//! printing path itself cannot recurse.

use crate::println;
use core::panic::PanicInfo;
use core::sync::atomic::{AtomicBool, Ordering};

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    static IS_PANICKING: AtomicBool = AtomicBool::new(false);

    if !IS_PANICKING.swap(true, Ordering::Relaxed) {
        if let Some(args) = info.message() {
            if let Some(location) = info.location() {
                println!(
                    "Kernel panic at {}:{}:{}:\n\n{}",
                    location.file(),
                    location.line(),
                    location.column(),
                    args
                );
            } else {
                println!("Kernel panic:\n\n{}", args);
            }
        } else {
            println!("Kernel panic!");
        }
    }

    loop {
        aarch64_cpu::asm::wfe();
    }
}
