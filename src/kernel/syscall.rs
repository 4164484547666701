//! The system-call table and dispatch.
//!
//! A fixed function-pointer table indexed by the value the caller placed
//! in `x8`, covering exactly three calls: `write`, `fork`, `exit`.

use crate::architecture::trap_frame::TrapFrame;
use crate::config::SYSCALL_COUNT;
use crate::kernel::scheduler;
use crate::{board, kernel::Serial};

type SyscallFn = fn(&mut TrapFrame) -> i64;

/// Indexed `{write, fork, exit}`.
static TABLE: [SyscallFn; SYSCALL_COUNT] = [sys_write, sys_fork, sys_exit];

/// Dispatches on `frame`'s syscall index (`x8`), writing the result back
/// into `x0`. An index outside the table reports `-1`.
pub fn dispatch(frame: &mut TrapFrame) {
    let index = frame.syscall_index() as usize;
    let result = match TABLE.get(index) {
        Some(syscall) => syscall(frame),
        None => -1,
    };
    frame.set_return_value(result);
}

/// Writes the nul-terminated string at `x0` to the serial console. The
/// pointer is a user-space address, dereferenced directly since `TTBR0_EL1`
/// is already programmed for the calling task's address space —
/// no separate user/kernel copy step is needed at EL1.
fn sys_write(frame: &mut TrapFrame) -> i64 {
    let mut cursor = frame.arg0() as *const u8;
    let mut written: i64 = 0;
    unsafe {
        while *cursor != 0 {
            board::serial().write_fmt(format_args!("{}", *cursor as char));
            cursor = cursor.add(1);
            written += 1;
        }
    }
    written
}

fn sys_fork(frame: &mut TrapFrame) -> i64 {
    scheduler::fork_current(frame)
}

fn sys_exit(_frame: &mut TrapFrame) -> i64 {
    scheduler::exit_current()
}
