//! The task control block.
//!
//! A fixed-size record carrying the saved CPU context, the scheduling
//! bookkeeping (`counter`/`priority`), and the per-task address space.
//! There is no heap-backed thread type or ready-heap here — the scheduler
//! owns a fixed table of these by value.

use crate::architecture::context::CpuContext;
use crate::memory::task_memory::MemoryState;

/// Identifies a task by its slot in the fixed task table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TaskId(pub u8);

/// Whether a task is eligible for election, or has exited and is waiting to
/// be reaped. There is no separate "ready" state: every non-`Zombie` task,
/// including whichever one happens to be running right now, is `Running`
/// and eligible — `scheduler::current_id` is what distinguishes the one
/// actually executing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunState {
    Running,
    Zombie,
}

/// Per-task flags. `KERNEL_TASK` distinguishes a task running entirely in
/// EL1 (no user address space of its own) from one that has been dropped
/// to EL0, per the data model's "one bit distinguishes kernel task from
/// user task".
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TaskFlags(u8);

impl TaskFlags {
    pub const KERNEL_TASK: Self = Self(1 << 0);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// A single task's complete state.
#[derive(Clone, Copy)]
pub struct Task {
    pub id: TaskId,
    pub state: RunState,
    pub flags: TaskFlags,
    /// Quanta remaining before this task next yields to election. The
    /// scheduler elects the ready task with the highest counter; signed so
    /// the timer tick can clamp it to exactly zero without underflowing.
    pub counter: i32,
    /// Refill value: on a counter exhaustion round, every task's counter
    /// is rebuilt as `counter / 2 + priority`.
    pub priority: i32,
    /// Non-zero while this task must not be preempted.
    pub preempt_count: u32,
    pub context: CpuContext,
    pub memory: MemoryState,
}

impl Task {
    pub const fn new(id: TaskId, priority: i32, flags: TaskFlags) -> Self {
        Self {
            id,
            state: RunState::Running,
            flags,
            counter: priority,
            priority,
            preempt_count: 0,
            context: CpuContext::new(),
            memory: MemoryState::new(),
        }
    }
}
