//! The preemptive round-robin scheduler and fixed task table.
//!
//! A fixed array of task pointers, no queue or heap, election by linear
//! scan for the highest `counter`, and a refill pass when nothing is left
//! to run. A counter-exhaustion round refills every present task's
//! counter as `counter / 2 + priority` rather than plain `counter +
//! priority` — an unhalved refill lets a starved task's counter climb
//! without bound across repeated rounds, undoing the priority aging it is
//! meant to provide. Halving first is the textbook fix (and the one
//! Linux's own contemporary O(1) scheduler used).
//!
//! A task never moves once created: it lives at a fixed index for its
//! whole lifetime, inside the very page that was allocated to hold it,
//! with that same page's tail used as its kernel stack. The table itself
//! stores only a pointer per slot, so election and bookkeeping never have
//! to move a `Task` in memory — the pointer handed to
//! `architecture::context::switch` stays valid for the task's whole life.

use core::ptr::addr_of_mut;

use crate::architecture::context::{self, CpuContext};
use crate::architecture::exception;
use crate::architecture::spinlock::SpinLock;
use crate::architecture::trap_frame::TrapFrame;
use crate::config::{MAX_TASKS, PAGE_SIZE};
use crate::kernel::task::{RunState, Task, TaskFlags, TaskId};
use crate::kernel::Mutex;
use crate::memory::address::VirtualAddress;
use crate::memory::frame_allocator;
use crate::memory::task_memory::{self, MemoryState};

/// Virtual address the current task's user stack is mapped at by
/// `move_to_user_mode`. A single page is enough for the bring-up scenarios
/// this kernel targets; there is no growth-on-fault for stacks, only
/// demand-paging on an actual translation fault, wherever it lands.
const USER_STACK_VA: u64 = 0x0020_0000;

/// The slot the boot path itself runs as, before it ever calls `init`.
/// Lives as a plain static rather than a frame-backed allocation, since
/// there is no "creator" task to allocate one on its behalf.
static mut INIT_TASK: Task = Task::new(TaskId(0), 1, TaskFlags::KERNEL_TASK);

struct TaskTable {
    tasks: [Option<*mut Task>; MAX_TASKS],
    current: TaskId,
}

unsafe impl Send for TaskTable {}

impl TaskTable {
    const fn new() -> Self {
        Self {
            tasks: [None; MAX_TASKS],
            current: TaskId(0),
        }
    }

    fn reserve_slot(&self) -> Option<TaskId> {
        (0..MAX_TASKS)
            .find(|&index| self.tasks[index].is_none())
            .map(|index| TaskId(index as u8))
    }

    fn install(&mut self, id: TaskId, task: *mut Task) {
        self.tasks[id.0 as usize] = Some(task);
    }

    fn get(&self, id: TaskId) -> &Task {
        unsafe { &*self.tasks[id.0 as usize].expect("task slot referenced before installation") }
    }

    fn get_mut(&mut self, id: TaskId) -> &mut Task {
        unsafe { &mut *self.tasks[id.0 as usize].expect("task slot referenced before installation") }
    }

    /// Picks the next task to run, following the election algorithm above.
    /// Returns the raw context pointers to switch between, or `None` if the
    /// currently running task should simply keep going (it's still the
    /// best choice, or there is nothing else present).
    fn elect(&mut self) -> Option<(*mut CpuContext, *mut CpuContext)> {
        loop {
            let mut best: Option<(usize, i32)> = None;
            let mut any_present = false;

            for (index, slot) in self.tasks.iter().enumerate() {
                let Some(task_ptr) = slot else { continue };
                let task = unsafe { &**task_ptr };
                if task.state == RunState::Zombie {
                    continue;
                }
                any_present = true;
                if best.map_or(true, |(_, counter)| task.counter > counter) {
                    best = Some((index, task.counter));
                }
            }

            match best {
                Some((index, counter)) if counter > 0 => {
                    let next_id = TaskId(index as u8);
                    if next_id == self.current {
                        return None;
                    }
                    let prev_ptr = &mut self.get_mut(self.current).context as *mut CpuContext;
                    let next_ptr = &mut self.get_mut(next_id).context as *mut CpuContext;
                    self.current = next_id;
                    return Some((prev_ptr, next_ptr));
                }
                Some(_) => {
                    for slot in self.tasks.iter() {
                        let Some(task_ptr) = slot else { continue };
                        let task = unsafe { &mut **task_ptr };
                        if task.state != RunState::Zombie {
                            task.counter = task.counter / 2 + task.priority;
                        }
                    }
                }
                None if any_present => unreachable!("a present task must have a counter"),
                None => return None,
            }
        }
    }
}

static SCHEDULER: SpinLock<TaskTable> = SpinLock::new(TaskTable::new());

/// Installs the boot path itself as task 0. Must run before anything else
/// in this module is called.
pub fn init() {
    crate::call_once!();
    SCHEDULER.lock(|table| {
        table.install(TaskId(0), unsafe { addr_of_mut!(INIT_TASK) });
        table.current = TaskId(0);
    });
}

/// The task currently executing.
pub fn current_id() -> TaskId {
    SCHEDULER.lock(|table| table.current)
}

/// Runs `f` against the current task's address-space bookkeeping.
pub fn with_current_memory<R>(f: impl FnOnce(&mut MemoryState) -> R) -> R {
    let id = current_id();
    SCHEDULER.lock(|table| f(&mut table.get_mut(id).memory))
}

/// A scoped `preempt_count` guard on the current task, via RAII. Held
/// across election itself, and around the whole of task creation so the
/// creator isn't preempted mid-setup.
pub struct PreemptGuard {
    task: TaskId,
}

impl PreemptGuard {
    pub fn new() -> Self {
        let task = current_id();
        SCHEDULER.lock(|table| table.get_mut(task).preempt_count += 1);
        Self { task }
    }
}

impl Drop for PreemptGuard {
    fn drop(&mut self) {
        SCHEDULER.lock(|table| table.get_mut(self.task).preempt_count -= 1);
    }
}

/// Releases the preempt count `create_process`/`fork_current` took on a new
/// task's behalf. Called from `ret_from_kernel_task`'s assembly the first
/// time a freshly created task actually runs.
#[no_mangle]
extern "C" fn schedule_tail() {
    let id = current_id();
    SCHEDULER.lock(|table| table.get_mut(id).preempt_count -= 1);
}

/// Picks a new task and switches to it if one is electable and different
/// from the current one. Spins with interrupts enabled if nothing at all
/// is electable (every task has exited).
fn elect_and_switch() {
    loop {
        let decision = SCHEDULER.lock(|table| table.elect());
        match decision {
            None => return,
            Some((prev, next)) => {
                context::switch(unsafe { &mut *prev }, unsafe { &mut *next });
                return;
            }
        }
    }
}

/// Called from the timer IRQ. Decrements the current task's counter; once
/// it runs out (and the task isn't holding off preemption), re-enables
/// interrupts, elects, and re-disables.
pub fn timer_tick() {
    let should_elect = SCHEDULER.lock(|table| {
        let id = table.current;
        let task = table.get_mut(id);
        task.counter -= 1;
        if task.counter > 0 || task.preempt_count > 0 {
            false
        } else {
            task.counter = 0;
            true
        }
    });

    if should_elect {
        exception::unmask_irq();
        elect_and_switch();
        exception::mask_irq();
    }
}

/// Voluntary yield: gives up the rest of the current task's quantum and
/// re-elects immediately.
pub fn schedule() {
    let id = current_id();
    SCHEDULER.lock(|table| table.get_mut(id).counter = 0);
    elect_and_switch();
}

/// Allocates a fresh frame to hold a new task, placing the `Task` record at
/// its base and leaving the rest of the page for its kernel stack, exactly
/// as `Scheduler::CreateProcess` does.
fn allocate_task_frame() -> Option<(TaskId, *mut Task, u64)> {
    let frame = frame_allocator::allocate_frame()?;
    let base = frame.to_kernel_virtual().as_u64();
    let id = SCHEDULER.lock(|table| table.reserve_slot())?;
    Some((id, base as *mut Task, base + PAGE_SIZE))
}

/// Creates a new kernel task running `entry(arg)` on its own stack, with
/// the current task's priority. The new task starts with `preempt_count`
/// already at 1, released by `schedule_tail` the first time it runs — the
/// creator effectively hands it off still "holding the lock" on its own
/// behalf.
pub fn create_kernel_task(entry: extern "C" fn(u64), arg: u64) -> Result<TaskId, i64> {
    let _guard = PreemptGuard::new();
    let Some((id, task_ptr, stack_top)) = allocate_task_frame() else {
        return Err(-1);
    };

    let priority = SCHEDULER.lock(|table| table.get(table.current).priority);
    let mut task = Task::new(id, priority, TaskFlags::KERNEL_TASK);
    task.preempt_count = 1;
    task.context.x19 = entry as usize as u64;
    task.context.x20 = arg;
    task.context.program_counter = context::ret_from_kernel_task as usize as u64;
    task.context.stack_pointer = stack_top;

    unsafe { task_ptr.write(task) };
    SCHEDULER.lock(|table| table.install(id, task_ptr));
    Ok(id)
}

/// Clones the current task into a new one: a fresh address space (copied
/// page for page from the parent via `copy_virtual_memory`) and a
/// saved exception-return record that, the first time the child is
/// scheduled, resumes exactly where the parent's `SVC` trapped — except
/// with a return value of zero, exactly as `fork` is specified to behave
/// from the child's side.
pub fn fork_current(parent_frame: &TrapFrame) -> i64 {
    let _guard = PreemptGuard::new();
    let Some((id, task_ptr, stack_top)) = allocate_task_frame() else {
        return -1;
    };

    let parent_id = current_id();
    let (priority, parent_memory) =
        SCHEDULER.lock(|table| (table.get(parent_id).priority, table.get(parent_id).memory));

    let mut task = Task::new(id, priority, TaskFlags::empty());
    task.preempt_count = 1;

    if !task_memory::copy_virtual_memory(&mut task.memory, &parent_memory) {
        SCHEDULER.lock(|table| table.tasks[id.0 as usize] = None);
        return -1;
    }

    let trap_frame_addr = stack_top - core::mem::size_of::<TrapFrame>() as u64;
    let child_frame_ptr = trap_frame_addr as *mut TrapFrame;
    unsafe {
        child_frame_ptr.write(parent_frame.clone_with_return_value(0));
    }

    task.context.program_counter = context::ret_from_exception as usize as u64;
    task.context.stack_pointer = trap_frame_addr;

    unsafe { task_ptr.write(task) };
    SCHEDULER.lock(|table| table.install(id, task_ptr));
    id.0 as i64
}

/// Drops the current (still kernel-mode) task to `EL0`, running `entry`
/// with a freshly allocated one-page user stack. Never returns — there is
/// no trap frame for it to fall back into.
pub fn move_to_user_mode(entry: VirtualAddress) -> ! {
    let id = current_id();
    let stack_page = SCHEDULER.lock(|table| {
        let task = table.get_mut(id);
        task.flags.remove(TaskFlags::KERNEL_TASK);
        task_memory::allocate_user_page(&mut task.memory, VirtualAddress::new(USER_STACK_VA))
    });
    stack_page.expect("out of memory bringing up the first user task's stack");

    let user_sp = USER_STACK_VA + PAGE_SIZE;
    unsafe { context::enter_user_mode(entry.as_u64(), user_sp) }
}

/// Marks the current task `Zombie` and elects away from it. It is never
/// scheduled again; its frame (task record and kernel stack) and any pages
/// it owned are intentionally left allocated rather than reclaimed — there
/// is no parent to wait on it yet, and no reaping path to hand them back to.
pub fn exit_current() -> ! {
    let id = current_id();
    SCHEDULER.lock(|table| table.get_mut(id).state = RunState::Zombie);
    elect_and_switch();
    unreachable!("a zombie task must never be rescheduled")
}

/// Handles a translation fault in the current task's address space by
/// demand-paging the faulting page in.
pub fn handle_translation_fault(faulting_address: VirtualAddress) -> Result<(), ()> {
    with_current_memory(|memory| task_memory::handle_translation_fault(memory, faulting_address))
}

/// Programs `TTBR0_EL1` for the current task's address space. Called once
/// a task actually owns a page-global directory (its first user page has
/// been mapped); a task with none yet runs purely in the kernel window.
pub fn activate_current_address_space() {
    with_current_memory(|memory| {
        if let Some(pgd) = memory.page_global_directory() {
            task_memory::set_page_global_directory(pgd);
        }
    });
}
