//! The locking interface implemented by `architecture::SpinLock`.

/// A mutual-exclusion primitive that hands the caller a mutable reference
/// to its guarded state for the duration of a closure, rather than a guard
/// object — avoids a `Drop` impl racing a context switch mid-unlock.
pub trait Mutex {
    type State;

    /// Runs `f` with exclusive access to the guarded state.
    fn lock<'a, R>(&'a self, f: impl FnOnce(&'a mut Self::State) -> R) -> R;
}
