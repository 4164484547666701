use core::cell::OnceCell;

/// A cell that can be written exactly once, after which it is read-only.
/// Used for globals whose initial value depends on runtime state (the
/// board's UART base, the ready task table) but which never change again.
#[derive(Debug)]
pub struct SetOnce<T> {
    inner: OnceCell<T>,
}

impl<T> SetOnce<T> {
    pub const fn new() -> Self {
        Self {
            inner: OnceCell::new(),
        }
    }

    /// Sets the value. Panics if already set.
    pub fn set(&self, value: T) {
        assert!(self.inner.set(value).is_ok(), "SetOnce written to twice");
    }

    /// Gets the value. Panics if not yet set.
    pub fn get(&self) -> &T {
        self.inner.get().expect("SetOnce read before being set")
    }
}

unsafe impl<T> Sync for SetOnce<T> {}
unsafe impl<T> Send for SetOnce<T> {}

/// Asserts that the enclosing function runs at most once over the life of
/// the kernel. Used to guard one-time initialization sequences.
#[macro_export]
macro_rules! call_once {
    () => {{
        use core::sync::atomic::{AtomicBool, Ordering::AcqRel};
        static IS_FIRST_INVOCATION: AtomicBool = AtomicBool::new(false);
        assert!(!IS_FIRST_INVOCATION.swap(true, AcqRel), "called more than once");
    }};
}
