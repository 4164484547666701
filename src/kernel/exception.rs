//! Generic (architecture-independent) exception-handling types.

/// The privilege level the CPU is currently executing at.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PrivilegeLevel {
    User,
    Kernel,
    Hypervisor,
    Unknown,
}
