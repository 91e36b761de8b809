//! Wrappers for UID and GID syscalls

use libc;

/// Real UID of the calling process, as seen outside any namespace.
pub fn getuid() -> libc::uid_t {
    unsafe { libc::getuid() }
}

/// Real GID of the calling process, as seen outside any namespace.
pub fn getgid() -> libc::gid_t {
    unsafe { libc::getgid() }
}
