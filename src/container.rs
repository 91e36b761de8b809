//! Namespace Constructor and Child Supervisor.
//!
//! Unlike a general-purpose container runtime, this engine never needs to remap an arbitrary
//! uid/gid range and never needs a privileged parent-side helper (`newuidmap`/`newgidmap`): the
//! identity map is always the trivial single row `outer_id -> outer_id`, which an unprivileged
//! process can write to its own `/proc/self/{uid,gid}_map` the instant it creates the user
//! namespace. That collapses the double-fork/socketpair handshake a general remapper would need
//! down to a single `clone()` with no coordination between parent and child beyond `waitpid`.

use std::ffi::CString;
use std::os::unix::io::RawFd;

use libc;
use log::debug;

use super::err::{Error, Result};
use super::fs;
use super::net;
use super::util;

/// Sandbox Flags: which namespaces/subsystems to isolate.
pub const SANDBOX_NET: u32 = 1 << 0;
pub const SANDBOX_FS: u32 = 1 << 1;
pub const SANDBOX_ALL: u32 = SANDBOX_NET | SANDBOX_FS;

const CHILD_STACK_SIZE: usize = 100 * 1024;

/// Parent-to-child handoff record, built on the parent's stack immediately before `clone` and
/// read only by the child.
struct CloneArg {
    uid: libc::uid_t,
    gid: libc::gid_t,
    flags: u32,
    argv: Vec<String>,
}

fn deny_setgroups() -> Result<()> {
    util::write_file("/proc/self/setgroups", b"deny\n")
}

/// Write the single-row identity map `"<id> <id> 1\n"` to `/proc/self/{uid,gid}_map`.
fn write_id_maps(uid: libc::uid_t, gid: libc::gid_t) -> Result<()> {
    util::write_file("/proc/self/uid_map", format!("{} {} 1\n", uid, uid).as_bytes())?;
    util::write_file("/proc/self/gid_map", format!("{} {} 1\n", gid, gid).as_bytes())?;
    Ok(())
}

fn set_pdeathsig() -> Result<()> {
    if 0 != unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL, 0, 0, 0) } {
        return Err(Error::last_os_error("prctl(PR_SET_PDEATHSIG)"));
    }
    Ok(())
}

fn exec(argv: &[String]) -> Result<()> {
    let cprogram = CString::new(argv[0].as_bytes())?;
    let cargs: Vec<CString> = argv
        .iter()
        .map(|a| CString::new(a.as_bytes()))
        .collect::<std::result::Result<_, _>>()?;
    let mut argv_ptrs: Vec<*const libc::c_char> = cargs.iter().map(|a| a.as_ptr()).collect();
    argv_ptrs.push(std::ptr::null());

    unsafe {
        libc::execvp(cprogram.as_ptr(), argv_ptrs.as_ptr());
    }
    // only reached if execvp failed
    Err(Error::last_os_error(format!("execvp({:?})", argv[0])))
}

/// Ordered setup sequence run inside the clone-spawned child, with the new namespaces already
/// active. Any failing step aborts immediately; the child never attempts to recover.
fn contain_child(mut arg: CloneArg) -> Result<()> {
    deny_setgroups()?;
    write_id_maps(arg.uid, arg.gid)?;

    if arg.flags & SANDBOX_FS != 0 {
        fs::setup(&mut arg.argv)?;
    }

    if arg.flags & SANDBOX_NET != 0 {
        net::configure_lo()?;
        net::add_sandbox_address()?;
        net::add_default_route()?;
    }

    set_pdeathsig()?;

    exec(&arg.argv)
}

extern "C" fn clone_trampoline(arg: *mut libc::c_void) -> libc::c_int {
    let boxed: Box<CloneArg> = unsafe { Box::from_raw(arg as *mut CloneArg) };
    let result = contain_child(*boxed);
    if let Err(e) = result {
        eprintln!("sandbox: {}", e);
        return 1;
    }
    // exec() only returns on error, already handled above
    0
}

fn namespace_flags(flags: u32) -> libc::c_int {
    let mut ns = libc::CLONE_NEWUSER | libc::CLONE_NEWUTS | libc::CLONE_NEWIPC | libc::CLONE_NEWPID;
    if flags & SANDBOX_NET != 0 {
        ns |= libc::CLONE_NEWNET;
    }
    if flags & SANDBOX_FS != 0 {
        ns |= libc::CLONE_NEWNS;
    }
    ns
}

/// Run `argv` inside a fresh set of namespaces controlled by `flags`, blocking until it exits.
/// Returns the exit code to propagate to our own caller.
#[cfg(target_os = "linux")]
pub fn contain(argv: &[String], flags: u32) -> i32 {
    if flags == 0 {
        return match exec(argv) {
            Ok(()) => unreachable!(),
            Err(e) => {
                eprintln!("sandbox: {}", e);
                1
            }
        };
    }

    let arg = Box::new(CloneArg {
        uid: util::getuid(),
        gid: util::getgid(),
        flags,
        argv: argv.to_vec(),
    });
    let arg_ptr = Box::into_raw(arg) as *mut libc::c_void;

    let stack = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            CHILD_STACK_SIZE,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_STACK,
            -1 as RawFd,
            0,
        )
    };
    if stack == libc::MAP_FAILED {
        eprintln!("sandbox: {}", Error::last_os_error("mmap(child stack)"));
        unsafe { drop(Box::from_raw(arg_ptr as *mut CloneArg)) };
        return 1;
    }
    let stack_top = unsafe { (stack as *mut u8).add(CHILD_STACK_SIZE) as *mut libc::c_void };

    let pid = unsafe {
        libc::clone(
            clone_trampoline,
            stack_top,
            namespace_flags(flags) | libc::SIGCHLD,
            arg_ptr,
        )
    };

    if pid < 0 {
        eprintln!("sandbox: {}", Error::last_os_error("clone"));
        let hint = Error::Permission(concat!(
            "\nInsufficient permission to create namespaces.\n",
            "Must either have root (uid 0), CAP_SYS_ADMIN,\n",
            "or enable unprivileged user namespaces via eg.\n",
            "\n",
            "    echo 1 > /proc/sys/kernel/unprivileged_userns_clone"
        ).to_string());
        eprintln!("{}", hint);
        unsafe { libc::munmap(stack, CHILD_STACK_SIZE) };
        return 1;
    }

    debug!("clone() child pid {}", pid);

    let mut status: libc::c_int = 0;
    let waited = unsafe { libc::waitpid(pid, &mut status, 0) };
    unsafe { libc::munmap(stack, CHILD_STACK_SIZE) };

    if waited < 0 {
        eprintln!("sandbox: {}", Error::last_os_error("waitpid"));
        return 1;
    }

    if libc::WIFEXITED(status) {
        libc::WEXITSTATUS(status)
    } else if libc::WIFSIGNALED(status) {
        let sig = libc::WTERMSIG(status);
        debug!("child terminated by signal {}", sig);
        unsafe { libc::raise(sig) };
        // raise() only returns if the signal is ignored/blocked; fall back to a conventional code
        128 + sig
    } else {
        eprintln!("sandbox: child neither exited nor was signalled (status {})", status);
        1
    }
}

/// Non-Linux builds have no namespaces to create: transparently exec the target, preserving the
/// CLI contract.
#[cfg(not(target_os = "linux"))]
pub fn contain(argv: &[String], _flags: u32) -> i32 {
    match exec(argv) {
        Ok(()) => unreachable!(),
        Err(e) => {
            eprintln!("sandbox: {}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_flags_net_only() {
        let ns = namespace_flags(SANDBOX_NET);
        assert_ne!(ns & libc::CLONE_NEWNET, 0);
        assert_eq!(ns & libc::CLONE_NEWNS, 0);
    }

    #[test]
    fn namespace_flags_fs_only() {
        let ns = namespace_flags(SANDBOX_FS);
        assert_eq!(ns & libc::CLONE_NEWNET, 0);
        assert_ne!(ns & libc::CLONE_NEWNS, 0);
    }

    #[test]
    fn namespace_flags_always_includes_core() {
        let ns = namespace_flags(0);
        assert_ne!(ns & libc::CLONE_NEWUSER, 0);
        assert_ne!(ns & libc::CLONE_NEWUTS, 0);
        assert_ne!(ns & libc::CLONE_NEWIPC, 0);
        assert_ne!(ns & libc::CLONE_NEWPID, 0);
    }

    #[test]
    fn sandbox_all_is_union() {
        assert_eq!(SANDBOX_ALL, SANDBOX_NET | SANDBOX_FS);
    }
}
