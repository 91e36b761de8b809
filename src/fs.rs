//! Mount-namespace topology: private remount of `/`, a tmpfs scratch area, optional hidden
//! directories, and the bind mount that exposes the invoker's working directory inside the
//! sandbox.

use std::env;
use std::io;
use std::path::Path;

use libc;
use log::{debug, warn};

use super::err::{Error, Result};
use super::rewrite;
use super::util;

/// Fixed mount point `TMP_DIR` is bind-mounted onto inside the sandbox.
pub const INNER_TMP: &str = rewrite::INNER_TMP;

const TMP_PREFIX: &str = "/tmp/";

/// Split `SANDBOX_DIRS` on commas, dropping empty tokens. Whitespace is not trimmed: this
/// matches the original tokenizer exactly, empty-token-dropping included.
fn split_sandbox_dirs(value: &str) -> Vec<&str> {
    value.split(',').filter(|s| !s.is_empty()).collect()
}

/// Mount an empty read-only tmpfs over `dir`, hiding its contents from the sandbox. A missing
/// or non-directory target is tolerated (logged and skipped); anything else is fatal.
fn hide_dir(dir: &str) -> Result<()> {
    match util::mount(
        "tmpfs",
        dir,
        "tmpfs",
        (libc::MS_RDONLY | libc::MS_NOSUID | libc::MS_NODEV) as libc::c_ulong,
    ) {
        Ok(()) => Ok(()),
        Err(Error::OS { io, .. }) if matches!(io.raw_os_error(), Some(libc::ENOENT) | Some(libc::ENOTDIR)) => {
            warn!("skip hiding {:?}: {}", dir, io);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Build the private mount-namespace topology for the sandbox. Only called when the filesystem
/// namespace has been unshared (`SANDBOX_FS`). `argv[0]` is rewritten in place if `TMP_DIR` ends
/// up bind-mounted to [`INNER_TMP`].
///
/// When `TMP_DIR` already lives under `/tmp/`, the caller's own temp directory would be made
/// inaccessible by the `/tmp` tmpfs mount below, so setup is skipped entirely.
pub fn setup(argv: &mut [String]) -> Result<()> {
    if let Ok(tmp_dir) = env::var("TMP_DIR") {
        if tmp_dir.starts_with(TMP_PREFIX) {
            debug!("TMP_DIR {:?} already under /tmp/, skipping fs setup", tmp_dir);
            return Ok(());
        }
    }

    util::mount(
        "none",
        "/",
        "",
        (libc::MS_REC | libc::MS_PRIVATE) as libc::c_ulong,
    )?;

    util::mount(
        "tmpfs",
        "/tmp",
        "tmpfs",
        (libc::MS_LAZYTIME | libc::MS_NOATIME | libc::MS_NODEV | libc::MS_NOSUID) as libc::c_ulong,
    )?;
    env::set_var("TMPDIR", "/tmp");

    if let Ok(dirs) = env::var("SANDBOX_DIRS") {
        for dir in split_sandbox_dirs(&dirs) {
            hide_dir(dir)?;
        }
        env::remove_var("SANDBOX_DIRS");
    }

    if let Ok(outer_tmp) = env::var("TMP_DIR") {
        util::mkdir(INNER_TMP, 0o700).or_else(|e| match e {
            Error::File { ref io, .. } if io.kind() == io::ErrorKind::AlreadyExists => Ok(Path::new(INNER_TMP).to_path_buf()),
            _ => Err(e),
        })?;

        util::mount(&outer_tmp, INNER_TMP, "", libc::MS_BIND as libc::c_ulong)?;

        rewrite_process(&outer_tmp);
        if let Some(argv0) = argv.first_mut() {
            *argv0 = rewrite::exec_name(argv0, &outer_tmp, INNER_TMP);
        }

        env::set_var("TEST_DIR", INNER_TMP);
        env::set_var("TMP_DIR", INNER_TMP);
        env::set_var("HOME", INNER_TMP);

        env::set_current_dir(INNER_TMP).map_err(|e| Error::file("chdir", INNER_TMP, e))?;
    }

    util::mount(
        "none",
        "/",
        "",
        (libc::MS_BIND | libc::MS_REMOUNT | libc::MS_RDONLY | libc::MS_REC) as libc::c_ulong,
    )?;

    util::mount("proc", "/proc", "proc", 0)?;

    Ok(())
}

/// Rewrite the process's own environment in place, redirecting anything that pointed at
/// `outer_tmp` to the new bind-mounted location.
fn rewrite_process(outer_tmp: &str) {
    let mut entries: Vec<String> = env::vars().map(|(k, v)| format!("{}={}", k, v)).collect();
    rewrite::rewrite_env(&mut entries, outer_tmp, INNER_TMP);
    for entry in entries {
        if let Some(eq) = entry.find('=') {
            env::set_var(&entry[..eq], &entry[eq + 1..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_empty_tokens() {
        assert_eq!(split_sandbox_dirs("/a,,/b,"), vec!["/a", "/b"]);
    }

    #[test]
    fn preserves_whitespace() {
        assert_eq!(split_sandbox_dirs("/a, /b"), vec!["/a", " /b"]);
    }

    #[test]
    fn single_entry() {
        assert_eq!(split_sandbox_dirs("/only"), vec!["/only"]);
    }

    #[test]
    fn empty_value() {
        assert_eq!(split_sandbox_dirs(""), Vec::<&str>::new());
    }
}
