use std::ffi::CString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use libc;

use log::debug;

use super::err::{Error, Result};
pub use super::user::*;

/// Allocate a `CString` from the given path.
fn str2cstr<S: AsRef<str>>(s: S) -> Result<CString> {
    let ret = CString::new(s.as_ref())?;
    Ok(ret)
}

/// Allocate a `CString` from the given path.
fn path2cstr<P: AsRef<Path>>(path: P) -> Result<CString> {
    str2cstr(path.as_ref().to_string_lossy())
}

/// Create a file, and write the provided bytes
pub fn write_file<P: AsRef<Path>, S: AsRef<[u8]>>(name: P, buf: S) -> Result<()> {
    debug!("write_file({:?}, ...)", name.as_ref().display());
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .open(name.as_ref())
        .map_err(|e| Error::file("open", name.as_ref(), e))?
        .write_all(buf.as_ref())
        .map_err(|e| Error::file("write", name.as_ref(), e))
}

/// Wraps `mkdir()`.  Only attempts to create the leaf, with the given mode.
pub fn mkdir<S: AsRef<Path>>(name: S, mode: libc::mode_t) -> Result<PathBuf> {
    debug!("mkdir({:?}, {:#o})", name.as_ref().display(), mode);
    if 0 != unsafe { libc::mkdir(path2cstr(&name)?.as_ptr(), mode) } {
        return Err(Error::last_file_error("mkdir", name));
    }
    Ok(name.as_ref().to_path_buf())
}

/// Wraps `mount()` with an empty `data` argument.
pub fn mount<A, B, C>(src: A, target: B, fstype: C, flags: libc::c_ulong) -> Result<()>
where
    A: AsRef<Path>,
    B: AsRef<Path>,
    C: AsRef<str>,
{
    mount_with_data(src, target, fstype, flags, "")
}

/// Wraps `mount()`
pub fn mount_with_data<A, B, C, D>(
    src: A,
    target: B,
    fstype: C,
    flags: libc::c_ulong,
    data: D,
) -> Result<()>
where
    A: AsRef<Path>,
    B: AsRef<Path>,
    C: AsRef<str>,
    D: AsRef<str>,
{
    debug!(
        "mount({:?},{:?},{:?},0x{:x},{:?})",
        src.as_ref().display(),
        target.as_ref().display(),
        fstype.as_ref(),
        flags,
        data.as_ref()
    );
    if 0 != unsafe {
        libc::mount(
            path2cstr(&src)?.as_ptr(),
            path2cstr(&target)?.as_ptr(),
            str2cstr(&fstype)?.as_ptr() as *const _,
            flags,
            str2cstr(&data)?.as_ptr() as *const _,
        )
    } {
        return Err(Error::last_os_error(format!(
            "mount src={:?} target={:?} fs={:?} flags=0x{:x}",
            src.as_ref(),
            target.as_ref(),
            fstype.as_ref(),
            flags
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cstr() {
        let cstr = path2cstr("/some/path").unwrap();
        assert_eq!(cstr.to_str().unwrap(), "/some/path");
    }
}
