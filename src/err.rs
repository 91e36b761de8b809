use std::path::{Path, PathBuf};
use std::{error, fmt, io};

/// Failure modes of the sandboxing engine.
///
/// Each variant corresponds to a single named syscall or library call, so a failing setup
/// step can be identified from the printed message alone.
#[derive(Debug)]
pub enum Error {
    File {
        op: String,
        name: PathBuf,
        io: io::Error,
    },
    OS {
        op: String,
        io: io::Error,
    },
    TooLong,
    BadStr,
    Usage(String),
    Permission(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Annotate I/O error
    pub fn file<S: AsRef<str>, P: AsRef<Path>>(desc: S, path: P, err: io::Error) -> Self {
        Error::File {
            op: desc.as_ref().to_string(),
            name: path.as_ref().to_path_buf(),
            io: err,
        }
    }

    /// Annotate Error::last_os_error()
    pub fn last_file_error<S: AsRef<str>, P: AsRef<Path>>(desc: S, path: P) -> Self {
        Self::file(desc, path, io::Error::last_os_error())
    }

    pub fn os<S: AsRef<str>>(desc: S, err: io::Error) -> Self {
        Self::OS {
            op: desc.as_ref().to_string(),
            io: err,
        }
    }

    /// Annotate Error::last_os_error()
    pub fn last_os_error<S: AsRef<str>>(desc: S) -> Self {
        Self::os(desc, io::Error::last_os_error())
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::File { io, .. } => Some(io),
            Self::OS { io, .. } => Some(io),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { op, name, io } => {
                write!(f, "{} {} : {}", op, name.display(), io)
            }
            Self::OS { op, io } => write!(f, "{} : {}", op, io),
            Self::TooLong => write!(f, "interface name too long"),
            Self::BadStr => write!(f, "string can not contain a nil byte"),
            Self::Usage(msg) => write!(f, "{}", msg),
            Self::Permission(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<std::ffi::NulError> for Error {
    fn from(_inp: std::ffi::NulError) -> Self {
        Error::BadStr
    }
}

