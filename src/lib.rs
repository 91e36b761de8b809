//! please-sandbox - namespace-based isolation for build and test actions
//!
//! Installs executables:
//! - sandbox - Run a command line isolated in fresh namespaces (user, UTS, IPC, PID, network,
//!   mount).
//! - nonet   - Same, but always without network access.

pub mod err;
pub use err::{Error, Result};

pub mod logging;

pub mod rewrite;
mod netlink;
pub mod net;
pub mod fs;
mod user;
pub mod util;

pub mod container;
pub mod cli;
