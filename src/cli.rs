//! Front End: argument parsing and the two environment-variable toggles shared by both
//! installed binaries.

use std::env;

use super::container::{self, SANDBOX_ALL};
use super::err::Error;

/// Read `SHARE_NETWORK`/`SHARE_MOUNT` from the environment and fold them into a sandbox flag
/// bitmask. `"1"` suppresses the matching bit; any other value, or absence, leaves it set.
pub fn flags_from_env() -> u32 {
    let mut flags = SANDBOX_ALL;

    if env::var("SHARE_NETWORK").ok().as_deref() == Some("1") {
        flags &= !container::SANDBOX_NET;
    }
    if env::var("SHARE_MOUNT").ok().as_deref() == Some("1") {
        flags &= !container::SANDBOX_FS;
    }

    flags
}

/// Shared entry point for both `sandbox` and `nonet`. Prints a usage message and returns exit
/// code 1 if no command was given; otherwise runs it under the given flags.
pub fn run(program_name: &str, flags: u32, argv: &[String]) -> i32 {
    if argv.is_empty() {
        let err = Error::Usage(format!("Usage: {} <command> [args...]", program_name));
        eprintln!("{}", err);
        return 1;
    }

    container::contain(argv, flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_all_flags() {
        env::remove_var("SHARE_NETWORK");
        env::remove_var("SHARE_MOUNT");
        assert_eq!(flags_from_env(), SANDBOX_ALL);
    }

    #[test]
    fn share_network_clears_net_bit() {
        env::set_var("SHARE_NETWORK", "1");
        env::remove_var("SHARE_MOUNT");
        let flags = flags_from_env();
        assert_eq!(flags & container::SANDBOX_NET, 0);
        assert_ne!(flags & container::SANDBOX_FS, 0);
        env::remove_var("SHARE_NETWORK");
    }

    #[test]
    fn share_mount_clears_fs_bit() {
        env::remove_var("SHARE_NETWORK");
        env::set_var("SHARE_MOUNT", "1");
        let flags = flags_from_env();
        assert_ne!(flags & container::SANDBOX_NET, 0);
        assert_eq!(flags & container::SANDBOX_FS, 0);
        env::remove_var("SHARE_MOUNT");
    }

    #[test]
    fn non_one_value_keeps_bit_set() {
        env::set_var("SHARE_NETWORK", "true");
        assert_ne!(flags_from_env() & container::SANDBOX_NET, 0);
        env::remove_var("SHARE_NETWORK");
    }
}
