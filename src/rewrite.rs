//! Rewriting of paths and environment variables to reflect the sandbox's mount layout.
//!
//! When the mount namespace is replaced, the working directory the caller knows as `TMP_DIR`
//! is bind-mounted to a fixed location inside the sandbox (`INNER_TMP`). Anything the target
//! program was told about that directory (its own argv[0], or any environment value) has to
//! be rewritten to match, or it will refer to a path that no longer resolves.

/// Constant location `TMP_DIR` is bind-mounted to inside the sandbox.
pub const INNER_TMP: &str = "/tmp/plz_sandbox";

/// Substitute `old_dir` for `new_dir` in `value`, if `value` contains `old_dir` as a literal
/// substring starting at `offset`. Otherwise return `value` unchanged.
///
/// `offset` must be a valid byte index into `value` (`<= value.len()`). `old_dir` must not be
/// empty: an empty prefix trivially "matches" everywhere, which is never a useful rewrite.
pub fn rewrite(value: &str, old_dir: &str, new_dir: &str, offset: usize) -> String {
    debug_assert!(!old_dir.is_empty());
    debug_assert!(offset <= value.len());

    match value.get(offset..offset + old_dir.len()) {
        Some(candidate) if candidate == old_dir => {
            let mut out = String::with_capacity(offset + new_dir.len() + (value.len() - offset - old_dir.len()));
            out.push_str(&value[..offset]);
            out.push_str(new_dir);
            out.push_str(&value[offset + old_dir.len()..]);
            out
        }
        _ => value.to_string(),
    }
}

/// Rewrite the executable name: an alias for `rewrite()` at offset 0, the name this operation
/// carries in the distilled spec.
pub fn exec_name(old_name: &str, old_dir: &str, new_dir: &str) -> String {
    rewrite(old_name, old_dir, new_dir, 0)
}

/// Rewrite every `NAME=VALUE` entry in `env` whose value begins with `old_dir`, replacing that
/// prefix with `new_dir`. Entries without an `=` are left untouched.
pub fn rewrite_env(env: &mut [String], old_dir: &str, new_dir: &str) {
    for entry in env.iter_mut() {
        if let Some(eq) = entry.find('=') {
            *entry = rewrite(entry, old_dir, new_dir, eq + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_no_match() {
        let out = rewrite(
            "/usr/bin/bash",
            "/work/plz-out/tmp/target.build",
            "/tmp/plz_sandbox",
            0,
        );
        assert_eq!(out, "/usr/bin/bash");
    }

    #[test]
    fn rewrite_absolute_prefix() {
        let out = rewrite(
            "/work/plz-out/tmp/target.build/test.bin",
            "/work/plz-out/tmp/target.build",
            "/tmp/plz_sandbox",
            0,
        );
        assert_eq!(out, "/tmp/plz_sandbox/test.bin");
    }

    #[test]
    fn rewrite_short_prefix() {
        let out = rewrite("/lib/test.bin", "/lib", "/tmp/plz_sandbox", 0);
        assert_eq!(out, "/tmp/plz_sandbox/test.bin");
    }

    #[test]
    fn rewrite_noop_when_already_rewritten() {
        let out = rewrite(
            "/tmp/plz_sandbox/test.bin",
            "/tmp/plz_sandbox",
            "/tmp/plz_sandbox",
            0,
        );
        assert_eq!(out, "/tmp/plz_sandbox/test.bin");
    }

    #[test]
    fn rewrite_env_value_with_offset() {
        let out = rewrite(
            "RESULTS_FILE=/home/peter/git/please/plz-out/tmp/my_test/test.results",
            "/home/peter/git/please/plz-out/tmp/my_test",
            "/tmp/plz_sandbox",
            13,
        );
        assert_eq!(out, "RESULTS_FILE=/tmp/plz_sandbox/test.results");
    }

    #[test]
    fn length_and_byte_preservation() {
        let s = "PREFIX=/a/b/c/tail";
        let old = "/a/b/c";
        let new = "/much/longer/replacement";
        let out = rewrite(s, old, new, 7);
        assert_eq!(out.len(), s.len() - old.len() + new.len());
        assert!(out.starts_with("PREFIX="));
        assert!(out.ends_with("/tail"));
    }

    #[test]
    fn round_trip() {
        let s = "/a/b/c/leaf";
        let a = "/a/b/c";
        let b = "/elsewhere";
        let forward = rewrite(s, a, b, 0);
        let back = rewrite(&forward, b, a, 0);
        assert_eq!(back, s);
    }

    #[test]
    fn environment_array_rewrite() {
        let mut env: Vec<String> = vec![
            "TMP_DIR=/home/peter/git/please/plz-out/tmp/my_test".to_string(),
            "RESULTS_FILE=/home/peter/git/please/plz-out/tmp/my_test/test.results".to_string(),
            "SOME_TOOL=/usr/local/bin/go".to_string(),
            "thirty-five ham and cheese sandwiches".to_string(),
        ];

        rewrite_env(
            &mut env,
            "/home/peter/git/please/plz-out/tmp/my_test",
            "/tmp/plz_sandbox",
        );

        assert_eq!(
            env,
            vec![
                "TMP_DIR=/tmp/plz_sandbox".to_string(),
                "RESULTS_FILE=/tmp/plz_sandbox/test.results".to_string(),
                "SOME_TOOL=/usr/local/bin/go".to_string(),
                "thirty-five ham and cheese sandwiches".to_string(),
            ]
        );
    }

    #[test]
    fn environment_entry_without_equals_untouched() {
        let mut env = vec!["no-equals-sign-here".to_string()];
        rewrite_env(&mut env, "/anything", "/else");
        assert_eq!(env, vec!["no-equals-sign-here".to_string()]);
    }
}
