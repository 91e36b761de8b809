//! Run a command line isolated the same way `sandbox` does, but always without network access,
//! regardless of `SHARE_NETWORK`.

use std::env;
use std::process::exit;

use please_sandbox::cli;
use please_sandbox::container::SANDBOX_NET;
use please_sandbox::logging;

fn main() {
    logging::setup().expect("logger already installed");

    let argv: Vec<String> = env::args().skip(1).collect();
    let flags = cli::flags_from_env() & !SANDBOX_NET;

    exit(cli::run("nonet", flags, &argv));
}
