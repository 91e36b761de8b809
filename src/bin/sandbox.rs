//! Run a command line isolated in fresh user/UTS/IPC/PID namespaces, plus network and mount
//! namespaces unless `SHARE_NETWORK=1` / `SHARE_MOUNT=1` are set.

use std::env;
use std::process::exit;

use please_sandbox::cli;
use please_sandbox::logging;

fn main() {
    logging::setup().expect("logger already installed");

    let argv: Vec<String> = env::args().skip(1).collect();
    let flags = cli::flags_from_env();

    exit(cli::run("sandbox", flags, &argv));
}
