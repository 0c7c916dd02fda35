//! Precis server binary for deployments that build only named binaries.
//! Run with: cargo run --bin precis-server

use std::process::ExitCode;

use precis::start_precis;

fn main() -> ExitCode {
    start_precis::run()
}
