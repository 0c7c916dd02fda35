//! Binary entrypoint that launches the precis server.

use std::process::ExitCode;

use precis::start_precis;

/// Start the server after loading the summarization model.
fn main() -> ExitCode {
    start_precis::run()
}
