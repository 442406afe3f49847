use std::process::ExitCode;

use clap::Parser;
use rasterfill::{cli, logger};

fn main() -> ExitCode {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let args = cli::CliArgs::parse();
    let code = cli::run(args);
    rasterfill::log_info!("Session finished");
    code
}
