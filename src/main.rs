mod cli;
mod config;
mod digest;
mod errors;
mod exceptions;
mod instance;
mod inventory;
mod manifest;
mod progress;
mod prompt;
mod reconcile;
mod scripts;
mod server;
mod sync;
mod transfer;
mod update;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
