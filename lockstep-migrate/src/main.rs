//! lockstep migration CLI tool
//!
//! Command-line interface for applying, reverting and inspecting migrations.
//! Suitable for CI/CD pipelines: a failed run exits with status 1.

use clap::Parser;
use colored::Colorize;
use lockstep_migrate::{run, Cli};
use std::process;

fn main() {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.default_log_filter()))
        .init();

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red(), e);
            process::exit(1);
        }
    }
}
