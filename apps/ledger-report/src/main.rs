//! # Ledger Report Entry Point
//!
//! ```text
//! ledger-report --snapshot shop.json --branch b1 --preset last-7-days --daily
//! ```
//!
//! The actual work is in lib.rs for better testability.

use clap::Parser;
use ledger_report::cli::Cli;

fn main() {
    ledger_report::init_tracing();

    let cli = Cli::parse();
    match ledger_report::run(&cli) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("ledger-report: {err}");
            std::process::exit(err.exit_code());
        }
    }
}
