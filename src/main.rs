// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

mod assembler;
mod cmd;
mod convert;
mod extract;
mod filter;
mod input;
mod json_schema;
mod parser;
mod planner;
mod rewrite;
mod schema;

use clap::Parser;
use cmd::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cmd::run(cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
