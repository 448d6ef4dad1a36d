use bufr2nc::cli::{args::Args, commands};
use clap::Parser;
use std::process;

fn main() {
    let args = Args::parse();

    match commands::run(args) {
        Ok(_summary) => {
            // Summary has already been reported by the command
            process::exit(bufr2nc::constants::exit_codes::SUCCESS);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(error.exit_code());
        }
    }
}
