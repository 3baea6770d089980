//! eeprog - host tool for a serial parallel EEPROM/EPROM programmer
//!
//! Talks to the programmer firmware over a serial line (or to an in-process
//! simulation with `-d sim`) to read, write, verify and blank check AT28C
//! EEPROMs and 27-series EPROMs.

mod cli;
mod commands;
mod progress;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(-1);
        }
    };

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if cli.list_chips {
        commands::list_chips();
        return;
    }

    let request = match cli.request() {
        Ok(request) => request,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!();
            eprintln!("Usage: eeprog -d <device> -t <type> -o <op> [-a <address>] [-b <byte>] [-f <file>]");
            eprintln!("For more information, try '--help'.");
            std::process::exit(-1);
        }
    };

    println!("selected {}", request.chip);

    if let Err(e) = commands::run(&request) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
