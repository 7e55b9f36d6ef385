//! nescore CLI - load an iNES ROM and run the CPU until it faults.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{LevelFilter, error, info};
use nescore::{Nes, NesError};

/// NES CPU core runner
#[derive(Parser, Debug)]
#[command(name = "nescore")]
#[command(about = "Runs an NROM cartridge on the 2A03 CPU core", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,

    /// Stop after this many instructions and print the CPU state
    #[arg(short, long)]
    max_steps: Option<u64>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(args: &Args) -> Result<(), NesError> {
    let mut nes = Nes::open(&args.rom)?;
    match args.max_steps {
        Some(steps) => {
            nes.run_for(steps)?;
            let cpu = nes.cpu();
            println!("{}  CYC:{}", cpu.state(), cpu.cycles());
            Ok(())
        }
        None => nes.run(),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(level(args.verbose))
        .parse_default_env()
        .init();

    info!("Starting nescore with {}", args.rom.display());
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("nescore: {e}");
            ExitCode::FAILURE
        }
    }
}
