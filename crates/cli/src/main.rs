//! Console emulator CLI.
//!
//! This binary provides a single entry point for running cartridge images.
//! It performs:
//! 1. **Direct run:** boot a ROM and run to the halt flag or a step limit.
//! 2. **Trace record:** additionally serialize every bus access for later
//!    regression replay.
//! 3. **Trace replay:** verify a run against a recorded trace; the first
//!    divergence exits with code 2.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use n64_core::Config;
use n64_core::sim::simulator::{Simulator, StopReason};
use n64_core::sim::trace::Tracer;

#[derive(Parser, Debug)]
#[command(
    name = "n64sim",
    author,
    version,
    about = "Cycle-approximate console emulator core runner",
    long_about = "Run a cartridge image through the emulator core.\n\nExamples:\n  n64sim run game.z64\n  n64sim run game.z64 --no-recompiler --steps 5000000\n  n64sim run game.z64 --trace-record run.trace\n  n64sim run game.z64 --trace-replay run.trace"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a cartridge image.
    Run {
        /// Cartridge ROM image (raw big-endian byte order).
        rom: PathBuf,

        /// Disable the dynamic recompiler (interpreter only).
        #[arg(long)]
        no_recompiler: bool,

        /// Stop after this many VR instructions.
        #[arg(long)]
        steps: Option<u64>,

        /// Record a memory trace to this file.
        #[arg(long)]
        trace_record: Option<PathBuf>,

        /// Replay and verify a memory trace from this file.
        #[arg(long, conflicts_with = "trace_record")]
        trace_replay: Option<PathBuf>,

        /// Print run statistics on exit.
        #[arg(long)]
        stats: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            rom,
            no_recompiler,
            steps,
            trace_record,
            trace_replay,
            stats,
        } => cmd_run(rom, no_recompiler, steps, trace_record, trace_replay, stats),
    }
}

fn cmd_run(
    rom: PathBuf,
    no_recompiler: bool,
    steps: Option<u64>,
    trace_record: Option<PathBuf>,
    trace_replay: Option<PathBuf>,
    stats: bool,
) -> ExitCode {
    let mut config = Config::default();
    config.recompiler.enabled = !no_recompiler;
    if let Some(limit) = steps {
        config.general.step_limit = limit;
    }

    let mut sim = Simulator::new(&config);

    if let Err(err) = sim.machine.load_rom(&rom) {
        eprintln!("error: cannot load {}: {err}", rom.display());
        return ExitCode::from(1);
    }

    if let Some(path) = trace_record {
        match File::create(&path) {
            Ok(file) => sim.machine.tracer = Some(Tracer::record(Box::new(file))),
            Err(err) => {
                eprintln!("error: cannot create {}: {err}", path.display());
                return ExitCode::from(1);
            }
        }
    }
    if let Some(path) = trace_replay {
        let tracer = File::open(&path)
            .map_err(n64_core::common::EmuError::from)
            .and_then(|file| Tracer::replay(Box::new(file)));
        match tracer {
            Ok(t) => sim.machine.tracer = Some(t),
            Err(err) => {
                eprintln!("error: cannot replay {}: {err}", path.display());
                return ExitCode::from(1);
            }
        }
    }

    sim.machine.boot();
    let reason = sim.run();

    if stats {
        eprintln!("{}", sim.machine.stats);
    }

    match &reason {
        StopReason::StepLimit => {}
        StopReason::Halted(why) => eprintln!("halted: {why}"),
        StopReason::TraceMismatch(why) => eprintln!("replay mismatch: {why}"),
    }
    ExitCode::from(reason.exit_code() as u8)
}
