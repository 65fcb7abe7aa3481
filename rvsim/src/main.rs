//! A minimal terminal driver for `rvasm`/`rvcore`. Not a polished CLI UX —
//! the interactive shell is an external concern this binary merely
//! illustrates a non-graphical version of.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rvcore::{Simulator, StepResult};

#[derive(Parser)]
#[command(name = "rvsim", about = "Assemble and run RV32I/M/F programs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a source file into a flat binary image.
    Assemble {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load and run a binary image until it halts or the step budget runs out.
    Run {
        image: PathBuf,
        #[arg(long, default_value_t = 1_000_000)]
        max_steps: u64,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Assemble { input, output } => assemble(&input, output),
        Command::Run { image, max_steps } => run(&image, max_steps),
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn assemble(input: &PathBuf, output: Option<PathBuf>) -> Result<(), String> {
    let source = fs::read_to_string(input).map_err(|e| format!("reading {input:?}: {e}"))?;
    let (bytes, symbols) =
        rvasm::assemble_with_symbols(&source).map_err(|e| format!("assembling {input:?}: {e}"))?;

    eprintln!("--- symbol table ---");
    for (label, address) in &symbols {
        eprintln!("{label}: {address:#x}");
    }

    let output_path = output.unwrap_or_else(|| input.with_extension("bin"));
    fs::write(&output_path, &bytes).map_err(|e| format!("writing {output_path:?}: {e}"))?;
    println!(
        "assembled {input:?} to {output_path:?} ({} bytes)",
        bytes.len()
    );
    Ok(())
}

fn run(image: &PathBuf, max_steps: u64) -> Result<(), String> {
    let bytes = fs::read(image).map_err(|e| format!("reading {image:?}: {e}"))?;
    let mut sim = Simulator::new();
    sim.load(&bytes).map_err(|e| format!("loading {image:?}: {e}"))?;

    let mut steps = 0;
    loop {
        match sim.step() {
            StepResult::Continue => {
                steps += 1;
                if steps >= max_steps {
                    println!("stopped after {steps} steps (budget exhausted)");
                    break;
                }
            }
            StepResult::Halt(reason) => {
                println!("halted after {steps} steps: {reason:?}");
                break;
            }
        }
    }

    let snapshot = sim.snapshot(rvcore::constants::BASE_ADDRESS, 64);
    println!("pc = {:#x}", snapshot.pc);
    for (i, value) in snapshot.registers.iter().enumerate() {
        println!("x{i:<2} = {value:#010x}");
    }
    Ok(())
}
