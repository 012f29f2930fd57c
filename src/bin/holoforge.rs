use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

mod commands;

use commands::{ProteinArgs, filter, info, prepare, run};

#[derive(Parser, Debug)]
#[command(
    name = "holoforge",
    about = "A command-line tool for filtering, repairing, and parametrising protein-ligand complexes.",
    version,
    author,
    arg_required_else_help = true
)]
struct Cli {
    /// Only report warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report chains, gaps, and hetero groups of a structure without modifying it.
    Info(info::InfoArgs),
    /// Keep or drop chains, gaps, and small molecules.
    Filter {
        #[command(flatten)]
        protein: ProteinArgs,
        #[command(flatten)]
        args: filter::FilterArgs,
    },
    /// Fill gaps, add missing atoms, and protonate with external engines.
    Prepare {
        #[command(flatten)]
        protein: ProteinArgs,
        #[command(flatten)]
        args: prepare::PrepareArgs,
    },
    /// Filter, prepare, and parametrise as described by a pipeline file.
    Run {
        #[command(flatten)]
        protein: ProteinArgs,
        #[command(flatten)]
        args: run::RunArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Info(args) => info::run(&args)?,
        Command::Filter { protein, args } => {
            let mut protein = commands::load_protein(&protein)?;
            filter::run(&mut protein, &args)?;
        }
        Command::Prepare { protein, args } => {
            let mut protein = commands::load_protein(&protein)?;
            prepare::run(&mut protein, &args)?;
        }
        Command::Run { protein, args } => {
            let mut protein = commands::load_protein(&protein)?;
            run::run(&mut protein, &args)?;
        }
    }

    Ok(())
}
