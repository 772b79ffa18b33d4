//! CLI frontend for the Regelwerk rules engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rw",
    about = "Regelwerk: a rules engine for narrator-driven adventures",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario, reading one action per line from stdin
    Play {
        /// Scenario directory (module.json, party.json, optional rules.json)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// RNG seed for deterministic play
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Let the engine play the monsters' turns
        #[arg(short, long)]
        auto_monsters: bool,

        /// In-game minutes that pass per action
        #[arg(long, default_value = "10")]
        turn_minutes: u64,

        /// Resume from a save slot
        #[arg(long)]
        load: Option<String>,

        /// Save into this slot when input ends
        #[arg(long)]
        save: Option<String>,

        /// Directory holding save slots (default: `<dir>/saves`)
        #[arg(long)]
        saves: Option<PathBuf>,
    },

    /// Validate a scenario and report problems
    Check {
        /// Scenario directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// List part of a scenario: locations, npcs, party, items, monsters, spells
    Show {
        /// What to list
        what: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Scenario directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// List the save slots of a scenario
    Saves {
        /// Scenario directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Directory holding save slots (default: `<dir>/saves`)
        #[arg(long)]
        saves: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play {
            dir,
            seed,
            auto_monsters,
            turn_minutes,
            load,
            save,
            saves,
        } => commands::play::run(
            &dir,
            &commands::play::PlayOptions {
                seed,
                auto_monsters,
                turn_minutes,
                load,
                save,
                saves,
            },
        ),
        Commands::Check { dir } => commands::check::run(&dir),
        Commands::Show { what, json, dir } => commands::show::run(&dir, &what, json),
        Commands::Saves { dir, saves } => commands::saves::run(&dir, saves.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
