use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use rw_engine::{
    Action, ActionOutcome, EngineConfig, Game, JsonFileStore, StateStore, parse_actions,
    parse_command_line,
};
use tracing::info;

/// Marks typed input holding narrator text with embedded calls.
const CALL_MARKER: &str = "do_action(";

/// Flags of `rw play`.
pub struct PlayOptions {
    pub seed: u64,
    pub auto_monsters: bool,
    pub turn_minutes: u64,
    pub load: Option<String>,
    pub save: Option<String>,
    pub saves: Option<PathBuf>,
}

pub fn run(dir: &Path, options: &PlayOptions) -> Result<(), String> {
    let scenario = Arc::new(super::load_scenario(dir)?);
    let config = EngineConfig::default()
        .with_seed(options.seed)
        .with_turn_minutes(options.turn_minutes)
        .with_auto_monsters(options.auto_monsters);
    let mut store = JsonFileStore::new(super::saves_dir(dir, options.saves.as_deref()));

    let mut game = match &options.load {
        Some(slot) => {
            let state = store
                .load(slot)
                .map_err(|e| format!("failed to load '{slot}': {e}"))?;
            let mut game = Game::resume(scenario, state, config);
            println!("  {} '{slot}'\n", "Resuming".bold());
            let outcome = game
                .do_action(&Action::named("look", &[]))
                .map_err(|e| e.to_string())?;
            print_outcome(&mut game, &outcome);
            game
        }
        None => {
            let mut game =
                Game::new(scenario, config).map_err(|e| format!("failed to start game: {e}"))?;
            println!("  {} {}\n", "Starting".bold(), game.scenario().module.name);
            let intro = game.intro().map_err(|e| e.to_string())?;
            println!("{intro}");
            show_image(&mut game);
            println!();
            game
        }
    };

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("q") {
            break;
        }

        for action in read_actions(input) {
            match game.do_action(&action) {
                Ok(outcome) => print_outcome(&mut game, &outcome),
                Err(e) => println!("{}\n", format!("error: {e}").red()),
            }
        }
    }

    if let Some(slot) = &options.save {
        store
            .save(slot, game.state())
            .map_err(|e| format!("failed to save '{slot}': {e}"))?;
        info!(slot = %slot, dir = %store.dir().display(), "game saved");
        println!("  Saved '{slot}'.");
    }

    Ok(())
}

/// The actions in one line of input. Parse errors are printed and skipped.
fn read_actions(input: &str) -> Vec<Action> {
    let (actions, errors) = if input.trim_start().starts_with(CALL_MARKER)
        || !input.contains(CALL_MARKER)
    {
        match parse_command_line(input) {
            Ok(action) => (vec![action], Vec::new()),
            Err(e) => (Vec::new(), vec![e]),
        }
    } else {
        parse_actions(input)
    };
    if !errors.is_empty() {
        eprint!("{}", super::render_parse_errors(input, &errors));
    }
    actions
}

fn print_outcome(game: &mut Game, outcome: &ActionOutcome) {
    if !outcome.handled {
        println!("{}", outcome.text.dimmed());
    } else if outcome.failed {
        println!("{}", outcome.text.yellow());
    } else {
        println!("{}", outcome.text);
    }
    show_image(game);
    if game.monsters_turn_pending() {
        println!("{}", "(The monsters act; narrate their turn, then skip.)".dimmed());
    }
    if game.state().game_over {
        println!("{}", "Game over.".red().bold());
    }
    println!();
}

fn show_image(game: &mut Game) {
    if let Some(image) = game.take_image() {
        println!("{}", format!("[image: {image}]").dimmed());
    }
}
