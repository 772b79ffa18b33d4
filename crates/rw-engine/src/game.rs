//! The game session: one world state, advanced one action at a time.

use std::sync::Arc;

use chrono::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rw_mechanics::Move;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{SystemClock, WallClock};
use crate::config::EngineConfig;
use crate::context::ActionContext;
use crate::error::EngineResult;
use crate::parser::Action;
use crate::scenario::Scenario;
use crate::state::{Mode, WorldState};

/// Actions that work in every mode.
pub const UNIVERSAL_VERBS: &[&str] = &[
    "look", "help", "topic", "stats", "give", "use", "cast", "equip", "play",
];

/// Actions of exploration mode.
pub const EXPLORATION_VERBS: &[&str] = &[
    "go", "search", "pickup", "drop", "invent", "complete-task", "browse",
];

/// Actions of encounter mode.
pub const ENCOUNTER_VERBS: &[&str] = &[
    "attack", "shoot", "press", "advance", "retreat", "charge", "flee", "skip",
];

/// Actions of dialog mode, on top of the exploration actions.
pub const DIALOG_VERBS: &[&str] = &["bye"];

/// Actions of store mode.
pub const STORE_VERBS: &[&str] = &["browse", "buy", "sell", "leave"];

/// Actions that cost no game time.
pub const SYSTEM_VERBS: &[&str] = &["look", "help", "stats", "invent", "browse"];

/// What an action did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    /// Narration for the caller.
    pub text: String,
    /// The action broke a rule; nothing changed.
    pub failed: bool,
    /// False if no engine action exists for the verb.
    pub handled: bool,
}

impl ActionOutcome {
    /// A successful action.
    pub fn done(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            failed: false,
            handled: true,
        }
    }

    /// A rule failure the caller can correct and retry.
    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            failed: true,
            handled: true,
        }
    }

    /// A verb the engine does not know; the narrator resolves it instead.
    pub fn unhandled(verb: &str) -> Self {
        Self {
            text: format!("No engine action for '{verb}'; resolve it narratively."),
            failed: false,
            handled: false,
        }
    }
}

/// One running game.
pub struct Game {
    scenario: Arc<Scenario>,
    state: WorldState,
    config: EngineConfig,
    clock: Box<dyn WallClock>,
    image: Option<String>,
    skip_turn: bool,
    monsters_pending: bool,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("game_id", &self.state.game_id)
            .field("location", &self.state.location)
            .field("mode", &self.state.mode)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Start a new game of `scenario`.
    pub fn new(scenario: Arc<Scenario>, config: EngineConfig) -> EngineResult<Self> {
        let state = WorldState::new(&scenario, &config)?;
        info!(game = %state.game_id, module = %scenario.module.name, "new game");
        Ok(Self::resume(scenario, state, config))
    }

    /// Continue a saved game.
    pub fn resume(scenario: Arc<Scenario>, state: WorldState, config: EngineConfig) -> Self {
        Self {
            scenario,
            state,
            config,
            clock: Box::new(SystemClock),
            image: None,
            skip_turn: false,
            monsters_pending: false,
        }
    }

    /// Use `clock` for real-time random happenings.
    pub fn with_clock(mut self, clock: impl WallClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The world state.
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// The scenario being played.
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Module introduction followed by the starting location. Starts a fight
    /// waiting there.
    pub fn intro(&mut self) -> EngineResult<String> {
        let intro = self.scenario.module.intro.clone();
        let outcome = self.run(|ctx| {
            let mut lines = Vec::new();
            if !intro.is_empty() {
                lines.push(intro);
            }
            lines.push(ctx.describe_location()?);
            ctx.state.here_mut()?.visited = true;
            if let Some(text) = ctx.standing_encounter()? {
                lines.push(text);
            }
            Ok(ActionOutcome::done(lines.join("\n")))
        })?;
        Ok(outcome.text)
    }

    /// Resolve one action.
    ///
    /// Rule failures come back as a failed outcome and leave the world
    /// untouched; errors mean broken scenario data or engine state, and
    /// also leave the world as it was.
    pub fn do_action(&mut self, action: &Action) -> EngineResult<ActionOutcome> {
        debug!(%action, "action");
        self.run(|ctx| {
            let outcome = dispatch(ctx, action)?;
            if outcome.failed || !outcome.handled {
                return Ok(outcome);
            }
            if SYSTEM_VERBS.contains(&action.verb.as_str()) {
                ctx.skip_turn = true;
                return Ok(outcome);
            }
            let mut lines = vec![outcome.text];
            lines.extend(end_of_action(ctx)?);
            Ok(ActionOutcome::done(
                lines
                    .into_iter()
                    .filter(|l| !l.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ))
        })
    }

    /// The image of the last action, if it had one. Cleared by reading.
    pub fn take_image(&mut self) -> Option<String> {
        self.image.take()
    }

    /// True if the last action cost no game time: the clock, effects,
    /// script transitions and random happenings did not advance.
    pub fn skip_turn(&self) -> bool {
        self.skip_turn
    }

    /// True if the last action handed control to the monsters and the
    /// narrator should play their turn.
    pub fn monsters_turn_pending(&self) -> bool {
        self.monsters_pending
    }

    fn run(
        &mut self,
        f: impl FnOnce(&mut ActionContext<'_>) -> EngineResult<ActionOutcome>,
    ) -> EngineResult<ActionOutcome> {
        let snapshot = self.state.clone();
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(self.state.action_count));
        let mut ctx = ActionContext {
            scenario: &self.scenario,
            state: &mut self.state,
            config: &self.config,
            rng: &mut rng,
            now: self.clock.now(),
            image: None,
            skip_turn: false,
            monsters_pending: false,
        };
        let result = f(&mut ctx);
        let (image, skip_turn, monsters_pending) =
            (ctx.image.take(), ctx.skip_turn, ctx.monsters_pending);

        self.image = None;
        self.skip_turn = false;
        self.monsters_pending = false;
        match result {
            Ok(outcome) if !outcome.failed => {
                self.image = image;
                self.skip_turn = skip_turn;
                self.monsters_pending = monsters_pending;
                Ok(outcome)
            }
            Ok(outcome) => {
                self.state = snapshot;
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "action aborted");
                self.state = snapshot;
                Err(e)
            }
        }
    }
}

/// Route an action: universal verbs first, then the table of the current mode.
fn dispatch(ctx: &mut ActionContext<'_>, action: &Action) -> EngineResult<ActionOutcome> {
    let verb = action.verb.as_str();
    if ctx.state.game_over && !matches!(verb, "look" | "help" | "stats" | "invent") {
        return Ok(ActionOutcome::failed("The game is over."));
    }
    match verb {
        "look" => return look(ctx, action.text(0)),
        "help" => return Ok(ActionOutcome::done(help(ctx.state.mode))),
        "topic" => return ctx.topic(action),
        "stats" => return ctx.stats(action.text(0)),
        "give" => return ctx.give(action),
        "use" => return ctx.use_item(action, None),
        "play" => return ctx.use_item(action, Some("play")),
        "cast" => return ctx.cast(action),
        "equip" => return ctx.equip_item(action),
        _ => {}
    }

    let mode = ctx.state.mode;
    if !mode_verbs(mode).any(|v| v == verb) {
        let known = [EXPLORATION_VERBS, ENCOUNTER_VERBS, DIALOG_VERBS, STORE_VERBS]
            .iter()
            .any(|table| table.contains(&verb));
        return Ok(if known {
            ActionOutcome::failed(format!("Cannot {verb} during {mode}."))
        } else {
            ActionOutcome::unhandled(verb)
        });
    }
    match verb {
        "go" => ctx.go(action.text(0)),
        "search" => ctx.search(action.text(0)),
        "pickup" => ctx.pickup(action),
        "drop" => ctx.drop_item(action),
        "invent" => ctx.inventory(action.text(0)),
        "complete-task" => ctx.complete_task(action.text(0)),
        "bye" => ctx.bye(),
        "browse" => ctx.browse(action),
        "buy" => ctx.buy(action),
        "sell" => ctx.sell(action),
        "leave" => ctx.leave(),
        other => match other.parse::<Move>() {
            Ok(mv) => ctx.encounter_move(mv, action.text(0), action.text(1)),
            Err(_) => Ok(ActionOutcome::unhandled(other)),
        },
    }
}

/// Verbs of `mode` beyond the universal ones.
fn mode_verbs(mode: Mode) -> impl Iterator<Item = &'static str> {
    let tables: &[&[&'static str]] = match mode {
        Mode::Exploration => &[EXPLORATION_VERBS],
        Mode::Encounter => &[ENCOUNTER_VERBS],
        Mode::Dialog => &[DIALOG_VERBS, EXPLORATION_VERBS],
        Mode::Store => &[STORE_VERBS],
    };
    tables.iter().flat_map(|t| t.iter().copied())
}

fn help(mode: Mode) -> String {
    let mut specific: Vec<&str> = mode_verbs(mode).collect();
    specific.dedup();
    format!(
        "Always: {}. During {mode}: {}.",
        UNIVERSAL_VERBS.join(", "),
        specific.join(", ")
    )
}

/// `look(target?)`: the location, or a closer look at something in it.
fn look(ctx: &mut ActionContext<'_>, target: Option<String>) -> EngineResult<ActionOutcome> {
    let Some(name) = target else {
        return ctx.describe_location().map(ActionOutcome::done);
    };
    let mut found = ctx.being_here(&name)?.or(ctx.floor_item(&name)?);
    for member in ctx.state.party.clone() {
        if found.is_some() {
            break;
        }
        found = ctx.held_item(&member, &name);
    }
    let Some(id) = found else {
        return Ok(ActionOutcome::failed(format!("There is no {name} here.")));
    };
    let obj = ctx.state.registry.get(&id)?;
    let image = obj
        .being()
        .and_then(|b| b.image.clone())
        .or_else(|| {
            obj.item_def_key()
                .and_then(|key| ctx.scenario.rules.item(key))
                .and_then(|def| def.image.clone())
        });
    let description = if obj.description.is_empty() {
        format!("Nothing special about {}.", obj.name)
    } else {
        format!("{}: {}", obj.name, obj.description)
    };
    ctx.image = image;
    Ok(ActionOutcome::done(description))
}

/// The bookkeeping after every action that took game time: the clock,
/// effect expiry, script transitions and random happenings.
fn end_of_action(ctx: &mut ActionContext<'_>) -> EngineResult<Vec<String>> {
    let minutes = ctx.config.turn_minutes;
    let state = &mut *ctx.state;
    state.action_count += 1;
    state.elapsed_minutes += minutes;
    if let Some(later) = i64::try_from(minutes)
        .ok()
        .and_then(Duration::try_minutes)
        .and_then(|d| state.game_time.checked_add_signed(d))
    {
        state.game_time = later;
    }
    let now = state.elapsed_minutes;
    let mut lines = state.effects.advance_one_action(&mut state.registry, now)?;
    let effects = &state.effects;
    state.registry.release_retired(|id| effects.references(id));
    if let Some(text) = ctx.evaluate_transitions()? {
        lines.push(text);
    }
    if let Some(text) = ctx.random_happenings()? {
        lines.push(text);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::scenario::tests::hamlet;
    use chrono::{TimeZone, Utc};
    use rw_mechanics::Side;

    fn game() -> Game {
        Game::new(Arc::new(hamlet()), EngineConfig::default()).unwrap()
    }

    fn act(game: &mut Game, verb: &str, args: &[&str]) -> ActionOutcome {
        game.do_action(&Action::named(verb, args)).unwrap()
    }

    fn id(game: &Game, name: &str) -> rw_core::ObjectId {
        game.state()
            .registry
            .resolve(name)
            .map(|o| o.unique_name.clone())
            .unwrap()
    }

    #[test]
    fn failed_pickup_changes_nothing() {
        let mut game = game();
        let before = game.state().clone();
        let action = crate::parser::parse_actions(r#"do_action("pickup", "Alice", "Torch", null)"#)
            .0
            .remove(0);
        let outcome = game.do_action(&action).unwrap();
        assert!(outcome.failed);
        assert_eq!(outcome.text, "There is no Torch here.");
        assert_eq!(game.state(), &before);
    }

    #[test]
    fn pickup_and_drop_move_items() {
        let mut game = game();
        let outcome = act(&mut game, "pickup", &["Alice", "rope"]);
        assert_eq!(outcome.text, "Alice picks up rope.");
        let alice = id(&game, "Alice");
        assert!(game.state().registry.find_child(alice.as_str(), "rope").is_some());
        assert_eq!(game.state().action_count, 1);
        assert_eq!(game.state().elapsed_minutes, 10);

        let outcome = act(&mut game, "drop", &["Alice", "gold", "5"]);
        assert_eq!(outcome.text, "Alice drops 5 gold.");
        let gold = game.state().registry.find_child(alice.as_str(), "gold").unwrap();
        assert_eq!(game.state().registry.get(&gold).unwrap().item().unwrap().count(), 10);
    }

    #[test]
    fn unknown_verbs_are_left_to_the_narrator() {
        let mut game = game();
        let outcome = act(&mut game, "dance", &["Alice"]);
        assert!(!outcome.handled);
        assert!(!outcome.failed);
        assert_eq!(game.state().action_count, 0);
    }

    #[test]
    fn verbs_of_other_modes_fail() {
        let mut game = game();
        let outcome = act(&mut game, "attack", &["Alice", "Mara"]);
        assert!(outcome.failed);
        assert_eq!(outcome.text, "Cannot attack during exploration.");
    }

    #[test]
    fn system_verbs_take_no_time() {
        let mut game = game();
        act(&mut game, "look", &[]);
        act(&mut game, "help", &[]);
        assert!(game.skip_turn());
        act(&mut game, "invent", &[]);
        assert_eq!(game.state().action_count, 0);
        assert_eq!(game.state().elapsed_minutes, 0);
    }

    #[test]
    fn skip_turn_marks_actions_without_game_time() {
        let mut game = game();
        act(&mut game, "help", &[]);
        assert!(game.skip_turn());
        act(&mut game, "pickup", &["Alice", "rope"]);
        assert!(!game.skip_turn());
        act(&mut game, "stats", &["Alice"]);
        assert!(game.skip_turn());
        assert!(act(&mut game, "pickup", &["Alice", "anvil"]).failed);
        assert!(!game.skip_turn());
    }

    #[test]
    fn go_lists_exits_on_a_bad_name() {
        let mut game = game();
        let outcome = act(&mut game, "go", &["west"]);
        assert!(outcome.failed);
        assert_eq!(outcome.text, "There is no exit 'west' here. Exits: north.");
    }

    #[test]
    fn search_reveals_the_cellar() {
        let mut game = game();
        // DC 5 against a plain d20: ten tries are plenty.
        let mut found = false;
        for _ in 0..10 {
            let outcome = act(&mut game, "search", &["Alice"]);
            assert!(!outcome.failed);
            if outcome.text.contains("finds gold x5") {
                found = true;
                break;
            }
        }
        assert!(found);
        let outcome = act(&mut game, "go", &["cellar"]);
        assert!(!outcome.failed, "{}", outcome.text);
        assert_eq!(game.state().location, "cellar");
    }

    #[test]
    fn tasks_grant_xp_once() {
        let mut game = game();
        let outcome = act(&mut game, "complete-task", &["Ring the Bell"]);
        assert_eq!(outcome.text, "Task complete: ring the bell. Alice and Bob gain 25 xp.");
        let alice = id(&game, "Alice");
        assert_eq!(game.state().registry.being(&alice).unwrap().xp, 25);
        assert!(act(&mut game, "complete-task", &["ring the bell"]).failed);
    }

    #[test]
    fn melee_duel_to_victory() {
        let mut game = game();
        let outcome = act(&mut game, "go", &["cave"]);
        assert!(outcome.text.contains("A goblin leaps out!"));
        assert_eq!(game.state().mode, Mode::Encounter);
        // The den is small: everyone starts engaged.
        let encounter = game.state().encounter.clone().unwrap();
        assert_eq!(encounter.turn, Side::Players);

        let mut won = false;
        for _ in 0..40 {
            if game.state().encounter.is_none() {
                won = true;
                break;
            }
            let outcome = act(&mut game, "attack", &["Alice", "Goblin"]);
            if outcome.failed {
                // Alice already moved: let the monsters have their turn.
                act(&mut game, "skip", &[]);
                act(&mut game, "skip", &["Goblin"]);
            }
        }
        assert!(won || game.state().game_over);
        if won {
            assert_eq!(game.state().mode, Mode::Exploration);
            let goblin = id(&game, "Goblin");
            assert!(game.state().registry.being(&goblin).unwrap().dead);
            let floor = game.state().floor().unwrap();
            assert!(
                floor
                    .iter()
                    .any(|i| game.state().registry.get(i).unwrap().name == "dagger")
            );
        }
    }

    #[test]
    fn monsters_turn_is_handed_to_the_narrator() {
        let mut game = game();
        act(&mut game, "go", &["north"]);
        act(&mut game, "skip", &["Alice"]);
        assert!(!game.monsters_turn_pending());
        let outcome = act(&mut game, "skip", &["Bob"]);
        assert!(outcome.text.ends_with("The monsters' turn."));
        assert!(game.monsters_turn_pending());
        assert!(!game.skip_turn());
        assert_eq!(game.state().encounter.as_ref().unwrap().turn, Side::Monsters);
    }

    #[test]
    fn give_and_equip_spend_the_move_in_a_fight() {
        let mut game = game();
        act(&mut game, "go", &["north"]);
        act(&mut game, "skip", &["Alice"]);
        let outcome = act(&mut game, "give", &["Alice", "gold", "Bob", "1"]);
        assert!(outcome.failed);
        assert_eq!(outcome.text, "Alice has already moved this round.");
        assert!(act(&mut game, "equip", &["Alice", "longsword"]).failed);

        let outcome = act(&mut game, "give", &["Bob", "arrow", "Alice", "1"]);
        assert!(!outcome.failed, "{}", outcome.text);
        assert_eq!(game.state().encounter.as_ref().unwrap().turn, Side::Monsters);

        // Acting on the monsters' turn ends it and uses the new round's move.
        let outcome = act(&mut game, "equip", &["Alice", "longsword"]);
        assert!(outcome.text.contains("The monsters' turn ends."), "{}", outcome.text);
        let encounter = game.state().encounter.clone().unwrap();
        assert_eq!((encounter.turn, encounter.round), (Side::Players, 2));
        assert!(act(&mut game, "equip", &["Alice", "longsword"]).failed);
    }

    #[test]
    fn auto_monsters_play_their_turn() {
        let config = EngineConfig::default().with_auto_monsters(true);
        let mut game = Game::new(Arc::new(hamlet()), config).unwrap();
        act(&mut game, "go", &["north"]);
        act(&mut game, "skip", &["Alice"]);
        act(&mut game, "skip", &["Bob"]);
        assert!(!game.monsters_turn_pending());
        let state = game.state();
        if let Some(encounter) = &state.encounter {
            assert_eq!(encounter.turn, Side::Players);
            assert_eq!(encounter.round, 2);
        }
    }

    #[test]
    fn trading_with_mara() {
        let mut game = game();
        let outcome = act(&mut game, "browse", &["Mara"]);
        assert!(!outcome.failed, "{}", outcome.text);
        assert_eq!(game.state().mode, Mode::Store);
        assert!(outcome.text.starts_with("Mara sells dagger (2 gold each)"));

        let outcome = act(&mut game, "buy", &["Alice", "arrow", "5"]);
        assert_eq!(outcome.text, "Alice buys 5 arrow for 5 gold.");
        let outcome = act(&mut game, "sell", &["Alice", "longsword"]);
        assert_eq!(outcome.text, "Alice sells longsword for 7 gold.");
        let alice = id(&game, "Alice");
        assert_eq!(game.state().registry.being(&alice).unwrap().equipped.weapon, None);
        assert!(act(&mut game, "buy", &["Alice", "dagger", "3"]).failed);
        let outcome = act(&mut game, "leave", &[]);
        assert!(!outcome.failed);
        assert_eq!(game.state().mode, Mode::Exploration);
    }

    #[test]
    fn dialog_topics() {
        let mut game = game();
        let outcome = act(&mut game, "topic", &["mara"]);
        assert_eq!(outcome.text, "Mara: Welcome, travelers.");
        assert_eq!(game.state().mode, Mode::Dialog);
        let outcome = act(&mut game, "topic", &["Mara", "Goblins"]);
        assert_eq!(outcome.text, "Mara: They live in the den to the north.");
        assert!(act(&mut game, "topic", &["Mara", "weather"]).failed);
        act(&mut game, "bye", &[]);
        assert_eq!(game.state().mode, Mode::Exploration);
    }

    #[test]
    fn the_store_opens_from_dialog_too() {
        let mut game = game();
        act(&mut game, "topic", &["Mara"]);
        let outcome = act(&mut game, "browse", &[]);
        assert!(!outcome.failed, "{}", outcome.text);
        assert_eq!(game.state().mode, Mode::Store);
        let help = act(&mut game, "help", &[]);
        assert!(help.text.contains("buy"));
    }

    #[test]
    fn potions_heal_and_are_used_up() {
        let mut game = game();
        let alice = id(&game, "Alice");
        game.state
            .registry
            .being_mut(&alice)
            .unwrap()
            .take_damage(6)
            .unwrap();
        let outcome = act(&mut game, "use", &["Alice", "healing potion"]);
        assert!(outcome.text.contains("recovers"), "{}", outcome.text);
        let potion = game
            .state()
            .registry
            .find_child(alice.as_str(), "healing potion")
            .unwrap();
        assert_eq!(
            game.state().registry.get(&potion).unwrap().item().unwrap().count(),
            1
        );
    }

    #[test]
    fn used_up_items_leave_no_trace_in_the_save() {
        let mut game = game();
        act(&mut game, "use", &["Alice", "healing potion"]);
        act(&mut game, "use", &["Alice", "healing potion"]);
        let alice = id(&game, "Alice");
        let registry = &game.state().registry;
        assert!(registry.find_child(alice.as_str(), "healing potion").is_none());
        assert!(!registry.is_retired("healing potion"));
    }

    #[test]
    fn spells_spend_slots() {
        let mut game = game();
        let outcome = act(&mut game, "cast", &["Alice", "cure wounds", "Bob"]);
        assert!(!outcome.failed, "{}", outcome.text);
        let alice = id(&game, "Alice");
        assert_eq!(game.state().registry.being(&alice).unwrap().spell_slots, vec![1]);
        assert!(act(&mut game, "cast", &["Bob", "cure wounds"]).failed);
    }

    #[test]
    fn character_sheet() {
        let mut game = game();
        let outcome = act(&mut game, "stats", &["Alice"]);
        insta::assert_snapshot!(outcome.text, @r"
        Alice (level 1)
        Health 12/12, defense 10, speed 30, xp 0
        Attributes: dexterity 14 (+2), strength 16 (+3)
        Weapon: longsword, armor: none
        Spells: cure wounds (slots 2)
        ");
    }

    #[test]
    fn random_events_wait_for_the_wall_clock() {
        let mut scenario = hamlet();
        scenario.module.areas.insert(
            "village".to_string(),
            crate::scenario::AreaDef {
                min_minutes: 30,
                max_minutes: 30,
                encounters: Vec::new(),
                events: vec!["A dog barks.".to_string()],
            },
        );
        if let Some(square) = scenario.module.locations.get_mut("square") {
            square.area = Some("village".to_string());
        }
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        let mut game = Game::new(Arc::new(scenario), EngineConfig::default())
            .unwrap()
            .with_clock(clock.clone());

        let first = act(&mut game, "pickup", &["Alice", "rope"]);
        assert!(!first.text.contains("dog"));
        clock.advance(Duration::minutes(31));
        let second = act(&mut game, "drop", &["Alice", "rope"]);
        assert!(second.text.ends_with("A dog barks."), "{}", second.text);
    }

    #[test]
    fn game_time_advances_per_action() {
        let mut game = game();
        let start = game.state().game_time;
        act(&mut game, "pickup", &["Alice", "rope"]);
        assert_eq!(game.state().game_time - start, Duration::minutes(10));
    }
}
