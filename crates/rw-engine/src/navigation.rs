//! Moving between locations, script states, searching, tasks, and the
//! random happenings of an area.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rw_core::ObjectId;
use rw_mechanics::{Advantage, skill_check};
use tracing::{debug, info};

use crate::context::{ActionContext, join_names};
use crate::error::{EngineError, EngineResult};
use crate::game::ActionOutcome;
use crate::scenario::{EncounterDef, SCRIPT_DONE};
use crate::state::Mode;

/// Skill used to search a location.
pub const SEARCH_SKILL: &str = "perception";

/// Search difficulty when a location names none.
pub const DEFAULT_SEARCH_DC: i64 = 10;

/// An exit usable right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenExit {
    pub name: String,
    pub to: String,
    pub terms: Vec<String>,
}

impl ActionContext<'_> {
    /// Exits of the party's location: base and script overlay (hidden ones
    /// only once found), then exits opened by tasks.
    pub(crate) fn open_exits(&self) -> EngineResult<Vec<OpenExit>> {
        let view = self.state.view(self.scenario)?;
        let here = self.state.here()?;
        let mut exits: Vec<OpenExit> = view
            .exits
            .iter()
            .filter(|(name, exit)| !exit.hidden || here.revealed.contains(**name))
            .map(|(name, exit)| OpenExit {
                name: (*name).to_string(),
                to: exit.to.clone(),
                terms: exit.terms.clone(),
            })
            .collect();
        for (name, to) in &here.added_exits {
            if let Some(existing) = exits.iter_mut().find(|e| &e.name == name) {
                existing.to = to.clone();
            } else {
                exits.push(OpenExit {
                    name: name.clone(),
                    to: to.clone(),
                    terms: Vec::new(),
                });
            }
        }
        Ok(exits)
    }

    /// `go(exit)`.
    pub(crate) fn go(&mut self, exit: Option<String>) -> EngineResult<ActionOutcome> {
        let exits = self.open_exits()?;
        let names: Vec<String> = exits.iter().map(|e| e.name.clone()).collect();
        let Some(input) = exit else {
            return Ok(ActionOutcome::failed(format!(
                "Go where? Exits: {}.",
                join_names(&names)
            )));
        };
        let found = exits.iter().find(|e| {
            e.name.eq_ignore_ascii_case(&input)
                || e.terms.iter().any(|t| t.eq_ignore_ascii_case(&input))
        });
        let Some(found) = found else {
            let listed = if names.is_empty() {
                "none".to_string()
            } else {
                join_names(&names)
            };
            return Ok(ActionOutcome::failed(format!(
                "There is no exit '{input}' here. Exits: {listed}."
            )));
        };
        if self.state.living_party().is_empty() {
            return Ok(ActionOutcome::failed("Nobody is left to go anywhere."));
        }
        let to = found.to.clone();
        let text = self.travel(&to, true)?;
        Ok(ActionOutcome::done(text))
    }

    /// Move the party to location `to`.
    ///
    /// Abandons any running fight, materializes the destination, resets its
    /// timers and, if `fights` is set, starts a standing encounter there.
    pub(crate) fn travel(&mut self, to: &str, fights: bool) -> EngineResult<String> {
        let mut lines = Vec::new();
        if self.state.encounter.is_some() {
            lines.push(self.end_encounter()?);
        }
        self.state.mode = Mode::Exploration;
        self.state.dialog_partner = None;

        let from = std::mem::replace(&mut self.state.location, to.to_string());
        self.state.previous_location = Some(from.clone());
        self.state.ensure_location(self.scenario, to)?;
        for id in self.state.party.clone() {
            self.state.registry.being_mut(&id)?.location = Some(to.to_string());
        }
        let elapsed = self.state.elapsed_minutes;
        let here = self.state.here_mut()?;
        here.entered_at = elapsed;
        here.script_entered_at = elapsed;
        self.materialize_npcs()?;
        info!(from = %from, to, "party moved");

        lines.push(self.describe_location()?);
        self.state.here_mut()?.visited = true;
        if fights {
            if let Some(text) = self.standing_encounter()? {
                lines.push(text);
            }
        }
        Ok(lines.join("\n"))
    }

    /// Create the NPCs the current view lists.
    fn materialize_npcs(&mut self) -> EngineResult<()> {
        let npcs = self.state.view(self.scenario)?.npcs.to_vec();
        let location = self.state.location.clone();
        for key in npcs {
            self.state.ensure_npc(self.scenario, &key, &location)?;
        }
        Ok(())
    }

    /// Start the fight waiting at the party's location, if there is one.
    pub(crate) fn standing_encounter(&mut self) -> EngineResult<Option<String>> {
        if self.state.encounter.is_some() || self.state.living_party().is_empty() {
            return Ok(None);
        }
        let def = self.state.view(self.scenario)?.encounter.cloned();
        let spawned = self.state.here()?.encounter_spawned;
        match def {
            Some(def) if !spawned => {
                self.state.here_mut()?.encounter_spawned = true;
                let monsters = self.spawn_group(&def)?;
                self.start_encounter(&monsters, &def.description).map(Some)
            }
            _ => {
                let living = self.state.living_monsters_here();
                if living.is_empty() {
                    return Ok(None);
                }
                self.start_encounter(&living, "").map(Some)
            }
        }
    }

    fn spawn_group(&mut self, def: &EncounterDef) -> EngineResult<Vec<ObjectId>> {
        let location = self.state.location.clone();
        let mut monsters = Vec::new();
        for group in &def.monsters {
            for _ in 0..group.count {
                monsters.push(self.state.spawn_monster(
                    &self.scenario.rules,
                    &group.monster,
                    &location,
                )?);
            }
        }
        Ok(monsters)
    }

    /// Describe the party's location and remember its image.
    pub(crate) fn describe_location(&mut self) -> EngineResult<String> {
        let location = self.scenario.location(&self.state.location)?;
        let view = self.state.view(self.scenario)?;
        self.image = view.image.map(str::to_string);

        let mut lines = vec![location.name.clone()];
        if !view.description.is_empty() {
            lines.push(view.description.to_string());
        }
        let exits: Vec<String> = self.open_exits()?.into_iter().map(|e| e.name).collect();
        if !exits.is_empty() {
            lines.push(format!("Exits: {}.", join_names(&exits)));
        }
        let npcs: Vec<String> = self
            .state
            .present_npcs(self.scenario)?
            .iter()
            .map(|id| self.name_of(id))
            .collect();
        if !npcs.is_empty() {
            lines.push(format!("Here: {}.", join_names(&npcs)));
        }
        let monsters: Vec<String> = self
            .state
            .monsters_here()
            .iter()
            .map(|id| {
                let name = self.name_of(id);
                match self.state.registry.being(id) {
                    Ok(b) if b.dead => format!("{name} (dead)"),
                    _ => name,
                }
            })
            .collect();
        if !monsters.is_empty() {
            lines.push(format!("Monsters: {}.", join_names(&monsters)));
        }
        let floor = self.labels(self.state.here_id()?.as_str());
        if !floor.is_empty() {
            lines.push(format!("On the ground: {}.", join_names(&floor)));
        }
        let open: Vec<String> = view
            .tasks
            .keys()
            .filter(|t| !self.state.here().is_ok_and(|h| h.completed_tasks.contains(**t)))
            .map(|t| (*t).to_string())
            .collect();
        if !open.is_empty() {
            lines.push(format!("Tasks: {}.", join_names(&open)));
        }
        Ok(lines.join("\n"))
    }

    /// Enter script state `name` at the party's location.
    ///
    /// `name` must be listed in the current state's transitions; `"done"`
    /// or an empty name clears the state. Entering a state with a
    /// `goto_location` moves the party on.
    pub(crate) fn next_script_state(&mut self, name: &str) -> EngineResult<String> {
        let key = self.state.location.clone();
        let location = self.scenario.location(&key)?;
        if name.is_empty() || name == SCRIPT_DONE {
            self.state.here_mut()?.script_state = None;
            debug!(location = %key, "script cleared");
            return Ok(String::new());
        }
        let current = self.state.here()?.script_state.clone();
        let reachable = match &current {
            Some(c) => location.script.get(c).is_some_and(|s| s.allows(name)),
            None => true,
        };
        let Some(next) = location.script.get(name).filter(|_| reachable) else {
            return Err(EngineError::Scenario(format!(
                "script state '{name}' is not reachable from {} at '{key}'",
                current.as_deref().unwrap_or("the base state")
            )));
        };

        let elapsed = self.state.elapsed_minutes;
        let here = self.state.here_mut()?;
        here.script_state = Some(name.to_string());
        here.script_entered_at = elapsed;
        self.materialize_npcs()?;
        info!(location = %key, state = name, "script state entered");

        let mut lines = Vec::new();
        if let Some(description) = &next.description {
            lines.push(description.clone());
        }
        if let Some(target) = &next.goto_location {
            lines.push(self.travel(target, true)?);
        }
        Ok(lines.join("\n"))
    }

    /// Fire the first timed transition of the current script state that is due.
    pub(crate) fn evaluate_transitions(&mut self) -> EngineResult<Option<String>> {
        let location = self.scenario.location(&self.state.location)?;
        let here = self.state.here()?;
        let Some(script) = here
            .script_state
            .as_deref()
            .and_then(|s| location.script.get(s))
        else {
            return Ok(None);
        };
        let in_state = self.state.elapsed_minutes.saturating_sub(here.script_entered_at);
        let due = script
            .transitions
            .iter()
            .find(|t| t.elapsed_time.is_some_and(|m| in_state >= m))
            .map(|t| t.to.clone());
        match due {
            Some(to) => self.next_script_state(&to).map(Some),
            None => Ok(None),
        }
    }

    /// `search(character)`: a perception check that turns up hidden exits and items.
    pub(crate) fn search(&mut self, who: Option<String>) -> EngineResult<ActionOutcome> {
        let Some(name) = who else {
            return Ok(ActionOutcome::failed("Who should search?"));
        };
        let Some(id) = self.character(&name) else {
            return Ok(ActionOutcome::failed(format!("There is no character named {name}.")));
        };
        if let Some(reason) = self.unable(&id)? {
            return Ok(ActionOutcome::failed(reason));
        }
        let searcher = self.name_of(&id);
        let location = self.scenario.location(&self.state.location)?;
        let view = self.state.view(self.scenario)?;
        let here = self.state.here()?;
        let hidden_exits: Vec<String> = view
            .exits
            .iter()
            .filter(|(name, exit)| exit.hidden && !here.revealed.contains(**name))
            .map(|(name, _)| (*name).to_string())
            .collect();
        let hidden_items: Vec<_> = location
            .hidden_items
            .iter()
            .filter(|p| !here.revealed.contains(&p.item))
            .cloned()
            .collect();
        if hidden_exits.is_empty() && hidden_items.is_empty() {
            return Ok(ActionOutcome::done(format!(
                "{searcher} searches but finds nothing new."
            )));
        }

        let dc = location.search_dc.unwrap_or(DEFAULT_SEARCH_DC);
        let stats = &self.state.registry.being(&id)?.stats;
        let check = skill_check(
            stats,
            &self.scenario.rules,
            SEARCH_SKILL,
            dc,
            Advantage::Normal,
            self.rng,
        );
        if !check.success {
            return Ok(ActionOutcome::done(format!(
                "{searcher} searches ({check}) but finds nothing."
            )));
        }

        let floor = self.state.here_id()?.clone();
        let mut found = Vec::new();
        for placement in &hidden_items {
            let item = self.state.spawn_item(&self.scenario.rules, placement, &floor)?;
            found.push(self.label(&item));
        }
        let here = self.state.here_mut()?;
        for placement in &hidden_items {
            here.revealed.insert(placement.item.clone());
        }
        for exit in &hidden_exits {
            here.revealed.insert(exit.clone());
            found.push(format!("a way {exit}"));
        }
        Ok(ActionOutcome::done(format!(
            "{searcher} searches ({check}) and finds {}.",
            join_names(&found)
        )))
    }

    /// `complete-task(task)`.
    pub(crate) fn complete_task(&mut self, task: Option<String>) -> EngineResult<ActionOutcome> {
        let Some(input) = task else {
            return Ok(ActionOutcome::failed("Which task?"));
        };
        let view = self.state.view(self.scenario)?;
        let Some((key, def)) = view
            .tasks
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&input))
            .map(|(k, d)| ((*k).to_string(), (*d).clone()))
        else {
            return Ok(ActionOutcome::failed(format!("There is no task '{input}' here.")));
        };
        if self.state.here()?.completed_tasks.contains(&key) {
            return Ok(ActionOutcome::failed(format!("'{key}' is already done.")));
        }

        let here = self.state.here_mut()?;
        here.completed_tasks.insert(key.clone());
        for (exit, to) in &def.unlocks {
            here.added_exits.insert(exit.clone(), to.clone());
        }
        let mut lines = vec![format!("Task complete: {key}.")];
        if def.xp > 0 {
            let living = self.state.living_party();
            for id in &living {
                self.state.registry.being_mut(id)?.xp += def.xp;
            }
            let names: Vec<String> = living.iter().map(|id| self.name_of(id)).collect();
            lines.push(format!("{} gain {} xp.", join_names(&names), def.xp));
        }
        for exit in def.unlocks.keys() {
            lines.push(format!("A way {exit} opens."));
        }
        if let Some(next) = &def.next_state {
            let text = self.next_script_state(next)?;
            if !text.is_empty() {
                lines.push(text);
            }
        }
        Ok(ActionOutcome::done(lines.join(" ")))
    }

    /// Roll for a random encounter or event in the current area once its
    /// real-time timer is due, then schedule the next one.
    pub(crate) fn random_happenings(&mut self) -> EngineResult<Option<String>> {
        if self.state.mode != Mode::Exploration {
            return Ok(None);
        }
        let location = self.scenario.location(&self.state.location)?;
        let Some(area_key) = &location.area else {
            return Ok(None);
        };
        let Some(area) = self.scenario.module.areas.get(area_key) else {
            return Err(EngineError::Scenario(format!("unknown area '{area_key}'")));
        };
        let total = area.encounters.len() + area.events.len();
        if total == 0 {
            return Ok(None);
        }

        let low = area.min_minutes.min(area.max_minutes);
        let high = area.max_minutes.max(area.min_minutes);
        let wait = self.rng.random_range(low..=high);
        let next = i64::try_from(wait)
            .ok()
            .and_then(Duration::try_minutes)
            .and_then(|d| self.now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let due = self.state.random_schedule.insert(area_key.clone(), next);
        match due {
            Some(at) if self.now >= at => {}
            Some(at) => {
                self.state.random_schedule.insert(area_key.clone(), at);
                return Ok(None);
            }
            None => return Ok(None),
        }

        let pick = self.rng.random_range(0..total);
        debug!(area = %area_key, pick, "random happening");
        match area.encounters.get(pick) {
            Some(def) => {
                let monsters = self.spawn_group(def)?;
                self.start_encounter(&monsters, &def.description).map(Some)
            }
            None => Ok(area.events.get(pick - area.encounters.len()).cloned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::config::EngineConfig;
    use crate::error::EngineError;
    use crate::game::{ActionOutcome, Game};
    use crate::parser::Action;
    use crate::scenario::tests::hamlet;
    use crate::scenario::{Scenario, ScriptState, TaskDef, Transition};

    fn act(game: &mut Game, verb: &str, args: &[&str]) -> ActionOutcome {
        game.do_action(&Action::named(verb, args)).unwrap()
    }

    fn script_state(game: &Game) -> Option<String> {
        game.state().here().unwrap().script_state.clone()
    }

    /// The hamlet with an alarm that empties the square for twenty minutes.
    fn alarmed() -> Scenario {
        let mut scenario = hamlet();
        let square = scenario.module.locations.get_mut("square").unwrap();
        square.tasks.get_mut("ring the bell").unwrap().next_state = Some("alarm".to_string());
        square.tasks.insert(
            "open the hatch".to_string(),
            TaskDef {
                unlocks: BTreeMap::from([("hatch".to_string(), "cellar".to_string())]),
                ..TaskDef::default()
            },
        );
        square.script.insert(
            "alarm".to_string(),
            ScriptState {
                description: Some("Bells clang; the square empties.".to_string()),
                npcs: Some(Vec::new()),
                transitions: vec![Transition {
                    to: "done".to_string(),
                    elapsed_time: Some(20),
                }],
                ..ScriptState::default()
            },
        );
        square.script.insert(
            "flight".to_string(),
            ScriptState {
                goto_location: Some("cellar".to_string()),
                ..ScriptState::default()
            },
        );
        scenario
    }

    #[test]
    fn tasks_move_the_script_and_timers_clear_it() {
        let mut game = Game::new(Arc::new(alarmed()), EngineConfig::default()).unwrap();
        let outcome = act(&mut game, "complete-task", &["ring the bell"]);
        assert!(outcome.text.contains("Bells clang"), "{}", outcome.text);
        assert_eq!(script_state(&game).as_deref(), Some("alarm"));
        assert!(act(&mut game, "topic", &["Mara"]).failed);

        act(&mut game, "pickup", &["Alice", "rope"]);
        assert_eq!(script_state(&game), None);
        assert!(!act(&mut game, "topic", &["Mara"]).failed);
    }

    #[test]
    fn unlocked_exits_can_be_used() {
        let mut game = Game::new(Arc::new(alarmed()), EngineConfig::default()).unwrap();
        assert!(act(&mut game, "go", &["hatch"]).failed);
        act(&mut game, "complete-task", &["open the hatch"]);
        let outcome = act(&mut game, "go", &["hatch"]);
        assert!(!outcome.failed);
        assert!(outcome.text.starts_with("Cellar\nDamp and dark."));
    }

    #[test]
    fn entering_a_state_can_move_the_party() {
        let mut scenario = alarmed();
        let square = scenario.module.locations.get_mut("square").unwrap();
        square.tasks.get_mut("open the hatch").unwrap().next_state = Some("flight".to_string());
        let mut game = Game::new(Arc::new(scenario), EngineConfig::default()).unwrap();
        act(&mut game, "complete-task", &["open the hatch"]);
        assert_eq!(game.state().location, "cellar");
        assert_eq!(game.state().previous_location.as_deref(), Some("square"));
    }

    #[test]
    fn unreachable_states_are_hard_errors() {
        let mut scenario = alarmed();
        let square = scenario.module.locations.get_mut("square").unwrap();
        square.initial_script_state = Some("alarm".to_string());
        square.tasks.get_mut("open the hatch").unwrap().next_state = Some("flight".to_string());
        let mut game = Game::new(Arc::new(scenario), EngineConfig::default()).unwrap();
        let before = game.state().clone();
        let err = game
            .do_action(&Action::named("complete-task", &["open the hatch"]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Scenario(_)));
        assert_eq!(game.state(), &before);
    }

    #[test]
    fn a_cleared_den_stays_quiet() {
        let mut game = Game::new(
            Arc::new(hamlet()),
            EngineConfig::default().with_auto_monsters(true),
        )
        .unwrap();
        act(&mut game, "go", &["north"]);
        assert!(game.state().encounter.is_some());
        act(&mut game, "flee", &["Alice"]);
        act(&mut game, "flee", &["Bob"]);
        // Both fled past the edge of the small den.
        assert!(game.state().encounter.is_none());
        assert_eq!(game.state().location, "square");

        // The goblin is still there and picks the fight up again.
        act(&mut game, "go", &["north"]);
        assert!(game.state().encounter.is_some());
    }
}
