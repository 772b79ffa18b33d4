//! The explicit context every action handler runs in.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rw_core::{ObjectId, WorldObject};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::resolver::resolve_among;
use crate::scenario::Scenario;
use crate::state::WorldState;

/// What one action may read and change.
pub(crate) struct ActionContext<'a> {
    pub scenario: &'a Scenario,
    pub state: &'a mut WorldState,
    pub config: &'a EngineConfig,
    pub rng: &'a mut StdRng,
    /// Real time, for random happenings.
    pub now: DateTime<Utc>,
    /// Image of whatever the action described last.
    pub image: Option<String>,
    /// The action cost no game time.
    pub skip_turn: bool,
    /// Control passed to the monsters; the narrator should play them.
    pub monsters_pending: bool,
}

impl ActionContext<'_> {
    fn resolve(&self, candidates: &[ObjectId], name: &str) -> Option<ObjectId> {
        resolve_among(
            &self.state.registry,
            candidates,
            name,
            self.config.fuzzy_threshold,
        )
    }

    /// A party member by name.
    pub fn character(&self, name: &str) -> Option<ObjectId> {
        self.resolve(&self.state.party, name)
    }

    /// Any being at the party's location: characters, NPCs in view, monsters.
    pub fn being_here(&self, name: &str) -> EngineResult<Option<ObjectId>> {
        let mut candidates = self.state.party.clone();
        candidates.extend(self.state.present_npcs(self.scenario)?);
        candidates.extend(self.state.monsters_here());
        Ok(self.resolve(&candidates, name))
    }

    /// An item lying at the party's location.
    pub fn floor_item(&self, name: &str) -> EngineResult<Option<ObjectId>> {
        Ok(self.resolve(self.state.floor()?, name))
    }

    /// An item carried directly by `owner`.
    pub fn held_item(&self, owner: &ObjectId, name: &str) -> Option<ObjectId> {
        self.resolve(self.state.registry.children(owner.as_str()), name)
    }

    /// Display name of a registered object, falling back to its handle.
    pub fn name_of(&self, id: &ObjectId) -> String {
        self.state
            .registry
            .resolve(id.as_str())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Why `id` cannot act, if it cannot.
    pub fn unable(&self, id: &ObjectId) -> EngineResult<Option<String>> {
        let being = self.state.registry.being(id)?;
        Ok(being
            .incapacitated_by()
            .map(|reason| format!("{} is {reason} and cannot act.", self.name_of(id))))
    }

    /// A party member able to act, or the text explaining why there is none.
    pub fn acting_character(&self, name: Option<&str>) -> EngineResult<Result<ObjectId, String>> {
        let Some(name) = name else {
            return Ok(Err("Which character?".to_string()));
        };
        let Some(id) = self.character(name) else {
            return Ok(Err(format!("There is no character named {name}.")));
        };
        Ok(match self.unable(&id)? {
            Some(reason) => Err(reason),
            None => Ok(id),
        })
    }

    /// Label an item with its count and state, e.g. `arrow x20` or `torch (lit)`.
    pub fn label(&self, id: &ObjectId) -> String {
        self.state
            .registry
            .resolve(id.as_str())
            .map(item_label)
            .unwrap_or_else(|| id.to_string())
    }

    /// Labels of every item `owner` holds.
    pub fn labels(&self, owner: &str) -> Vec<String> {
        self.state
            .registry
            .children(owner)
            .iter()
            .map(|id| self.label(id))
            .collect()
    }
}

pub(crate) fn item_label(obj: &WorldObject) -> String {
    let mut label = obj.name.clone();
    if let Some(item) = obj.item() {
        if let Some(qty) = item.qty {
            label.push_str(&format!(" x{qty}"));
        }
        if let Some(state) = &item.cur_state {
            label.push_str(&format!(" ({state})"));
        }
    }
    label
}

/// Join names as `a, b and c`.
pub(crate) fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
