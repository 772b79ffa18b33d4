//! The world state: the serializable aggregate root of one game.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rw_core::{
    Being, CoreError, Equipment, GameId, ItemState, LocationState, ObjectBody, ObjectId,
    ObjectKind, Owner, Registry, WorldObject,
};
use rw_mechanics::{EffectLedger, Encounter, ItemKind, Rules};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::scenario::{CharacterDef, ItemPlacement, LocationView, Scenario};

/// What kind of interaction is going on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Moving around and poking at things.
    #[default]
    Exploration,
    /// A fight is running.
    Encounter,
    /// Talking to an NPC.
    Dialog,
    /// Trading with an NPC.
    Store,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Exploration => write!(f, "exploration"),
            Mode::Encounter => write!(f, "an encounter"),
            Mode::Dialog => write!(f, "a conversation"),
            Mode::Store => write!(f, "trading"),
        }
    }
}

/// Everything that changes during a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    /// Identity of this game.
    pub game_id: GameId,
    /// All mutable objects.
    pub registry: Registry,
    /// Active temporary effects.
    pub effects: EffectLedger,
    /// Current interaction mode.
    pub mode: Mode,
    /// Key of the party's location.
    pub location: String,
    /// Where the party came from.
    pub previous_location: Option<String>,
    /// The running fight, only in encounter mode.
    pub encounter: Option<Encounter>,
    /// In-game clock.
    pub game_time: NaiveDateTime,
    /// Game minutes since the start.
    pub elapsed_minutes: u64,
    /// Actions that changed the world so far.
    pub action_count: u64,
    /// The party has fallen.
    pub game_over: bool,
    /// Next real time a random happening is due, per area.
    pub random_schedule: BTreeMap<String, DateTime<Utc>>,
    /// The NPC being talked or traded with.
    pub dialog_partner: Option<ObjectId>,
    /// Party members in marching order.
    pub party: Vec<ObjectId>,
    /// Materialized location states, by location key.
    pub location_states: BTreeMap<String, ObjectId>,
    /// Materialized NPCs, by NPC key.
    pub npcs: BTreeMap<String, ObjectId>,
}

fn default_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1000, 3, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .unwrap_or_default()
}

/// Upper-case the first letter of a key for display.
pub(crate) fn title_case(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl WorldState {
    /// A fresh game: the party at the module's start location.
    pub fn new(scenario: &Scenario, config: &EngineConfig) -> EngineResult<Self> {
        let module = &scenario.module;
        let game_time = config
            .start_time
            .or(module.start_time)
            .unwrap_or_else(default_start);
        let mut state = Self {
            game_id: GameId::new(),
            registry: Registry::new(),
            effects: EffectLedger::new(),
            mode: Mode::Exploration,
            location: module.start_location.clone(),
            previous_location: None,
            encounter: None,
            game_time,
            elapsed_minutes: 0,
            action_count: 0,
            game_over: false,
            random_schedule: BTreeMap::new(),
            dialog_partner: None,
            party: Vec::new(),
            location_states: BTreeMap::new(),
            npcs: BTreeMap::new(),
        };
        for def in &scenario.party.characters {
            let id = state.spawn_character(&scenario.rules, def)?;
            state.party.push(id);
        }
        let start = module.start_location.clone();
        state.ensure_location(scenario, &start)?;
        Ok(state)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize, rebuilding the registry's index.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let state: Self = serde_json::from_str(json)?;
        state.registry.check_consistency()?;
        Ok(state)
    }

    // -----------------------------------------------------------------------
    // Materialization
    // -----------------------------------------------------------------------

    fn spawn_character(&mut self, rules: &Rules, def: &CharacterDef) -> EngineResult<ObjectId> {
        let being = Being {
            spells: def.spells.clone(),
            spell_slots: def.spell_slots.clone(),
            image: def.image.clone(),
            location: Some(self.location.clone()),
            ..Being::with_stats(def.stats.clone())
        };
        let obj = WorldObject::new(&def.name, ObjectBody::Character(being))
            .with_description(&def.description);
        let id = self.registry.register(obj, Owner::Root)?;
        for placement in &def.items {
            self.spawn_item(rules, placement, &id)?;
        }
        for name in &def.equip {
            let item = self.registry.find_child(id.as_str(), name).ok_or_else(|| {
                EngineError::Scenario(format!("{} equips '{name}' but does not carry it", def.name))
            })?;
            equip(&mut self.registry, rules, &id, &item)?;
        }
        Ok(id)
    }

    /// Create an item from scenario data under `owner`.
    pub fn spawn_item(
        &mut self,
        rules: &Rules,
        placement: &ItemPlacement,
        owner: &ObjectId,
    ) -> EngineResult<ObjectId> {
        let def = rules
            .item(&placement.item)
            .ok_or_else(|| EngineError::Scenario(format!("unknown item '{}'", placement.item)))?;
        let state = ItemState {
            def: Some(placement.item.clone()),
            qty: placement.qty,
            cur_state: placement.state.clone(),
            unique: placement.unique,
        };
        let obj = WorldObject::new(placement.display_name(), ObjectBody::Item(state))
            .with_description(&def.description);
        Ok(self.registry.register(obj, Owner::Object(owner.clone()))?)
    }

    /// The state object of location `key`, creating it (with its items
    /// and NPCs) on first use.
    pub fn ensure_location(&mut self, scenario: &Scenario, key: &str) -> EngineResult<ObjectId> {
        if let Some(id) = self.location_states.get(key) {
            return Ok(id.clone());
        }
        let location = scenario.location(key)?;
        let mut ls = LocationState::new(key);
        ls.script_state = location.initial_script_state.clone();
        let obj = WorldObject::new(key, ObjectBody::LocationState(ls));
        let id = self.registry.register(obj, Owner::Root)?;
        self.location_states.insert(key.to_string(), id.clone());
        for placement in &location.items {
            self.spawn_item(&scenario.rules, placement, &id)?;
        }
        let npcs = location.view(location.initial_script_state.as_deref()).npcs.to_vec();
        for npc in npcs {
            self.ensure_npc(scenario, &npc, key)?;
        }
        debug!(location = key, "location materialized");
        Ok(id)
    }

    /// The NPC with key `key`, creating it at `location` on first use.
    pub fn ensure_npc(
        &mut self,
        scenario: &Scenario,
        key: &str,
        location: &str,
    ) -> EngineResult<ObjectId> {
        if let Some(id) = self.npcs.get(key) {
            return Ok(id.clone());
        }
        let def = scenario.npc(key)?;
        let being = Being {
            template: Some(key.to_string()),
            image: def.image.clone(),
            location: Some(location.to_string()),
            ..Being::with_stats(def.stats.clone())
        };
        let name = def.name.clone().unwrap_or_else(|| title_case(key));
        let obj = WorldObject::new(name, ObjectBody::Npc(being)).with_description(&def.description);
        let id = self.registry.register(obj, Owner::Root)?;
        if let Some(store) = &def.store {
            for placement in &store.stock {
                self.spawn_item(&scenario.rules, placement, &id)?;
            }
            if store.purse > 0 {
                let currency = scenario.rules.currency().to_string();
                self.spawn_item(&scenario.rules, &ItemPlacement::stack(currency, store.purse), &id)?;
            }
        }
        self.npcs.insert(key.to_string(), id.clone());
        Ok(id)
    }

    /// Create a monster of type `key` at `location`.
    pub fn spawn_monster(
        &mut self,
        rules: &Rules,
        key: &str,
        location: &str,
    ) -> EngineResult<ObjectId> {
        let def = rules
            .monster(key)
            .ok_or_else(|| EngineError::Scenario(format!("unknown monster '{key}'")))?;
        let mut stats = def.stats.clone();
        stats.basic.cur_health = stats.basic.max_health;
        let being = Being {
            attacks: def.attacks.clone(),
            template: Some(key.to_string()),
            xp: def.xp,
            image: def.image.clone(),
            location: Some(location.to_string()),
            ..Being::with_stats(stats)
        };
        let obj = WorldObject::new(title_case(key), ObjectBody::Monster(being))
            .with_description(&def.description);
        let id = self.registry.register(obj, Owner::Root)?;
        for loot in &def.items {
            self.spawn_item(rules, &ItemPlacement::of(loot.clone()), &id)?;
        }
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The state object of the party's location.
    pub fn here_id(&self) -> EngineResult<&ObjectId> {
        self.location_states.get(&self.location).ok_or_else(|| {
            EngineError::Scenario(format!("location '{}' was never materialized", self.location))
        })
    }

    /// The state of the party's location.
    pub fn here(&self) -> EngineResult<&LocationState> {
        let id = self.here_id()?;
        let obj = self.registry.get(id)?;
        obj.location_state()
            .ok_or_else(|| not_a_location(id.clone(), obj.kind()))
    }

    /// Mutable state of the party's location.
    pub fn here_mut(&mut self) -> EngineResult<&mut LocationState> {
        let id = self.here_id()?.clone();
        let obj = self.registry.get_mut(&id)?;
        let kind = obj.kind();
        obj.location_state_mut()
            .ok_or_else(|| not_a_location(id, kind))
    }

    /// The party's location with its script overlay applied.
    pub fn view<'s>(&self, scenario: &'s Scenario) -> EngineResult<LocationView<'s>> {
        let location = scenario.location(&self.location)?;
        Ok(location.view(self.here()?.script_state.as_deref()))
    }

    /// Items lying at the party's location.
    pub fn floor(&self) -> EngineResult<&[ObjectId]> {
        Ok(self.registry.children(self.here_id()?.as_str()))
    }

    /// Party members who are not dead.
    pub fn living_party(&self) -> Vec<ObjectId> {
        self.party
            .iter()
            .filter(|id| {
                self.registry
                    .resolve(id.as_str())
                    .and_then(|o| o.being())
                    .is_some_and(|b| !b.dead)
            })
            .cloned()
            .collect()
    }

    /// NPCs in the current view of the party's location.
    pub fn present_npcs(&self, scenario: &Scenario) -> EngineResult<Vec<ObjectId>> {
        let view = self.view(scenario)?;
        Ok(view
            .npcs
            .iter()
            .filter_map(|key| self.npcs.get(key))
            .cloned()
            .collect())
    }

    /// Monsters at the party's location, living or dead.
    pub fn monsters_here(&self) -> Vec<ObjectId> {
        self.registry
            .roots_of_kind(ObjectKind::Monster)
            .into_iter()
            .filter(|o| {
                o.being()
                    .is_some_and(|b| b.location.as_deref() == Some(self.location.as_str()))
            })
            .map(|o| o.unique_name.clone())
            .collect()
    }

    /// Living monsters at the party's location.
    pub fn living_monsters_here(&self) -> Vec<ObjectId> {
        self.monsters_here()
            .into_iter()
            .filter(|id| self.registry.being(id).is_ok_and(|b| !b.dead))
            .collect()
    }
}

fn not_a_location(id: ObjectId, actual: ObjectKind) -> EngineError {
    EngineError::Core(CoreError::WrongKind {
        id,
        expected: ObjectKind::LocationState,
        actual,
    })
}

/// Put `item` into the matching equipment slot of `being`.
///
/// Returns the slot name, or `None` if the item is neither weapon nor armor.
pub(crate) fn equip(
    registry: &mut Registry,
    rules: &Rules,
    being: &ObjectId,
    item: &ObjectId,
) -> EngineResult<Option<&'static str>> {
    let kind = registry
        .get(item)?
        .item_def_key()
        .and_then(|key| rules.item(key))
        .map(|def| def.kind);
    let slots: &mut Equipment = &mut registry.being_mut(being)?.equipped;
    match kind {
        Some(ItemKind::Weapon) => {
            slots.weapon = Some(item.clone());
            Ok(Some("weapon"))
        }
        Some(ItemKind::Armor) => {
            slots.armor = Some(item.clone());
            Ok(Some("armor"))
        }
        _ => Ok(None),
    }
}
