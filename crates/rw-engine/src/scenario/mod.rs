//! Read-only scenario data: rules, the module, and the party.
//!
//! A scenario directory holds `module.json` and `party.json`, plus an
//! optional `rules.json`; without one the starter rules are used.

pub mod location;
pub mod validate;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDateTime;
use rw_core::Stats;
use rw_mechanics::Rules;
use rw_mechanics::rules::preset;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
pub use location::{
    EncounterDef, Exit, ItemPlacement, Location, LocationView, MonsterGroup, SCRIPT_DONE,
    ScriptState, TaskDef, Transition,
};
pub use validate::validate_scenario;

/// File names inside a scenario directory.
pub const RULES_FILE: &str = "rules.json";
/// Module file name.
pub const MODULE_FILE: &str = "module.json";
/// Party file name.
pub const PARTY_FILE: &str = "party.json";

/// A merchant's wares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDef {
    /// Items for sale.
    #[serde(default)]
    pub stock: Vec<ItemPlacement>,
    /// Currency the merchant starts with.
    #[serde(default)]
    pub purse: u32,
    /// Percentage of an item's value paid when buying from the party.
    #[serde(default = "default_buys_at")]
    pub buys_at: u32,
}

fn default_buys_at() -> u32 {
    50
}

/// A non-player character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcDef {
    /// Display name; the key if absent.
    pub name: Option<String>,
    /// Free-text description.
    pub description: String,
    /// Stat block.
    pub stats: Stats,
    /// What the NPC says when addressed without a topic.
    pub greeting: String,
    /// Conversation topics, name → text.
    pub topics: BTreeMap<String, String>,
    /// Present if the NPC trades.
    pub store: Option<StoreDef>,
    /// Optional illustration.
    pub image: Option<String>,
}

/// Random tables for a region of the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaDef {
    /// Shortest real-time wait between random happenings, in minutes.
    #[serde(default = "default_min_minutes")]
    pub min_minutes: u64,
    /// Longest real-time wait, in minutes.
    #[serde(default = "default_max_minutes")]
    pub max_minutes: u64,
    /// Fights that may break out.
    #[serde(default)]
    pub encounters: Vec<EncounterDef>,
    /// Things that may happen.
    #[serde(default)]
    pub events: Vec<String>,
}

fn default_min_minutes() -> u64 {
    30
}

fn default_max_minutes() -> u64 {
    120
}

/// The adventure: places, people and random tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Module title.
    pub name: String,
    /// Opening narration.
    #[serde(default)]
    pub intro: String,
    /// Where the party starts.
    pub start_location: String,
    /// In-game start time.
    #[serde(default)]
    pub start_time: Option<NaiveDateTime>,
    /// Locations, keyed by name.
    pub locations: BTreeMap<String, Location>,
    /// NPCs, keyed by name.
    #[serde(default)]
    pub npcs: BTreeMap<String, NpcDef>,
    /// Random tables, keyed by area.
    #[serde(default)]
    pub areas: BTreeMap<String, AreaDef>,
}

/// A player character as written in the party file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterDef {
    /// Name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Stat block.
    pub stats: Stats,
    /// Starting items.
    pub items: Vec<ItemPlacement>,
    /// Names of carried items to equip at the start.
    pub equip: Vec<String>,
    /// Known spells.
    pub spells: BTreeSet<String>,
    /// Spell slots per level, level 1 first.
    pub spell_slots: Vec<u32>,
    /// Optional illustration.
    pub image: Option<String>,
}

/// The adventuring party.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    /// Members.
    pub characters: Vec<CharacterDef>,
}

/// Everything a game reads but never changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Rules tables.
    pub rules: Rules,
    /// The module.
    pub module: Module,
    /// The party.
    pub party: Party,
}

impl Scenario {
    /// Load a scenario directory.
    pub fn load(dir: &Path) -> EngineResult<Self> {
        let rules_path = dir.join(RULES_FILE);
        let rules = if rules_path.exists() {
            read_json(&rules_path)?
        } else {
            debug!(dir = %dir.display(), "no rules file, using starter rules");
            preset::starter()
        };
        Ok(Self {
            rules,
            module: read_json(&dir.join(MODULE_FILE))?,
            party: read_json(&dir.join(PARTY_FILE))?,
        })
    }

    /// A location that must exist.
    pub fn location(&self, key: &str) -> EngineResult<&Location> {
        self.module
            .locations
            .get(key)
            .ok_or_else(|| EngineError::Scenario(format!("unknown location '{key}'")))
    }

    /// An NPC that must exist.
    pub fn npc(&self, key: &str) -> EngineResult<&NpcDef> {
        self.module
            .npcs
            .get(key)
            .ok_or_else(|| EngineError::Scenario(format!("unknown NPC '{key}'")))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> EngineResult<T> {
    let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| EngineError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rw_mechanics::LocationSize;

    /// A small two-room module used across the engine's tests.
    pub(crate) fn hamlet() -> Scenario {
        let mut module = Module {
            name: "Hamlet".to_string(),
            start_location: "square".to_string(),
            ..Module::default()
        };

        let mut square = Location {
            name: "Village Square".to_string(),
            description: "A muddy square.".to_string(),
            npcs: vec!["mara".to_string()],
            items: vec![ItemPlacement::of("rope")],
            hidden_items: vec![ItemPlacement::stack("gold", 5)],
            search_dc: Some(5),
            ..Location::default()
        };
        square.exits.insert(
            "north".to_string(),
            Exit {
                to: "den".to_string(),
                terms: vec!["den".to_string(), "cave".to_string()],
                hidden: false,
            },
        );
        square.exits.insert(
            "cellar".to_string(),
            Exit {
                to: "cellar".to_string(),
                terms: Vec::new(),
                hidden: true,
            },
        );
        square.tasks.insert(
            "ring the bell".to_string(),
            TaskDef {
                description: "Warn the village.".to_string(),
                xp: 25,
                ..TaskDef::default()
            },
        );

        let den = Location {
            name: "Goblin Den".to_string(),
            description: "It smells of wet dog.".to_string(),
            size: LocationSize::Small,
            exits: BTreeMap::from([(
                "south".to_string(),
                Exit {
                    to: "square".to_string(),
                    ..Exit::default()
                },
            )]),
            encounter: Some(EncounterDef {
                description: "A goblin leaps out!".to_string(),
                monsters: vec![MonsterGroup {
                    monster: "goblin".to_string(),
                    count: 1,
                }],
            }),
            ..Location::default()
        };
        let cellar = Location {
            name: "Cellar".to_string(),
            description: "Damp and dark.".to_string(),
            exits: BTreeMap::from([(
                "up".to_string(),
                Exit {
                    to: "square".to_string(),
                    ..Exit::default()
                },
            )]),
            ..Location::default()
        };
        module.locations.insert("square".to_string(), square);
        module.locations.insert("den".to_string(), den);
        module.locations.insert("cellar".to_string(), cellar);

        module.npcs.insert(
            "mara".to_string(),
            NpcDef {
                name: Some("Mara".to_string()),
                greeting: "Welcome, travelers.".to_string(),
                topics: BTreeMap::from([(
                    "goblins".to_string(),
                    "They live in the den to the north.".to_string(),
                )]),
                store: Some(StoreDef {
                    stock: vec![ItemPlacement::of("dagger"), ItemPlacement::stack("arrow", 20)],
                    purse: 10,
                    buys_at: 50,
                }),
                ..NpcDef::default()
            },
        );

        let mut stats = Stats::default();
        stats.basic.max_health = 12;
        stats.basic.cur_health = 12;
        stats.attributes.insert("strength".to_string(), 16);
        stats.attributes.insert("dexterity".to_string(), 14);
        let alice = CharacterDef {
            name: "Alice".to_string(),
            stats: stats.clone(),
            items: vec![
                ItemPlacement::of("longsword"),
                ItemPlacement::stack("gold", 15),
                ItemPlacement::stack("healing potion", 2),
            ],
            equip: vec!["longsword".to_string()],
            spells: BTreeSet::from(["cure wounds".to_string()]),
            spell_slots: vec![2],
            ..CharacterDef::default()
        };
        let bob = CharacterDef {
            name: "Bob".to_string(),
            stats,
            items: vec![ItemPlacement::of("shortbow"), ItemPlacement::stack("arrow", 3)],
            equip: vec!["shortbow".to_string()],
            ..CharacterDef::default()
        };

        Scenario {
            rules: preset::starter(),
            module,
            party: Party {
                characters: vec![alice, bob],
            },
        }
    }

    #[test]
    fn load_reads_a_directory_and_defaults_rules() {
        let scenario = hamlet();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MODULE_FILE),
            serde_json::to_string(&scenario.module).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(PARTY_FILE),
            serde_json::to_string(&scenario.party).unwrap(),
        )
        .unwrap();

        let loaded = Scenario::load(dir.path()).unwrap();
        assert_eq!(loaded, scenario);
    }

    #[test]
    fn load_reports_the_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Scenario::load(dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::Io { ref path, .. } if path.ends_with(MODULE_FILE)));
    }

    #[test]
    fn lookups_are_hard_errors() {
        let scenario = hamlet();
        assert!(scenario.location("square").is_ok());
        assert!(matches!(
            scenario.location("moon"),
            Err(EngineError::Scenario(_))
        ));
    }
}
