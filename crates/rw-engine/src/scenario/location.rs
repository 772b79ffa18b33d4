//! Static location data and script-state overlays.

use std::collections::BTreeMap;

use rw_mechanics::LocationSize;
use serde::{Deserialize, Serialize};

/// Script-state name that clears the active state.
pub const SCRIPT_DONE: &str = "done";

/// A way out of a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    /// Key of the destination location.
    pub to: String,
    /// Other words the exit answers to.
    #[serde(default)]
    pub terms: Vec<String>,
    /// Only usable once found by searching.
    #[serde(default)]
    pub hidden: bool,
}

impl Exit {
    /// True if `input` names this exit, given its key.
    pub fn answers_to(&self, key: &str, input: &str) -> bool {
        key.eq_ignore_ascii_case(input) || self.terms.iter().any(|t| t.eq_ignore_ascii_case(input))
    }
}

/// An item to create in the world.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPlacement {
    /// Key into the rules' equipment table.
    pub item: String,
    /// Display name; the key if absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Stack size for stackable items.
    #[serde(default)]
    pub qty: Option<u32>,
    /// Initial state, e.g. "lit".
    #[serde(default)]
    pub state: Option<String>,
    /// Never merges with other stacks.
    #[serde(default)]
    pub unique: bool,
}

impl ItemPlacement {
    /// A single item by key.
    pub fn of(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            ..Self::default()
        }
    }

    /// A stack of `qty` items.
    pub fn stack(item: impl Into<String>, qty: u32) -> Self {
        Self {
            qty: Some(qty),
            ..Self::of(item)
        }
    }

    /// The name the placed item will carry.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.item)
    }
}

fn one() -> u32 {
    1
}

/// Some monsters of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterGroup {
    /// Key into the rules' monster table.
    pub monster: String,
    /// How many.
    #[serde(default = "one")]
    pub count: u32,
}

/// A fight that starts when the party arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterDef {
    /// Narration when the fight begins.
    #[serde(default)]
    pub description: String,
    /// Who attacks.
    pub monsters: Vec<MonsterGroup>,
}

/// Something the party can accomplish at a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDef {
    /// What the task is.
    #[serde(default)]
    pub description: String,
    /// Experience for every living character.
    #[serde(default)]
    pub xp: u64,
    /// Exits opened on completion, name → destination.
    #[serde(default)]
    pub unlocks: BTreeMap<String, String>,
    /// Script state to move to on completion.
    #[serde(default)]
    pub next_state: Option<String>,
}

/// A transition out of a script state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Target state, or `"done"` to clear.
    pub to: String,
    /// Fires on its own once this many game minutes passed in the state.
    #[serde(default)]
    pub elapsed_time: Option<u64>,
}

/// An overlay on a location while a script state is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptState {
    /// Replaces the location description.
    pub description: Option<String>,
    /// Added or replaced exits.
    pub exits: BTreeMap<String, Exit>,
    /// Replaces the NPC list.
    pub npcs: Option<Vec<String>>,
    /// Replaces the standing encounter.
    pub encounter: Option<EncounterDef>,
    /// Added or replaced tasks.
    pub tasks: BTreeMap<String, TaskDef>,
    /// Move the party here when the state is entered.
    pub goto_location: Option<String>,
    /// States reachable from this one.
    pub transitions: Vec<Transition>,
    /// Replaces the location image.
    pub image: Option<String>,
}

impl ScriptState {
    /// True if `to` is a legal next state.
    pub fn allows(&self, to: &str) -> bool {
        self.transitions.iter().any(|t| t.to == to)
    }
}

/// A place in the module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    /// Display name.
    pub name: String,
    /// Base description.
    pub description: String,
    /// Battlefield size.
    pub size: LocationSize,
    /// Area whose random tables apply here.
    pub area: Option<String>,
    /// Exits, keyed by name.
    pub exits: BTreeMap<String, Exit>,
    /// NPCs present, keys into the module's NPC table.
    pub npcs: Vec<String>,
    /// Items lying here.
    pub items: Vec<ItemPlacement>,
    /// Items a successful search turns up.
    pub hidden_items: Vec<ItemPlacement>,
    /// Difficulty of searching here.
    pub search_dc: Option<i64>,
    /// Tasks, keyed by name.
    pub tasks: BTreeMap<String, TaskDef>,
    /// Fight waiting for the party.
    pub encounter: Option<EncounterDef>,
    /// Script states, keyed by name.
    pub script: BTreeMap<String, ScriptState>,
    /// Script state active on first arrival.
    pub initial_script_state: Option<String>,
    /// Optional illustration.
    pub image: Option<String>,
}

/// A location with its active script state merged on top.
#[derive(Debug, Clone)]
pub struct LocationView<'a> {
    /// Description in effect.
    pub description: &'a str,
    /// Exits in effect; overlay entries win.
    pub exits: BTreeMap<&'a str, &'a Exit>,
    /// NPC keys in effect.
    pub npcs: &'a [String],
    /// Standing encounter in effect.
    pub encounter: Option<&'a EncounterDef>,
    /// Tasks in effect; overlay entries win.
    pub tasks: BTreeMap<&'a str, &'a TaskDef>,
    /// Image in effect.
    pub image: Option<&'a str>,
}

impl Location {
    /// Merge the overlay of `script_state` (if it exists) onto the base.
    pub fn view(&self, script_state: Option<&str>) -> LocationView<'_> {
        let overlay = script_state.and_then(|s| self.script.get(s));

        let mut exits: BTreeMap<&str, &Exit> =
            self.exits.iter().map(|(k, v)| (k.as_str(), v)).collect();
        let mut tasks: BTreeMap<&str, &TaskDef> =
            self.tasks.iter().map(|(k, v)| (k.as_str(), v)).collect();
        let mut view = LocationView {
            description: &self.description,
            exits: BTreeMap::new(),
            npcs: &self.npcs,
            encounter: self.encounter.as_ref(),
            tasks: BTreeMap::new(),
            image: self.image.as_deref(),
        };

        if let Some(overlay) = overlay {
            if let Some(d) = &overlay.description {
                view.description = d;
            }
            exits.extend(overlay.exits.iter().map(|(k, v)| (k.as_str(), v)));
            tasks.extend(overlay.tasks.iter().map(|(k, v)| (k.as_str(), v)));
            if let Some(npcs) = &overlay.npcs {
                view.npcs = npcs;
            }
            if let Some(enc) = &overlay.encounter {
                view.encounter = Some(enc);
            }
            if let Some(image) = &overlay.image {
                view.image = Some(image.as_str());
            }
        }
        view.exits = exits;
        view.tasks = tasks;
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mill() -> Location {
        let mut loc = Location {
            name: "Old Mill".to_string(),
            description: "A creaking mill.".to_string(),
            npcs: vec!["miller".to_string()],
            ..Location::default()
        };
        loc.exits.insert(
            "road".to_string(),
            Exit {
                to: "road".to_string(),
                terms: vec!["south".to_string()],
                hidden: false,
            },
        );
        loc.script.insert(
            "burning".to_string(),
            ScriptState {
                description: Some("The mill is on fire!".to_string()),
                npcs: Some(Vec::new()),
                exits: BTreeMap::from([(
                    "road".to_string(),
                    Exit {
                        to: "river".to_string(),
                        ..Exit::default()
                    },
                )]),
                ..ScriptState::default()
            },
        );
        loc
    }

    #[test]
    fn base_view_without_script_state() {
        let loc = mill();
        let view = loc.view(None);
        assert_eq!(view.description, "A creaking mill.");
        assert_eq!(view.npcs, ["miller".to_string()]);
        assert_eq!(view.exits["road"].to, "road");
    }

    #[test]
    fn overlay_keys_win() {
        let loc = mill();
        let view = loc.view(Some("burning"));
        assert_eq!(view.description, "The mill is on fire!");
        assert!(view.npcs.is_empty());
        assert_eq!(view.exits["road"].to, "river");
    }

    #[test]
    fn unknown_state_falls_back_to_base() {
        let loc = mill();
        assert_eq!(loc.view(Some("flooded")).description, "A creaking mill.");
    }

    #[test]
    fn exits_answer_to_terms() {
        let loc = mill();
        let exit = &loc.exits["road"];
        assert!(exit.answers_to("road", "SOUTH"));
        assert!(!exit.answers_to("road", "north"));
    }

    #[test]
    fn placement_defaults_from_json() {
        let p: ItemPlacement = serde_json::from_str(r#"{"item": "arrow", "qty": 20}"#).unwrap();
        assert_eq!(p, ItemPlacement::stack("arrow", 20));
        assert_eq!(p.display_name(), "arrow");
    }
}
