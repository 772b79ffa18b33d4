use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::id::ObjectId;
use crate::modifier::{Modifier, ModifierStack};
use crate::stats::{StatPath, StatValue, Stats};

/// Conditions that stop a being from acting.
pub const INCAPACITATING: &[&str] = &[
    "paralyzed",
    "frozen",
    "stunned",
    "unconscious",
    "asleep",
];

/// The kind of a world object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// A player character.
    Character,
    /// A hostile combatant.
    Monster,
    /// A non-player character.
    Npc,
    /// A carried or placed item.
    Item,
    /// The mutable per-game state of a location.
    LocationState,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character => write!(f, "character"),
            Self::Monster => write!(f, "monster"),
            Self::Npc => write!(f, "npc"),
            Self::Item => write!(f, "item"),
            Self::LocationState => write!(f, "location state"),
        }
    }
}

/// Per-combatant bookkeeping that only exists while an encounter runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterRecord {
    /// Last round this combatant acted in; 0 means not yet.
    pub moved_round: u32,
    /// Position on the encounter's 1-D axis, in feet.
    pub range: i64,
    /// Left the battlefield; no longer targetable or counted.
    pub escaped: bool,
}

impl EncounterRecord {
    /// A fresh record at the given position.
    pub fn at(range: i64) -> Self {
        Self {
            moved_round: 0,
            range,
            escaped: false,
        }
    }
}

/// Items a being currently wields or wears.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    /// Equipped weapon (an item the being owns).
    pub weapon: Option<ObjectId>,
    /// Equipped armor (an item the being owns).
    pub armor: Option<ObjectId>,
}

impl Equipment {
    /// Drop any reference to `item`.
    pub fn unequip(&mut self, item: &ObjectId) {
        if self.weapon.as_ref() == Some(item) {
            self.weapon = None;
        }
        if self.armor.as_ref() == Some(item) {
            self.armor = None;
        }
    }
}

/// A natural attack, used by monsters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    /// Display name ("bite", "claw").
    pub name: String,
    /// Damage dice expression.
    pub damage: String,
    /// Reach in feet; 0 is melee.
    #[serde(default)]
    pub range: i64,
    /// To-hit bonus as a dice expression or flat number; rolled per attack.
    #[serde(default)]
    pub to_hit: Option<String>,
}

/// Characters, monsters and NPCs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Being {
    /// Stat block with all active modifiers folded in.
    #[serde(default)]
    pub stats: Stats,
    /// Hit points reached zero.
    #[serde(default)]
    pub dead: bool,
    /// Location key the being is at. Characters follow the party.
    #[serde(default)]
    pub location: Option<String>,
    /// Equipped weapon and armor.
    #[serde(default)]
    pub equipped: Equipment,
    /// Spells the being knows.
    #[serde(default)]
    pub spells: BTreeSet<String>,
    /// Remaining spell slots; index 0 holds level-1 slots.
    #[serde(default)]
    pub spell_slots: Vec<u32>,
    /// Natural attacks (monsters).
    #[serde(default)]
    pub attacks: Vec<Attack>,
    /// Monster type or NPC template this being was made from.
    #[serde(default)]
    pub template: Option<String>,
    /// Experience points.
    #[serde(default)]
    pub xp: u64,
    /// Optional illustration.
    #[serde(default)]
    pub image: Option<String>,
    /// Modifier stacks for every tracked stat path.
    #[serde(default)]
    pub mods: BTreeMap<StatPath, ModifierStack>,
    /// Present only during an encounter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter: Option<EncounterRecord>,
}

impl Being {
    /// A living being with the given stats.
    pub fn with_stats(stats: Stats) -> Self {
        Self {
            stats,
            ..Self::default()
        }
    }

    /// Not dead and not held by an incapacitating condition.
    pub fn able_to_act(&self) -> bool {
        !self.dead
            && !INCAPACITATING
                .iter()
                .any(|c| self.stats.has_condition(c))
    }

    /// Why the being cannot act, if it cannot.
    pub fn incapacitated_by(&self) -> Option<&str> {
        if self.dead {
            return Some("dead");
        }
        INCAPACITATING
            .iter()
            .copied()
            .find(|c| self.stats.has_condition(c))
    }

    /// Part of a running encounter, alive, and still on the battlefield.
    pub fn is_fighting(&self) -> bool {
        !self.dead && self.encounter.as_ref().is_some_and(|e| !e.escaped)
    }

    /// Current hit points.
    pub fn health(&self) -> i64 {
        self.stats.basic.cur_health
    }

    /// Recompute the live value of `path` from its stack, dropping the stack once empty.
    pub fn recompute(&mut self, path: &StatPath) -> CoreResult<()> {
        let Some(stack) = self.mods.get(path) else {
            return Ok(());
        };
        let value = stack.fold(path)?;
        if stack.is_empty() {
            self.mods.remove(path);
        }
        self.stats.set(path, value)?;
        self.clamp_health();
        Ok(())
    }

    /// A permanent numeric change. On a tracked path the base moves, so the
    /// change survives later modifier removal.
    pub fn adjust_permanent(&mut self, path: &StatPath, delta: i64) -> CoreResult<()> {
        if let Some(stack) = self.mods.get_mut(path) {
            let base = stack.base.as_int().ok_or_else(|| CoreError::StatTypeMismatch {
                path: path.to_string(),
                detail: "permanent adjustment of a non-numeric stat".to_string(),
            })?;
            stack.base = StatValue::Int(base + delta);
            return self.recompute(path);
        }
        let current = self
            .stats
            .get(path)
            .as_int()
            .ok_or_else(|| CoreError::StatTypeMismatch {
                path: path.to_string(),
                detail: "permanent adjustment of a non-numeric stat".to_string(),
            })?;
        self.stats.set(path, StatValue::Int(current + delta))?;
        self.clamp_health();
        Ok(())
    }

    /// Apply a modifier once and for all. On a tracked path the base absorbs it.
    pub fn apply_permanent(&mut self, path: &StatPath, modifier: &Modifier) -> CoreResult<()> {
        if let Some(stack) = self.mods.get_mut(path) {
            stack.base = modifier.apply(path, stack.base.clone())?;
            return self.recompute(path);
        }
        let value = modifier.apply(path, self.stats.get(path))?;
        self.stats.set(path, value)?;
        self.clamp_health();
        Ok(())
    }

    /// Push a temporary modifier onto the stack for `path`.
    pub fn push_modifier(&mut self, path: &StatPath, modifier: Modifier) -> CoreResult<()> {
        let base = self.stats.get(path);
        self.mods
            .entry(path.clone())
            .or_insert_with(|| ModifierStack::new(base))
            .entries
            .push(modifier);
        self.recompute(path)
    }

    /// Pop every modifier tagged with `effect_uid` and recompute what they touched.
    pub fn remove_effect(&mut self, effect_uid: u64) -> CoreResult<()> {
        let touched: Vec<StatPath> = self
            .mods
            .iter_mut()
            .filter_map(|(path, stack)| {
                (stack.remove_effect(effect_uid) > 0).then(|| path.clone())
            })
            .collect();
        for path in touched {
            self.recompute(&path)?;
        }
        Ok(())
    }

    /// Mark the being dead if its health reached zero. Returns true if it just died.
    pub fn settle_death(&mut self) -> bool {
        if !self.dead && self.health() <= 0 {
            self.dead = true;
            return true;
        }
        false
    }

    /// Apply damage, flooring health at 0. Returns true if this killed the being.
    pub fn take_damage(&mut self, amount: i64) -> CoreResult<bool> {
        if self.dead {
            return Ok(false);
        }
        let lost = amount.max(0).min(self.health());
        self.adjust_permanent(&StatPath::CUR_HEALTH, -lost)?;
        if self.health() <= 0 {
            self.dead = true;
            return Ok(true);
        }
        Ok(false)
    }

    /// Restore hit points up to the maximum. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i64) -> CoreResult<i64> {
        if self.dead {
            return Ok(0);
        }
        let room = (self.stats.basic.max_health - self.health()).max(0);
        let healed = amount.max(0).min(room);
        self.adjust_permanent(&StatPath::CUR_HEALTH, healed)?;
        Ok(healed)
    }

    fn clamp_health(&mut self) {
        let basic = &mut self.stats.basic;
        basic.cur_health = basic.cur_health.clamp(0, basic.max_health.max(0));
    }
}

/// Mutable state of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    /// Key into the rules' equipment table; defaults to the display name.
    #[serde(default)]
    pub def: Option<String>,
    /// Stack size for stackable resources (arrows, coins). `None` means a single item.
    #[serde(default)]
    pub qty: Option<u32>,
    /// Named state such as "lit".
    #[serde(default)]
    pub cur_state: Option<String>,
    /// Never merged into another stack.
    #[serde(default)]
    pub unique: bool,
}

impl ItemState {
    /// A stackable item with the given quantity.
    pub fn stack(qty: u32) -> Self {
        Self {
            qty: Some(qty),
            ..Self::default()
        }
    }

    /// True if quantities of this item can be split and merged.
    pub fn is_stackable(&self) -> bool {
        self.qty.is_some() && !self.unique
    }

    /// How many units this entry represents.
    pub fn count(&self) -> u32 {
        self.qty.unwrap_or(1)
    }
}

/// Mutable per-game state of a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationState {
    /// Key of the static location definition.
    pub location: String,
    /// The party has been here before.
    #[serde(default)]
    pub visited: bool,
    /// Active script state, if any.
    #[serde(default)]
    pub script_state: Option<String>,
    /// Game minute the party last entered.
    #[serde(default)]
    pub entered_at: u64,
    /// Game minute the current script state began.
    #[serde(default)]
    pub script_entered_at: u64,
    /// Exits added at runtime, by exit name, pointing at a location key.
    #[serde(default)]
    pub added_exits: BTreeMap<String, String>,
    /// Hidden exits and items that have been revealed.
    #[serde(default)]
    pub revealed: BTreeSet<String>,
    /// Completed tasks.
    #[serde(default)]
    pub completed_tasks: BTreeSet<String>,
    /// The standing encounter has already been spawned.
    #[serde(default)]
    pub encounter_spawned: bool,
}

impl LocationState {
    /// Fresh state for a location key.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }
}

/// The typed payload of a world object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectBody {
    /// A player character.
    Character(Being),
    /// A hostile combatant.
    Monster(Being),
    /// A non-player character.
    Npc(Being),
    /// An item.
    Item(ItemState),
    /// Per-game location state.
    LocationState(LocationState),
}

/// Anything with identity in the world graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    /// Globally unique handle; assigned by the registry.
    #[serde(default)]
    pub unique_name: ObjectId,
    /// Display name, not unique.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Handles of owned items, in insertion order.
    #[serde(default)]
    pub items: Vec<ObjectId>,
    /// Kind-specific data.
    pub body: ObjectBody,
}

impl WorldObject {
    /// A new, unregistered object.
    pub fn new(name: impl Into<String>, body: ObjectBody) -> Self {
        Self {
            unique_name: ObjectId::default(),
            name: name.into(),
            description: String::new(),
            items: Vec::new(),
            body,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The object's kind.
    pub fn kind(&self) -> ObjectKind {
        match self.body {
            ObjectBody::Character(_) => ObjectKind::Character,
            ObjectBody::Monster(_) => ObjectKind::Monster,
            ObjectBody::Npc(_) => ObjectKind::Npc,
            ObjectBody::Item(_) => ObjectKind::Item,
            ObjectBody::LocationState(_) => ObjectKind::LocationState,
        }
    }

    /// The being payload of a character, monster or NPC.
    pub fn being(&self) -> Option<&Being> {
        match &self.body {
            ObjectBody::Character(b) | ObjectBody::Monster(b) | ObjectBody::Npc(b) => Some(b),
            _ => None,
        }
    }

    /// Mutable being payload.
    pub fn being_mut(&mut self) -> Option<&mut Being> {
        match &mut self.body {
            ObjectBody::Character(b) | ObjectBody::Monster(b) | ObjectBody::Npc(b) => Some(b),
            _ => None,
        }
    }

    /// The item payload.
    pub fn item(&self) -> Option<&ItemState> {
        match &self.body {
            ObjectBody::Item(i) => Some(i),
            _ => None,
        }
    }

    /// Mutable item payload.
    pub fn item_mut(&mut self) -> Option<&mut ItemState> {
        match &mut self.body {
            ObjectBody::Item(i) => Some(i),
            _ => None,
        }
    }

    /// The location-state payload.
    pub fn location_state(&self) -> Option<&LocationState> {
        match &self.body {
            ObjectBody::LocationState(l) => Some(l),
            _ => None,
        }
    }

    /// Mutable location-state payload.
    pub fn location_state_mut(&mut self) -> Option<&mut LocationState> {
        match &mut self.body {
            ObjectBody::LocationState(l) => Some(l),
            _ => None,
        }
    }

    /// Key into the equipment table for items: the explicit def or the display name.
    pub fn item_def_key(&self) -> Option<&str> {
        self.item()
            .map(|i| i.def.as_deref().unwrap_or(self.name.as_str()))
    }

    /// True if `name` matches this object's unique or display name.
    pub fn answers_to(&self, name: &str) -> bool {
        self.unique_name.as_str() == name || self.name.eq_ignore_ascii_case(name)
    }
}
