//! Rules data: spells, equipment, monster types, and skills.
//!
//! A [`Rules`] table is read-only scenario data loaded from `rules.json`, or
//! built in code with the functions in [`preset`]. Lookups are by key, first
//! exactly and then ignoring case, since narrators rarely match case.

pub mod preset;

use std::collections::BTreeMap;

use rw_core::{Attack, Stats};
use serde::{Deserialize, Serialize};

use crate::dice::DiceExpr;
use crate::effects::EffectDef;

/// Default currency item for stores.
pub const DEFAULT_CURRENCY: &str = "gold";

/// The complete rules table for a scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Name of the rule system.
    pub name: String,
    /// Spells by name.
    pub spells: BTreeMap<String, SpellDef>,
    /// Equipment by key.
    pub equipment: BTreeMap<String, ItemDef>,
    /// Monster types by key.
    pub monsters: BTreeMap<String, MonsterDef>,
    /// Skills by name.
    pub skills: BTreeMap<String, SkillDef>,
    /// Item key used as money in stores.
    pub currency: Option<String>,
}

/// What kind of thing an item is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Anything without combat use.
    #[default]
    Gear,
    /// Can be equipped as a weapon.
    Weapon,
    /// Can be equipped as armor.
    Armor,
    /// Used up by ranged weapons.
    Ammo,
    /// Used up when used.
    Consumable,
}

/// Static definition of an equipment item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDef {
    /// Description shown on inspection.
    pub description: String,
    /// Category.
    pub kind: ItemKind,
    /// Weapon damage.
    pub damage: Option<DiceExpr>,
    /// Attribute used for to-hit; defaults by weapon range.
    pub ability: Option<String>,
    /// Reach in feet; 0 is melee.
    pub range: i64,
    /// Equipment key of the ammunition this weapon consumes.
    pub ammo: Option<String>,
    /// Bonus to defense when worn.
    pub defense: i64,
    /// Price in the store currency.
    pub value: u32,
    /// Effect applied by `use` (or any verb without its own entry).
    pub effect: Option<EffectDef>,
    /// Effects indexed by verb ("light", "read", "drink").
    pub verbs: BTreeMap<String, EffectDef>,
    /// Image shown when the item is described.
    pub image: Option<String>,
}

impl ItemDef {
    /// The effect for `verb`, falling back to the default effect for `use`.
    pub fn effect_for(&self, verb: Option<&str>) -> Option<&EffectDef> {
        match verb {
            Some(v) => lookup(&self.verbs, v).or(if v.eq_ignore_ascii_case("use") {
                self.effect.as_ref()
            } else {
                None
            }),
            None => self.effect.as_ref(),
        }
    }

    /// Attribute the wielder adds to attack rolls.
    pub fn to_hit_ability(&self) -> &str {
        match &self.ability {
            Some(a) => a.as_str(),
            None if self.range > 0 => "dexterity",
            None => "strength",
        }
    }

    /// True for weapons that fire from range.
    pub fn is_ranged(&self) -> bool {
        self.kind == ItemKind::Weapon && self.range > 0
    }
}

/// Static definition of a spell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellDef {
    /// Description.
    pub description: String,
    /// Slot level; 0 is a cantrip and costs no slot.
    pub level: u32,
    /// Range in feet during encounters; 0 means touch.
    pub range: i64,
    /// What the spell does.
    pub effect: EffectDef,
}

/// Static definition of a monster type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterDef {
    /// Description.
    pub description: String,
    /// Starting stat block.
    pub stats: Stats,
    /// Natural attacks.
    pub attacks: Vec<Attack>,
    /// Experience awarded for defeating one.
    pub xp: u64,
    /// Equipment keys the monster carries (dropped as loot).
    pub items: Vec<String>,
    /// Image shown when the monster appears.
    pub image: Option<String>,
}

/// Static definition of a skill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDef {
    /// Attribute the skill adds its modifier from.
    pub ability: String,
}

impl Rules {
    /// Equipment definition by key.
    pub fn item(&self, key: &str) -> Option<&ItemDef> {
        lookup(&self.equipment, key)
    }

    /// Spell definition by name.
    pub fn spell(&self, name: &str) -> Option<&SpellDef> {
        lookup(&self.spells, name)
    }

    /// Monster definition by type key.
    pub fn monster(&self, key: &str) -> Option<&MonsterDef> {
        lookup(&self.monsters, key)
    }

    /// The attribute governing a skill.
    pub fn skill_ability(&self, skill: &str) -> Option<&str> {
        lookup(&self.skills, skill).map(|s| s.ability.as_str())
    }

    /// The currency item key.
    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    /// Every effect defined anywhere in the rules, with a label for reporting.
    pub fn all_effects(&self) -> Vec<(String, &EffectDef)> {
        let mut out = Vec::new();
        for (name, spell) in &self.spells {
            out.push((format!("spell '{name}'"), &spell.effect));
        }
        for (key, item) in &self.equipment {
            if let Some(effect) = &item.effect {
                out.push((format!("item '{key}'"), effect));
            }
            for (verb, effect) in &item.verbs {
                out.push((format!("item '{key}' ({verb})"), effect));
            }
        }
        out
    }
}

/// Exact lookup, then case-insensitive.
fn lookup<'a, V>(map: &'a BTreeMap<String, V>, key: &str) -> Option<&'a V> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
