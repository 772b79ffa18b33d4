//! Stat blocks and the dotted stat paths scenario data uses to address them.
//!
//! Scenario files name stats as strings (`"basic.cur_health"`,
//! `"attributes.strength"`); those are parsed once into [`StatPath`] and
//! every read or write goes through [`Stats::get`] / [`Stats::set`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Score an attribute has when a stat block does not mention it.
pub const DEFAULT_ATTRIBUTE: i64 = 10;

/// A stat leaf value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    /// A numeric stat.
    Int(i64),
    /// A flag such as `darkvision`.
    Bool(bool),
    /// An accumulating list such as resistances or conditions.
    List(Vec<String>),
    /// A free-text stat.
    Text(String),
}

impl StatValue {
    /// The integer value, if this is a numeric stat.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Truthiness: booleans as-is, non-zero numbers, non-empty lists and text.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Int(n) => *n != 0,
            Self::Bool(b) => *b,
            Self::List(items) => !items.is_empty(),
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// Short name of the value type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Bool(_) => "boolean",
            Self::List(_) => "list",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// The fixed numeric stats every being has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BasicStat {
    /// Maximum hit points.
    MaxHealth,
    /// Current hit points.
    CurHealth,
    /// Number an attack roll must reach to hit.
    Defense,
    /// Movement per round in feet.
    Speed,
    /// Character level.
    Level,
}

impl BasicStat {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "max_health" | "max_hp" => Some(Self::MaxHealth),
            "cur_health" | "health" | "hp" => Some(Self::CurHealth),
            "defense" | "armor_class" | "ac" => Some(Self::Defense),
            "speed" => Some(Self::Speed),
            "level" => Some(Self::Level),
            _ => None,
        }
    }

    /// The canonical key used in stat paths.
    pub fn key(self) -> &'static str {
        match self {
            Self::MaxHealth => "max_health",
            Self::CurHealth => "cur_health",
            Self::Defense => "defense",
            Self::Speed => "speed",
            Self::Level => "level",
        }
    }
}

/// Typed address of one stat leaf.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatPath {
    /// `basic.<stat>`
    Basic(BasicStat),
    /// `attributes.<name>`
    Attribute(String),
    /// `skills.<name>`
    Skill(String),
    /// `abilities.<name>`
    Ability(String),
    /// `conditions`
    Conditions,
}

impl StatPath {
    /// Shorthand for `basic.cur_health`.
    pub const CUR_HEALTH: StatPath = StatPath::Basic(BasicStat::CurHealth);
}

impl FromStr for StatPath {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let trimmed = s.trim();
        let path = trimmed.strip_prefix("stats.").unwrap_or(trimmed);
        let unknown = || CoreError::UnknownStatPath(s.to_string());

        if path == "conditions" {
            return Ok(Self::Conditions);
        }
        let (group, leaf) = path.split_once('.').ok_or_else(unknown)?;
        if leaf.is_empty() || leaf.contains('.') {
            return Err(unknown());
        }
        let leaf = leaf.to_lowercase();
        match group {
            "basic" => BasicStat::parse(&leaf).map(Self::Basic).ok_or_else(unknown),
            "attributes" => Ok(Self::Attribute(leaf)),
            "skills" => Ok(Self::Skill(leaf)),
            "abilities" => Ok(Self::Ability(leaf)),
            _ => Err(unknown()),
        }
    }
}

impl TryFrom<String> for StatPath {
    type Error = CoreError;

    fn try_from(s: String) -> CoreResult<Self> {
        s.parse()
    }
}

impl From<StatPath> for String {
    fn from(path: StatPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for StatPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(stat) => write!(f, "basic.{}", stat.key()),
            Self::Attribute(name) => write!(f, "attributes.{name}"),
            Self::Skill(name) => write!(f, "skills.{name}"),
            Self::Ability(name) => write!(f, "abilities.{name}"),
            Self::Conditions => write!(f, "conditions"),
        }
    }
}

/// Hit points, defense and the other fixed numeric stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicStats {
    /// Maximum hit points.
    pub max_health: i64,
    /// Current hit points, kept within `[0, max_health]`.
    pub cur_health: i64,
    /// Defense an attack roll must meet.
    pub defense: i64,
    /// Feet per round.
    pub speed: i64,
    /// Level.
    pub level: i64,
}

impl Default for BasicStats {
    fn default() -> Self {
        Self {
            max_health: 10,
            cur_health: 10,
            defense: 10,
            speed: 30,
            level: 1,
        }
    }
}

impl BasicStats {
    fn get(&self, stat: BasicStat) -> i64 {
        match stat {
            BasicStat::MaxHealth => self.max_health,
            BasicStat::CurHealth => self.cur_health,
            BasicStat::Defense => self.defense,
            BasicStat::Speed => self.speed,
            BasicStat::Level => self.level,
        }
    }

    fn slot(&mut self, stat: BasicStat) -> &mut i64 {
        match stat {
            BasicStat::MaxHealth => &mut self.max_health,
            BasicStat::CurHealth => &mut self.cur_health,
            BasicStat::Defense => &mut self.defense,
            BasicStat::Speed => &mut self.speed,
            BasicStat::Level => &mut self.level,
        }
    }
}

/// A full stat block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Fixed numeric stats.
    pub basic: BasicStats,
    /// Ability scores (strength, dexterity, ...). Missing scores count as 10.
    pub attributes: BTreeMap<String, i64>,
    /// Skill bonuses added on top of the governing attribute modifier.
    pub skills: BTreeMap<String, i64>,
    /// Special abilities: flags, lists, or text.
    pub abilities: BTreeMap<String, StatValue>,
    /// Active conditions (paralyzed, asleep, ...).
    pub conditions: Vec<String>,
}

impl Stats {
    /// Read a stat leaf.
    pub fn get(&self, path: &StatPath) -> StatValue {
        match path {
            StatPath::Basic(stat) => StatValue::Int(self.basic.get(*stat)),
            StatPath::Attribute(name) => StatValue::Int(self.attribute(name)),
            StatPath::Skill(name) => StatValue::Int(self.skill(name)),
            StatPath::Ability(name) => self
                .abilities
                .get(name)
                .cloned()
                .unwrap_or(StatValue::Bool(false)),
            StatPath::Conditions => StatValue::List(self.conditions.clone()),
        }
    }

    /// Write a stat leaf. Numeric paths only accept integers.
    pub fn set(&mut self, path: &StatPath, value: StatValue) -> CoreResult<()> {
        let mismatch = |expected: &str, value: &StatValue| CoreError::StatTypeMismatch {
            path: path.to_string(),
            detail: format!("expected {expected}, got {}", value.type_name()),
        };
        match path {
            StatPath::Basic(stat) => {
                let n = value.as_int().ok_or_else(|| mismatch("integer", &value))?;
                *self.basic.slot(*stat) = n;
            }
            StatPath::Attribute(name) => {
                let n = value.as_int().ok_or_else(|| mismatch("integer", &value))?;
                self.attributes.insert(name.clone(), n);
            }
            StatPath::Skill(name) => {
                let n = value.as_int().ok_or_else(|| mismatch("integer", &value))?;
                self.skills.insert(name.clone(), n);
            }
            StatPath::Ability(name) => {
                self.abilities.insert(name.clone(), value);
            }
            StatPath::Conditions => match value {
                StatValue::List(items) => self.conditions = items,
                other => return Err(mismatch("list", &other)),
            },
        }
        Ok(())
    }

    /// An attribute score, defaulting to 10.
    pub fn attribute(&self, name: &str) -> i64 {
        self.attributes
            .get(&name.to_lowercase())
            .copied()
            .unwrap_or(DEFAULT_ATTRIBUTE)
    }

    /// The d20 modifier for an attribute: `(score - 10) / 2`, rounded down.
    pub fn modifier(&self, attribute: &str) -> i64 {
        (self.attribute(attribute) - 10).div_euclid(2)
    }

    /// A skill bonus, defaulting to 0 (untrained).
    pub fn skill(&self, name: &str) -> i64 {
        self.skills.get(&name.to_lowercase()).copied().unwrap_or(0)
    }

    /// True if the ability is present and truthy.
    pub fn has_ability(&self, name: &str) -> bool {
        self.abilities
            .get(&name.to_lowercase())
            .is_some_and(StatValue::truthy)
    }

    /// True if the condition is active.
    pub fn has_condition(&self, condition: &str) -> bool {
        self.conditions
            .iter()
            .any(|c| c.eq_ignore_ascii_case(condition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_paths_with_and_without_prefix() {
        assert_eq!(
            "stats.basic.cur_health".parse::<StatPath>().unwrap(),
            StatPath::CUR_HEALTH
        );
        assert_eq!(
            "attributes.Strength".parse::<StatPath>().unwrap(),
            StatPath::Attribute("strength".to_string())
        );
        assert_eq!(
            "conditions".parse::<StatPath>().unwrap(),
            StatPath::Conditions
        );
        assert_eq!(
            "basic.ac".parse::<StatPath>().unwrap(),
            StatPath::Basic(BasicStat::Defense)
        );
    }

    #[test]
    fn reject_unknown_paths() {
        assert!("basic.mana".parse::<StatPath>().is_err());
        assert!("inventory.gold".parse::<StatPath>().is_err());
        assert!("attributes".parse::<StatPath>().is_err());
        assert!("attributes.a.b".parse::<StatPath>().is_err());
    }

    #[test]
    fn path_display_round_trips() {
        for raw in [
            "basic.max_health",
            "attributes.dexterity",
            "skills.stealth",
            "abilities.darkvision",
            "conditions",
        ] {
            let path: StatPath = raw.parse().unwrap();
            assert_eq!(path.to_string(), raw);
        }
    }

    #[test]
    fn defaults_for_missing_leaves() {
        let stats = Stats::default();
        assert_eq!(stats.attribute("strength"), 10);
        assert_eq!(stats.modifier("strength"), 0);
        assert_eq!(stats.skill("stealth"), 0);
        assert!(!stats.has_ability("darkvision"));
    }

    #[test]
    fn modifier_rounds_down() {
        let mut stats = Stats::default();
        stats.attributes.insert("strength".to_string(), 7);
        assert_eq!(stats.modifier("strength"), -2);
        stats.attributes.insert("strength".to_string(), 15);
        assert_eq!(stats.modifier("strength"), 2);
    }

    #[test]
    fn set_rejects_wrong_types() {
        let mut stats = Stats::default();
        let err = stats
            .set(&StatPath::CUR_HEALTH, StatValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, CoreError::StatTypeMismatch { .. }));
        assert!(
            stats
                .set(&StatPath::Conditions, StatValue::Int(3))
                .is_err()
        );
    }

    #[test]
    fn stat_path_works_as_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(StatPath::Ability("flying".to_string()), 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"abilities.flying":1}"#);
        let back: BTreeMap<StatPath, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
