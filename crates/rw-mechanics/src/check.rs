//! d20 checks against a difficulty class.

use rand::rngs::StdRng;
use rw_core::Stats;

use crate::dice::{Advantage, roll_d20};
use crate::rules::Rules;

/// Ability used when a skill is not in the rules table.
pub const FALLBACK_ABILITY: &str = "wisdom";

/// The result of a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// The kept d20.
    pub roll: u32,
    /// Everything added to it.
    pub bonus: i64,
    /// `roll + bonus`.
    pub total: i64,
    /// Difficulty class.
    pub dc: i64,
    /// `total >= dc`.
    pub success: bool,
}

impl std::fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.success { "success" } else { "failure" };
        write!(
            f,
            "{} {:+} = {} vs DC {}: {verdict}",
            self.roll, self.bonus, self.total, self.dc
        )
    }
}

/// Roll `d20 + bonus` against `dc`.
pub fn check(bonus: i64, dc: i64, advantage: Advantage, rng: &mut StdRng) -> CheckOutcome {
    let (roll, _) = roll_d20(rng, advantage);
    let total = i64::from(roll) + bonus;
    CheckOutcome {
        roll,
        bonus,
        total,
        dc,
        success: total >= dc,
    }
}

/// An attribute check: `d20 + modifier(attribute)`.
pub fn attribute_check(
    stats: &Stats,
    attribute: &str,
    dc: i64,
    advantage: Advantage,
    rng: &mut StdRng,
) -> CheckOutcome {
    check(stats.modifier(attribute), dc, advantage, rng)
}

/// A skill check: `d20 + modifier(governing attribute) + skill bonus`.
pub fn skill_check(
    stats: &Stats,
    rules: &Rules,
    skill: &str,
    dc: i64,
    advantage: Advantage,
    rng: &mut StdRng,
) -> CheckOutcome {
    let ability = rules.skill_ability(skill).unwrap_or(FALLBACK_ABILITY);
    let bonus = stats.modifier(ability) + stats.skill(skill);
    check(bonus, dc, advantage, rng)
}
