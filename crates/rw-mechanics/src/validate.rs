//! Validation of rules data.
//!
//! Checks that every effect can be honored, that weapons and monster
//! attacks have usable dice, and that cross-references inside the rules
//! (ammunition, loot, skills) point at something.

use crate::dice::DiceExpr;
use crate::error::MechError;
use crate::rules::{ItemKind, Rules};

/// A warning or error found during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Where the issue was found.
    pub entity: String,
    /// A human-readable description of the issue.
    pub message: String,
    /// Whether this is an error (true) or a warning (false).
    pub is_error: bool,
}

impl ValidationIssue {
    /// An error.
    pub fn error(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            message: message.into(),
            is_error: true,
        }
    }

    /// A warning.
    pub fn warning(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            message: message.into(),
            is_error: false,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = if self.is_error { "error" } else { "warning" };
        write!(f, "{level}: {}: {}", self.entity, self.message)
    }
}

/// Validate a rules table. Returns every issue found.
pub fn validate_rules(rules: &Rules) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (label, effect) in rules.all_effects() {
        match effect.validate(&label) {
            Ok(()) => {}
            Err(MechError::CheckTermination(_)) => issues.push(ValidationIssue::error(
                label,
                "ends on a check; use duration or turns instead",
            )),
            Err(e) => issues.push(ValidationIssue::error(label, e.to_string())),
        }
    }

    for (key, item) in &rules.equipment {
        let entity = format!("item '{key}'");
        if item.kind == ItemKind::Weapon && item.damage.is_none() {
            issues.push(ValidationIssue::warning(
                &entity,
                "weapon without damage hits for 1",
            ));
        }
        if let Some(ammo) = &item.ammo {
            match rules.item(ammo) {
                None => issues.push(ValidationIssue::error(
                    &entity,
                    format!("uses unknown ammunition '{ammo}'"),
                )),
                Some(def) if def.kind != ItemKind::Ammo => issues.push(ValidationIssue::warning(
                    &entity,
                    format!("ammunition '{ammo}' is not marked as ammo"),
                )),
                Some(_) => {}
            }
        }
    }

    for (key, monster) in &rules.monsters {
        let entity = format!("monster '{key}'");
        if monster.stats.basic.max_health <= 0 {
            issues.push(ValidationIssue::error(&entity, "max_health must be positive"));
        }
        if monster.attacks.is_empty() {
            issues.push(ValidationIssue::warning(&entity, "has no attacks"));
        }
        for attack in &monster.attacks {
            let dice = std::iter::once(&attack.damage).chain(attack.to_hit.as_ref());
            for expr in dice {
                if expr.parse::<DiceExpr>().is_err() {
                    issues.push(ValidationIssue::error(
                        &entity,
                        format!("attack '{}' has invalid dice '{expr}'", attack.name),
                    ));
                }
            }
        }
        for loot in &monster.items {
            if rules.item(loot).is_none() {
                issues.push(ValidationIssue::error(
                    &entity,
                    format!("carries unknown item '{loot}'"),
                ));
            }
        }
    }

    for (name, skill) in &rules.skills {
        if skill.ability.trim().is_empty() {
            issues.push(ValidationIssue::error(
                format!("skill '{name}'"),
                "has no governing ability",
            ));
        }
    }

    issues
}
