//! Static effect definitions as they appear in rules data.

use rand::rngs::StdRng;
use rw_core::{ModMode, ModValue, Modifier, StatPath};
use serde::{Deserialize, Serialize};

use crate::dice::DiceExpr;
use crate::error::{MechError, MechResult};

/// One stat change an effect makes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierDef {
    /// Stat addressed, e.g. `attributes.strength`.
    pub path: StatPath,
    /// How the value combines.
    pub mode: ModMode,
    /// Operand; text under `add`/`sub`/`mul` is a dice expression.
    pub value: ModValue,
}

impl ModifierDef {
    /// Roll any dice in the operand and tag the result with an effect uid.
    pub fn resolve(&self, effect_uid: u64, rng: &mut StdRng) -> MechResult<Modifier> {
        let value = match (&self.value, self.mode) {
            (ModValue::Text(expr), ModMode::Add | ModMode::Sub | ModMode::Mul) => {
                let dice: DiceExpr = expr.parse()?;
                ModValue::Int(dice.roll(rng).total())
            }
            (value, _) => value.clone(),
        };
        Ok(Modifier {
            effect_uid,
            mode: self.mode,
            value,
        })
    }
}

/// What an effect does and how long it lasts.
///
/// With neither `duration` nor `turns` the effect is permanent: it mutates
/// its targets once and leaves no record behind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectDef {
    /// Text reported when the effect is applied.
    pub description: String,
    /// Stat changes.
    pub modifiers: Vec<ModifierDef>,
    /// Healing rolled once on application.
    pub heal: Option<DiceExpr>,
    /// Damage rolled once on application.
    pub damage: Option<DiceExpr>,
    /// Lifetime in game minutes.
    pub duration: Option<u64>,
    /// Lifetime in actions.
    pub turns: Option<u32>,
    /// Ends when a check succeeds. Rejected by validation.
    pub check: Option<String>,
    /// New state for the source item ("lit").
    pub sets_state: Option<String>,
}

impl EffectDef {
    /// True if the effect leaves a record that expires later.
    pub fn is_temporary(&self) -> bool {
        self.duration.is_some() || self.turns.is_some()
    }

    /// True if applying the effect touches its targets at all.
    pub fn affects_targets(&self) -> bool {
        !self.modifiers.is_empty() || self.heal.is_some() || self.damage.is_some()
    }

    /// Fail early on definitions the engine cannot honor.
    pub fn validate(&self, name: &str) -> MechResult<()> {
        if self.check.is_some() {
            return Err(MechError::CheckTermination(name.to_string()));
        }
        if self.duration == Some(0) || self.turns == Some(0) {
            return Err(MechError::InvalidEffect {
                name: name.to_string(),
                detail: "a lifetime of zero never takes effect".to_string(),
            });
        }
        for m in &self.modifiers {
            if let (ModValue::Text(expr), ModMode::Add | ModMode::Sub | ModMode::Mul) =
                (&m.value, m.mode)
            {
                expr.parse::<DiceExpr>()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn text_operands_roll_as_dice() {
        let def = ModifierDef {
            path: StatPath::CUR_HEALTH,
            mode: ModMode::Add,
            value: ModValue::Text("2d4".to_string()),
        };
        let mut rng = StdRng::seed_from_u64(1);
        let m = def.resolve(3, &mut rng).unwrap();
        assert_eq!(m.effect_uid, 3);
        let ModValue::Int(n) = m.value else {
            panic!("expected an integer, got {:?}", m.value);
        };
        assert!((2..=8).contains(&n));
    }

    #[test]
    fn set_keeps_text() {
        let def = ModifierDef {
            path: StatPath::Ability("aura".to_string()),
            mode: ModMode::Set,
            value: ModValue::Text("glowing".to_string()),
        };
        let mut rng = StdRng::seed_from_u64(1);
        let m = def.resolve(1, &mut rng).unwrap();
        assert_eq!(m.value, ModValue::Text("glowing".to_string()));
    }

    #[test]
    fn parse_from_rules_json() {
        let json = r#"{
            "description": "You feel stronger.",
            "modifiers": [{"path": "attributes.strength", "mode": "add", "value": 2}],
            "duration": 60
        }"#;
        let def: EffectDef = serde_json::from_str(json).unwrap();
        assert!(def.is_temporary());
        assert_eq!(def.modifiers[0].path, StatPath::Attribute("strength".to_string()));
        def.validate("bull's strength").unwrap();
    }

    #[test]
    fn unknown_modes_and_paths_fail_to_load() {
        let bad_mode = r#"{"modifiers": [{"path": "basic.speed", "mode": "div", "value": 2}]}"#;
        assert!(serde_json::from_str::<EffectDef>(bad_mode).is_err());
        let bad_path = r#"{"modifiers": [{"path": "basic.mana", "mode": "add", "value": 2}]}"#;
        assert!(serde_json::from_str::<EffectDef>(bad_path).is_err());
    }

    #[test]
    fn check_termination_is_rejected() {
        let def = EffectDef {
            check: Some("constitution 12".to_string()),
            turns: Some(3),
            ..EffectDef::default()
        };
        assert!(matches!(
            def.validate("poison"),
            Err(MechError::CheckTermination(_))
        ));
    }
}
