//! Game mechanics for Regelwerk.
//!
//! Provides dice expressions and d20 checks, the rules tables scenario data
//! is written against, the effects engine that applies and expires stat
//! modifiers, and the encounter turn engine. Every random roll takes an
//! explicit `StdRng`.

pub mod check;
pub mod dice;
pub mod effects;
pub mod encounter;
pub mod error;
pub mod rules;
pub mod validate;

pub use check::{CheckOutcome, attribute_check, skill_check};
pub use dice::{Advantage, DiceExpr, Die, RollResult};
pub use effects::{Application, Effect, EffectDef, EffectLedger, EffectReport, ModifierDef};
pub use encounter::{
    CombatContext, Encounter, EncounterEnd, Gate, LocationSize, Move, MoveOutcome, Side,
    TurnState, plan_monster_move,
};
pub use error::{MechError, MechResult};
pub use rules::{ItemDef, ItemKind, MonsterDef, Rules, SkillDef, SpellDef};
pub use validate::{ValidationIssue, validate_rules};
