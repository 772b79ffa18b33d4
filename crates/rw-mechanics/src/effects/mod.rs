//! The effects engine: applying, stacking and expiring stat modifications.
//!
//! Permanent effects mutate their targets once. Temporary effects get a uid
//! from the [`EffectLedger`], push one modifier per target and path onto the
//! target's modifier stacks, and are removed again by uid when their
//! lifetime runs out. Removal always recomputes from the stack.

pub mod def;

pub use def::{EffectDef, ModifierDef};

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rw_core::{ObjectId, Registry, StatPath};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MechResult;

/// When a temporary effect ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// At a game minute.
    Minutes {
        /// Game minute at which the effect expires.
        until: u64,
    },
    /// After a number of actions.
    Turns {
        /// Actions left.
        remaining: u32,
    },
}

/// A state change on the source item, undone when the effect ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// The item whose state changed.
    pub item: ObjectId,
    /// Its state before.
    pub previous: Option<String>,
}

/// An active temporary effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Monotonic per game.
    pub uid: u64,
    /// Spell or item verb that created it.
    pub name: String,
    /// The object the effect came from.
    pub source: Option<ObjectId>,
    /// Stat paths touched on each target.
    pub targets: BTreeMap<ObjectId, Vec<StatPath>>,
    /// When it ends.
    pub termination: Termination,
    /// Item state to restore on removal.
    #[serde(default)]
    pub state_change: Option<StateChange>,
    /// Set by the first end-of-action pass after application; the action
    /// that applied the effect does not count against its lifetime.
    #[serde(default)]
    pub armed: bool,
}

/// What to apply, to whom.
#[derive(Debug, Clone, Copy)]
pub struct Application<'a> {
    /// Name used in text and on the effect record.
    pub name: &'a str,
    /// The definition.
    pub def: &'a EffectDef,
    /// The item, spellcaster or other origin.
    pub source: Option<&'a ObjectId>,
    /// Beings affected.
    pub targets: &'a [ObjectId],
}

/// The result of applying an effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectReport {
    /// Narration.
    pub text: String,
    /// Nothing could be affected.
    pub failed: bool,
    /// Uid of the effect record, for temporary effects.
    pub uid: Option<u64>,
    /// Targets killed by the effect.
    pub deaths: Vec<ObjectId>,
}

/// Every active temporary effect in one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectLedger {
    next_uid: u64,
    active: Vec<Effect>,
}

impl EffectLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Active effects in application order.
    pub fn active(&self) -> &[Effect] {
        &self.active
    }

    /// Effects currently touching `target`.
    pub fn effects_on<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a Effect> + 'a {
        self.active
            .iter()
            .filter(move |e| e.targets.contains_key(target))
    }

    /// True if an active effect names `id` as source, target or changed item.
    pub fn references(&self, id: &ObjectId) -> bool {
        self.active.iter().any(|e| {
            e.source.as_ref() == Some(id)
                || e.targets.contains_key(id)
                || e.state_change.as_ref().is_some_and(|c| &c.item == id)
        })
    }

    /// Apply an effect at game minute `now`.
    pub fn apply(
        &mut self,
        registry: &mut Registry,
        app: Application<'_>,
        now: u64,
        rng: &mut StdRng,
    ) -> MechResult<EffectReport> {
        let def = app.def;
        def.validate(app.name)?;

        let mut report = EffectReport::default();
        let mut lines = Vec::new();
        if !def.description.is_empty() {
            lines.push(def.description.clone());
        }

        if def.affects_targets() && app.targets.is_empty() {
            report.failed = true;
            report.text = format!("There is nothing for {} to affect.", app.name);
            return Ok(report);
        }

        let uid = def.is_temporary().then(|| {
            self.next_uid += 1;
            self.next_uid
        });

        let mut touched: BTreeMap<ObjectId, Vec<StatPath>> = BTreeMap::new();
        let mut affected = 0usize;
        for target in app.targets {
            if !def.affects_targets() {
                break;
            }
            let being = registry.being_mut(target)?;
            if being.dead {
                lines.push(format!("{target} is beyond help."));
                continue;
            }
            affected += 1;

            for m in &def.modifiers {
                let modifier = m.resolve(uid.unwrap_or(0), rng)?;
                match uid {
                    Some(_) => {
                        being.push_modifier(&m.path, modifier)?;
                        touched.entry(target.clone()).or_default().push(m.path.clone());
                    }
                    None => being.apply_permanent(&m.path, &modifier)?,
                }
            }
            if let Some(heal) = def.heal {
                let healed = being.heal(heal.roll(rng).amount())?;
                lines.push(format!("{target} recovers {healed} hit points."));
            }
            if let Some(damage) = def.damage {
                let amount = damage.roll(rng).amount();
                being.take_damage(amount)?;
                lines.push(format!("{target} takes {amount} damage."));
            }
            being.settle_death();
            if being.dead {
                lines.push(format!("{target} dies."));
                report.deaths.push(target.clone());
            }
        }

        if def.affects_targets() && affected == 0 {
            report.failed = true;
            report.text = lines.join(" ");
            return Ok(report);
        }

        let mut state_change = None;
        if let (Some(state), Some(source)) = (&def.sets_state, app.source) {
            if let Some(item) = registry.get_mut(source)?.item_mut() {
                let previous = item.cur_state.replace(state.clone());
                state_change = Some(StateChange {
                    item: source.clone(),
                    previous,
                });
                lines.push(format!("{source} is now {state}."));
            }
        }

        if let Some(uid) = uid {
            let termination = match (def.duration, def.turns) {
                (Some(minutes), _) => Termination::Minutes {
                    until: now + minutes,
                },
                (None, Some(turns)) => Termination::Turns { remaining: turns },
                (None, None) => Termination::Turns { remaining: 1 },
            };
            debug!(uid, effect = app.name, "effect started");
            self.active.push(Effect {
                uid,
                name: app.name.to_string(),
                source: app.source.cloned(),
                targets: touched,
                termination,
                state_change,
                armed: false,
            });
            report.uid = Some(uid);
        }

        report.text = lines.join(" ");
        Ok(report)
    }

    /// Remove an effect by uid, popping exactly its modifiers. Returns it if it was active.
    pub fn remove(&mut self, registry: &mut Registry, uid: u64) -> MechResult<Option<Effect>> {
        let Some(pos) = self.active.iter().position(|e| e.uid == uid) else {
            return Ok(None);
        };
        let effect = self.active.remove(pos);
        for target in effect.targets.keys() {
            // Targets may have been removed from the world since.
            if let Some(being) = registry.resolve_mut(target.as_str()).and_then(|o| o.being_mut()) {
                being.remove_effect(uid)?;
            }
        }
        if let Some(change) = &effect.state_change {
            if let Some(item) = registry
                .resolve_mut(change.item.as_str())
                .and_then(|o| o.item_mut())
            {
                item.cur_state = change.previous.clone();
            }
        }
        debug!(uid, effect = %effect.name, "effect removed");
        Ok(Some(effect))
    }

    /// Run the end-of-action pass: expire effects whose lifetime is over.
    ///
    /// Returns a line of narration per expired effect.
    pub fn advance_one_action(
        &mut self,
        registry: &mut Registry,
        now: u64,
    ) -> MechResult<Vec<String>> {
        let mut expired = Vec::new();
        for effect in &mut self.active {
            if !effect.armed {
                effect.armed = true;
                continue;
            }
            let done = match &mut effect.termination {
                Termination::Turns { remaining } => {
                    *remaining = remaining.saturating_sub(1);
                    *remaining == 0
                }
                Termination::Minutes { until } => now >= *until,
            };
            if done {
                expired.push(effect.uid);
            }
        }

        let mut lines = Vec::new();
        for uid in expired {
            if let Some(effect) = self.remove(registry, uid)? {
                lines.push(wear_off_text(&effect));
            }
        }
        Ok(lines)
    }
}

fn wear_off_text(effect: &Effect) -> String {
    let targets: Vec<&str> = effect.targets.keys().map(ObjectId::as_str).collect();
    match (targets.is_empty(), &effect.state_change) {
        (false, _) => format!(
            "The {} on {} wears off.",
            effect.name,
            targets.join(", ")
        ),
        (true, Some(change)) => format!("The {} of {} ends.", effect.name, change.item),
        (true, None) => format!("The {} ends.", effect.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DiceExpr;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rw_core::{
        BasicStat, Being, ItemState, ModMode, ModValue, ObjectBody, Owner, Stats, WorldObject,
    };

    fn world() -> (Registry, ObjectId) {
        let mut reg = Registry::new();
        let mut stats = Stats::default();
        stats.basic.max_health = 20;
        stats.basic.cur_health = 20;
        stats.attributes.insert("strength".to_string(), 12);
        let alice = reg
            .register(
                WorldObject::new("Alice", ObjectBody::Character(Being::with_stats(stats))),
                Owner::Root,
            )
            .unwrap();
        (reg, alice)
    }

    fn strength(reg: &Registry, id: &ObjectId) -> i64 {
        reg.being(id).unwrap().stats.attribute("strength")
    }

    fn modifier(path: &str, mode: ModMode, value: ModValue) -> ModifierDef {
        ModifierDef {
            path: path.parse().unwrap(),
            mode,
            value,
        }
    }

    fn apply(
        ledger: &mut EffectLedger,
        reg: &mut Registry,
        def: &EffectDef,
        targets: &[ObjectId],
        now: u64,
    ) -> EffectReport {
        let mut rng = StdRng::seed_from_u64(0);
        ledger
            .apply(
                reg,
                Application {
                    name: "test",
                    def,
                    source: None,
                    targets,
                },
                now,
                &mut rng,
            )
            .unwrap()
    }

    #[test]
    fn permanent_effect_leaves_no_record() {
        let (mut reg, alice) = world();
        let mut ledger = EffectLedger::new();
        let def = EffectDef {
            modifiers: vec![modifier(
                "attributes.strength",
                ModMode::Add,
                ModValue::Int(2),
            )],
            ..EffectDef::default()
        };
        let report = apply(&mut ledger, &mut reg, &def, &[alice.clone()], 0);
        assert!(!report.failed);
        assert_eq!(report.uid, None);
        assert!(ledger.active().is_empty());
        assert_eq!(strength(&reg, &alice), 14);
    }

    #[test]
    fn temporary_effect_expires_after_its_turns() {
        let (mut reg, alice) = world();
        let mut ledger = EffectLedger::new();
        let def = EffectDef {
            modifiers: vec![modifier(
                "attributes.strength",
                ModMode::Set,
                ModValue::Int(19),
            )],
            turns: Some(2),
            ..EffectDef::default()
        };
        let report = apply(&mut ledger, &mut reg, &def, &[alice.clone()], 0);
        assert_eq!(report.uid, Some(1));
        assert_eq!(strength(&reg, &alice), 19);
        assert!(ledger.references(&alice));

        // The applying action arms it; two more actions use it up.
        assert!(ledger.advance_one_action(&mut reg, 10).unwrap().is_empty());
        assert!(ledger.advance_one_action(&mut reg, 20).unwrap().is_empty());
        let lines = ledger.advance_one_action(&mut reg, 30).unwrap();
        assert_eq!(lines, vec!["The test on Alice wears off.".to_string()]);
        assert_eq!(strength(&reg, &alice), 12);
        assert!(reg.being(&alice).unwrap().mods.is_empty());
        assert!(!ledger.references(&alice));
    }

    #[test]
    fn duration_is_measured_in_game_minutes() {
        let (mut reg, alice) = world();
        let mut ledger = EffectLedger::new();
        let def = EffectDef {
            modifiers: vec![modifier(
                "basic.speed",
                ModMode::Mul,
                ModValue::Int(2),
            )],
            duration: Some(30),
            ..EffectDef::default()
        };
        apply(&mut ledger, &mut reg, &def, &[alice.clone()], 100);
        assert_eq!(reg.being(&alice).unwrap().stats.basic.speed, 60);
        ledger.advance_one_action(&mut reg, 110).unwrap();
        ledger.advance_one_action(&mut reg, 120).unwrap();
        assert_eq!(ledger.active().len(), 1);
        ledger.advance_one_action(&mut reg, 130).unwrap();
        assert!(ledger.active().is_empty());
        assert_eq!(reg.being(&alice).unwrap().stats.basic.speed, 30);
    }

    #[test]
    fn removing_one_effect_keeps_the_others() {
        let (mut reg, alice) = world();
        let mut ledger = EffectLedger::new();
        let add = EffectDef {
            modifiers: vec![modifier(
                "attributes.strength",
                ModMode::Add,
                ModValue::Int(4),
            )],
            turns: Some(5),
            ..EffectDef::default()
        };
        let set = EffectDef {
            modifiers: vec![modifier(
                "attributes.strength",
                ModMode::Set,
                ModValue::Int(8),
            )],
            turns: Some(5),
            ..EffectDef::default()
        };
        let first = apply(&mut ledger, &mut reg, &add, &[alice.clone()], 0).uid.unwrap();
        let second = apply(&mut ledger, &mut reg, &set, &[alice.clone()], 0).uid.unwrap();
        assert_eq!(strength(&reg, &alice), 8);

        ledger.remove(&mut reg, second).unwrap();
        assert_eq!(strength(&reg, &alice), 16);
        ledger.remove(&mut reg, first).unwrap();
        assert_eq!(strength(&reg, &alice), 12);
    }

    #[test]
    fn damage_can_kill() {
        let (mut reg, alice) = world();
        let mut ledger = EffectLedger::new();
        let def = EffectDef {
            damage: Some(DiceExpr::flat(50)),
            ..EffectDef::default()
        };
        let report = apply(&mut ledger, &mut reg, &def, &[alice.clone()], 0);
        assert_eq!(report.deaths, vec![alice.clone()]);
        let being = reg.being(&alice).unwrap();
        assert!(being.dead);
        assert_eq!(being.health(), 0);

        // A second application finds nobody to affect.
        let report = apply(&mut ledger, &mut reg, &def, &[alice.clone()], 0);
        assert!(report.failed);
    }

    #[test]
    fn heal_clamps_to_max_health() {
        let (mut reg, alice) = world();
        reg.being_mut(&alice).unwrap().take_damage(3).unwrap();
        let mut ledger = EffectLedger::new();
        let def = EffectDef {
            heal: Some(DiceExpr::flat(10)),
            ..EffectDef::default()
        };
        let report = apply(&mut ledger, &mut reg, &def, &[alice.clone()], 0);
        assert_eq!(report.text, "Alice recovers 3 hit points.");
        assert_eq!(reg.being(&alice).unwrap().health(), 20);
    }

    #[test]
    fn state_change_reverts_on_expiry() {
        let (mut reg, alice) = world();
        let torch = reg
            .register(
                WorldObject::new("Torch", ObjectBody::Item(ItemState::default())),
                Owner::Object(alice),
            )
            .unwrap();
        let mut ledger = EffectLedger::new();
        let def = EffectDef {
            sets_state: Some("lit".to_string()),
            turns: Some(1),
            ..EffectDef::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        ledger
            .apply(
                &mut reg,
                Application {
                    name: "light",
                    def: &def,
                    source: Some(&torch),
                    targets: &[],
                },
                0,
                &mut rng,
            )
            .unwrap();
        let state = |reg: &Registry| reg.get(&torch).unwrap().item().unwrap().cur_state.clone();
        assert_eq!(state(&reg), Some("lit".to_string()));
        ledger.advance_one_action(&mut reg, 10).unwrap();
        let lines = ledger.advance_one_action(&mut reg, 20).unwrap();
        assert_eq!(lines, vec!["The light of Torch ends.".to_string()]);
        assert_eq!(state(&reg), None);
    }

    #[test]
    fn removal_skips_targets_that_left_the_world() {
        let (mut reg, alice) = world();
        let mut ledger = EffectLedger::new();
        let def = EffectDef {
            modifiers: vec![modifier("conditions", ModMode::Or, ModValue::Text("blessed".into()))],
            turns: Some(3),
            ..EffectDef::default()
        };
        let uid = apply(&mut ledger, &mut reg, &def, &[alice.clone()], 0).uid.unwrap();
        reg.unregister(&alice).unwrap();
        assert!(ledger.remove(&mut reg, uid).unwrap().is_some());
        assert!(ledger.active().is_empty());
    }

    #[derive(Debug, Clone)]
    struct Step {
        mode: ModMode,
        value: i64,
        permanent: bool,
    }

    fn step() -> impl Strategy<Value = Step> {
        (
            prop_oneof![Just(ModMode::Set), Just(ModMode::Add), Just(ModMode::Mul)],
            -5i64..6,
            proptest::bool::weighted(0.2),
        )
            .prop_map(|(mode, value, permanent)| Step {
                mode,
                value,
                permanent,
            })
    }

    proptest! {
        /// Removing every temporary effect, in any order, leaves exactly the
        /// base value moved by the permanent changes.
        #[test]
        fn effects_round_trip(steps in proptest::collection::vec(step(), 1..12), order in any::<u64>()) {
            let (mut reg, alice) = world();
            let mut ledger = EffectLedger::new();
            let path = StatPath::Basic(BasicStat::Defense);
            let mut expected_base = 10i64;
            let mut uids = Vec::new();

            for s in &steps {
                if s.permanent {
                    let def = EffectDef {
                        modifiers: vec![modifier("basic.defense", ModMode::Add, ModValue::Int(s.value))],
                        ..EffectDef::default()
                    };
                    apply(&mut ledger, &mut reg, &def, &[alice.clone()], 0);
                    expected_base += s.value;
                } else {
                    let def = EffectDef {
                        modifiers: vec![modifier("basic.defense", s.mode, ModValue::Int(s.value))],
                        turns: Some(100),
                        ..EffectDef::default()
                    };
                    uids.push(apply(&mut ledger, &mut reg, &def, &[alice.clone()], 0).uid.unwrap());
                }
            }

            // Pseudo-shuffle removal order from the seed.
            let mut order = order;
            while !uids.is_empty() {
                let idx = (order % uids.len() as u64) as usize;
                order = order / 3 + 7;
                let uid = uids.swap_remove(idx);
                ledger.remove(&mut reg, uid).unwrap();
            }

            let being = reg.being(&alice).unwrap();
            prop_assert_eq!(being.stats.get(&path).as_int(), Some(expected_base));
            prop_assert!(being.mods.is_empty());
        }
    }
}
