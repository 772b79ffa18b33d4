//! Combat moves: attacks and movement on the range axis.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rw_core::{Being, ObjectId, Registry};
use tracing::debug;

use super::{Encounter, Gate, Side};
use crate::dice::{Advantage, DiceExpr, roll_d20};
use crate::error::{MechError, MechResult};
use crate::rules::Rules;

/// How far an attack may close in before swinging.
pub const ATTACK_CLOSE_DISTANCE: i64 = 30;
/// Feet covered by advance and retreat.
pub const STEP: i64 = 30;
/// Feet covered by charge and flee.
pub const DASH: i64 = 60;

/// A move a combatant can make on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    /// Melee attack, closing up to 30 ft first.
    Attack,
    /// Ranged attack; no closing.
    Shoot,
    /// Melee attack with advantage against an engaged target.
    Press,
    /// Move 30 ft toward the enemy.
    Advance,
    /// Move 30 ft away from the enemy.
    Retreat,
    /// Move 60 ft toward the enemy.
    Charge,
    /// Move 60 ft away from the enemy.
    Flee,
    /// Do nothing this round.
    Skip,
}

impl Move {
    /// True for moves that need a target.
    pub fn is_attack(self) -> bool {
        matches!(self, Self::Attack | Self::Shoot | Self::Press)
    }
}

impl FromStr for Move {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "attack" => Ok(Self::Attack),
            "shoot" => Ok(Self::Shoot),
            "press" => Ok(Self::Press),
            "advance" => Ok(Self::Advance),
            "retreat" => Ok(Self::Retreat),
            "charge" => Ok(Self::Charge),
            "flee" => Ok(Self::Flee),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown move: {other}")),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Attack => "attack",
            Self::Shoot => "shoot",
            Self::Press => "press",
            Self::Advance => "advance",
            Self::Retreat => "retreat",
            Self::Charge => "charge",
            Self::Flee => "flee",
            Self::Skip => "skip",
        };
        write!(f, "{s}")
    }
}

/// Everything a move may touch.
pub struct CombatContext<'a> {
    /// The world.
    pub registry: &'a mut Registry,
    /// Rules data for weapons.
    pub rules: &'a Rules,
    /// The action's rng.
    pub rng: &'a mut StdRng,
}

/// The result of a move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Narration.
    pub text: String,
    /// The move was not allowed; nothing changed.
    pub failed: bool,
    /// Combatants killed by the move.
    pub killed: Vec<ObjectId>,
    /// Combatants that left the battlefield.
    pub escaped: Vec<ObjectId>,
}

impl MoveOutcome {
    fn denied(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            failed: true,
            ..Self::default()
        }
    }

    fn done(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

enum ToHit {
    Ability(String),
    Dice(DiceExpr),
}

struct WeaponProfile {
    name: String,
    damage: DiceExpr,
    range: i64,
    to_hit: ToHit,
    ammo: Option<String>,
}

impl Encounter {
    /// Resolve one move by `actor`.
    pub fn attack_move(
        &mut self,
        ctx: &mut CombatContext<'_>,
        mv: Move,
        actor: &ObjectId,
        target: Option<&ObjectId>,
    ) -> MechResult<MoveOutcome> {
        let flip = match self.gate(ctx.registry, actor)? {
            Gate::Allowed { flip } => flip,
            Gate::Denied(reason) => return Ok(MoveOutcome::denied(reason)),
        };
        let side = self
            .side_of(actor.as_str())
            .ok_or_else(|| MechError::Encounter(format!("{actor} has no side")))?;
        debug!(%actor, %mv, ?target, "encounter move");

        let mut outcome = match mv {
            Move::Skip => {
                self.commit(ctx.registry, actor, flip)?;
                MoveOutcome::done(format!("{actor} holds position."))
            }
            Move::Advance | Move::Charge | Move::Retreat | Move::Flee => {
                self.movement(ctx.registry, mv, actor, side, flip)?
            }
            Move::Attack | Move::Press | Move::Shoot => {
                let Some(target) = target else {
                    return Ok(MoveOutcome::denied(format!("Who should {actor} {mv}?")));
                };
                self.strike(ctx, mv, actor, target, side, flip)?
            }
        };
        if flip && !outcome.failed {
            outcome.text = format!("The monsters' turn ends. {}", outcome.text);
        }
        Ok(outcome)
    }

    fn movement(
        &mut self,
        registry: &mut Registry,
        mv: Move,
        actor: &ObjectId,
        side: Side,
        flip: bool,
    ) -> MechResult<MoveOutcome> {
        let from = self
            .position(registry, actor.as_str())
            .ok_or_else(|| MechError::Encounter(format!("{actor} has no position")))?;
        let (distance, toward) = match mv {
            Move::Advance => (STEP, true),
            Move::Charge => (DASH, true),
            Move::Retreat => (STEP, false),
            _ => (DASH, false),
        };
        let direction = if toward {
            side.toward()
        } else {
            -side.toward()
        };
        let mut to = from + direction * distance;

        let mut text = if toward {
            format!("{actor} moves {distance} ft toward the enemy.")
        } else {
            format!("{actor} falls back {distance} ft.")
        };
        if toward {
            if let Some((closest, at)) = self.closest_ahead(registry, side, from) {
                if at == from {
                    return Ok(MoveOutcome::denied(format!(
                        "{actor} is already face to face with {closest}."
                    )));
                }
                let reaches = (to - at) * side.toward() >= 0;
                if reaches {
                    to = at;
                    text = format!("{actor} closes in on {closest}.");
                }
            }
        }

        self.commit(registry, actor, flip)?;
        let escaped = to < self.min_range || to > self.max_range;
        let record = registry
            .being_mut(actor)?
            .encounter
            .as_mut()
            .ok_or_else(|| MechError::Encounter(format!("{actor} has no record")))?;
        record.range = to;
        let mut outcome = MoveOutcome::done(text);
        if escaped {
            record.escaped = true;
            outcome.text = format!("{actor} leaves the battlefield.");
            outcome.escaped.push(actor.clone());
        }
        Ok(outcome)
    }

    /// The nearest fighting opponent between `from` and the enemy side.
    fn closest_ahead(&self, registry: &Registry, side: Side, from: i64) -> Option<(ObjectId, i64)> {
        self.fighting(registry, side.opposite())
            .into_iter()
            .filter_map(|id| {
                let at = self.position(registry, id.as_str())?;
                ((at - from) * side.toward() >= 0).then_some((id, at))
            })
            .min_by_key(|(_, at)| (at - from).abs())
    }

    fn strike(
        &mut self,
        ctx: &mut CombatContext<'_>,
        mv: Move,
        actor: &ObjectId,
        target: &ObjectId,
        side: Side,
        flip: bool,
    ) -> MechResult<MoveOutcome> {
        if self.side_of(target.as_str()) != Some(side.opposite()) {
            return Ok(MoveOutcome::denied(format!(
                "{target} is not an enemy of {actor} in this fight."
            )));
        }
        let target_fighting = ctx
            .registry
            .resolve(target.as_str())
            .and_then(|o| o.being())
            .is_some_and(Being::is_fighting);
        if !target_fighting {
            return Ok(MoveOutcome::denied(format!(
                "{target} is no longer in the fight."
            )));
        }
        let distance = self
            .distance(ctx.registry, actor.as_str(), target.as_str())
            .ok_or_else(|| MechError::Encounter(format!("{actor} or {target} has no position")))?;

        let mut advantage = Advantage::Normal;
        let mut lines = Vec::new();
        let weapon = match mv {
            Move::Shoot => {
                let Some(weapon) = ranged_profile(ctx, actor)? else {
                    return Ok(MoveOutcome::denied(format!("{actor} has no ranged weapon.")));
                };
                if distance > weapon.range {
                    return Ok(MoveOutcome::denied(format!(
                        "{target} is {distance} ft away, beyond the {} range of {} ft.",
                        weapon.name, weapon.range
                    )));
                }
                if distance == 0 {
                    advantage = Advantage::Disadvantage;
                }
                weapon
            }
            Move::Press => {
                if distance > 0 {
                    return Ok(MoveOutcome::denied(format!(
                        "{actor} must be engaged with {target} to press the attack."
                    )));
                }
                advantage = Advantage::Advantage;
                melee_profile(ctx, actor)?
            }
            _ => {
                if distance > ATTACK_CLOSE_DISTANCE {
                    return Ok(MoveOutcome::denied(format!(
                        "{target} is {distance} ft away; {actor} must advance first."
                    )));
                }
                melee_profile(ctx, actor)?
            }
        };

        let ammo = match &weapon.ammo {
            Some(key) => match find_ammo(ctx.registry, actor, key) {
                Some(id) => Some(id),
                None => {
                    return Ok(MoveOutcome::denied(format!("{actor} is out of {key}.")));
                }
            },
            None => None,
        };

        // Preconditions hold; from here on the move happens.
        self.commit(ctx.registry, actor, flip)?;
        if let Some(ammo) = ammo {
            ctx.registry.consume(&ammo, 1)?;
        }
        if mv == Move::Attack && distance > 0 {
            let at = self
                .position(ctx.registry, target.as_str())
                .ok_or_else(|| MechError::Encounter(format!("{target} has no position")))?;
            if let Some(record) = ctx.registry.being_mut(actor)?.encounter.as_mut() {
                record.range = at;
            }
            lines.push(format!("{actor} closes in on {target}."));
        }

        let bonus = match &weapon.to_hit {
            ToHit::Ability(ability) => ctx.registry.being(actor)?.stats.modifier(ability),
            ToHit::Dice(dice) => dice.roll(ctx.rng).total(),
        };
        let defense = defense_of(ctx, target)?;
        let (roll, _) = roll_d20(ctx.rng, advantage);
        let total = i64::from(roll) + bonus;
        let hit = roll == 20 || total >= defense;

        let verb = if mv == Move::Shoot { "shoots at" } else { "attacks" };
        let mut outcome = MoveOutcome::default();
        if !hit {
            lines.push(format!(
                "{actor} {verb} {target} with {}: {total} against defense {defense}, a miss.",
                weapon.name
            ));
            outcome.text = lines.join(" ");
            return Ok(outcome);
        }

        let damage = weapon.damage.roll(ctx.rng).amount();
        let died = ctx.registry.being_mut(target)?.take_damage(damage)?;
        lines.push(format!(
            "{actor} {verb} {target} with {}: {total} against defense {defense}, a hit for {damage} damage.",
            weapon.name
        ));
        if died {
            lines.push(format!("{target} dies."));
            outcome.killed.push(target.clone());
            if side == Side::Players {
                let xp = ctx.registry.being(target)?.xp;
                ctx.registry.being_mut(actor)?.xp += xp;
            }
        }
        outcome.text = lines.join(" ");
        Ok(outcome)
    }
}

fn equipped_weapon<'r>(
    ctx: &'r CombatContext<'_>,
    actor: &ObjectId,
) -> MechResult<Option<(String, &'r crate::rules::ItemDef)>> {
    let being = ctx.registry.being(actor)?;
    let Some(weapon) = &being.equipped.weapon else {
        return Ok(None);
    };
    let item = ctx.registry.get(weapon)?;
    Ok(item
        .item_def_key()
        .and_then(|key| ctx.rules.item(key))
        .filter(|def| def.damage.is_some())
        .map(|def| (item.name.clone(), def)))
}

fn melee_profile(ctx: &CombatContext<'_>, actor: &ObjectId) -> MechResult<WeaponProfile> {
    let being = ctx.registry.being(actor)?;
    if !being.attacks.is_empty() {
        let attack = being
            .attacks
            .iter()
            .find(|a| a.range == 0)
            .unwrap_or(&being.attacks[0]);
        return natural_profile(attack);
    }
    if let Some((name, def)) = equipped_weapon(ctx, actor)? {
        if !def.is_ranged() {
            return Ok(WeaponProfile {
                name,
                damage: def.damage.unwrap_or(DiceExpr::flat(1)),
                range: 0,
                to_hit: ToHit::Ability(def.to_hit_ability().to_string()),
                ammo: None,
            });
        }
    }
    Ok(WeaponProfile {
        name: "bare hands".to_string(),
        damage: DiceExpr::flat(1),
        range: 0,
        to_hit: ToHit::Ability("strength".to_string()),
        ammo: None,
    })
}

fn ranged_profile(ctx: &CombatContext<'_>, actor: &ObjectId) -> MechResult<Option<WeaponProfile>> {
    let being = ctx.registry.being(actor)?;
    if let Some(attack) = being.attacks.iter().find(|a| a.range > 0) {
        return natural_profile(attack).map(Some);
    }
    Ok(equipped_weapon(ctx, actor)?
        .filter(|(_, def)| def.is_ranged())
        .map(|(name, def)| WeaponProfile {
            name,
            damage: def.damage.unwrap_or(DiceExpr::flat(1)),
            range: def.range,
            to_hit: ToHit::Ability(def.to_hit_ability().to_string()),
            ammo: def.ammo.clone(),
        }))
}

fn natural_profile(attack: &rw_core::Attack) -> MechResult<WeaponProfile> {
    let to_hit = match &attack.to_hit {
        Some(expr) => ToHit::Dice(expr.parse()?),
        None => ToHit::Ability("strength".to_string()),
    };
    Ok(WeaponProfile {
        name: attack.name.clone(),
        damage: attack.damage.parse()?,
        range: attack.range,
        to_hit,
        ammo: None,
    })
}

fn find_ammo(registry: &Registry, actor: &ObjectId, key: &str) -> Option<ObjectId> {
    registry
        .children(actor.as_str())
        .iter()
        .find(|id| {
            registry
                .resolve(id.as_str())
                .and_then(|o| o.item_def_key())
                .is_some_and(|k| k.eq_ignore_ascii_case(key))
        })
        .cloned()
}

fn defense_of(ctx: &CombatContext<'_>, target: &ObjectId) -> MechResult<i64> {
    let being = ctx.registry.being(target)?;
    let mut defense = being.stats.basic.defense;
    if let Some(armor) = &being.equipped.armor {
        let item = ctx.registry.get(armor)?;
        if let Some(def) = item.item_def_key().and_then(|k| ctx.rules.item(k)) {
            defense += def.defense;
        }
    }
    Ok(defense)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::tests::fighter;
    use crate::encounter::{EncounterEnd, LocationSize, TurnState};
    use crate::rules::preset;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rw_core::{Attack, ItemState, ObjectBody, Owner, WorldObject};

    struct Arena {
        reg: Registry,
        enc: Encounter,
        rules: Rules,
        rng: StdRng,
        alice: ObjectId,
        goblin: ObjectId,
    }

    impl Arena {
        fn new(size: LocationSize) -> Self {
            let mut reg = Registry::new();
            let alice = fighter(&mut reg, "Alice", false);
            let goblin = fighter(&mut reg, "Goblin", true);
            let enc =
                Encounter::start(&mut reg, &[alice.clone()], &[goblin.clone()], size).unwrap();
            Self {
                reg,
                enc,
                rules: preset::starter(),
                rng: StdRng::seed_from_u64(11),
                alice,
                goblin,
            }
        }

        fn act(&mut self, mv: Move, actor: &ObjectId, target: Option<&ObjectId>) -> MoveOutcome {
            let mut ctx = CombatContext {
                registry: &mut self.reg,
                rules: &self.rules,
                rng: &mut self.rng,
            };
            self.enc.attack_move(&mut ctx, mv, actor, target).unwrap()
        }

        fn pos(&self, id: &ObjectId) -> i64 {
            self.enc.position(&self.reg, id.as_str()).unwrap()
        }
    }

    #[test]
    fn advance_stops_at_the_closest_opponent() {
        let mut a = Arena::new(LocationSize::Outside);
        let alice = a.alice.clone();
        let out = a.act(Move::Charge, &alice, None);
        assert!(!out.failed);
        assert_eq!(out.text, "Alice closes in on Goblin.");
        assert_eq!(a.pos(&alice), 0);
    }

    #[test]
    fn advancing_when_engaged_is_refused() {
        let mut a = Arena::new(LocationSize::Small);
        let alice = a.alice.clone();
        let out = a.act(Move::Advance, &alice, None);
        assert!(out.failed);
        assert_eq!(out.text, "Alice is already face to face with Goblin.");
    }

    #[test]
    fn fleeing_past_the_bound_escapes() {
        let mut a = Arena::new(LocationSize::Medium);
        let alice = a.alice.clone();
        let out = a.act(Move::Flee, &alice, None);
        assert_eq!(out.escaped, vec![alice.clone()]);
        assert_eq!(a.pos(&alice), 90);
        assert_eq!(a.enc.outcome(&a.reg), Some(EncounterEnd::Escaped));
    }

    #[test]
    fn attack_closes_up_to_thirty_feet() {
        let mut a = Arena::new(LocationSize::Medium);
        let (alice, goblin) = (a.alice.clone(), a.goblin.clone());
        let out = a.act(Move::Attack, &alice, Some(&goblin));
        assert!(!out.failed, "{}", out.text);
        assert!(out.text.starts_with("Alice closes in on Goblin."));
        assert_eq!(a.pos(&alice), 0);
    }

    #[test]
    fn attack_beyond_thirty_feet_is_refused_without_changes() {
        let mut a = Arena::new(LocationSize::Outside);
        let (alice, goblin) = (a.alice.clone(), a.goblin.clone());
        let out = a.act(Move::Attack, &alice, Some(&goblin));
        assert!(out.failed);
        assert_eq!(out.text, "Goblin is 60 ft away; Alice must advance first.");
        assert_eq!(a.pos(&alice), 60);
        assert_eq!(a.enc.pending(&a.reg, Side::Players), vec![alice]);
    }

    #[test]
    fn press_needs_engagement() {
        let mut a = Arena::new(LocationSize::Medium);
        let (alice, goblin) = (a.alice.clone(), a.goblin.clone());
        assert!(a.act(Move::Press, &alice, Some(&goblin)).failed);
    }

    #[test]
    fn shoot_consumes_ammo_and_fails_when_empty() {
        let mut a = Arena::new(LocationSize::Outside);
        let (alice, goblin) = (a.alice.clone(), a.goblin.clone());
        let bow = a
            .reg
            .register(
                WorldObject::new("Shortbow", ObjectBody::Item(ItemState::default())),
                Owner::Object(alice.clone()),
            )
            .unwrap();
        let arrows = a
            .reg
            .register(
                WorldObject::new("Arrow", ObjectBody::Item(ItemState::stack(1))),
                Owner::Object(alice.clone()),
            )
            .unwrap();
        a.reg.being_mut(&alice).unwrap().equipped.weapon = Some(bow);

        let out = a.act(Move::Shoot, &alice, Some(&goblin));
        assert!(!out.failed, "{}", out.text);
        assert!(a.reg.resolve(arrows.as_str()).is_none());

        // Next round, no arrows left.
        a.enc.next_turn();
        a.enc.next_turn();
        let out = a.act(Move::Shoot, &alice, Some(&goblin));
        assert!(out.failed);
        assert_eq!(out.text, "Alice is out of arrow.");
    }

    #[test]
    fn melee_duel_to_the_death() {
        let mut a = Arena::new(LocationSize::Small);
        let (alice, goblin) = (a.alice.clone(), a.goblin.clone());
        {
            let g = a.reg.being_mut(&goblin).unwrap();
            g.stats.basic.cur_health = 1;
            g.stats.basic.defense = 0;
            g.xp = 50;
        }

        let out = a.act(Move::Attack, &alice, Some(&goblin));
        assert_eq!(out.killed, vec![goblin.clone()]);
        assert!(out.text.ends_with("Goblin dies."));
        assert_eq!(a.reg.being(&alice).unwrap().xp, 50);
        assert_eq!(a.enc.settle(&a.reg), TurnState::Over(EncounterEnd::Victory));
    }

    #[test]
    fn monsters_use_their_natural_attacks() {
        let mut a = Arena::new(LocationSize::Small);
        let (alice, goblin) = (a.alice.clone(), a.goblin.clone());
        a.reg.being_mut(&goblin).unwrap().attacks.push(Attack {
            name: "claw".to_string(),
            damage: "5".to_string(),
            range: 0,
            to_hit: Some("30".to_string()),
        });
        a.act(Move::Skip, &alice, None);
        a.enc.settle(&a.reg);

        let out = a.act(Move::Attack, &goblin, Some(&alice));
        assert!(!out.failed, "{}", out.text);
        assert_eq!(a.reg.being(&alice).unwrap().health(), 995);
    }

    #[test]
    fn wrong_side_targets_are_refused() {
        let mut a = Arena::new(LocationSize::Small);
        let alice = a.alice.clone();
        let out = a.act(Move::Attack, &alice, Some(&alice));
        assert!(out.failed);
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Alice(Move),
        Goblin(Move),
    }

    fn movement() -> impl Strategy<Value = Move> {
        prop_oneof![
            Just(Move::Advance),
            Just(Move::Charge),
            Just(Move::Retreat),
            Just(Move::Flee),
            Just(Move::Skip),
        ]
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![movement().prop_map(Step::Alice), movement().prop_map(Step::Goblin)]
    }

    proptest! {
        #[test]
        fn movement_respects_the_range_bounds(
            size in prop_oneof![
                Just(LocationSize::Small),
                Just(LocationSize::Medium),
                Just(LocationSize::Large),
                Just(LocationSize::Outside),
            ],
            steps in proptest::collection::vec(step(), 1..30),
        ) {
            let mut a = Arena::new(size);
            let (alice, goblin) = (a.alice.clone(), a.goblin.clone());
            for s in steps {
                if a.enc.outcome(&a.reg).is_some() {
                    break;
                }
                let (actor, other, mv) = match s {
                    Step::Alice(mv) => (alice.clone(), goblin.clone(), mv),
                    Step::Goblin(mv) => (goblin.clone(), alice.clone(), mv),
                };
                let side = a.enc.side_of(actor.as_str()).unwrap();
                let before = a.pos(&actor);
                let opponent = a.pos(&other);
                let out = a.act(mv, &actor, None);
                a.enc.settle(&a.reg);
                let after = a.pos(&actor);

                if !out.failed && matches!(mv, Move::Advance | Move::Charge) {
                    let was_ahead = (opponent - before) * side.toward() >= 0;
                    if was_ahead {
                        prop_assert!((opponent - after) * side.toward() >= 0);
                    }
                }
                if out.failed {
                    prop_assert_eq!(before, after);
                }
                for id in [&alice, &goblin] {
                    let record = a.reg.being(id).unwrap().encounter.clone().unwrap();
                    let outside = record.range < a.enc.min_range || record.range > a.enc.max_range;
                    prop_assert_eq!(record.escaped, outside);
                }
            }
        }
    }
}
