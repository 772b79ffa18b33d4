//! Encounter state machine.
//!
//! An encounter tracks two sides on a one-dimensional battlefield. Each
//! combatant carries an [`EncounterRecord`] with its position (in feet) and
//! the last round it moved in; who still has to move is always recomputed
//! from those records, there is no separate turn queue.
//!
//! Characters start at `+starting_range` and monsters at 0, so characters
//! close in by decreasing their range and monsters by increasing it.
//! Leaving `[min_range, max_range]` takes a combatant off the battlefield.

pub mod moves;
pub mod tactics;

pub use moves::{CombatContext, Move, MoveOutcome};
pub use tactics::plan_monster_move;

use std::fmt;

use rw_core::{Being, EncounterRecord, ObjectId, Registry, Stats};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MechError, MechResult};

/// A side of an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The party.
    Players,
    /// Their opponents.
    Monsters,
}

impl Side {
    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            Self::Players => Self::Monsters,
            Self::Monsters => Self::Players,
        }
    }

    /// Direction of travel toward the enemy on the range axis.
    pub fn toward(self) -> i64 {
        match self {
            Self::Players => -1,
            Self::Monsters => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Players => write!(f, "players"),
            Self::Monsters => write!(f, "monsters"),
        }
    }
}

/// How much room a location leaves for a fight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSize {
    /// A closet or narrow tunnel; the fight starts at close quarters.
    Small,
    /// A room.
    #[default]
    Medium,
    /// A hall or cavern.
    Large,
    /// Open ground.
    Outside,
}

/// Range limits of a battlefield, in feet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeBand {
    /// Where characters start.
    pub starting: i64,
    /// Below this a combatant has left the fight.
    pub min: i64,
    /// Above this a combatant has left the fight.
    pub max: i64,
}

impl LocationSize {
    /// The battlefield a location of this size allows.
    pub fn band(self) -> RangeBand {
        let (starting, min, max) = match self {
            Self::Small => (0, -30, 30),
            Self::Medium => (30, -30, 60),
            Self::Large => (30, -60, 90),
            Self::Outside => (60, -60, 120),
        };
        RangeBand { starting, min, max }
    }
}

/// How an encounter ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncounterEnd {
    /// No monster is left fighting.
    Victory,
    /// Every character is dead.
    Defeat,
    /// The surviving characters left the battlefield.
    Escaped,
    /// The party walked away while both sides could still fight.
    Abandoned,
}

/// What the encounter does after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// The acting side still has combatants to move.
    Continue,
    /// The turn passed to a side.
    NextTurn(Side),
    /// One side has nobody fighting any more.
    Over(EncounterEnd),
}

/// Whether a combatant may act right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// It may; acting ends the monsters' turn early if `flip` is set.
    Allowed {
        /// A character is acting during the monsters' turn.
        flip: bool,
    },
    /// It may not, for the given reason.
    Denied(String),
}

/// A running encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    /// Whose turn it is.
    pub turn: Side,
    /// Round number, starting at 1.
    pub round: u32,
    /// Character participants.
    pub characters: Vec<ObjectId>,
    /// Monster participants.
    pub monsters: Vec<ObjectId>,
    /// Lower battlefield bound.
    pub min_range: i64,
    /// Upper battlefield bound.
    pub max_range: i64,
    /// Where characters started.
    pub starting_range: i64,
}

impl Encounter {
    /// Start an encounter and give every living participant a record.
    pub fn start(
        registry: &mut Registry,
        characters: &[ObjectId],
        monsters: &[ObjectId],
        size: LocationSize,
    ) -> MechResult<Self> {
        let band = size.band();
        let characters = enlist(registry, characters, band.starting)?;
        let monsters = enlist(registry, monsters, 0)?;
        if characters.is_empty() || monsters.is_empty() {
            return Err(MechError::Encounter(
                "an encounter needs a living combatant on each side".to_string(),
            ));
        }
        info!(
            characters = characters.len(),
            monsters = monsters.len(),
            ?size,
            "encounter started"
        );
        Ok(Self {
            turn: Side::Players,
            round: 1,
            characters,
            monsters,
            min_range: band.min,
            max_range: band.max,
            starting_range: band.starting,
        })
    }

    /// Add a monster that joins mid-fight at the monsters' line.
    pub fn reinforce(&mut self, registry: &mut Registry, monster: &ObjectId) -> MechResult<()> {
        let mut record = EncounterRecord::at(0);
        record.moved_round = self.round;
        registry.being_mut(monster)?.encounter = Some(record);
        self.monsters.push(monster.clone());
        Ok(())
    }

    /// Which side a combatant fights on.
    pub fn side_of(&self, id: &str) -> Option<Side> {
        if self.characters.iter().any(|c| c.as_str() == id) {
            Some(Side::Players)
        } else if self.monsters.iter().any(|m| m.as_str() == id) {
            Some(Side::Monsters)
        } else {
            None
        }
    }

    /// Every participant on a side.
    pub fn members(&self, side: Side) -> &[ObjectId] {
        match side {
            Side::Players => &self.characters,
            Side::Monsters => &self.monsters,
        }
    }

    /// Participants on a side that are alive and still on the battlefield.
    pub fn fighting(&self, registry: &Registry, side: Side) -> Vec<ObjectId> {
        self.members(side)
            .iter()
            .filter(|id| combatant(registry, id.as_str()).is_some_and(Being::is_fighting))
            .cloned()
            .collect()
    }

    /// Fighters on a side that can act and have not moved this round.
    pub fn pending(&self, registry: &Registry, side: Side) -> Vec<ObjectId> {
        self.members(side)
            .iter()
            .filter(|id| {
                combatant(registry, id.as_str()).is_some_and(|b| {
                    b.is_fighting()
                        && b.able_to_act()
                        && b.encounter
                            .as_ref()
                            .is_some_and(|r| r.moved_round < self.round)
                })
            })
            .cloned()
            .collect()
    }

    /// Position of a participant.
    pub fn position(&self, registry: &Registry, id: &str) -> Option<i64> {
        combatant(registry, id)
            .and_then(|b| b.encounter.as_ref())
            .map(|r| r.range)
    }

    /// Distance between two participants.
    pub fn distance(&self, registry: &Registry, a: &str, b: &str) -> Option<i64> {
        Some((self.position(registry, a)? - self.position(registry, b)?).abs())
    }

    /// The end state, if one side has nobody fighting.
    pub fn outcome(&self, registry: &Registry) -> Option<EncounterEnd> {
        if self.fighting(registry, Side::Players).is_empty() {
            let all_dead = self
                .characters
                .iter()
                .all(|id| combatant(registry, id.as_str()).is_none_or(|b| b.dead));
            return Some(if all_dead {
                EncounterEnd::Defeat
            } else {
                EncounterEnd::Escaped
            });
        }
        if self.fighting(registry, Side::Monsters).is_empty() {
            return Some(EncounterEnd::Victory);
        }
        None
    }

    /// Check whether `actor` may act now, without changing anything.
    pub fn gate(&self, registry: &Registry, actor: &ObjectId) -> MechResult<Gate> {
        let Some(side) = self.side_of(actor.as_str()) else {
            return Ok(Gate::Denied(format!("{actor} is not part of this fight.")));
        };
        let being = registry.being(actor)?;
        let record = being.encounter.as_ref().ok_or_else(|| {
            MechError::Encounter(format!("{actor} is a participant without a record"))
        })?;
        if let Some(reason) = being.incapacitated_by() {
            return Ok(Gate::Denied(format!("{actor} is {reason} and cannot act.")));
        }
        if record.escaped {
            return Ok(Gate::Denied(format!("{actor} has left the fight.")));
        }

        let flip = match (side, self.turn) {
            (Side::Monsters, Side::Players) => {
                return Ok(Gate::Denied(format!(
                    "It is the players' turn; {actor} must wait."
                )));
            }
            (Side::Players, Side::Monsters) => true,
            _ => false,
        };
        if !flip && record.moved_round >= self.round {
            return Ok(Gate::Denied(format!("{actor} has already moved this round.")));
        }
        Ok(Gate::Allowed { flip })
    }

    /// Record that `actor` used its move, first ending the monsters' turn if asked.
    pub fn commit(&mut self, registry: &mut Registry, actor: &ObjectId, flip: bool) -> MechResult<()> {
        if flip {
            self.next_turn();
        }
        let round = self.round;
        let record = registry.being_mut(actor)?.encounter.as_mut().ok_or_else(|| {
            MechError::Encounter(format!("{actor} is a participant without a record"))
        })?;
        record.moved_round = round;
        Ok(())
    }

    /// Pass the turn to the other side; a new round starts with the players.
    pub fn next_turn(&mut self) {
        self.turn = self.turn.opposite();
        if self.turn == Side::Players {
            self.round += 1;
        }
        info!(turn = %self.turn, round = self.round, "encounter turn");
    }

    /// After a move: report an end state, or pass the turn once the acting
    /// side has nobody left to move.
    pub fn settle(&mut self, registry: &Registry) -> TurnState {
        if let Some(end) = self.outcome(registry) {
            return TurnState::Over(end);
        }
        let mut state = TurnState::Continue;
        // Skip over a side that cannot move at all, but never loop forever.
        for _ in 0..2 {
            if !self.pending(registry, self.turn).is_empty() {
                break;
            }
            self.next_turn();
            state = TurnState::NextTurn(self.turn);
        }
        state
    }

    /// Tear the encounter down: strip records and clear what dead monsters
    /// no longer need.
    pub fn finish(&self, registry: &mut Registry) -> MechResult<EncounterEnd> {
        let end = self.outcome(registry).unwrap_or(EncounterEnd::Abandoned);
        for id in self.characters.iter().chain(&self.monsters) {
            let Some(being) = registry.resolve_mut(id.as_str()).and_then(|o| o.being_mut())
            else {
                continue;
            };
            being.encounter = None;
        }
        for id in &self.monsters {
            if let Some(being) = registry.resolve_mut(id.as_str()).and_then(|o| o.being_mut()) {
                if being.dead {
                    being.stats = Stats::default();
                    being.stats.basic.cur_health = 0;
                    being.attacks.clear();
                    being.spells.clear();
                    being.spell_slots.clear();
                    being.mods.clear();
                }
            }
        }
        info!(?end, round = self.round, "encounter finished");
        Ok(end)
    }
}

fn combatant<'a>(registry: &'a Registry, id: &str) -> Option<&'a Being> {
    registry.resolve(id).and_then(|o| o.being())
}

fn enlist(registry: &mut Registry, ids: &[ObjectId], range: i64) -> MechResult<Vec<ObjectId>> {
    let mut enlisted = Vec::new();
    for id in ids {
        let being = registry.being_mut(id)?;
        if being.dead {
            continue;
        }
        being.encounter = Some(EncounterRecord::at(range));
        enlisted.push(id.clone());
    }
    Ok(enlisted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_core::{ObjectBody, Owner, Stats, WorldObject};

    pub(crate) fn fighter(reg: &mut Registry, name: &str, monster: bool) -> ObjectId {
        let mut stats = Stats::default();
        stats.basic.max_health = 1000;
        stats.basic.cur_health = 1000;
        let being = Being::with_stats(stats);
        let body = if monster {
            ObjectBody::Monster(being)
        } else {
            ObjectBody::Character(being)
        };
        reg.register(WorldObject::new(name, body), Owner::Root).unwrap()
    }

    fn duel(size: LocationSize) -> (Registry, Encounter, ObjectId, ObjectId) {
        let mut reg = Registry::new();
        let alice = fighter(&mut reg, "Alice", false);
        let goblin = fighter(&mut reg, "Goblin", true);
        let enc = Encounter::start(&mut reg, &[alice.clone()], &[goblin.clone()], size).unwrap();
        (reg, enc, alice, goblin)
    }

    #[test]
    fn start_places_sides_by_location_size() {
        let (reg, enc, alice, goblin) = duel(LocationSize::Outside);
        assert_eq!(enc.turn, Side::Players);
        assert_eq!(enc.round, 1);
        assert_eq!(enc.position(&reg, alice.as_str()), Some(60));
        assert_eq!(enc.position(&reg, goblin.as_str()), Some(0));
        assert_eq!((enc.min_range, enc.max_range), (-60, 120));
    }

    #[test]
    fn start_needs_both_sides() {
        let mut reg = Registry::new();
        let alice = fighter(&mut reg, "Alice", false);
        assert!(Encounter::start(&mut reg, &[alice], &[], LocationSize::Small).is_err());
    }

    #[test]
    fn monsters_cannot_act_on_the_players_turn() {
        let (reg, enc, _, goblin) = duel(LocationSize::Medium);
        assert!(matches!(enc.gate(&reg, &goblin).unwrap(), Gate::Denied(_)));
    }

    #[test]
    fn second_move_in_a_round_is_denied() {
        let (mut reg, mut enc, alice, _) = duel(LocationSize::Medium);
        assert_eq!(
            enc.gate(&reg, &alice).unwrap(),
            Gate::Allowed { flip: false }
        );
        enc.commit(&mut reg, &alice, false).unwrap();
        let Gate::Denied(reason) = enc.gate(&reg, &alice).unwrap() else {
            panic!("second move was allowed");
        };
        assert_eq!(reason, "Alice has already moved this round.");
    }

    #[test]
    fn a_player_acting_on_the_monsters_turn_ends_it() {
        let (mut reg, mut enc, alice, _) = duel(LocationSize::Medium);
        enc.commit(&mut reg, &alice, false).unwrap();
        assert_eq!(enc.settle(&reg), TurnState::NextTurn(Side::Monsters));

        assert_eq!(enc.gate(&reg, &alice).unwrap(), Gate::Allowed { flip: true });
        enc.commit(&mut reg, &alice, true).unwrap();
        assert_eq!(enc.turn, Side::Players);
        assert_eq!(enc.round, 2);
    }

    #[test]
    fn settle_passes_the_turn_and_counts_rounds() {
        let (mut reg, mut enc, alice, goblin) = duel(LocationSize::Medium);
        assert_eq!(enc.settle(&reg), TurnState::Continue);
        enc.commit(&mut reg, &alice, false).unwrap();
        assert_eq!(enc.settle(&reg), TurnState::NextTurn(Side::Monsters));
        enc.commit(&mut reg, &goblin, false).unwrap();
        assert_eq!(enc.settle(&reg), TurnState::NextTurn(Side::Players));
        assert_eq!(enc.round, 2);
        assert_eq!(enc.pending(&reg, Side::Players), vec![alice]);
    }

    #[test]
    fn incapacitated_sides_are_skipped() {
        let (mut reg, mut enc, alice, goblin) = duel(LocationSize::Medium);
        reg.being_mut(&goblin)
            .unwrap()
            .stats
            .conditions
            .push("asleep".to_string());
        enc.commit(&mut reg, &alice, false).unwrap();
        assert_eq!(enc.settle(&reg), TurnState::NextTurn(Side::Players));
        assert_eq!(enc.round, 2);
    }

    #[test]
    fn outcome_and_finish() {
        let (mut reg, enc, alice, goblin) = duel(LocationSize::Medium);
        assert_eq!(enc.outcome(&reg), None);
        reg.being_mut(&goblin).unwrap().take_damage(5000).unwrap();
        assert_eq!(enc.outcome(&reg), Some(EncounterEnd::Victory));

        assert_eq!(enc.finish(&mut reg).unwrap(), EncounterEnd::Victory);
        assert!(reg.being(&alice).unwrap().encounter.is_none());
        assert!(reg.being(&goblin).unwrap().encounter.is_none());
    }

    #[test]
    fn finish_strips_dead_monsters() {
        let (mut reg, enc, alice, goblin) = duel(LocationSize::Small);
        {
            let being = reg.being_mut(&goblin).unwrap();
            being.stats.attributes.insert("strength".to_string(), 18);
            being.attacks.push(rw_core::Attack {
                name: "club".to_string(),
                damage: "1d6".to_string(),
                range: 0,
                to_hit: None,
            });
            being.take_damage(5000).unwrap();
        }
        enc.finish(&mut reg).unwrap();

        let goblin = reg.being(&goblin).unwrap();
        assert!(goblin.dead);
        assert!(goblin.attacks.is_empty());
        assert!(goblin.stats.attributes.is_empty());
        assert_eq!(goblin.health(), 0);
        assert_eq!(reg.being(&alice).unwrap().stats.basic.max_health, 1000);
    }

    #[test]
    fn escape_versus_defeat() {
        let (mut reg, enc, alice, _) = duel(LocationSize::Medium);
        reg.being_mut(&alice)
            .unwrap()
            .encounter
            .as_mut()
            .unwrap()
            .escaped = true;
        assert_eq!(enc.outcome(&reg), Some(EncounterEnd::Escaped));
        reg.being_mut(&alice).unwrap().take_damage(5000).unwrap();
        assert_eq!(enc.outcome(&reg), Some(EncounterEnd::Defeat));
    }
}
