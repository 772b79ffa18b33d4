//! Running encounters: starting them, resolving moves, playing the
//! monsters when asked to, and cleaning up when one side is done.

use rw_core::ObjectId;
use rw_mechanics::{
    CombatContext, Encounter, EncounterEnd, Gate, Move, Side, TurnState, plan_monster_move,
};
use tracing::{debug, info};

use crate::context::{ActionContext, join_names};
use crate::error::EngineResult;
use crate::game::ActionOutcome;
use crate::state::Mode;

/// Monster turns the engine plays in a row before handing back control.
const MAX_AUTO_TURNS: usize = 16;

impl ActionContext<'_> {
    /// Start a fight between the living party and `monsters`.
    pub(crate) fn start_encounter(
        &mut self,
        monsters: &[ObjectId],
        description: &str,
    ) -> EngineResult<String> {
        let size = self.scenario.location(&self.state.location)?.size;
        let party = self.state.living_party();
        let encounter = Encounter::start(&mut self.state.registry, &party, monsters, size)?;
        self.state.mode = Mode::Encounter;
        self.state.dialog_partner = None;

        let mut names = Vec::new();
        for id in &encounter.monsters {
            let being = self.state.registry.being(id)?;
            if self.image.is_none() {
                self.image.clone_from(&being.image);
            }
            names.push(format!("{} ({} hp)", self.name_of(id), being.health()));
        }
        let mut lines = Vec::new();
        if !description.is_empty() {
            lines.push(description.to_string());
        }
        lines.push(format!("Combat begins against {}.", join_names(&names)));
        lines.push(format!("Round {}: the players' turn.", encounter.round));
        self.state.encounter = Some(encounter);
        Ok(lines.join("\n"))
    }

    /// One of the encounter verbs.
    ///
    /// `skip` without an actor ends the current side's turn.
    pub(crate) fn encounter_move(
        &mut self,
        mv: Move,
        actor: Option<String>,
        target: Option<String>,
    ) -> EngineResult<ActionOutcome> {
        let Some(name) = actor else {
            if mv != Move::Skip {
                return Ok(ActionOutcome::failed(format!("Who should {mv}?")));
            }
            let Some(encounter) = self.state.encounter.as_mut() else {
                return Ok(ActionOutcome::failed("There is no fight going on."));
            };
            let ended = encounter.turn;
            encounter.next_turn();
            let mut lines = vec![format!("The {ended}' turn ends.")];
            match encounter.turn {
                Side::Players => {
                    lines.push(format!("Round {}: the players' turn.", encounter.round));
                }
                Side::Monsters if self.config.auto_monsters => lines.extend(self.after_move()?),
                Side::Monsters => {
                    lines.push("The monsters' turn.".to_string());
                    self.monsters_pending = true;
                }
            }
            return Ok(ActionOutcome::done(lines.join("\n")));
        };
        let Some(actor) = self.being_here(&name)? else {
            return Ok(ActionOutcome::failed(format!("There is no {name} here.")));
        };
        let target = match target {
            Some(t) => match self.being_here(&t)? {
                Some(id) => Some(id),
                None => return Ok(ActionOutcome::failed(format!("There is no {t} here."))),
            },
            None => None,
        };

        let Some(encounter) = self.state.encounter.as_mut() else {
            return Ok(ActionOutcome::failed("There is no fight going on."));
        };
        let mut ctx = CombatContext {
            registry: &mut self.state.registry,
            rules: &self.scenario.rules,
            rng: &mut *self.rng,
        };
        let outcome = encounter.attack_move(&mut ctx, mv, &actor, target.as_ref())?;
        if outcome.failed {
            return Ok(ActionOutcome::failed(outcome.text));
        }
        let mut lines = vec![outcome.text];
        lines.extend(self.after_move()?);
        Ok(ActionOutcome::done(lines.join("\n")))
    }

    /// Whether `actor` may act in the running fight. `None` if there is no
    /// fight or `actor` is not in it.
    pub(crate) fn combat_gate(&self, actor: &ObjectId) -> EngineResult<Option<Gate>> {
        match &self.state.encounter {
            Some(encounter) if encounter.side_of(actor.as_str()).is_some() => {
                Ok(Some(encounter.gate(&self.state.registry, actor)?))
            }
            _ => Ok(None),
        }
    }

    /// Claim `actor`'s move for a non-combat action: `Ok(None)` outside a
    /// fight, `Some(flip)` if allowed, the refusal otherwise.
    pub(crate) fn claim_move(
        &self,
        actor: &ObjectId,
    ) -> EngineResult<Result<Option<bool>, ActionOutcome>> {
        Ok(match self.combat_gate(actor)? {
            Some(Gate::Denied(reason)) => Err(ActionOutcome::failed(reason)),
            Some(Gate::Allowed { flip }) => Ok(Some(flip)),
            None => Ok(None),
        })
    }

    /// Spend a claimed move once the action succeeded.
    pub(crate) fn settle_move(
        &mut self,
        actor: &ObjectId,
        flip: Option<bool>,
        outcome: ActionOutcome,
    ) -> EngineResult<ActionOutcome> {
        let Some(flip) = flip.filter(|_| !outcome.failed) else {
            return Ok(outcome);
        };
        let mut lines = vec![outcome.text];
        lines.extend(self.spend_move(actor, flip)?);
        Ok(ActionOutcome::done(lines.join("\n")))
    }

    /// Spend `actor`'s move after a non-combat action in a fight.
    pub(crate) fn spend_move(&mut self, actor: &ObjectId, flip: bool) -> EngineResult<Vec<String>> {
        let Some(encounter) = self.state.encounter.as_mut() else {
            return Ok(Vec::new());
        };
        encounter.commit(&mut self.state.registry, actor, flip)?;
        let mut lines = Vec::new();
        if flip {
            lines.push("The monsters' turn ends.".to_string());
        }
        lines.extend(self.after_move()?);
        Ok(lines)
    }

    /// Settle the fight after a move: end it, pass the turn, or let the
    /// monsters act.
    pub(crate) fn after_move(&mut self) -> EngineResult<Vec<String>> {
        let mut lines = Vec::new();
        for _ in 0..MAX_AUTO_TURNS {
            let Some(encounter) = self.state.encounter.as_mut() else {
                break;
            };
            match encounter.settle(&self.state.registry) {
                TurnState::Continue
                    if encounter.turn == Side::Monsters && self.config.auto_monsters =>
                {
                    lines.extend(self.monster_turn()?);
                }
                TurnState::Continue => break,
                TurnState::Over(_) => {
                    lines.push(self.end_encounter()?);
                    break;
                }
                TurnState::NextTurn(Side::Players) => {
                    lines.push(format!("Round {}: the players' turn.", encounter.round));
                    break;
                }
                TurnState::NextTurn(Side::Monsters) if !self.config.auto_monsters => {
                    lines.push("The monsters' turn.".to_string());
                    self.monsters_pending = true;
                    break;
                }
                TurnState::NextTurn(Side::Monsters) => lines.extend(self.monster_turn()?),
            }
        }
        Ok(lines)
    }

    /// Move every monster that still may, by the simple tactics.
    fn monster_turn(&mut self) -> EngineResult<Vec<String>> {
        let pending = match &self.state.encounter {
            Some(encounter) => encounter.pending(&self.state.registry, Side::Monsters),
            None => return Ok(Vec::new()),
        };
        let mut lines = Vec::new();
        for monster in pending {
            let Some(encounter) = self.state.encounter.as_mut() else {
                break;
            };
            if encounter.outcome(&self.state.registry).is_some() {
                break;
            }
            let (mv, target) = plan_monster_move(encounter, &self.state.registry, &monster);
            let mut ctx = CombatContext {
                registry: &mut self.state.registry,
                rules: &self.scenario.rules,
                rng: &mut *self.rng,
            };
            let mut outcome = encounter.attack_move(&mut ctx, mv, &monster, target.as_ref())?;
            if outcome.failed {
                debug!(%monster, %mv, reason = %outcome.text, "planned move refused");
                outcome = encounter.attack_move(&mut ctx, Move::Skip, &monster, None)?;
            }
            lines.push(outcome.text);
        }
        Ok(lines)
    }

    /// Tear down the running fight and apply its consequences.
    pub(crate) fn end_encounter(&mut self) -> EngineResult<String> {
        let Some(encounter) = self.state.encounter.take() else {
            return Ok(String::new());
        };
        let end = encounter.finish(&mut self.state.registry)?;
        self.state.mode = Mode::Exploration;
        info!(?end, location = %self.state.location, "encounter over");

        match end {
            EncounterEnd::Victory => {
                let floor = self.state.here_id()?.clone();
                let mut loot = Vec::new();
                for monster in &encounter.monsters {
                    if !self.state.registry.being(monster)?.dead {
                        continue;
                    }
                    for item in self.state.registry.children(monster.as_str()).to_vec() {
                        let dropped = self.state.registry.reparent(&item, &floor, None)?;
                        loot.push(self.label(&dropped));
                    }
                }
                let mut lines = vec!["Victory!".to_string()];
                if !loot.is_empty() {
                    lines.push(format!("The fallen drop {}.", join_names(&loot)));
                }
                lines.push(self.describe_location()?);
                Ok(lines.join("\n"))
            }
            EncounterEnd::Defeat => {
                self.state.game_over = true;
                Ok("The party has fallen. The game is over.".to_string())
            }
            EncounterEnd::Escaped => {
                let mut lines = vec!["The party escapes.".to_string()];
                if let Some(back) = self.state.previous_location.clone() {
                    lines.push(self.travel(&back, false)?);
                }
                Ok(lines.join("\n"))
            }
            EncounterEnd::Abandoned => Ok("The party leaves the fight behind.".to_string()),
        }
    }
}
