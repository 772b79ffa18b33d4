//! Items, equipment, spells and character sheets.

use std::fmt::Write as _;

use rw_core::{ObjectId, ObjectKind};
use rw_mechanics::{Application, EffectDef, ItemKind};
use tracing::debug;

use crate::context::{ActionContext, join_names};
use crate::error::{EngineError, EngineResult};
use crate::game::ActionOutcome;
use crate::parser::Action;
use crate::state::equip;

/// Verb used when `use` names none.
pub const DEFAULT_VERB: &str = "use";

macro_rules! acting {
    ($ctx:expr, $name:expr) => {
        match $ctx.acting_character($name.as_deref())? {
            Ok(id) => id,
            Err(text) => return Ok(ActionOutcome::failed(text)),
        }
    };
}

/// What a `use` or `cast` applies, and where it comes from.
struct Invocation<'d> {
    name: String,
    def: &'d EffectDef,
    source: ObjectId,
    range: Option<i64>,
}

impl ActionContext<'_> {
    /// `pickup(character, item, qty?)`.
    pub(crate) fn pickup(&mut self, action: &Action) -> EngineResult<ActionOutcome> {
        let who = acting!(self, action.text(0));
        let Some(name) = action.text(1) else {
            return Ok(ActionOutcome::failed("Pick up what?"));
        };
        let Some(item) = self.floor_item(&name)? else {
            return Ok(ActionOutcome::failed(format!("There is no {name} here.")));
        };
        self.transfer(&who, &item, &who, action.count(2), "picks up")
    }

    /// `drop(character, item, qty?)`.
    pub(crate) fn drop_item(&mut self, action: &Action) -> EngineResult<ActionOutcome> {
        let who = acting!(self, action.text(0));
        let Some(name) = action.text(1) else {
            return Ok(ActionOutcome::failed("Drop what?"));
        };
        let Some(item) = self.held_item(&who, &name) else {
            return Ok(ActionOutcome::failed(format!(
                "{} carries no {name}.",
                self.name_of(&who)
            )));
        };
        let floor = self.state.here_id()?.clone();
        self.transfer(&who, &item, &floor, action.count(2), "drops")
    }

    /// `give(character, item, receiver, qty?)`.
    pub(crate) fn give(&mut self, action: &Action) -> EngineResult<ActionOutcome> {
        let who = acting!(self, action.text(0));
        let flip = match self.claim_move(&who)? {
            Ok(flip) => flip,
            Err(refused) => return Ok(refused),
        };
        let Some(name) = action.text(1) else {
            return Ok(ActionOutcome::failed("Give what?"));
        };
        let Some(item) = self.held_item(&who, &name) else {
            return Ok(ActionOutcome::failed(format!(
                "{} carries no {name}.",
                self.name_of(&who)
            )));
        };
        let Some(receiver_name) = action.text(2) else {
            return Ok(ActionOutcome::failed("Give it to whom?"));
        };
        let receiver = match self.being_here(&receiver_name)? {
            Some(id) if id == who => {
                return Ok(ActionOutcome::failed(format!(
                    "{} already has it.",
                    self.name_of(&who)
                )));
            }
            Some(id) => id,
            None => {
                return Ok(ActionOutcome::failed(format!(
                    "There is no {receiver_name} here."
                )));
            }
        };
        if self.state.registry.being(&receiver)?.dead {
            return Ok(ActionOutcome::failed(format!(
                "{} is dead.",
                self.name_of(&receiver)
            )));
        }
        let verb = format!("gives {}", self.name_of(&receiver));
        let outcome = self.transfer(&who, &item, &receiver, action.count(3), &verb)?;
        self.settle_move(&who, flip, outcome)
    }

    /// Move `qty` of `item` to `to` and narrate it as `"{actor} {verb} {item}."`.
    fn transfer(
        &mut self,
        actor: &ObjectId,
        item: &ObjectId,
        to: &ObjectId,
        qty: Option<u32>,
        verb: &str,
    ) -> EngineResult<ActionOutcome> {
        let available = self
            .state
            .registry
            .get(item)?
            .item()
            .map_or(1, |state| state.count());
        if let Some(qty) = qty.filter(|q| *q > available) {
            return Ok(ActionOutcome::failed(format!(
                "There are only {available} of {} to move, not {qty}.",
                self.name_of(item)
            )));
        }
        let moving = qty.unwrap_or(available);
        let moved = self.state.registry.reparent(item, to, qty)?;
        let name = self.name_of(&moved);
        let what = if moving > 1 {
            format!("{moving} {name}")
        } else {
            name
        };
        Ok(ActionOutcome::done(format!(
            "{} {verb} {what}.",
            self.name_of(actor)
        )))
    }

    /// `equip(character, item)`.
    pub(crate) fn equip_item(&mut self, action: &Action) -> EngineResult<ActionOutcome> {
        let who = acting!(self, action.text(0));
        let flip = match self.claim_move(&who)? {
            Ok(flip) => flip,
            Err(refused) => return Ok(refused),
        };
        let Some(name) = action.text(1) else {
            return Ok(ActionOutcome::failed("Equip what?"));
        };
        let Some(item) = self.held_item(&who, &name) else {
            return Ok(ActionOutcome::failed(format!(
                "{} carries no {name}.",
                self.name_of(&who)
            )));
        };
        let outcome = match equip(&mut self.state.registry, &self.scenario.rules, &who, &item)? {
            Some(slot) => ActionOutcome::done(format!(
                "{} equips {} as {slot}.",
                self.name_of(&who),
                self.name_of(&item)
            )),
            None => ActionOutcome::failed(format!(
                "{} is neither weapon nor armor.",
                self.name_of(&item)
            )),
        };
        self.settle_move(&who, flip, outcome)
    }

    /// `invent(character?)`: what one character, or everyone, carries.
    pub(crate) fn inventory(&self, who: Option<String>) -> EngineResult<ActionOutcome> {
        let members = match who {
            Some(name) => match self.character(&name) {
                Some(id) => vec![id],
                None => {
                    return Ok(ActionOutcome::failed(format!(
                        "There is no character named {name}."
                    )));
                }
            },
            None => self.state.party.clone(),
        };
        let mut lines = Vec::new();
        for id in &members {
            let being = self.state.registry.being(id)?;
            let items: Vec<String> = self
                .state
                .registry
                .children(id.as_str())
                .iter()
                .map(|item| {
                    let label = self.label(item);
                    if being.equipped.weapon.as_ref() == Some(item) {
                        format!("{label} (wielded)")
                    } else if being.equipped.armor.as_ref() == Some(item) {
                        format!("{label} (worn)")
                    } else {
                        label
                    }
                })
                .collect();
            let carried = if items.is_empty() {
                "nothing".to_string()
            } else {
                join_names(&items)
            };
            lines.push(format!("{} carries {carried}.", self.name_of(id)));
        }
        Ok(ActionOutcome::done(lines.join("\n")))
    }

    /// `stats(character)`: a character sheet.
    pub(crate) fn stats(&self, who: Option<String>) -> EngineResult<ActionOutcome> {
        let Some(name) = who else {
            return Ok(ActionOutcome::failed("Whose stats?"));
        };
        let Some(id) = self.being_here(&name)? else {
            return Ok(ActionOutcome::failed(format!("There is no {name} here.")));
        };
        let being = self.state.registry.being(&id)?;
        let stats = &being.stats;
        let basic = &stats.basic;

        let mut sheet = format!("{} (level {})", self.name_of(&id), basic.level);
        if being.dead {
            sheet.push_str(", dead");
        }
        let _ = write!(
            sheet,
            "\nHealth {}/{}, defense {}, speed {}, xp {}",
            basic.cur_health, basic.max_health, basic.defense, basic.speed, being.xp
        );
        let attributes: Vec<String> = stats
            .attributes
            .iter()
            .map(|(name, score)| format!("{name} {score} ({:+})", stats.modifier(name)))
            .collect();
        if !attributes.is_empty() {
            let _ = write!(sheet, "\nAttributes: {}", attributes.join(", "));
        }
        let skills: Vec<String> = stats
            .skills
            .iter()
            .map(|(name, bonus)| format!("{name} {bonus:+}"))
            .collect();
        if !skills.is_empty() {
            let _ = write!(sheet, "\nSkills: {}", skills.join(", "));
        }
        let abilities: Vec<String> = stats
            .abilities
            .iter()
            .map(|(name, value)| format!("{name} {value}"))
            .collect();
        if !abilities.is_empty() {
            let _ = write!(sheet, "\nAbilities: {}", abilities.join(", "));
        }
        if !stats.conditions.is_empty() {
            let _ = write!(sheet, "\nConditions: {}", stats.conditions.join(", "));
        }
        let slot = |item: &Option<ObjectId>| {
            item.as_ref()
                .map_or_else(|| "none".to_string(), |id| self.name_of(id))
        };
        let _ = write!(
            sheet,
            "\nWeapon: {}, armor: {}",
            slot(&being.equipped.weapon),
            slot(&being.equipped.armor)
        );
        if !being.spells.is_empty() {
            let spells: Vec<&str> = being.spells.iter().map(String::as_str).collect();
            let slots: Vec<String> = being.spell_slots.iter().map(u32::to_string).collect();
            let _ = write!(
                sheet,
                "\nSpells: {} (slots {})",
                spells.join(", "),
                slots.join("/")
            );
        }
        let effects: Vec<&str> = self
            .state
            .effects
            .effects_on(id.as_str())
            .map(|e| e.name.as_str())
            .collect();
        if !effects.is_empty() {
            let _ = write!(sheet, "\nUnder: {}", effects.join(", "));
        }
        Ok(ActionOutcome::done(sheet))
    }

    /// `use(character, item, target?, verb?)` and `play(character, item, target?)`.
    pub(crate) fn use_item(
        &mut self,
        action: &Action,
        verb: Option<&str>,
    ) -> EngineResult<ActionOutcome> {
        let who = acting!(self, action.text(0));
        let Some(name) = action.text(1) else {
            return Ok(ActionOutcome::failed("Use what?"));
        };
        let Some(item) = self.held_item(&who, &name) else {
            return Ok(ActionOutcome::failed(format!(
                "{} carries no {name}.",
                self.name_of(&who)
            )));
        };
        let verb = verb
            .map(str::to_string)
            .or_else(|| action.text(3))
            .unwrap_or_else(|| DEFAULT_VERB.to_string())
            .to_lowercase();

        let obj = self.state.registry.get(&item)?;
        let item_name = obj.name.clone();
        let key = obj.item_def_key().unwrap_or(&obj.name).to_string();
        let scenario = self.scenario;
        let def = scenario
            .rules
            .item(&key)
            .ok_or_else(|| EngineError::Scenario(format!("unknown item '{key}'")))?;
        let Some(effect) = def.effect_for(Some(&verb)) else {
            return Ok(ActionOutcome::failed(format!(
                "Nothing happens when {} tries to {verb} the {item_name}.",
                self.name_of(&who)
            )));
        };
        if self.image.is_none() {
            self.image.clone_from(&def.image);
        }
        let consumed = def.kind == ItemKind::Consumable;
        let invocation = Invocation {
            name: item_name,
            def: effect,
            source: item.clone(),
            range: None,
        };
        let mut outcome = self.invoke(&who, invocation, action.text(2))?;
        if consumed && !outcome.failed {
            // The item may be gone already if it destroyed itself.
            if self.state.registry.contains(item.as_str()) {
                self.state.registry.consume(&item, 1)?;
            }
            debug!(%item, "consumed");
        }
        outcome.text = outcome.text.trim().to_string();
        Ok(outcome)
    }

    /// `cast(character, spell, target?)`.
    pub(crate) fn cast(&mut self, action: &Action) -> EngineResult<ActionOutcome> {
        let who = acting!(self, action.text(0));
        let Some(spell_name) = action.text(1).map(|s| s.to_lowercase()) else {
            return Ok(ActionOutcome::failed("Cast what?"));
        };
        let caster = self.name_of(&who);
        let being = self.state.registry.being(&who)?;
        if !being.spells.iter().any(|s| s.eq_ignore_ascii_case(&spell_name)) {
            return Ok(ActionOutcome::failed(format!(
                "{caster} does not know {spell_name}."
            )));
        }
        let scenario = self.scenario;
        let spell = scenario
            .rules
            .spell(&spell_name)
            .ok_or_else(|| EngineError::Scenario(format!("unknown spell '{spell_name}'")))?;
        let slot = usize::try_from(spell.level)
            .ok()
            .and_then(|level| level.checked_sub(1));
        if let Some(slot) = slot {
            if being.spell_slots.get(slot).copied().unwrap_or(0) == 0 {
                return Ok(ActionOutcome::failed(format!(
                    "{caster} has no level {} spell slots left.",
                    spell.level
                )));
            }
        }
        let invocation = Invocation {
            name: spell_name.clone(),
            def: &spell.effect,
            source: who.clone(),
            range: Some(spell.range),
        };
        let mut outcome = self.invoke(&who, invocation, action.text(2))?;
        if !outcome.failed {
            if let Some(slot) = slot {
                if let Some(left) = self.state.registry.being_mut(&who)?.spell_slots.get_mut(slot) {
                    *left = left.saturating_sub(1);
                }
            }
            outcome.text = format!("{caster} casts {spell_name}. {}", outcome.text)
                .trim()
                .to_string();
        }
        Ok(outcome)
    }

    /// Apply an item or spell effect for `actor`, spending its move in a fight.
    fn invoke(
        &mut self,
        actor: &ObjectId,
        invocation: Invocation<'_>,
        target: Option<String>,
    ) -> EngineResult<ActionOutcome> {
        let flip = match self.claim_move(actor)? {
            Ok(flip) => flip,
            Err(refused) => return Ok(refused),
        };

        let targets = if invocation.def.affects_targets() {
            let target = match target {
                Some(name) => match self.being_here(&name)? {
                    Some(id) => id,
                    None => return Ok(ActionOutcome::failed(format!("There is no {name} here."))),
                },
                None => actor.clone(),
            };
            if let (Some(range), Some(encounter)) = (invocation.range, &self.state.encounter) {
                let distance =
                    encounter.distance(&self.state.registry, actor.as_str(), target.as_str());
                if distance.is_some_and(|d| d > range) {
                    return Ok(ActionOutcome::failed(format!(
                        "{} is out of range for {}.",
                        self.name_of(&target),
                        invocation.name
                    )));
                }
            }
            vec![target]
        } else {
            Vec::new()
        };

        let now = self.state.elapsed_minutes;
        let report = self.state.effects.apply(
            &mut self.state.registry,
            Application {
                name: &invocation.name,
                def: invocation.def,
                source: Some(&invocation.source),
                targets: &targets,
            },
            now,
            self.rng,
        )?;
        if report.failed {
            return Ok(ActionOutcome::failed(report.text));
        }

        let mut lines = vec![report.text];
        let is_character = self.state.registry.get(actor)?.kind() == ObjectKind::Character;
        for dead in &report.deaths {
            let victim = self.state.registry.get(dead)?;
            if is_character && victim.kind() == ObjectKind::Monster {
                let xp = victim.being().map_or(0, |b| b.xp);
                self.state.registry.being_mut(actor)?.xp += xp;
            }
        }
        let text = lines
            .into_iter()
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        self.settle_move(actor, flip, ActionOutcome::done(text))
    }
}
