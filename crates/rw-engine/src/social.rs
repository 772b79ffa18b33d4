//! Conversations and trading with NPCs.

use rw_core::ObjectId;
use tracing::debug;

use crate::context::{ActionContext, join_names};
use crate::error::{EngineError, EngineResult};
use crate::game::ActionOutcome;
use crate::parser::Action;
use crate::scenario::{NpcDef, StoreDef};
use crate::state::Mode;

impl<'a> ActionContext<'a> {
    /// An NPC present at the party's location, with its definition.
    fn npc_here(&self, name: &str) -> EngineResult<Option<(ObjectId, &'a NpcDef)>> {
        let present = self.state.present_npcs(self.scenario)?;
        let Some(id) = present.into_iter().find(|id| {
            self.state
                .registry
                .resolve(id.as_str())
                .is_some_and(|o| o.answers_to(name))
        }) else {
            return Ok(None);
        };
        let key = self
            .state
            .npcs
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.clone())
            .ok_or_else(|| EngineError::Scenario(format!("NPC {id} has no definition")))?;
        let scenario = self.scenario;
        Ok(Some((id, scenario.npc(&key)?)))
    }

    /// The merchant the party is talking to, with its store.
    fn merchant(&self) -> EngineResult<Option<(ObjectId, &'a StoreDef)>> {
        let Some(partner) = self.state.dialog_partner.clone() else {
            return Ok(None);
        };
        let name = self.name_of(&partner);
        Ok(self
            .npc_here(&name)?
            .and_then(|(id, def)| def.store.as_ref().map(|store| (id, store))))
    }

    /// The stack of currency `owner` carries, with its size.
    fn purse(&self, owner: &ObjectId) -> Option<(ObjectId, u32)> {
        let currency = self.scenario.rules.currency();
        self.state
            .registry
            .children(owner.as_str())
            .iter()
            .filter_map(|id| self.state.registry.resolve(id.as_str()))
            .find(|o| o.item_def_key() == Some(currency))
            .map(|o| {
                let count = o.item().map_or(0, |i| i.count());
                (o.unique_name.clone(), count)
            })
    }

    fn value_of(&self, item: &ObjectId) -> EngineResult<u32> {
        let obj = self.state.registry.get(item)?;
        let key = obj.item_def_key().unwrap_or(&obj.name);
        self.scenario
            .rules
            .item(key)
            .map(|def| def.value)
            .ok_or_else(|| EngineError::Scenario(format!("unknown item '{key}'")))
    }

    /// `topic(npc, topic?)`: talk to an NPC.
    pub(crate) fn topic(&mut self, action: &Action) -> EngineResult<ActionOutcome> {
        let Some(name) = action.text(0) else {
            return Ok(ActionOutcome::failed("Talk to whom?"));
        };
        let Some((id, def)) = self.npc_here(&name)? else {
            return Ok(ActionOutcome::failed(format!("There is no {name} here to talk to.")));
        };
        let npc = self.name_of(&id);
        let text = match action.text(1) {
            Some(topic) => match def
                .topics
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(&topic))
            {
                Some((_, text)) => text.clone(),
                None => {
                    return Ok(ActionOutcome::failed(format!(
                        "{npc} has nothing to say about {topic}."
                    )));
                }
            },
            None if def.greeting.is_empty() => format!("{npc} nods."),
            None => def.greeting.clone(),
        };
        self.image.clone_from(&def.image);
        if self.state.mode != Mode::Encounter {
            self.state.mode = Mode::Dialog;
        }
        self.state.dialog_partner = Some(id);
        Ok(ActionOutcome::done(format!("{npc}: {text}")))
    }

    /// `bye`: end the conversation.
    pub(crate) fn bye(&mut self) -> EngineResult<ActionOutcome> {
        let partner = self.state.dialog_partner.take();
        self.state.mode = Mode::Exploration;
        Ok(ActionOutcome::done(match partner {
            Some(id) => format!("{} bids the party farewell.", self.name_of(&id)),
            None => "The conversation ends.".to_string(),
        }))
    }

    /// `browse(npc?)`: look at a merchant's wares and start trading.
    pub(crate) fn browse(&mut self, action: &Action) -> EngineResult<ActionOutcome> {
        let name = match (action.text(0), &self.state.dialog_partner) {
            (Some(name), _) => name,
            (None, Some(partner)) => self.name_of(partner),
            (None, None) => return Ok(ActionOutcome::failed("Browse whose wares?")),
        };
        let Some((id, def)) = self.npc_here(&name)? else {
            return Ok(ActionOutcome::failed(format!("There is no {name} here.")));
        };
        let npc = self.name_of(&id);
        let Some(store) = &def.store else {
            return Ok(ActionOutcome::failed(format!("{npc} has nothing to sell.")));
        };

        let currency = self.scenario.rules.currency().to_string();
        let purse = self.purse(&id).map(|(purse, _)| purse);
        let mut wares = Vec::new();
        for item in self.state.registry.children(id.as_str()) {
            if Some(item) == purse.as_ref() {
                continue;
            }
            wares.push(format!(
                "{} ({} {currency} each)",
                self.label(item),
                self.value_of(item)?
            ));
        }
        let stock = if wares.is_empty() {
            "nothing".to_string()
        } else {
            join_names(&wares)
        };
        let budget = self.purse(&id).map_or(0, |(_, n)| n);
        self.state.mode = Mode::Store;
        self.state.dialog_partner = Some(id);
        debug!(merchant = %npc, buys_at = store.buys_at, "store opened");
        Ok(ActionOutcome::done(format!(
            "{npc} sells {stock}. {npc} has {budget} {currency} and pays {}% of value.",
            store.buys_at
        )))
    }

    /// `buy(character, item, qty?)`.
    pub(crate) fn buy(&mut self, action: &Action) -> EngineResult<ActionOutcome> {
        let Some((merchant, _)) = self.merchant()? else {
            return Ok(ActionOutcome::failed("Nobody is selling anything."));
        };
        let buyer = match self.acting_character(action.text(0).as_deref())? {
            Ok(id) => id,
            Err(text) => return Ok(ActionOutcome::failed(text)),
        };
        let Some(name) = action.text(1) else {
            return Ok(ActionOutcome::failed("Buy what?"));
        };
        let purse = self.purse(&merchant).map(|(id, _)| id);
        let Some(item) = self.held_item(&merchant, &name).filter(|i| Some(i) != purse.as_ref())
        else {
            return Ok(ActionOutcome::failed(format!(
                "{} does not sell {name}.",
                self.name_of(&merchant)
            )));
        };
        let qty = action.count(2).unwrap_or(1);
        let available = self.state.registry.get(&item)?.item().map_or(1, |i| i.count());
        if qty > available {
            return Ok(ActionOutcome::failed(format!(
                "{} has only {available} {name}.",
                self.name_of(&merchant)
            )));
        }
        let price = self.value_of(&item)?.saturating_mul(qty);
        let currency = self.scenario.rules.currency().to_string();
        let funds = self.purse(&buyer);
        let have = funds.as_ref().map_or(0, |(_, n)| *n);
        if have < price {
            return Ok(ActionOutcome::failed(format!(
                "{} cannot afford that: it costs {price} {currency} and they have {have}.",
                self.name_of(&buyer)
            )));
        }

        let bought = self.state.registry.reparent(&item, &buyer, Some(qty))?;
        if let Some((coins, _)) = funds.filter(|_| price > 0) {
            self.state.registry.reparent(&coins, &merchant, Some(price))?;
        }
        Ok(ActionOutcome::done(format!(
            "{} buys {} for {price} {currency}.",
            self.name_of(&buyer),
            quantity(qty, &self.name_of(&bought))
        )))
    }

    /// `sell(character, item, qty?)`.
    pub(crate) fn sell(&mut self, action: &Action) -> EngineResult<ActionOutcome> {
        let Some((merchant, store)) = self.merchant()? else {
            return Ok(ActionOutcome::failed("Nobody is buying anything."));
        };
        let buys_at = store.buys_at;
        let seller = match self.acting_character(action.text(0).as_deref())? {
            Ok(id) => id,
            Err(text) => return Ok(ActionOutcome::failed(text)),
        };
        let Some(name) = action.text(1) else {
            return Ok(ActionOutcome::failed("Sell what?"));
        };
        let own_purse = self.purse(&seller).map(|(id, _)| id);
        let Some(item) = self
            .held_item(&seller, &name)
            .filter(|i| Some(i) != own_purse.as_ref())
        else {
            return Ok(ActionOutcome::failed(format!(
                "{} has no {name} to sell.",
                self.name_of(&seller)
            )));
        };
        let qty = action.count(2).unwrap_or(1);
        let available = self.state.registry.get(&item)?.item().map_or(1, |i| i.count());
        if qty > available {
            return Ok(ActionOutcome::failed(format!(
                "{} has only {available} {name}.",
                self.name_of(&seller)
            )));
        }
        let price = u32::try_from(
            u64::from(self.value_of(&item)?) * u64::from(qty) * u64::from(buys_at) / 100,
        )
        .unwrap_or(u32::MAX);
        let currency = self.scenario.rules.currency().to_string();
        let funds = self.purse(&merchant);
        let budget = funds.as_ref().map_or(0, |(_, n)| *n);
        if budget < price {
            return Ok(ActionOutcome::failed(format!(
                "{} cannot pay {price} {currency}; they have {budget}.",
                self.name_of(&merchant)
            )));
        }

        let sold = self.state.registry.reparent(&item, &merchant, Some(qty))?;
        if let Some((coins, _)) = funds.filter(|_| price > 0) {
            self.state.registry.reparent(&coins, &seller, Some(price))?;
        }
        Ok(ActionOutcome::done(format!(
            "{} sells {} for {price} {currency}.",
            self.name_of(&seller),
            quantity(qty, &self.name_of(&sold))
        )))
    }

    /// `leave`: stop trading.
    pub(crate) fn leave(&mut self) -> EngineResult<ActionOutcome> {
        let partner = self.state.dialog_partner.take();
        self.state.mode = Mode::Exploration;
        Ok(ActionOutcome::done(match partner {
            Some(id) => format!("The party leaves {}'s wares behind.", self.name_of(&id)),
            None => "The party stops trading.".to_string(),
        }))
    }
}

fn quantity(qty: u32, name: &str) -> String {
    if qty == 1 {
        name.to_string()
    } else {
        format!("{qty} {name}")
    }
}
