//! Cross-reference checks over a whole scenario.

use rw_mechanics::{ValidationIssue, validate_rules};

use super::{EncounterDef, ItemPlacement, Location, SCRIPT_DONE, Scenario};

/// Validate rules, module and party together. Returns every issue found.
pub fn validate_scenario(scenario: &Scenario) -> Vec<ValidationIssue> {
    let mut issues = validate_rules(&scenario.rules);
    let module = &scenario.module;

    if !module.locations.contains_key(&module.start_location) {
        issues.push(ValidationIssue::error(
            "module",
            format!("start location '{}' does not exist", module.start_location),
        ));
    }
    if scenario.party.characters.is_empty() {
        issues.push(ValidationIssue::error("party", "has no characters"));
    }

    for (key, location) in &module.locations {
        check_location(scenario, key, location, &mut issues);
    }

    for (key, npc) in &module.npcs {
        if let Some(store) = &npc.store {
            let entity = format!("npc '{key}'");
            check_items(scenario, &entity, &store.stock, &mut issues);
            if store.buys_at > 100 {
                issues.push(ValidationIssue::warning(
                    &entity,
                    format!("buys at {}% of value", store.buys_at),
                ));
            }
        }
    }

    for (key, area) in &module.areas {
        let entity = format!("area '{key}'");
        if area.min_minutes > area.max_minutes {
            issues.push(ValidationIssue::error(
                &entity,
                "min_minutes is greater than max_minutes",
            ));
        }
        for encounter in &area.encounters {
            check_encounter(scenario, &entity, encounter, &mut issues);
        }
        if !module
            .locations
            .values()
            .any(|l| l.area.as_deref() == Some(key.as_str()))
        {
            issues.push(ValidationIssue::warning(&entity, "no location uses it"));
        }
    }

    for character in &scenario.party.characters {
        let entity = format!("character '{}'", character.name);
        check_items(scenario, &entity, &character.items, &mut issues);
        for name in &character.equip {
            if !character
                .items
                .iter()
                .any(|p| p.display_name().eq_ignore_ascii_case(name))
            {
                issues.push(ValidationIssue::error(
                    &entity,
                    format!("equips '{name}' but does not carry it"),
                ));
            }
        }
        for spell in &character.spells {
            if scenario.rules.spell(spell).is_none() {
                issues.push(ValidationIssue::error(
                    &entity,
                    format!("knows unknown spell '{spell}'"),
                ));
            }
        }
    }

    issues
}

fn check_location(
    scenario: &Scenario,
    key: &str,
    location: &Location,
    issues: &mut Vec<ValidationIssue>,
) {
    let module = &scenario.module;
    let entity = format!("location '{key}'");
    let known_location = |target: &str| module.locations.contains_key(target);

    let overlay_exits = location.script.values().flat_map(|s| s.exits.iter());
    for (name, exit) in location.exits.iter().chain(overlay_exits) {
        if !known_location(&exit.to) {
            issues.push(ValidationIssue::error(
                &entity,
                format!("exit '{name}' leads to unknown location '{}'", exit.to),
            ));
        }
    }

    let overlay_tasks = location.script.values().flat_map(|s| s.tasks.iter());
    for (name, task) in location.tasks.iter().chain(overlay_tasks) {
        for (exit, target) in &task.unlocks {
            if !known_location(target) {
                issues.push(ValidationIssue::error(
                    &entity,
                    format!("task '{name}' opens exit '{exit}' to unknown location '{target}'"),
                ));
            }
        }
        if let Some(next) = &task.next_state {
            if next != SCRIPT_DONE && !location.script.contains_key(next) {
                issues.push(ValidationIssue::error(
                    &entity,
                    format!("task '{name}' moves to unknown script state '{next}'"),
                ));
            }
        }
    }

    let overlay_npcs = location
        .script
        .values()
        .filter_map(|s| s.npcs.as_ref())
        .flatten();
    for npc in location.npcs.iter().chain(overlay_npcs) {
        if !module.npcs.contains_key(npc) {
            issues.push(ValidationIssue::error(
                &entity,
                format!("unknown NPC '{npc}'"),
            ));
        }
    }

    check_items(scenario, &entity, &location.items, issues);
    check_items(scenario, &entity, &location.hidden_items, issues);

    let overlay_encounters = location
        .script
        .values()
        .filter_map(|s| s.encounter.as_ref());
    for encounter in location.encounter.iter().chain(overlay_encounters) {
        check_encounter(scenario, &entity, encounter, issues);
    }

    if let Some(area) = &location.area {
        if !module.areas.contains_key(area) {
            issues.push(ValidationIssue::error(
                &entity,
                format!("unknown area '{area}'"),
            ));
        }
    }

    if let Some(initial) = &location.initial_script_state {
        if !location.script.contains_key(initial) {
            issues.push(ValidationIssue::error(
                &entity,
                format!("initial script state '{initial}' does not exist"),
            ));
        }
    }
    for (state_name, state) in &location.script {
        for transition in &state.transitions {
            let to = transition.to.as_str();
            if !(to.is_empty() || to == SCRIPT_DONE || location.script.contains_key(to)) {
                issues.push(ValidationIssue::error(
                    &entity,
                    format!("script state '{state_name}' transitions to unknown state '{to}'"),
                ));
            }
        }
        if let Some(target) = &state.goto_location {
            if !known_location(target) {
                issues.push(ValidationIssue::error(
                    &entity,
                    format!("script state '{state_name}' sends the party to unknown location '{target}'"),
                ));
            }
        }
    }
}

fn check_items(
    scenario: &Scenario,
    entity: &str,
    items: &[ItemPlacement],
    issues: &mut Vec<ValidationIssue>,
) {
    for placement in items {
        if scenario.rules.item(&placement.item).is_none() {
            issues.push(ValidationIssue::error(
                entity,
                format!("unknown item '{}'", placement.item),
            ));
        }
        if placement.qty == Some(0) {
            issues.push(ValidationIssue::warning(
                entity,
                format!("places zero '{}'", placement.item),
            ));
        }
    }
}

fn check_encounter(
    scenario: &Scenario,
    entity: &str,
    encounter: &EncounterDef,
    issues: &mut Vec<ValidationIssue>,
) {
    if encounter.monsters.is_empty() {
        issues.push(ValidationIssue::warning(entity, "encounter without monsters"));
    }
    for group in &encounter.monsters {
        if scenario.rules.monster(&group.monster).is_none() {
            issues.push(ValidationIssue::error(
                entity,
                format!("unknown monster '{}'", group.monster),
            ));
        }
    }
}
