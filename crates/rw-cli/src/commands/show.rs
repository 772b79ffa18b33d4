use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use rw_core::Attack;
use rw_engine::Scenario;
use rw_mechanics::ItemDef;
use serde::Serialize;

const KINDS: &[&str] = &["locations", "npcs", "party", "items", "monsters", "spells"];

pub fn run(dir: &Path, what: &str, json: bool) -> Result<(), String> {
    let scenario = super::load_scenario(dir)?;
    let what = what.to_lowercase();

    if json {
        let rules = &scenario.rules;
        let module = &scenario.module;
        let text = match what.as_str() {
            "locations" => to_json(&module.locations),
            "npcs" => to_json(&module.npcs),
            "party" => to_json(&scenario.party),
            "items" => to_json(&rules.equipment),
            "monsters" => to_json(&rules.monsters),
            "spells" => to_json(&rules.spells),
            _ => return Err(unknown(&what)),
        }?;
        println!("{text}");
        return Ok(());
    }

    let (table, count) = match what.as_str() {
        "locations" => locations(&scenario),
        "npcs" => npcs(&scenario),
        "party" => party(&scenario),
        "items" => items(&scenario),
        "monsters" => monsters(&scenario),
        "spells" => spells(&scenario),
        _ => return Err(unknown(&what)),
    };

    if count == 0 {
        println!("  No {what} found.");
        return Ok(());
    }
    println!("{table}");
    println!();
    println!("  {count} {what}");

    Ok(())
}

fn unknown(what: &str) -> String {
    format!("cannot show \"{what}\"; try one of: {}", KINDS.join(", "))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}

/// A serde enum variant as written in scenario files.
fn label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn truncate(text: &str) -> String {
    if text.is_empty() {
        "-".to_string()
    } else if text.chars().count() > 60 {
        format!("{}...", text.chars().take(57).collect::<String>())
    } else {
        text.to_string()
    }
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn locations(scenario: &Scenario) -> (Table, usize) {
    let mut t = table(vec!["Key", "Name", "Size", "Exits", "NPCs"]);
    for (key, location) in &scenario.module.locations {
        let exits: Vec<String> = location
            .exits
            .iter()
            .map(|(name, exit)| {
                if exit.hidden {
                    format!("{name} -> {} (hidden)", exit.to)
                } else {
                    format!("{name} -> {}", exit.to)
                }
            })
            .collect();
        t.add_row(vec![
            key.clone(),
            location.name.clone(),
            label(&location.size),
            exits.join(", "),
            location.npcs.join(", "),
        ]);
    }
    (t, scenario.module.locations.len())
}

fn npcs(scenario: &Scenario) -> (Table, usize) {
    let mut t = table(vec!["Key", "Name", "Trades", "Topics"]);
    for (key, npc) in &scenario.module.npcs {
        let topics: Vec<&str> = npc.topics.keys().map(String::as_str).collect();
        t.add_row(vec![
            key.clone(),
            npc.name.clone().unwrap_or_else(|| key.clone()),
            if npc.store.is_some() { "yes" } else { "no" }.to_string(),
            topics.join(", "),
        ]);
    }
    (t, scenario.module.npcs.len())
}

fn party(scenario: &Scenario) -> (Table, usize) {
    let mut t = table(vec!["Name", "Level", "Health", "Defense", "Attributes", "Items"]);
    for character in &scenario.party.characters {
        let stats = &character.stats;
        let attributes: Vec<String> = stats
            .attributes
            .iter()
            .map(|(name, score)| format!("{name} {score} ({:+})", stats.modifier(name)))
            .collect();
        let items: Vec<String> = character
            .items
            .iter()
            .map(|p| match p.qty {
                Some(n) if n > 1 => format!("{} x{n}", p.display_name()),
                _ => p.display_name().to_string(),
            })
            .collect();
        t.add_row(vec![
            character.name.clone(),
            stats.basic.level.to_string(),
            format!("{}/{}", stats.basic.cur_health, stats.basic.max_health),
            stats.basic.defense.to_string(),
            attributes.join(", "),
            items.join(", "),
        ]);
    }
    (t, scenario.party.characters.len())
}

fn damage(def: &ItemDef) -> String {
    match (&def.damage, def.range) {
        (Some(dice), 0) => dice.to_string(),
        (Some(dice), range) => format!("{dice} ({range} ft)"),
        (None, _) => "-".to_string(),
    }
}

fn items(scenario: &Scenario) -> (Table, usize) {
    let currency = scenario.rules.currency();
    let mut t = table(vec!["Key", "Kind", "Damage", "Value", "Description"]);
    for (key, def) in &scenario.rules.equipment {
        t.add_row(vec![
            key.clone(),
            label(&def.kind),
            damage(def),
            format!("{} {currency}", def.value),
            truncate(&def.description),
        ]);
    }
    (t, scenario.rules.equipment.len())
}

fn attacks(list: &[Attack]) -> String {
    if list.is_empty() {
        return "-".to_string();
    }
    list.iter()
        .map(|a| format!("{} {}", a.name, a.damage))
        .collect::<Vec<_>>()
        .join(", ")
}

fn monsters(scenario: &Scenario) -> (Table, usize) {
    let mut t = table(vec!["Key", "Health", "Defense", "Attacks", "XP"]);
    for (key, def) in &scenario.rules.monsters {
        t.add_row(vec![
            key.clone(),
            def.stats.basic.max_health.to_string(),
            def.stats.basic.defense.to_string(),
            attacks(&def.attacks),
            def.xp.to_string(),
        ]);
    }
    (t, scenario.rules.monsters.len())
}

fn spells(scenario: &Scenario) -> (Table, usize) {
    let mut t = table(vec!["Name", "Level", "Range", "Description"]);
    for (name, def) in &scenario.rules.spells {
        t.add_row(vec![
            name.clone(),
            def.level.to_string(),
            if def.range == 0 {
                "touch".to_string()
            } else {
                format!("{} ft", def.range)
            },
            truncate(&def.description),
        ]);
    }
    (t, scenario.rules.spells.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_descriptions_are_cut() {
        let long = "x".repeat(80);
        assert_eq!(truncate(&long).chars().count(), 60);
        assert_eq!(truncate(""), "-");
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn enum_labels_use_file_spelling() {
        assert_eq!(label(&rw_mechanics::ItemKind::Consumable), "consumable");
    }
}
