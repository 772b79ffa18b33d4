//! A ready-made starter rule set.
//!
//! Produces the same [`Rules`] that an equivalent `rules.json` would, so
//! tests and quick demos do not need a scenario directory.

use std::collections::BTreeMap;

use rw_core::{Attack, ModMode, ModValue, Stats, StatPath};

use crate::dice::{DiceExpr, Die};
use crate::effects::{EffectDef, ModifierDef};
use crate::rules::{ItemDef, ItemKind, MonsterDef, Rules, SkillDef, SpellDef};

/// A small fantasy rule set: a handful of weapons, spells and monsters.
pub fn starter() -> Rules {
    Rules {
        name: "starter".to_string(),
        spells: spells(),
        equipment: equipment(),
        monsters: monsters(),
        skills: skills(),
        currency: None,
    }
}

fn modifier(path: StatPath, mode: ModMode, value: ModValue) -> ModifierDef {
    ModifierDef { path, mode, value }
}

fn spells() -> BTreeMap<String, SpellDef> {
    let mut spells = BTreeMap::new();
    spells.insert(
        "cure wounds".to_string(),
        SpellDef {
            description: "A warm light closes wounds.".to_string(),
            level: 1,
            range: 0,
            effect: EffectDef {
                heal: Some(DiceExpr::dice(1, Die::D8).plus(2)),
                ..EffectDef::default()
            },
        },
    );
    spells.insert(
        "magic missile".to_string(),
        SpellDef {
            description: "Three darts of force streak out.".to_string(),
            level: 1,
            range: 120,
            effect: EffectDef {
                damage: Some(DiceExpr::dice(3, Die::D4).plus(3)),
                ..EffectDef::default()
            },
        },
    );
    spells.insert(
        "bless".to_string(),
        SpellDef {
            description: "A divine favor settles on the target.".to_string(),
            level: 1,
            range: 30,
            effect: EffectDef {
                modifiers: vec![modifier(
                    StatPath::Basic(rw_core::BasicStat::Defense),
                    ModMode::Add,
                    ModValue::Int(1),
                )],
                duration: Some(10),
                ..EffectDef::default()
            },
        },
    );
    spells.insert(
        "sleep".to_string(),
        SpellDef {
            description: "A heavy drowsiness falls.".to_string(),
            level: 1,
            range: 90,
            effect: EffectDef {
                modifiers: vec![modifier(
                    StatPath::Conditions,
                    ModMode::Or,
                    ModValue::Text("asleep".to_string()),
                )],
                turns: Some(2),
                ..EffectDef::default()
            },
        },
    );
    spells.insert(
        "light".to_string(),
        SpellDef {
            description: "The target glows softly.".to_string(),
            level: 0,
            range: 0,
            effect: EffectDef {
                modifiers: vec![modifier(
                    StatPath::Ability("glowing".to_string()),
                    ModMode::Set,
                    ModValue::Bool(true),
                )],
                duration: Some(60),
                ..EffectDef::default()
            },
        },
    );
    spells
}

fn weapon(description: &str, damage: DiceExpr, range: i64, value: u32) -> ItemDef {
    ItemDef {
        description: description.to_string(),
        kind: ItemKind::Weapon,
        damage: Some(damage),
        range,
        value,
        ..ItemDef::default()
    }
}

fn equipment() -> BTreeMap<String, ItemDef> {
    let mut items = BTreeMap::new();
    items.insert(
        "longsword".to_string(),
        weapon("A well-balanced blade.", DiceExpr::dice(1, Die::D8), 0, 15),
    );
    items.insert(
        "dagger".to_string(),
        ItemDef {
            ability: Some("dexterity".to_string()),
            ..weapon("A short, sharp knife.", DiceExpr::dice(1, Die::D4), 0, 2)
        },
    );
    items.insert(
        "shortbow".to_string(),
        ItemDef {
            ammo: Some("arrow".to_string()),
            ..weapon("A light hunting bow.", DiceExpr::dice(1, Die::D6), 80, 25)
        },
    );
    items.insert(
        "arrow".to_string(),
        ItemDef {
            description: "A fletched arrow.".to_string(),
            kind: ItemKind::Ammo,
            value: 1,
            ..ItemDef::default()
        },
    );
    items.insert(
        "leather armor".to_string(),
        ItemDef {
            description: "Boiled leather, supple and light.".to_string(),
            kind: ItemKind::Armor,
            defense: 1,
            value: 10,
            ..ItemDef::default()
        },
    );
    items.insert(
        "chain mail".to_string(),
        ItemDef {
            description: "Heavy interlocking rings.".to_string(),
            kind: ItemKind::Armor,
            defense: 4,
            value: 75,
            ..ItemDef::default()
        },
    );

    let mut torch_verbs = BTreeMap::new();
    torch_verbs.insert(
        "light".to_string(),
        EffectDef {
            description: "The torch flares to life.".to_string(),
            sets_state: Some("lit".to_string()),
            duration: Some(60),
            ..EffectDef::default()
        },
    );
    items.insert(
        "torch".to_string(),
        ItemDef {
            description: "A stick wrapped in oil-soaked rags.".to_string(),
            value: 1,
            verbs: torch_verbs,
            ..ItemDef::default()
        },
    );
    items.insert(
        "healing potion".to_string(),
        ItemDef {
            description: "A small vial of red liquid.".to_string(),
            kind: ItemKind::Consumable,
            value: 50,
            effect: Some(EffectDef {
                description: "The potion tastes of cherries.".to_string(),
                heal: Some(DiceExpr::dice(2, Die::D4).plus(2)),
                ..EffectDef::default()
            }),
            ..ItemDef::default()
        },
    );
    items.insert(
        "rope".to_string(),
        ItemDef {
            description: "Fifty feet of hempen rope.".to_string(),
            value: 1,
            ..ItemDef::default()
        },
    );
    items.insert(
        "gold".to_string(),
        ItemDef {
            description: "Gold coins.".to_string(),
            value: 1,
            ..ItemDef::default()
        },
    );
    items
}

fn monster_stats(health: i64, defense: i64, strength: i64, dexterity: i64) -> Stats {
    let mut stats = Stats::default();
    stats.basic.max_health = health;
    stats.basic.cur_health = health;
    stats.basic.defense = defense;
    stats.attributes.insert("strength".to_string(), strength);
    stats.attributes.insert("dexterity".to_string(), dexterity);
    stats
}

fn attack(name: &str, damage: &str, range: i64, to_hit: &str) -> Attack {
    Attack {
        name: name.to_string(),
        damage: damage.to_string(),
        range,
        to_hit: Some(to_hit.to_string()),
    }
}

fn monsters() -> BTreeMap<String, MonsterDef> {
    let mut monsters = BTreeMap::new();
    monsters.insert(
        "goblin".to_string(),
        MonsterDef {
            description: "A small, wiry creature with a wicked grin.".to_string(),
            stats: monster_stats(7, 13, 8, 14),
            attacks: vec![
                attack("scimitar", "1d6+2", 0, "4"),
                attack("shortbow", "1d6+2", 80, "4"),
            ],
            xp: 50,
            items: vec!["dagger".to_string()],
            image: None,
        },
    );
    monsters.insert(
        "wolf".to_string(),
        MonsterDef {
            description: "A lean grey wolf, hackles raised.".to_string(),
            stats: monster_stats(11, 13, 12, 15),
            attacks: vec![attack("bite", "2d4+2", 0, "4")],
            xp: 50,
            items: Vec::new(),
            image: None,
        },
    );
    monsters.insert(
        "skeleton".to_string(),
        MonsterDef {
            description: "Bones held together by old malice.".to_string(),
            stats: monster_stats(13, 13, 10, 14),
            attacks: vec![attack("shortsword", "1d6+2", 0, "4")],
            xp: 50,
            items: Vec::new(),
            image: None,
        },
    );
    monsters
}

fn skills() -> BTreeMap<String, SkillDef> {
    [
        ("acrobatics", "dexterity"),
        ("athletics", "strength"),
        ("investigation", "intelligence"),
        ("perception", "wisdom"),
        ("persuasion", "charisma"),
        ("stealth", "dexterity"),
        ("survival", "wisdom"),
    ]
    .into_iter()
    .map(|(skill, ability)| {
        (
            skill.to_string(),
            SkillDef {
                ability: ability.to_string(),
            },
        )
    })
    .collect()
}
