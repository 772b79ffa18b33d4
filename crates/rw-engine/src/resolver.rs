//! Name resolution with fuzzy matching.
//!
//! Narrators misspell and abbreviate; names are matched exactly first, then
//! case-insensitively, then by Jaro-Winkler similarity.

use rw_core::{ObjectId, Registry};
use strsim::jaro_winkler;

/// Resolve `input` to one of `candidates`.
pub fn resolve_among(
    registry: &Registry,
    candidates: &[ObjectId],
    input: &str,
    threshold: f64,
) -> Option<ObjectId> {
    let input = input.trim();
    if let Some(id) = candidates.iter().find(|id| id.as_str() == input) {
        return Some(id.clone());
    }
    if let Some(id) = candidates.iter().find(|id| {
        id.as_str().eq_ignore_ascii_case(input)
            || registry
                .resolve(id.as_str())
                .is_some_and(|o| o.name.eq_ignore_ascii_case(input))
    }) {
        return Some(id.clone());
    }
    fuzzy_match(registry, candidates, input, threshold)
        .into_iter()
        .next()
        .map(|(id, _)| id)
}

/// Candidates whose unique or display name is similar to `input`,
/// best first.
pub fn fuzzy_match(
    registry: &Registry,
    candidates: &[ObjectId],
    input: &str,
    threshold: f64,
) -> Vec<(ObjectId, f64)> {
    let input_lower = input.to_lowercase();
    let mut matches: Vec<(ObjectId, f64)> = candidates
        .iter()
        .filter_map(|id| {
            let by_id = jaro_winkler(&input_lower, &id.as_str().to_lowercase());
            let by_name = registry
                .resolve(id.as_str())
                .map(|o| jaro_winkler(&input_lower, &o.name.to_lowercase()))
                .unwrap_or(0.0);
            let score = by_id.max(by_name);
            (score >= threshold).then(|| (id.clone(), score))
        })
        .collect();
    // Stable sort keeps candidate order among equal scores.
    matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_core::{Being, ItemState, ObjectBody, Owner, WorldObject};

    fn setup() -> (Registry, Vec<ObjectId>) {
        let mut reg = Registry::new();
        let alice = reg
            .register(
                WorldObject::new("Alice", ObjectBody::Character(Being::default())),
                Owner::Root,
            )
            .unwrap();
        let potion = reg
            .register(
                WorldObject::new("Healing Potion", ObjectBody::Item(ItemState::default())),
                Owner::Object(alice.clone()),
            )
            .unwrap();
        let rope = reg
            .register(
                WorldObject::new("Rope", ObjectBody::Item(ItemState::default())),
                Owner::Object(alice),
            )
            .unwrap();
        (reg, vec![potion, rope])
    }

    #[test]
    fn exact_then_case_insensitive() {
        let (reg, items) = setup();
        assert_eq!(resolve_among(&reg, &items, "Rope", 0.8), Some(items[1].clone()));
        assert_eq!(
            resolve_among(&reg, &items, "healing potion", 0.8),
            Some(items[0].clone())
        );
    }

    #[test]
    fn fuzzy_catches_typos() {
        let (reg, items) = setup();
        assert_eq!(
            resolve_among(&reg, &items, "Healing Potoin", 0.8),
            Some(items[0].clone())
        );
    }

    #[test]
    fn unrelated_names_do_not_match() {
        let (reg, items) = setup();
        assert_eq!(resolve_among(&reg, &items, "Torch", 0.8), None);
    }
}
