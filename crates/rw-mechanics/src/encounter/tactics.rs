//! A simple policy for monsters when the engine plays their side.

use rw_core::{ObjectId, Registry};

use super::moves::{ATTACK_CLOSE_DISTANCE, DASH};
use super::{Encounter, Move, Side};

/// Choose a move for `monster`: attack the closest character in reach,
/// shoot if a ranged attack covers the distance, otherwise close in.
pub fn plan_monster_move(
    encounter: &Encounter,
    registry: &Registry,
    monster: &ObjectId,
) -> (Move, Option<ObjectId>) {
    let Some(being) = registry.resolve(monster.as_str()).and_then(|o| o.being()) else {
        return (Move::Skip, None);
    };
    let closest = encounter
        .fighting(registry, Side::Players)
        .into_iter()
        .filter_map(|id| {
            let d = encounter.distance(registry, monster.as_str(), id.as_str())?;
            Some((id, d))
        })
        .min_by_key(|(_, d)| *d);
    let Some((target, distance)) = closest else {
        return (Move::Skip, None);
    };

    let has_melee = being.attacks.is_empty() || being.attacks.iter().any(|a| a.range == 0);
    let ranged_reach = being
        .attacks
        .iter()
        .filter(|a| a.range > 0)
        .map(|a| a.range)
        .max();

    if has_melee && distance <= ATTACK_CLOSE_DISTANCE {
        return (Move::Attack, Some(target));
    }
    if ranged_reach.is_some_and(|reach| reach >= distance) {
        return (Move::Shoot, Some(target));
    }
    if distance > DASH / 2 {
        (Move::Charge, None)
    } else {
        (Move::Advance, None)
    }
}
