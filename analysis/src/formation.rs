use std::collections::HashMap;

use common::match_analysis::{FormationPlayerPosition, FormationSnapshot, Player, Point, Position, Side};
use common::GameScope;
use rand::seq::SliceRandom;
use rand::Rng;

pub const FORMATIONS: [&str; 4] = ["4-3-3", "4-4-2", "4-2-3-1", "3-5-2"];

pub const CONFIDENCE_RANGE: std::ops::RangeInclusive<f64> = 0.8..=1.0;

/// Maximum offset applied to each axis of a base coordinate.
pub const JITTER: f64 = 0.05;

/// Base coordinates of a role for the home side, attacking towards `x = 1`.
///
/// Roles with more than one slot are filled in roster order. Roles with a
/// single slot put every player of that role on it. Defensive and attacking
/// midfielders have no slot and are never placed.
pub fn base_slots(role: Position) -> &'static [Point] {
    match role {
        Position::Goalkeeper => &[Point { x: 0.1, y: 0.5 }],
        Position::CenterBack => &[Point { x: 0.25, y: 0.3 }, Point { x: 0.25, y: 0.7 }],
        Position::LeftBack => &[Point { x: 0.25, y: 0.1 }],
        Position::RightBack => &[Point { x: 0.25, y: 0.9 }],
        Position::CentralMidfield => &[
            Point { x: 0.45, y: 0.3 },
            Point { x: 0.45, y: 0.5 },
            Point { x: 0.45, y: 0.7 },
        ],
        Position::LeftWing => &[Point { x: 0.7, y: 0.2 }],
        Position::RightWing => &[Point { x: 0.7, y: 0.8 }],
        Position::Striker => &[Point { x: 0.8, y: 0.5 }],
        Position::DefensiveMidfield | Position::AttackingMidfield => &[],
    }
}

/// Seconds at which snapshots are taken: every multiple of `interval` below `duration`.
pub fn snapshot_times(duration: u32, interval: u32) -> impl Iterator<Item = u32> {
    (0..duration).step_by(interval.max(1) as usize)
}

/// One snapshot per side at every multiple of the configured interval.
#[tracing::instrument(skip(config, scope, roster, rng), fields(game = %scope.game_id))]
pub fn generate<R>(
    config: &crate::Config,
    scope: &GameScope,
    roster: &[Player],
    duration: u32,
    rng: &mut R,
) -> Vec<FormationSnapshot>
where
    R: Rng + ?Sized,
{
    let home = crate::roster::side_players(roster, Side::Home, config.max_players_per_side);
    let away = crate::roster::side_players(roster, Side::Away, config.max_players_per_side);

    let mut snapshots = Vec::new();
    for timestamp in snapshot_times(duration, config.formation_interval) {
        for (side, players) in [(Side::Home, &home), (Side::Away, &away)] {
            let formation = FORMATIONS
                .choose(&mut *rng)
                .copied()
                .unwrap_or(FORMATIONS[0]);

            snapshots.push(FormationSnapshot {
                id: uuid::Uuid::now_v7(),
                game_id: scope.game_id,
                timestamp,
                side,
                formation: formation.to_owned(),
                confidence: rng.gen_range(CONFIDENCE_RANGE),
                players: place(players, side, &mut *rng),
                owner: scope.owner.clone(),
            });
        }
    }

    tracing::debug!("Generated {} snapshots", snapshots.len());

    snapshots
}

/// Puts each player on the base coordinate of their role, mirrored for the
/// away side, with independent jitter on both axes.
pub fn place<R>(players: &[&Player], side: Side, rng: &mut R) -> Vec<FormationPlayerPosition>
where
    R: Rng + ?Sized,
{
    let mut used_slots: HashMap<Position, usize> = HashMap::new();

    players
        .iter()
        .filter_map(|player| {
            let slots = base_slots(player.position);
            let base = match slots {
                [] => return None,
                [single] => *single,
                many => {
                    let used = used_slots.entry(player.position).or_default();
                    let slot = many.get(*used)?;
                    *used += 1;
                    *slot
                }
            };

            let x = match side {
                Side::Home => base.x,
                Side::Away => 1.0 - base.x,
            };

            Some(FormationPlayerPosition {
                player_id: Some(player.id),
                player_name: player.name.clone(),
                position: Point::new(
                    x + rng.gen_range(-JITTER..JITTER),
                    base.y + rng.gen_range(-JITTER..JITTER),
                ),
                role: player.position,
            })
        })
        .collect()
}
