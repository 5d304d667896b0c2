//! Player and team statistics.
//!
//! The `*_event_stats` functions are pure functions of the event set. The
//! enrichment values are random placeholders for analysis that does not
//! exist yet and are kept apart from the derived counts.

use common::match_analysis::{
    Enrichment, Event, EventType, Outcome, Player, PlayerEnrichment, PlayerEventStats,
    PlayerStats, Side, TeamEnrichment, TeamEventStats, TeamStats,
};
use common::GameScope;
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub players: Vec<PlayerStats>,
    pub teams: Vec<TeamStats>,
}

pub fn player_event_stats(player_id: uuid::Uuid, events: &[Event]) -> PlayerEventStats {
    events
        .iter()
        .filter(|e| e.player_id == Some(player_id))
        .fold(PlayerEventStats::default(), |mut stats, event| {
            let successful = event.outcome == Outcome::Successful;

            stats.touches += 1;
            match event.event_type {
                EventType::Pass => {
                    stats.passes += 1;
                    stats.passes_completed += u32::from(successful);
                }
                // No separate on-target judgement, the outcome is reused.
                EventType::Shot => {
                    stats.shots += 1;
                    stats.shots_on_target += u32::from(successful);
                }
                EventType::Dribble => {
                    stats.dribbles += 1;
                    stats.dribbles_successful += u32::from(successful);
                }
                EventType::Tackle => {
                    stats.recoveries += 1;
                }
                EventType::Foul | EventType::Goal | EventType::Card => {}
            }

            stats
        })
}

pub fn team_event_stats(side: Side, events: &[Event]) -> TeamEventStats {
    let mut stats = events
        .iter()
        .filter(|e| e.side == side)
        .fold(TeamEventStats::default(), |mut stats, event| {
            let successful = event.outcome == Outcome::Successful;

            match event.event_type {
                EventType::Pass => {
                    stats.passes += 1;
                    stats.passes_completed += u32::from(successful);
                }
                EventType::Shot => {
                    stats.shots += 1;
                    stats.shots_on_target += u32::from(successful);
                }
                _ => {}
            }

            stats
        });

    stats.pass_accuracy = pass_accuracy(stats.passes_completed, stats.passes);
    stats
}

pub fn pass_accuracy(completed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }

    f64::from(completed) / f64::from(total) * 100.0
}

pub fn player_enrichment<R>(rng: &mut R) -> PlayerEnrichment
where
    R: Rng + ?Sized,
{
    PlayerEnrichment {
        minutes_played: 90,
        key_passes: rng.gen_range(0..5),
        assists: rng.gen_range(0..2),
        goals: rng.gen_range(0..3),
        turnovers: rng.gen_range(0..5),
        fouls: rng.gen_range(0..3),
        cards: rng.gen_range(0..2),
        expected_goals: rng.gen_range(0.0..2.0),
    }
}

pub fn team_enrichment<R>(side: Side, rng: &mut R) -> TeamEnrichment
where
    R: Rng + ?Sized,
{
    let possession = match side {
        Side::Home => rng.gen_range(55.0..75.0),
        Side::Away => rng.gen_range(45.0..65.0),
    };

    TeamEnrichment {
        possession,
        corners: rng.gen_range(2..10),
        fouls: rng.gen_range(5..20),
        yellow_cards: rng.gen_range(0..3),
        red_cards: 0,
        formation: crate::formation::FORMATIONS[0].to_owned(),
    }
}

/// Builds one stats row per roster player and one per side.
#[tracing::instrument(skip_all, fields(game = %scope.game_id, events = events.len()))]
pub fn aggregate<R>(scope: &GameScope, roster: &[Player], events: &[Event], rng: &mut R) -> Aggregate
where
    R: Rng + ?Sized,
{
    let players = roster
        .iter()
        .map(|player| PlayerStats {
            game_id: scope.game_id,
            player_id: player.id,
            player_name: player.name.clone(),
            derived: player_event_stats(player.id, events),
            enrichment: Enrichment::Placeholder(player_enrichment(&mut *rng)),
            owner: scope.owner.clone(),
        })
        .collect();

    let teams = [Side::Home, Side::Away]
        .into_iter()
        .map(|side| TeamStats {
            game_id: scope.game_id,
            side,
            derived: team_event_stats(side, events),
            enrichment: Enrichment::Placeholder(team_enrichment(side, &mut *rng)),
            owner: scope.owner.clone(),
        })
        .collect();

    Aggregate { players, teams }
}
