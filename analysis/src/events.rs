use common::match_analysis::{AutoFlag, Event, EventType, Outcome, Player, Point};
use common::GameScope;
use rand::seq::SliceRandom;
use rand::Rng;

/// Event types the detector emits. Fouls, goals and cards are never produced.
pub const GENERATED_TYPES: [EventType; 4] = [
    EventType::Pass,
    EventType::Shot,
    EventType::Dribble,
    EventType::Tackle,
];

pub const CONFIDENCE_RANGE: std::ops::RangeInclusive<f64> = 0.7..=1.0;

/// Chance that a generated event of the given type is successful.
pub fn success_probability(event_type: EventType) -> Option<f64> {
    match event_type {
        EventType::Pass => Some(0.85),
        EventType::Shot => Some(0.20),
        EventType::Tackle => Some(0.60),
        EventType::Dribble => Some(0.50),
        EventType::Foul | EventType::Goal | EventType::Card => None,
    }
}

/// Generates `config.event_count` events spread over `[0, duration)`.
///
/// Every event is attributed to a uniformly chosen roster player. An empty
/// roster or a zero duration yields no events.
#[tracing::instrument(skip(config, scope, roster, rng), fields(game = %scope.game_id, players = roster.len()))]
pub fn generate<R>(
    config: &crate::Config,
    scope: &GameScope,
    roster: &[Player],
    duration: u32,
    rng: &mut R,
) -> Vec<Event>
where
    R: Rng + ?Sized,
{
    if roster.is_empty() || duration == 0 {
        tracing::warn!("Nothing to generate events for");
        return Vec::new();
    }

    (0..config.event_count)
        .filter_map(|_| {
            let player = roster.choose(&mut *rng)?;
            Some(generate_one(scope, player, duration, &mut *rng))
        })
        .collect()
}

fn generate_one<R>(scope: &GameScope, player: &Player, duration: u32, rng: &mut R) -> Event
where
    R: Rng + ?Sized,
{
    let timestamp = rng.gen_range(0.0..f64::from(duration));
    let event_type = GENERATED_TYPES[rng.gen_range(0..GENERATED_TYPES.len())];

    let success = success_probability(event_type).unwrap_or(1.0);
    let outcome = if rng.gen_bool(success) {
        Outcome::Successful
    } else {
        Outcome::Failed
    };
    let confidence = rng.gen_range(CONFIDENCE_RANGE);

    let start_position = Point::new(rng.gen(), rng.gen());
    // Always set, even for types without a direction.
    let end_position = Point::new(rng.gen(), rng.gen());

    Event {
        id: uuid::Uuid::now_v7(),
        game_id: scope.game_id,
        timestamp,
        event_type,
        player_id: Some(player.id),
        player_name: Some(player.name.clone()),
        side: player.side,
        start_position,
        end_position: Some(end_position),
        outcome,
        confidence,
        auto_flag: AutoFlag::derive(confidence, outcome),
        owner: scope.owner.clone(),
    }
}
