use analysis::{events, roster, stats, Config};
use common::match_analysis::{AutoFlag, Event, EventType, Outcome, Point, Side};
use common::GameScope;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn scope() -> GameScope {
    GameScope {
        game_id: uuid::Uuid::now_v7(),
        owner: "coach".to_owned(),
    }
}

fn event(scope: &GameScope, player_id: Option<uuid::Uuid>, side: Side, event_type: EventType, outcome: Outcome) -> Event {
    Event {
        id: uuid::Uuid::now_v7(),
        game_id: scope.game_id,
        timestamp: 10.0,
        event_type,
        player_id,
        player_name: None,
        side,
        start_position: Point::new(0.5, 0.5),
        end_position: None,
        outcome,
        confidence: 0.8,
        auto_flag: AutoFlag::derive(0.8, outcome),
        owner: scope.owner.clone(),
    }
}

#[test]
fn player_counts_match_events_exactly() {
    let scope = scope();
    let players = roster::detect_players(&scope);
    let mut rng = StdRng::seed_from_u64(1);
    let generated = events::generate(&Config::default(), &scope, &players, 5400, &mut rng);

    let result = stats::aggregate(&scope, &players, &generated, &mut rng);

    assert_eq!(22, result.players.len());
    assert_eq!(2, result.teams.len());

    for row in result.players.iter() {
        let own: Vec<&Event> = generated
            .iter()
            .filter(|e| e.player_id == Some(row.player_id))
            .collect();
        let count = |t: EventType| own.iter().filter(|e| e.event_type == t).count() as u32;
        let successful = |t: EventType| {
            own.iter()
                .filter(|e| e.event_type == t && e.outcome == Outcome::Successful)
                .count() as u32
        };

        assert_eq!(own.len() as u32, row.derived.touches);
        assert_eq!(count(EventType::Pass), row.derived.passes);
        assert_eq!(successful(EventType::Pass), row.derived.passes_completed);
        assert_eq!(count(EventType::Shot), row.derived.shots);
        assert_eq!(successful(EventType::Shot), row.derived.shots_on_target);
        assert_eq!(count(EventType::Dribble), row.derived.dribbles);
        assert_eq!(successful(EventType::Dribble), row.derived.dribbles_successful);
        assert_eq!(count(EventType::Tackle), row.derived.recoveries);
    }

    let total_touches: u32 = result.players.iter().map(|p| p.derived.touches).sum();
    assert_eq!(200, total_touches);
}

#[test]
fn team_pass_accuracy() {
    let scope = scope();
    let players = roster::detect_players(&scope);
    let mut rng = StdRng::seed_from_u64(2);
    let generated = events::generate(&Config::default(), &scope, &players, 5400, &mut rng);

    for side in [Side::Home, Side::Away] {
        let team = stats::team_event_stats(side, &generated);
        let passes: Vec<_> = generated
            .iter()
            .filter(|e| e.side == side && e.event_type == EventType::Pass)
            .collect();
        let completed = passes.iter().filter(|e| e.outcome == Outcome::Successful).count();

        assert_eq!(passes.len() as u32, team.passes);
        assert_eq!(completed as u32, team.passes_completed);
        assert_eq!(completed as f64 / passes.len() as f64 * 100.0, team.pass_accuracy);
    }
}

#[test]
fn pass_accuracy_is_zero_without_passes() {
    let scope = scope();
    let only_shots = vec![
        event(&scope, None, Side::Home, EventType::Shot, Outcome::Successful),
        event(&scope, None, Side::Away, EventType::Pass, Outcome::Successful),
    ];

    let home = stats::team_event_stats(Side::Home, &only_shots);

    assert_eq!(0, home.passes);
    assert_eq!(0.0, home.pass_accuracy);
    assert!(!home.pass_accuracy.is_nan());
    assert_eq!(1, home.shots);
    assert_eq!(100.0, stats::team_event_stats(Side::Away, &only_shots).pass_accuracy);
}

#[test]
fn tolerates_untracked_types_and_unresolved_players() {
    let scope = scope();
    let players = roster::detect_players(&scope);
    let target = players[0].id;
    let mixed = vec![
        event(&scope, Some(target), Side::Home, EventType::Foul, Outcome::Failed),
        event(&scope, Some(target), Side::Home, EventType::Goal, Outcome::Successful),
        event(&scope, Some(target), Side::Home, EventType::Card, Outcome::Failed),
        event(&scope, None, Side::Home, EventType::Pass, Outcome::Successful),
    ];

    let player = stats::player_event_stats(target, &mixed);
    let team = stats::team_event_stats(Side::Home, &mixed);

    assert_eq!(3, player.touches);
    assert_eq!(0, player.passes);
    assert_eq!(0, player.shots);
    assert_eq!(0, player.recoveries);
    assert_eq!(1, team.passes);
}

#[test]
fn derived_fields_are_idempotent() {
    let scope = scope();
    let players = roster::detect_players(&scope);
    let generated = events::generate(&Config::default(), &scope, &players, 5400, &mut StdRng::seed_from_u64(3));

    let first = stats::aggregate(&scope, &players, &generated, &mut StdRng::seed_from_u64(10));
    let second = stats::aggregate(&scope, &players, &generated, &mut StdRng::seed_from_u64(11));

    let derived_players = |a: &stats::Aggregate| a.players.iter().map(|p| p.derived.clone()).collect::<Vec<_>>();
    let derived_teams = |a: &stats::Aggregate| a.teams.iter().map(|t| t.derived.clone()).collect::<Vec<_>>();

    assert_eq!(derived_players(&first), derived_players(&second));
    assert_eq!(derived_teams(&first), derived_teams(&second));
}

#[test]
fn enrichment_stays_in_range() {
    let mut rng = StdRng::seed_from_u64(4);

    for _ in 0..500 {
        let player = stats::player_enrichment(&mut rng);
        assert_eq!(90, player.minutes_played);
        assert!(player.key_passes < 5);
        assert!(player.assists < 2);
        assert!(player.goals < 3);
        assert!((0.0..2.0).contains(&player.expected_goals));

        let home = stats::team_enrichment(Side::Home, &mut rng);
        let away = stats::team_enrichment(Side::Away, &mut rng);
        assert!((55.0..75.0).contains(&home.possession));
        assert!((45.0..65.0).contains(&away.possession));
        assert!((2..10).contains(&home.corners));
        assert!((5..20).contains(&away.fouls));
        assert_eq!(0, home.red_cards);
    }
}
