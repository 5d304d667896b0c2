//! Row types of the PostgreSQL tables and their conversions from and to the
//! shared records.
//!
//! Enumerations are stored as their text codes. Reading a code that no
//! variant knows fails with [`common::UnknownVariant`].

use common::match_analysis::{
    Enrichment, Event, FormationPlayerPosition, FormationSnapshot, Player, PlayerEnrichment,
    PlayerEventStats, PlayerStats, Point, TeamEnrichment, TeamEventStats, TeamStats,
};
use common::{Game, Job, UnknownVariant};
use diesel::prelude::*;

const PLACEHOLDER_SOURCE: &str = "placeholder";

fn enrichment_source<T>(enrichment: &Enrichment<T>) -> &'static str {
    match enrichment {
        Enrichment::Placeholder(_) => PLACEHOLDER_SOURCE,
    }
}

fn enrichment<T>(source: &str, values: T) -> Result<Enrichment<T>, UnknownVariant> {
    match source {
        PLACEHOLDER_SOURCE => Ok(Enrichment::Placeholder(values)),
        other => Err(UnknownVariant {
            kind: "Enrichment",
            value: other.to_owned(),
        }),
    }
}

// Counters never leave the u32 range in practice, the database columns are signed.
fn to_db(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn from_db(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = crate::schema::games)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GameRow {
    pub id: uuid::Uuid,
    pub home_team: String,
    pub away_team: String,
    pub date: chrono::NaiveDate,
    pub duration: i32,
    pub status: String,
    pub video_file: Option<String>,
    pub video_url: Option<String>,
    pub user_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&Game> for GameRow {
    fn from(game: &Game) -> Self {
        Self {
            id: game.id,
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            date: game.date,
            duration: to_db(game.duration),
            status: game.status.as_str().to_owned(),
            video_file: game.video_file.clone(),
            video_url: game.video_url.clone(),
            user_id: game.owner.clone(),
            created_at: game.created_at,
            processed_at: game.processed_at,
        }
    }
}

impl TryFrom<GameRow> for Game {
    type Error = UnknownVariant;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            home_team: row.home_team,
            away_team: row.away_team,
            date: row.date,
            duration: from_db(row.duration),
            status: row.status.parse()?,
            video_file: row.video_file,
            video_url: row.video_url,
            owner: row.user_id,
            created_at: row.created_at,
            processed_at: row.processed_at,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = crate::schema::processing_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRow {
    pub id: uuid::Uuid,
    pub game_id: uuid::Uuid,
    pub stage: String,
    pub progress: i16,
    pub message: Option<String>,
    pub error_message: Option<String>,
    pub user_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            game_id: job.game_id,
            stage: job.stage.as_str().to_owned(),
            progress: i16::from(job.progress),
            message: job.message.clone(),
            error_message: job.error_message.clone(),
            user_id: job.owner.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

impl TryFrom<JobRow> for Job {
    type Error = UnknownVariant;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            game_id: row.game_id,
            stage: row.stage.parse()?,
            progress: row.progress.clamp(0, 100) as u8,
            message: row.message,
            error_message: row.error_message,
            owner: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = crate::schema::players)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlayerRow {
    pub id: uuid::Uuid,
    pub game_id: uuid::Uuid,
    pub name: String,
    pub position: String,
    pub team: String,
    pub jersey_number: i16,
    pub user_id: String,
}

impl From<&Player> for PlayerRow {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            game_id: player.game_id,
            name: player.name.clone(),
            position: player.position.as_str().to_owned(),
            team: player.side.as_str().to_owned(),
            jersey_number: i16::from(player.jersey_number),
            user_id: player.owner.clone(),
        }
    }
}

impl TryFrom<PlayerRow> for Player {
    type Error = UnknownVariant;

    fn try_from(row: PlayerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            game_id: row.game_id,
            name: row.name,
            position: row.position.parse()?,
            side: row.team.parse()?,
            jersey_number: u8::try_from(row.jersey_number).unwrap_or_default(),
            owner: row.user_id,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = crate::schema::events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventRow {
    pub id: uuid::Uuid,
    pub game_id: uuid::Uuid,
    pub timestamp_seconds: f64,
    pub event_type: String,
    pub player_id: Option<uuid::Uuid>,
    pub player_name: Option<String>,
    pub team: String,
    pub start_position_x: f64,
    pub start_position_y: f64,
    pub end_position_x: Option<f64>,
    pub end_position_y: Option<f64>,
    pub outcome: String,
    pub confidence: f64,
    pub auto_flag: String,
    pub user_id: String,
}

impl From<&Event> for EventRow {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            game_id: event.game_id,
            timestamp_seconds: event.timestamp,
            event_type: event.event_type.as_str().to_owned(),
            player_id: event.player_id,
            player_name: event.player_name.clone(),
            team: event.side.as_str().to_owned(),
            start_position_x: event.start_position.x,
            start_position_y: event.start_position.y,
            end_position_x: event.end_position.map(|p| p.x),
            end_position_y: event.end_position.map(|p| p.y),
            outcome: event.outcome.as_str().to_owned(),
            confidence: event.confidence,
            auto_flag: event.auto_flag.as_str().to_owned(),
            user_id: event.owner.clone(),
        }
    }
}

impl TryFrom<EventRow> for Event {
    type Error = UnknownVariant;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let end_position = match (row.end_position_x, row.end_position_y) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            game_id: row.game_id,
            timestamp: row.timestamp_seconds,
            event_type: row.event_type.parse()?,
            player_id: row.player_id,
            player_name: row.player_name,
            side: row.team.parse()?,
            start_position: Point::new(row.start_position_x, row.start_position_y),
            end_position,
            outcome: row.outcome.parse()?,
            confidence: row.confidence,
            auto_flag: row.auto_flag.parse()?,
            owner: row.user_id,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = crate::schema::formations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FormationRow {
    pub id: uuid::Uuid,
    pub game_id: uuid::Uuid,
    pub timestamp_seconds: i32,
    pub team: String,
    pub formation: String,
    pub confidence: f64,
    pub user_id: String,
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = crate::schema::formation_players)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FormationPlayerRow {
    pub formation_id: uuid::Uuid,
    pub slot: i16,
    pub player_id: Option<uuid::Uuid>,
    pub player_name: String,
    pub position_x: f64,
    pub position_y: f64,
    pub role: String,
}

impl FormationRow {
    /// Splits a snapshot into its header row and one row per placed player.
    pub fn split(snapshot: &FormationSnapshot) -> (Self, Vec<FormationPlayerRow>) {
        let header = Self {
            id: snapshot.id,
            game_id: snapshot.game_id,
            timestamp_seconds: to_db(snapshot.timestamp),
            team: snapshot.side.as_str().to_owned(),
            formation: snapshot.formation.clone(),
            confidence: snapshot.confidence,
            user_id: snapshot.owner.clone(),
        };

        let players = snapshot
            .players
            .iter()
            .enumerate()
            .map(|(slot, player)| FormationPlayerRow {
                formation_id: snapshot.id,
                slot: i16::try_from(slot).unwrap_or(i16::MAX),
                player_id: player.player_id,
                player_name: player.player_name.clone(),
                position_x: player.position.x,
                position_y: player.position.y,
                role: player.role.as_str().to_owned(),
            })
            .collect();

        (header, players)
    }

    /// Rebuilds a snapshot, `players` must already be ordered by slot.
    pub fn join(self, players: Vec<FormationPlayerRow>) -> Result<FormationSnapshot, UnknownVariant> {
        let players = players
            .into_iter()
            .map(|row| {
                Ok(FormationPlayerPosition {
                    player_id: row.player_id,
                    player_name: row.player_name,
                    position: Point::new(row.position_x, row.position_y),
                    role: row.role.parse()?,
                })
            })
            .collect::<Result<Vec<_>, UnknownVariant>>()?;

        Ok(FormationSnapshot {
            id: self.id,
            game_id: self.game_id,
            timestamp: from_db(self.timestamp_seconds),
            side: self.team.parse()?,
            formation: self.formation,
            confidence: self.confidence,
            players,
            owner: self.user_id,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = crate::schema::player_stats)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlayerStatsRow {
    pub game_id: uuid::Uuid,
    pub player_id: uuid::Uuid,
    pub player_name: String,
    pub touches: i32,
    pub passes: i32,
    pub passes_completed: i32,
    pub shots: i32,
    pub shots_on_target: i32,
    pub dribbles: i32,
    pub dribbles_successful: i32,
    pub recoveries: i32,
    pub enrichment_source: String,
    pub minutes_played: i32,
    pub key_passes: i32,
    pub assists: i32,
    pub goals: i32,
    pub turnovers: i32,
    pub fouls: i32,
    pub cards: i32,
    pub xg: f64,
    pub user_id: String,
}

impl From<&PlayerStats> for PlayerStatsRow {
    fn from(stats: &PlayerStats) -> Self {
        let derived = &stats.derived;
        let enrichment = stats.enrichment.values();

        Self {
            game_id: stats.game_id,
            player_id: stats.player_id,
            player_name: stats.player_name.clone(),
            touches: to_db(derived.touches),
            passes: to_db(derived.passes),
            passes_completed: to_db(derived.passes_completed),
            shots: to_db(derived.shots),
            shots_on_target: to_db(derived.shots_on_target),
            dribbles: to_db(derived.dribbles),
            dribbles_successful: to_db(derived.dribbles_successful),
            recoveries: to_db(derived.recoveries),
            enrichment_source: enrichment_source(&stats.enrichment).to_owned(),
            minutes_played: to_db(enrichment.minutes_played),
            key_passes: to_db(enrichment.key_passes),
            assists: to_db(enrichment.assists),
            goals: to_db(enrichment.goals),
            turnovers: to_db(enrichment.turnovers),
            fouls: to_db(enrichment.fouls),
            cards: to_db(enrichment.cards),
            xg: enrichment.expected_goals,
            user_id: stats.owner.clone(),
        }
    }
}

impl TryFrom<PlayerStatsRow> for PlayerStats {
    type Error = UnknownVariant;

    fn try_from(row: PlayerStatsRow) -> Result<Self, Self::Error> {
        let values = PlayerEnrichment {
            minutes_played: from_db(row.minutes_played),
            key_passes: from_db(row.key_passes),
            assists: from_db(row.assists),
            goals: from_db(row.goals),
            turnovers: from_db(row.turnovers),
            fouls: from_db(row.fouls),
            cards: from_db(row.cards),
            expected_goals: row.xg,
        };

        Ok(Self {
            game_id: row.game_id,
            player_id: row.player_id,
            player_name: row.player_name,
            derived: PlayerEventStats {
                touches: from_db(row.touches),
                passes: from_db(row.passes),
                passes_completed: from_db(row.passes_completed),
                shots: from_db(row.shots),
                shots_on_target: from_db(row.shots_on_target),
                dribbles: from_db(row.dribbles),
                dribbles_successful: from_db(row.dribbles_successful),
                recoveries: from_db(row.recoveries),
            },
            enrichment: enrichment(&row.enrichment_source, values)?,
            owner: row.user_id,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = crate::schema::team_stats)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TeamStatsRow {
    pub game_id: uuid::Uuid,
    pub team: String,
    pub passes: i32,
    pub passes_completed: i32,
    pub pass_accuracy: f64,
    pub shots: i32,
    pub shots_on_target: i32,
    pub enrichment_source: String,
    pub possession: f64,
    pub corners: i32,
    pub fouls: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
    pub formation: String,
    pub user_id: String,
}

impl From<&TeamStats> for TeamStatsRow {
    fn from(stats: &TeamStats) -> Self {
        let derived = &stats.derived;
        let enrichment = stats.enrichment.values();

        Self {
            game_id: stats.game_id,
            team: stats.side.as_str().to_owned(),
            passes: to_db(derived.passes),
            passes_completed: to_db(derived.passes_completed),
            pass_accuracy: derived.pass_accuracy,
            shots: to_db(derived.shots),
            shots_on_target: to_db(derived.shots_on_target),
            enrichment_source: enrichment_source(&stats.enrichment).to_owned(),
            possession: enrichment.possession,
            corners: to_db(enrichment.corners),
            fouls: to_db(enrichment.fouls),
            yellow_cards: to_db(enrichment.yellow_cards),
            red_cards: to_db(enrichment.red_cards),
            formation: enrichment.formation.clone(),
            user_id: stats.owner.clone(),
        }
    }
}

impl TryFrom<TeamStatsRow> for TeamStats {
    type Error = UnknownVariant;

    fn try_from(row: TeamStatsRow) -> Result<Self, Self::Error> {
        let values = TeamEnrichment {
            possession: row.possession,
            corners: from_db(row.corners),
            fouls: from_db(row.fouls),
            yellow_cards: from_db(row.yellow_cards),
            red_cards: from_db(row.red_cards),
            formation: row.formation,
        };

        Ok(Self {
            game_id: row.game_id,
            side: row.team.parse()?,
            derived: TeamEventStats {
                passes: from_db(row.passes),
                passes_completed: from_db(row.passes_completed),
                pass_accuracy: row.pass_accuracy,
                shots: from_db(row.shots),
                shots_on_target: from_db(row.shots_on_target),
            },
            enrichment: enrichment(&row.enrichment_source, values)?,
            owner: row.user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::match_analysis::{AutoFlag, EventType, Outcome, Position, Side};

    #[test]
    fn unknown_enrichment_source_is_rejected() {
        let err = enrichment("measured", ()).unwrap_err();
        assert_eq!("Enrichment", err.kind);
    }

    #[test]
    fn event_row_keeps_every_field() {
        let event = Event {
            id: uuid::Uuid::now_v7(),
            game_id: uuid::Uuid::now_v7(),
            timestamp: 12.5,
            event_type: EventType::Dribble,
            player_id: None,
            player_name: None,
            side: Side::Away,
            start_position: Point::new(0.1, 0.2),
            end_position: Some(Point::new(0.3, 0.4)),
            outcome: Outcome::Failed,
            confidence: 0.8,
            auto_flag: AutoFlag::Bad,
            owner: "caller".to_owned(),
        };

        let restored = Event::try_from(EventRow::from(&event)).unwrap();
        pretty_assertions::assert_eq!(event, restored);
    }

    #[test]
    fn formation_rows_are_numbered_by_slot() {
        let snapshot = FormationSnapshot {
            id: uuid::Uuid::now_v7(),
            game_id: uuid::Uuid::now_v7(),
            timestamp: 1800,
            side: Side::Home,
            formation: "4-4-2".to_owned(),
            confidence: 0.9,
            players: vec![
                FormationPlayerPosition {
                    player_id: None,
                    player_name: "A".to_owned(),
                    position: Point::new(0.1, 0.5),
                    role: Position::Goalkeeper,
                },
                FormationPlayerPosition {
                    player_id: None,
                    player_name: "B".to_owned(),
                    position: Point::new(0.8, 0.5),
                    role: Position::Striker,
                },
            ],
            owner: "caller".to_owned(),
        };

        let (header, players) = FormationRow::split(&snapshot);
        assert_eq!(vec![0, 1], players.iter().map(|p| p.slot).collect::<Vec<_>>());
        pretty_assertions::assert_eq!(snapshot, header.join(players).unwrap());
    }

    #[test]
    fn stored_stage_must_be_known() {
        let now = chrono::Utc::now();
        let row = JobRow {
            id: uuid::Uuid::now_v7(),
            game_id: uuid::Uuid::now_v7(),
            stage: "queued".to_owned(),
            progress: 0,
            message: None,
            error_message: None,
            user_id: "caller".to_owned(),
            created_at: now,
            updated_at: now,
        };

        assert!(Job::try_from(row).is_err());
    }
}
