//! Typed access to the records of a game.
//!
//! Every component receives a [`Gateway`] instead of reaching for a global
//! connection, so the in-memory implementation can stand in for PostgreSQL.

use common::match_analysis::{Event, FormationSnapshot, Player, PlayerStats, TeamStats};
use common::{DashboardStats, Game, GameStatus, Job, Stage};
use uuid::Uuid;

mod memory;
pub use memory::MemoryGateway;

mod postgres;
pub use postgres::PgGateway;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("game {0} already has a job in progress")]
    Conflict(Uuid),
    #[error("job cannot move from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },
    #[error("job progress cannot go from {from} to {to}")]
    ProgressRegression { from: u8, to: u8 },
    #[error("job progress {0} is above 100")]
    ProgressOutOfRange(u8),
    #[error("game {0} already reached a final status")]
    TerminalGame(Uuid),
    #[error("stored value: {0}")]
    Corrupt(#[from] common::UnknownVariant),
    #[error("database: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connecting to database: {0}")]
    Connection(#[from] diesel::ConnectionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub home_team: String,
    pub away_team: String,
    pub date: chrono::NaiveDate,
    pub duration: u32,
    pub video_url: Option<String>,
    pub owner: String,
}

/// The fields of a job the orchestrator writes together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobUpdate {
    pub stage: Stage,
    pub progress: u8,
    pub message: Option<String>,
    pub error_message: Option<String>,
}

/// Rejects writes that would move a job backwards.
pub(crate) fn check_job_update(current: &Job, update: &JobUpdate) -> Result<(), GatewayError> {
    if !current.stage.can_transition_to(update.stage) {
        return Err(GatewayError::InvalidTransition {
            from: current.stage,
            to: update.stage,
        });
    }
    if update.progress > 100 {
        return Err(GatewayError::ProgressOutOfRange(update.progress));
    }
    if update.progress < current.progress {
        return Err(GatewayError::ProgressRegression {
            from: current.progress,
            to: update.progress,
        });
    }

    Ok(())
}

pub(crate) fn completion(message: String) -> JobUpdate {
    JobUpdate {
        stage: Stage::Complete,
        progress: 100,
        message: Some(message),
        error_message: None,
    }
}

pub(crate) fn check_game_status(game: &Game) -> Result<(), GatewayError> {
    if game.status.is_terminal() {
        return Err(GatewayError::TerminalGame(game.id));
    }

    Ok(())
}

/// Average minutes from job creation to completion, 2.3 when nothing finished yet.
pub(crate) fn average_processing_minutes(
    finished: &[(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)],
) -> f64 {
    if finished.is_empty() {
        return 2.3;
    }

    let total: f64 = finished
        .iter()
        .map(|(created, updated)| (*updated - *created).num_milliseconds() as f64 / 60_000.0)
        .sum();
    total / finished.len() as f64
}

/// Number of finished jobs the dashboard averages over.
pub(crate) const DASHBOARD_JOB_WINDOW: usize = 10;

#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    async fn create_game(&self, game: NewGame) -> Result<Game, GatewayError>;

    async fn game(&self, id: Uuid) -> Result<Game, GatewayError>;

    /// Games of one caller, newest first.
    async fn list_games(&self, owner: &str) -> Result<Vec<Game>, GatewayError>;

    async fn set_video_file(&self, id: Uuid, path: String) -> Result<(), GatewayError>;

    /// Fails with [`GatewayError::TerminalGame`] once the game is completed or failed.
    async fn set_game_status(&self, id: Uuid, status: GameStatus) -> Result<Game, GatewayError>;

    /// Fails with [`GatewayError::Conflict`] while another job of the game is still running.
    async fn create_job(&self, game_id: Uuid, owner: &str) -> Result<Job, GatewayError>;

    /// The most recently created job of a game.
    async fn latest_job(&self, game_id: Uuid) -> Result<Job, GatewayError>;

    /// Applies the whole update or nothing. Writes to one job are serialized.
    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<Job, GatewayError>;

    /// Moves the job to `complete` at 100 and its game to `completed` in one
    /// write. Neither record changes when either check fails.
    async fn complete_job(&self, job_id: Uuid, message: String) -> Result<Job, GatewayError>;

    async fn insert_players(&self, players: &[Player]) -> Result<(), GatewayError>;

    async fn players(&self, game_id: Uuid) -> Result<Vec<Player>, GatewayError>;

    async fn insert_events(&self, events: &[Event]) -> Result<(), GatewayError>;

    /// Events of a game ordered by timestamp.
    async fn events(&self, game_id: Uuid) -> Result<Vec<Event>, GatewayError>;

    /// Stores a snapshot together with all of its player positions.
    async fn insert_formation(&self, snapshot: &FormationSnapshot) -> Result<(), GatewayError>;

    async fn formations(&self, game_id: Uuid) -> Result<Vec<FormationSnapshot>, GatewayError>;

    async fn insert_stats(
        &self,
        players: &[PlayerStats],
        teams: &[TeamStats],
    ) -> Result<(), GatewayError>;

    async fn player_stats(&self, game_id: Uuid) -> Result<Vec<PlayerStats>, GatewayError>;

    async fn team_stats(&self, game_id: Uuid) -> Result<Vec<TeamStats>, GatewayError>;

    async fn dashboard(&self, owner: &str) -> Result<DashboardStats, GatewayError>;
}
