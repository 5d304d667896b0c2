#[macro_use]
mod text_enum;
pub use text_enum::UnknownVariant;

pub mod match_analysis;
pub mod pipeline;

pub use pipeline::{GameStatus, Stage};

/// The game and caller a batch of generated records belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameScope {
    pub game_id: uuid::Uuid,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: uuid::Uuid,
    pub home_team: String,
    pub away_team: String,
    pub date: chrono::NaiveDate,
    /// Nominal duration in seconds.
    pub duration: u32,
    pub status: GameStatus,
    pub video_file: Option<String>,
    pub video_url: Option<String>,
    pub owner: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Game {
    pub fn scope(&self) -> GameScope {
        GameScope {
            game_id: self.id,
            owner: self.owner.clone(),
        }
    }
}

/// The processing job of a game, as returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: uuid::Uuid,
    pub game_id: uuid::Uuid,
    pub stage: Stage,
    pub progress: u8,
    pub message: Option<String>,
    pub error_message: Option<String>,
    pub owner: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub home_team: String,
    pub away_team: String,
    pub date: String,
    #[serde(default)]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub game_id: uuid::Uuid,
    pub status: GameStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub players: Vec<match_analysis::PlayerStats>,
    pub teams: Vec<match_analysis::TeamStats>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_games: usize,
    pub total_events: usize,
    pub completed_games: usize,
    /// Average minutes between job creation and completion.
    pub avg_processing_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
