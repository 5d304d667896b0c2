use axum::extract::{Multipart, Path, State};
use axum::Json;
use common::match_analysis::{Event, FormationSnapshot, Player};
use common::{Game, GameInfo, GameStats, GameStatus, Job, UploadResponse};
use futures::StreamExt;
use uuid::Uuid;

use super::{ApiError, AppState, UploadLimits, ALLOWED_VIDEO_TYPES};
use crate::gateway::NewGame;
use crate::identity::Identity;
use crate::pipeline::AnalysisTask;

/// Room for the non-file form fields on top of the video itself.
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum UploadError {
    #[error("No video file or URL provided")]
    MissingVideo,
    #[error("Missing required game information (homeTeam, awayTeam, date)")]
    MissingGameInfo,
    #[error("Invalid game information: {0}")]
    InvalidGameInfo(String),
    #[error("Invalid file type. Only MP4, AVI, and MOV files are allowed")]
    UnsupportedFileType(Option<String>),
    #[error("File size exceeds the {0} byte limit")]
    FileTooLarge(u64),
    #[error("Game duration must be positive")]
    InvalidDuration,
    #[error("Invalid form: {0}")]
    Multipart(String),
}

impl From<axum::extract::multipart::MultipartError> for UploadError {
    fn from(value: axum::extract::multipart::MultipartError) -> Self {
        Self::Multipart(value.body_text())
    }
}

pub fn router(limits: &UploadLimits) -> axum::Router<AppState> {
    let body_limit = limits.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    axum::Router::new()
        .route("/list", axum::routing::get(list))
        .route(
            "/upload",
            axum::routing::post(upload).layer(axum::extract::DefaultBodyLimit::max(
                usize::try_from(body_limit).unwrap_or(usize::MAX),
            )),
        )
        .route("/:id", axum::routing::get(game))
        .route("/:id/status", axum::routing::get(status))
        .route("/:id/players", axum::routing::get(players))
        .route("/:id/events", axum::routing::get(events))
        .route("/:id/formations", axum::routing::get(formations))
        .route("/:id/stats", axum::routing::get(stats))
}

#[derive(Debug)]
struct VideoPart {
    file_name: String,
    data: axum::body::Bytes,
}

#[derive(Debug, Default)]
struct UploadForm {
    video: Option<VideoPart>,
    video_url: Option<String>,
    game_info: Option<String>,
}

async fn read_form(mut form: Multipart, limits: &UploadLimits) -> Result<UploadForm, UploadError> {
    let mut upload = UploadForm::default();

    while let Some(mut field) = form.next_field().await? {
        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            Some("video") => {
                let file_name = field.file_name().unwrap_or("video").to_owned();
                let content_type = field.content_type().map(str::to_owned);

                let mut data = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    if (data.len() + chunk.len()) as u64 > limits.max_upload_bytes {
                        return Err(UploadError::FileTooLarge(limits.max_upload_bytes));
                    }
                    data.extend_from_slice(&chunk);
                }

                // Browsers send an empty part when no file was picked.
                if data.is_empty() {
                    continue;
                }
                if !content_type
                    .as_deref()
                    .is_some_and(|t| ALLOWED_VIDEO_TYPES.contains(&t))
                {
                    return Err(UploadError::UnsupportedFileType(content_type));
                }

                upload.video = Some(VideoPart {
                    file_name,
                    data: data.into(),
                });
            }
            Some("videoUrl") => {
                let url = field.text().await?;
                let url = url.trim();
                if !url.is_empty() {
                    upload.video_url = Some(url.to_owned());
                }
            }
            Some("gameInfo") => {
                upload.game_info = Some(field.text().await?);
            }
            _ => {}
        }
    }

    Ok(upload)
}

/// Checks the game information and turns it into the game to create.
pub fn validate_game_info(
    raw: Option<&str>,
    video_url: Option<String>,
    owner: &str,
    limits: &UploadLimits,
) -> Result<NewGame, UploadError> {
    let raw = raw.ok_or(UploadError::MissingGameInfo)?;
    let info: GameInfo =
        serde_json::from_str(raw).map_err(|e| UploadError::InvalidGameInfo(e.to_string()))?;

    if info.home_team.trim().is_empty() || info.away_team.trim().is_empty() {
        return Err(UploadError::MissingGameInfo);
    }

    let date = chrono::NaiveDate::parse_from_str(info.date.trim(), "%Y-%m-%d")
        .map_err(|e| UploadError::InvalidGameInfo(format!("date: {}", e)))?;

    let duration = info.duration.unwrap_or(limits.default_duration);
    if duration == 0 {
        return Err(UploadError::InvalidDuration);
    }

    Ok(NewGame {
        home_team: info.home_team.trim().to_owned(),
        away_team: info.away_team.trim().to_owned(),
        date,
        duration,
        video_url,
        owner: owner.to_owned(),
    })
}

#[tracing::instrument(skip(state, form))]
async fn upload(
    State(state): State<AppState>,
    identity: Identity,
    form: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = read_form(form, &state.limits).await?;
    if form.video.is_none() && form.video_url.is_none() {
        return Err(UploadError::MissingVideo.into());
    }
    let new_game = validate_game_info(
        form.game_info.as_deref(),
        form.video_url.clone(),
        identity.owner(),
        &state.limits,
    )?;

    let game = state.gateway.create_game(new_game).await?;
    tracing::info!(game = %game.id, "Created game");

    if let Some(video) = form.video {
        let key = crate::storage::video_key(identity.owner(), game.id, &video.file_name);
        let stream =
            futures::stream::once(async move { Ok::<_, std::io::Error>(video.data) }).boxed();

        if let Err(e) = state.storage.upload(key.clone(), stream).await {
            tracing::error!(game = %game.id, "Storing video: {}", e);
            if let Err(e) = state.gateway.set_game_status(game.id, GameStatus::Failed).await {
                tracing::error!(game = %game.id, "Failing game after storage error: {}", e);
            }
            return Err(ApiError::Internal("Failed to upload video file".to_owned()));
        }
        state.gateway.set_video_file(game.id, key).await?;
    }

    state.gateway.create_job(game.id, identity.owner()).await?;

    if let Err(e) = state.queue.submit(AnalysisTask { game_id: game.id }) {
        tracing::error!(game = %game.id, "Submitting analysis task: {}", e);
        crate::pipeline::fail_job(
            state.gateway.as_ref(),
            game.id,
            "Failed to start video processing".to_owned(),
        )
        .await?;
        return Err(ApiError::Internal(e.to_string()));
    }

    Ok(Json(UploadResponse {
        game_id: game.id,
        status: game.status,
        message: "Video uploaded successfully, processing started".to_owned(),
    }))
}

/// Loads a game of the caller. Games of other callers are reported as missing.
async fn owned_game(state: &AppState, identity: &Identity, id: Uuid) -> Result<Game, ApiError> {
    let game = state.gateway.game(id).await?;
    if game.owner != identity.owner() {
        return Err(ApiError::NotFound("Game not found"));
    }
    Ok(game)
}

#[tracing::instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<Game>>, ApiError> {
    Ok(Json(state.gateway.list_games(identity.owner()).await?))
}

#[tracing::instrument(skip(state))]
async fn game(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Game>, ApiError> {
    Ok(Json(owned_game(&state, &identity, id).await?))
}

#[tracing::instrument(skip(state))]
async fn status(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    let game = owned_game(&state, &identity, id).await?;
    Ok(Json(state.gateway.latest_job(game.id).await?))
}

#[tracing::instrument(skip(state))]
async fn players(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Player>>, ApiError> {
    let game = owned_game(&state, &identity, id).await?;
    Ok(Json(state.gateway.players(game.id).await?))
}

#[tracing::instrument(skip(state))]
async fn events(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let game = owned_game(&state, &identity, id).await?;
    Ok(Json(state.gateway.events(game.id).await?))
}

#[tracing::instrument(skip(state))]
async fn formations(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<FormationSnapshot>>, ApiError> {
    let game = owned_game(&state, &identity, id).await?;
    Ok(Json(state.gateway.formations(game.id).await?))
}

#[tracing::instrument(skip(state))]
async fn stats(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<GameStats>, ApiError> {
    let game = owned_game(&state, &identity, id).await?;

    Ok(Json(GameStats {
        players: state.gateway.player_stats(game.id).await?,
        teams: state.gateway.team_stats(game.id).await?,
    }))
}
