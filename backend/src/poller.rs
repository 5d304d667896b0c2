//! Follows a job until it reaches a final stage.
//!
//! Reads may race with the orchestrator and come back stale. The [`Tracker`]
//! never lets the stage or progress shown to the caller go backwards.

use std::sync::Arc;

use common::{Job, Stage};
use futures::{Stream, StreamExt};
use uuid::Uuid;

use crate::gateway::{Gateway, GatewayError};

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("no processing job for game {0}")]
    NotFound(Uuid),
    #[error("reading job status: {0}")]
    Transport(String),
}

#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    async fn job_status(&self, game_id: Uuid) -> Result<Job, PollError>;
}

/// Reads the job straight from a gateway.
pub struct GatewayStatus(pub Arc<dyn Gateway>);

#[async_trait::async_trait]
impl StatusSource for GatewayStatus {
    async fn job_status(&self, game_id: Uuid) -> Result<Job, PollError> {
        match self.0.latest_job(game_id).await {
            Ok(job) => Ok(job),
            Err(GatewayError::NotFound(_)) => Err(PollError::NotFound(game_id)),
            Err(e) => Err(PollError::Transport(e.to_string())),
        }
    }
}

/// Reads the job through the status endpoint of a running server.
pub struct HttpStatus {
    http: reqwest::Client,
    server: String,
    token: String,
}

impl HttpStatus {
    pub fn new<S, T>(server: S, token: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            http: reqwest::Client::new(),
            server: server.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl StatusSource for HttpStatus {
    async fn job_status(&self, game_id: Uuid) -> Result<Job, PollError> {
        let response = self
            .http
            .get(format!("{}/api/games/{}/status", self.server, game_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PollError::NotFound(game_id));
        }
        if !response.status().is_success() {
            return Err(PollError::Transport(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        response
            .json::<Job>()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))
    }
}

/// What the caller is shown after a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub stage: Stage,
    pub progress: u8,
    pub message: Option<String>,
    pub error_message: Option<String>,
}

impl From<&Job> for Observation {
    fn from(job: &Job) -> Self {
        Self {
            stage: job.stage,
            progress: job.progress,
            message: job.message.clone(),
            error_message: job.error_message.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Tracker {
    last: Option<Observation>,
}

impl Tracker {
    /// Folds a read into the last observation. A read behind the last one,
    /// by stage or by progress within the same stage, is ignored.
    pub fn observe(&mut self, job: &Job) -> Observation {
        let next = match self.last.take() {
            None => Observation::from(job),
            Some(last) => {
                let behind = job.stage.rank() < last.stage.rank()
                    || (job.stage == last.stage && job.progress < last.progress);
                if behind {
                    last
                } else {
                    let mut next = Observation::from(job);
                    next.progress = next.progress.max(last.progress);
                    next
                }
            }
        };

        self.last = Some(next.clone());
        next
    }

    pub fn last(&self) -> Option<&Observation> {
        self.last.as_ref()
    }
}

struct PollState<S> {
    source: S,
    tracker: Tracker,
    ticker: Option<tokio::time::Interval>,
    done: bool,
}

/// Reads the job every `every`, starting immediately.
///
/// The stream ends right after yielding a final stage or a
/// [`PollError::NotFound`]. Transport errors are yielded and polling goes on.
pub fn poll<S>(
    source: S,
    game_id: Uuid,
    every: std::time::Duration,
) -> impl Stream<Item = Result<Observation, PollError>>
where
    S: StatusSource,
{
    let state = PollState {
        source,
        tracker: Tracker::default(),
        ticker: None,
        done: false,
    };

    futures::stream::unfold(state, move |mut state| async move {
        if state.done {
            return None;
        }

        let ticker = state.ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;

        let item = match state.source.job_status(game_id).await {
            Ok(job) => {
                let observation = state.tracker.observe(&job);
                state.done = observation.stage.is_terminal();
                Ok(observation)
            }
            Err(PollError::NotFound(id)) => {
                state.done = true;
                Err(PollError::NotFound(id))
            }
            Err(e) => Err(e),
        };

        Some((item, state))
    })
}

/// Polls until the job finished and returns the final observation.
/// `on_update` sees every observation, including the final one.
pub async fn wait_for_terminal<S, F>(
    source: S,
    game_id: Uuid,
    every: std::time::Duration,
    mut on_update: F,
) -> Result<Observation, PollError>
where
    S: StatusSource,
    F: FnMut(&Observation),
{
    let updates = poll(source, game_id, every);
    futures::pin_mut!(updates);

    while let Some(update) = updates.next().await {
        match update {
            Ok(observation) => {
                on_update(&observation);
                if observation.stage.is_terminal() {
                    return Ok(observation);
                }
            }
            Err(PollError::Transport(reason)) => {
                tracing::warn!(game = %game_id, "Reading job status: {}", reason);
            }
            Err(e) => return Err(e),
        }
    }

    Err(PollError::NotFound(game_id))
}
