//! Drives a game's job from upload to a final stage.
//!
//! The analysis work is split into [`AnalysisStep`]s that run in order while
//! the job is in [`Stage::Analyzing`]. Each step publishes its progress
//! milestone before it runs. The first error stops the run and is written to
//! the job once, together with the failed game status.

use std::sync::Arc;

use common::{Game, GameStatus, Job, Stage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

use crate::gateway::{Gateway, GatewayError, JobUpdate};
use crate::storage::{StorageError, VideoStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisTask {
    pub game_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("loading video: {0}")]
    Storage(#[from] StorageError),
    #[error("{step}: {reason}")]
    Step { step: &'static str, reason: String },
    #[error("game has neither a video file nor a video url")]
    MissingVideo,
}

pub struct StepContext<'a> {
    pub gateway: &'a dyn Gateway,
    pub game: &'a Game,
    pub config: &'a analysis::Config,
    pub rng: &'a mut StdRng,
}

/// One unit of work of the analyzing stage.
#[async_trait::async_trait]
pub trait AnalysisStep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Progress published right before the step runs.
    fn progress(&self) -> u8;

    fn message(&self) -> &'static str;

    async fn run(&self, ctx: StepContext<'_>) -> Result<(), PipelineError>;
}

/// No frames are decoded, the step only marks the milestone.
pub struct FrameExtraction;

#[async_trait::async_trait]
impl AnalysisStep for FrameExtraction {
    fn name(&self) -> &'static str {
        "frame_extraction"
    }

    fn progress(&self) -> u8 {
        40
    }

    fn message(&self) -> &'static str {
        "Extracting frames..."
    }

    async fn run(&self, ctx: StepContext<'_>) -> Result<(), PipelineError> {
        tracing::debug!(game = %ctx.game.id, "Skipping frame extraction");
        Ok(())
    }
}

pub struct PlayerDetection;

#[async_trait::async_trait]
impl AnalysisStep for PlayerDetection {
    fn name(&self) -> &'static str {
        "player_detection"
    }

    fn progress(&self) -> u8 {
        50
    }

    fn message(&self) -> &'static str {
        "Detecting players..."
    }

    async fn run(&self, ctx: StepContext<'_>) -> Result<(), PipelineError> {
        let players = analysis::roster::detect_players(&ctx.game.scope());
        ctx.gateway.insert_players(&players).await?;
        Ok(())
    }
}

pub struct EventDetection;

#[async_trait::async_trait]
impl AnalysisStep for EventDetection {
    fn name(&self) -> &'static str {
        "event_detection"
    }

    fn progress(&self) -> u8 {
        65
    }

    fn message(&self) -> &'static str {
        "Analyzing events..."
    }

    async fn run(&self, ctx: StepContext<'_>) -> Result<(), PipelineError> {
        let roster = ctx.gateway.players(ctx.game.id).await?;
        let events = analysis::events::generate(
            ctx.config,
            &ctx.game.scope(),
            &roster,
            ctx.game.duration,
            &mut *ctx.rng,
        );

        for batch in events.chunks(ctx.config.event_batch_size.max(1)) {
            ctx.gateway.insert_events(batch).await?;
        }
        Ok(())
    }
}

pub struct FormationAnalysis;

#[async_trait::async_trait]
impl AnalysisStep for FormationAnalysis {
    fn name(&self) -> &'static str {
        "formation_analysis"
    }

    fn progress(&self) -> u8 {
        80
    }

    fn message(&self) -> &'static str {
        "Analyzing formations..."
    }

    async fn run(&self, ctx: StepContext<'_>) -> Result<(), PipelineError> {
        let roster = ctx.gateway.players(ctx.game.id).await?;
        let snapshots = analysis::formation::generate(
            ctx.config,
            &ctx.game.scope(),
            &roster,
            ctx.game.duration,
            &mut *ctx.rng,
        );

        for snapshot in snapshots.iter() {
            ctx.gateway.insert_formation(snapshot).await?;
        }
        Ok(())
    }
}

pub struct StatisticsCalculation;

#[async_trait::async_trait]
impl AnalysisStep for StatisticsCalculation {
    fn name(&self) -> &'static str {
        "statistics_calculation"
    }

    fn progress(&self) -> u8 {
        90
    }

    fn message(&self) -> &'static str {
        "Calculating statistics..."
    }

    async fn run(&self, ctx: StepContext<'_>) -> Result<(), PipelineError> {
        let roster = ctx.gateway.players(ctx.game.id).await?;
        let events = ctx.gateway.events(ctx.game.id).await?;

        let aggregate =
            analysis::stats::aggregate(&ctx.game.scope(), &roster, &events, &mut *ctx.rng);
        ctx.gateway
            .insert_stats(&aggregate.players, &aggregate.teams)
            .await?;
        Ok(())
    }
}

pub fn default_steps() -> Vec<Box<dyn AnalysisStep>> {
    vec![
        Box::new(FrameExtraction),
        Box::new(PlayerDetection),
        Box::new(EventDetection),
        Box::new(FormationAnalysis),
        Box::new(StatisticsCalculation),
    ]
}

/// Marks the latest job of a game as failed, keeping its progress, and
/// fails the game. A job that already finished is returned untouched, but a
/// failed job still drags a game that missed its final status along.
pub async fn fail_job(
    gateway: &dyn Gateway,
    game_id: Uuid,
    reason: String,
) -> Result<Job, GatewayError> {
    let job = gateway.latest_job(game_id).await?;
    if job.stage.is_terminal() {
        if job.stage == Stage::Failed {
            fail_game(gateway, game_id).await?;
        }
        return Ok(job);
    }

    let job = gateway
        .update_job(
            job.id,
            JobUpdate {
                stage: Stage::Failed,
                progress: job.progress,
                message: job.message.clone(),
                error_message: Some(reason),
            },
        )
        .await?;

    fail_game(gateway, game_id).await?;
    Ok(job)
}

async fn fail_game(gateway: &dyn Gateway, game_id: Uuid) -> Result<(), GatewayError> {
    match gateway.set_game_status(game_id, GameStatus::Failed).await {
        Ok(_) | Err(GatewayError::TerminalGame(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

pub struct Pipeline {
    gateway: Arc<dyn Gateway>,
    storage: Arc<dyn VideoStorage>,
    config: analysis::Config,
    steps: Vec<Box<dyn AnalysisStep>>,
    step_delay: std::time::Duration,
    seed: Option<u64>,
}

impl Pipeline {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        storage: Arc<dyn VideoStorage>,
        config: analysis::Config,
    ) -> Self {
        Self {
            gateway,
            storage,
            config,
            steps: default_steps(),
            step_delay: std::time::Duration::ZERO,
            seed: None,
        }
    }

    pub fn with_steps(mut self, steps: Vec<Box<dyn AnalysisStep>>) -> Self {
        self.steps = steps;
        self
    }

    /// Pause after every analysis step.
    pub fn with_step_delay(mut self, delay: std::time::Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    /// Runs the latest job of the task's game to a final stage and returns
    /// the job as it was last written.
    ///
    /// Errors are only returned when the failure itself could not be
    /// recorded. A job that already finished is not run again.
    #[tracing::instrument(skip(self), fields(game = %task.game_id))]
    pub async fn advance(&self, task: AnalysisTask) -> Result<Job, PipelineError> {
        let job = self.gateway.latest_job(task.game_id).await?;
        if job.stage.is_terminal() {
            tracing::warn!(stage = %job.stage, "Job already finished");
            return Ok(job);
        }

        match self.run(job).await {
            Ok(job) => {
                tracing::info!("Processing completed");
                Ok(job)
            }
            Err(e) => {
                tracing::error!(game = %task.game_id, "Processing failed: {}", e);
                let reason = format!("Processing failed: {}", e);
                Ok(fail_job(self.gateway.as_ref(), task.game_id, reason).await?)
            }
        }
    }

    async fn publish(
        &self,
        job: &Job,
        stage: Stage,
        progress: u8,
        message: &str,
    ) -> Result<Job, PipelineError> {
        tracing::debug!(%stage, progress, "{}", message);

        let job = self
            .gateway
            .update_job(
                job.id,
                JobUpdate {
                    stage,
                    progress,
                    message: Some(message.to_owned()),
                    error_message: None,
                },
            )
            .await?;
        Ok(job)
    }

    async fn run(&self, job: Job) -> Result<Job, PipelineError> {
        let job = self.publish(&job, Stage::Uploading, 10, "Upload received").await?;

        let job = self
            .publish(&job, Stage::Processing, 30, "Preparing video...")
            .await?;
        let game = self
            .gateway
            .set_game_status(job.game_id, GameStatus::Processing)
            .await?;
        self.prepare_video(&game).await?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut job = job;
        for step in self.steps.iter() {
            job = self
                .publish(&job, Stage::Analyzing, step.progress(), step.message())
                .await?;

            tracing::debug!(step = step.name(), "Running step");
            step.run(StepContext {
                gateway: self.gateway.as_ref(),
                game: &game,
                config: &self.config,
                rng: &mut rng,
            })
            .await?;

            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
        }

        tracing::debug!(stage = %Stage::Complete, progress = 100, "Processing complete!");
        let job = self
            .gateway
            .complete_job(job.id, "Processing complete!".to_owned())
            .await?;

        Ok(job)
    }

    /// Confirms the video can be read. Nothing is decoded.
    async fn prepare_video(&self, game: &Game) -> Result<(), PipelineError> {
        match (&game.video_file, &game.video_url) {
            (Some(key), _) => {
                let video = self.storage.load(key.clone()).await?;
                tracing::info!(bytes = video.len(), "Loaded video");
                Ok(())
            }
            (None, Some(url)) => {
                tracing::info!(url, "Using remote video");
                Ok(())
            }
            (None, None) => Err(PipelineError::MissingVideo),
        }
    }
}
