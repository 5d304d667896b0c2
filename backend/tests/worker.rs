use std::sync::Arc;

use backend::gateway::{Gateway, MemoryGateway, NewGame};
use backend::pipeline::{AnalysisStep, AnalysisTask, Pipeline, PipelineError, StepContext};
use common::{Game, GameStatus, Stage};
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

struct PanickingStep;

#[async_trait::async_trait]
impl AnalysisStep for PanickingStep {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn progress(&self) -> u8 {
        40
    }

    fn message(&self) -> &'static str {
        "Extracting frames..."
    }

    async fn run(&self, _ctx: StepContext<'_>) -> Result<(), PipelineError> {
        panic!("step blew up");
    }
}

async fn game_with_job(gateway: &MemoryGateway) -> Game {
    let game = gateway
        .create_game(NewGame {
            home_team: "A".to_owned(),
            away_team: "B".to_owned(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            duration: 5400,
            video_url: Some("https://example.com/match.mp4".to_owned()),
            owner: "coach".to_owned(),
        })
        .await
        .unwrap();
    gateway.create_job(game.id, "coach").await.unwrap();
    game
}

fn pipeline(gateway: Arc<MemoryGateway>) -> Pipeline {
    let storage = backend::storage::FileStorage::new(std::env::temp_dir());
    Pipeline::new(gateway, Arc::new(storage), analysis::Config::default())
}

#[tokio::test]
async fn processes_every_submitted_game() {
    let gateway = Arc::new(MemoryGateway::new());
    let first = game_with_job(&gateway).await;
    let second = game_with_job(&gateway).await;

    let (queue, tasks) = backend::worker::queue();
    queue.submit(AnalysisTask { game_id: first.id }).unwrap();
    queue.submit(AnalysisTask { game_id: second.id }).unwrap();
    drop(queue);

    backend::worker::run(Arc::new(pipeline(gateway.clone())), tasks).await;

    for game in [first, second] {
        let job = gateway.latest_job(game.id).await.unwrap();
        assert_eq!((Stage::Complete, 100), (job.stage, job.progress));
        assert_eq!(
            GameStatus::Completed,
            gateway.game(game.id).await.unwrap().status
        );
    }
}

#[tokio::test]
#[traced_test]
async fn panicking_task_fails_its_job() {
    let gateway = Arc::new(MemoryGateway::new());
    let game = game_with_job(&gateway).await;

    let (queue, tasks) = backend::worker::queue();
    queue.submit(AnalysisTask { game_id: game.id }).unwrap();
    drop(queue);

    let pipeline = pipeline(gateway.clone()).with_steps(vec![Box::new(PanickingStep)]);
    backend::worker::run(Arc::new(pipeline), tasks).await;

    let job = gateway.latest_job(game.id).await.unwrap();
    assert_eq!(Stage::Failed, job.stage);
    assert_eq!(40, job.progress);
    assert!(job.error_message.unwrap_or_default().contains("panicked"));
    assert_eq!(
        GameStatus::Failed,
        gateway.game(game.id).await.unwrap().status
    );
    assert!(logs_contain("Task panicked"));
}

#[tokio::test]
#[traced_test]
async fn duplicate_submission_runs_once() {
    let gateway = Arc::new(MemoryGateway::new());
    let game = game_with_job(&gateway).await;

    let (queue, tasks) = backend::worker::queue();
    queue.submit(AnalysisTask { game_id: game.id }).unwrap();
    queue.submit(AnalysisTask { game_id: game.id }).unwrap();
    drop(queue);

    backend::worker::run(Arc::new(pipeline(gateway.clone())), tasks).await;

    let job = gateway.latest_job(game.id).await.unwrap();
    assert_eq!(Stage::Complete, job.stage);
    assert!(logs_contain("Game is already being processed"));
}

#[tokio::test]
async fn closed_queue_rejects_tasks() {
    let (queue, tasks) = backend::worker::queue();
    drop(tasks);

    assert!(queue
        .submit(AnalysisTask {
            game_id: uuid::Uuid::now_v7()
        })
        .is_err());
}
