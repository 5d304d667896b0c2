use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use backend::api::{AppState, UploadLimits};
use backend::gateway::{Gateway, MemoryGateway, NewGame};
use backend::pipeline::AnalysisTask;
use backend::storage::{FileStorage, StorageError, VideoData, VideoStorage};
use futures::FutureExt;
use common::{ErrorBody, GameStatus, Job, Stage, UploadResponse};
use pretty_assertions::assert_eq;
use tower::ServiceExt;
use tracing_test::traced_test;

const BOUNDARY: &str = "match-upload-boundary";

struct Harness {
    gateway: Arc<MemoryGateway>,
    tasks: tokio::sync::mpsc::UnboundedReceiver<AnalysisTask>,
    router: axum::Router,
}

fn harness(limits: UploadLimits) -> Harness {
    let folder = std::env::temp_dir().join(format!("api-{}", uuid::Uuid::now_v7()));
    harness_with_storage(limits, Arc::new(FileStorage::new(folder)))
}

fn harness_with_storage(limits: UploadLimits, storage: Arc<dyn VideoStorage>) -> Harness {
    let gateway = Arc::new(MemoryGateway::new());
    let (queue, tasks) = backend::worker::queue();

    let state = AppState {
        gateway: gateway.clone(),
        storage,
        queue,
        limits,
    };

    Harness {
        gateway,
        tasks,
        router: axum::Router::new().nest("/api/", backend::api::router(state)),
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

fn multipart(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(token: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/games/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(multipart(parts))).unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Storage that rejects every write.
struct FullDisk;

impl VideoStorage for FullDisk {
    fn upload<'f, 's, 'own>(
        &'own self,
        _key: String,
        _stream: futures::stream::BoxStream<'s, Result<axum::body::Bytes, std::io::Error>>,
    ) -> futures::future::BoxFuture<'f, Result<u64, StorageError>>
    where
        's: 'f,
        'own: 'f,
    {
        async { Err(StorageError::Io(std::io::Error::other("no space left"))) }.boxed()
    }

    fn load<'f, 'own>(
        &'own self,
        key: String,
    ) -> futures::future::BoxFuture<'f, Result<VideoData, StorageError>>
    where
        'own: 'f,
    {
        async move { Err(StorageError::NotFound(key)) }.boxed()
    }
}

const GAME_INFO: &str = r#"{"homeTeam":"A","awayTeam":"B","date":"2024-05-01","duration":5400}"#;

#[tokio::test]
async fn upload_requires_identity() {
    let harness = harness(UploadLimits::default());

    let response = harness
        .router
        .oneshot(upload_request(
            None,
            &[
                Part::Text("videoUrl", "https://example.com/match.mp4"),
                Part::Text("gameInfo", GAME_INFO),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(StatusCode::UNAUTHORIZED, response.status());
    assert!(harness.gateway.list_games("coach").await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_with_video_creates_game_and_job() {
    let mut harness = harness(UploadLimits::default());

    let response = harness
        .router
        .clone()
        .oneshot(upload_request(
            Some("coach"),
            &[
                Part::File {
                    name: "video",
                    file_name: "final match.mp4",
                    content_type: "video/mp4",
                    data: b"not really a video",
                },
                Part::Text("gameInfo", GAME_INFO),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, response.status());
    let body: UploadResponse = json(response).await;
    assert_eq!(GameStatus::Uploaded, body.status);
    assert_eq!(
        "Video uploaded successfully, processing started",
        body.message
    );

    let game = harness.gateway.game(body.game_id).await.unwrap();
    assert_eq!("coach", game.owner);
    assert_eq!(
        Some(format!("coach/{}/final_match.mp4", game.id)),
        game.video_file
    );

    let job = harness.gateway.latest_job(game.id).await.unwrap();
    assert_eq!((Stage::Uploading, 0), (job.stage, job.progress));

    assert_eq!(
        Some(AnalysisTask { game_id: game.id }),
        harness.tasks.recv().await
    );
}

#[tokio::test]
async fn invalid_uploads_create_nothing() {
    let video = Part::File {
        name: "video",
        file_name: "match.mp4",
        content_type: "video/mp4",
        data: b"0123456789",
    };
    let cases: Vec<(&str, Vec<Part<'_>>)> = vec![
        ("no video", vec![Part::Text("gameInfo", GAME_INFO)]),
        (
            "no game info",
            vec![Part::Text("videoUrl", "https://example.com/match.mp4")],
        ),
        (
            "missing team",
            vec![
                Part::Text("videoUrl", "https://example.com/match.mp4"),
                Part::Text("gameInfo", r#"{"homeTeam":"A","awayTeam":"","date":"2024-05-01"}"#),
            ],
        ),
        (
            "bad date",
            vec![
                Part::Text("videoUrl", "https://example.com/match.mp4"),
                Part::Text("gameInfo", r#"{"homeTeam":"A","awayTeam":"B","date":"May"}"#),
            ],
        ),
        (
            "wrong type",
            vec![
                Part::File {
                    name: "video",
                    file_name: "match.png",
                    content_type: "image/png",
                    data: b"png",
                },
                Part::Text("gameInfo", GAME_INFO),
            ],
        ),
        ("too large", vec![video, Part::Text("gameInfo", GAME_INFO)]),
    ];

    for (case, parts) in cases {
        let harness = harness(UploadLimits {
            max_upload_bytes: 5,
            ..UploadLimits::default()
        });

        let response = harness
            .router
            .oneshot(upload_request(Some("coach"), &parts))
            .await
            .unwrap();

        assert_eq!(StatusCode::BAD_REQUEST, response.status(), "{}", case);
        let body: ErrorBody = json(response).await;
        assert!(!body.error.is_empty(), "{}", case);
        assert!(
            harness.gateway.list_games("coach").await.unwrap().is_empty(),
            "{}",
            case
        );
    }
}

#[tokio::test]
async fn status_of_unknown_game_is_not_found() {
    let harness = harness(UploadLimits::default());

    let response = harness
        .router
        .oneshot(get(
            &format!("/api/games/{}/status", uuid::Uuid::now_v7()),
            "coach",
        ))
        .await
        .unwrap();

    assert_eq!(StatusCode::NOT_FOUND, response.status());
}

#[tokio::test]
async fn status_without_job_is_not_found() {
    let harness = harness(UploadLimits::default());
    let game = harness
        .gateway
        .create_game(NewGame {
            home_team: "A".to_owned(),
            away_team: "B".to_owned(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            duration: 5400,
            video_url: None,
            owner: "coach".to_owned(),
        })
        .await
        .unwrap();

    let response = harness
        .router
        .oneshot(get(&format!("/api/games/{}/status", game.id), "coach"))
        .await
        .unwrap();

    assert_eq!(StatusCode::NOT_FOUND, response.status());
    let body: ErrorBody = json(response).await;
    assert_eq!("Processing job not found", body.error);
}

#[tokio::test]
async fn games_of_other_callers_are_hidden() {
    let harness = harness(UploadLimits::default());

    let response = harness
        .router
        .clone()
        .oneshot(upload_request(
            Some("coach"),
            &[
                Part::Text("videoUrl", "https://example.com/match.mp4"),
                Part::Text("gameInfo", GAME_INFO),
            ],
        ))
        .await
        .unwrap();
    let upload: UploadResponse = json(response).await;

    let own = harness
        .router
        .clone()
        .oneshot(get(&format!("/api/games/{}/status", upload.game_id), "coach"))
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, own.status());
    let job: Job = json(own).await;
    assert_eq!(upload.game_id, job.game_id);

    let other = harness
        .router
        .oneshot(get(&format!("/api/games/{}/status", upload.game_id), "rival"))
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, other.status());
}

#[tokio::test]
async fn processed_game_is_readable() {
    let harness = harness(UploadLimits::default());
    let Harness {
        gateway,
        tasks,
        router,
    } = harness;

    let pipeline = backend::pipeline::Pipeline::new(
        gateway.clone(),
        Arc::new(FileStorage::new(std::env::temp_dir())),
        analysis::Config::default(),
    );
    let worker = tokio::spawn(backend::worker::run(Arc::new(pipeline), tasks));

    let response = router
        .clone()
        .oneshot(upload_request(
            Some("coach"),
            &[
                Part::Text("videoUrl", "https://example.com/match.mp4"),
                Part::Text("gameInfo", GAME_INFO),
            ],
        ))
        .await
        .unwrap();
    let upload: UploadResponse = json(response).await;

    let finished = backend::poller::wait_for_terminal(
        backend::poller::GatewayStatus(gateway.clone()),
        upload.game_id,
        std::time::Duration::from_millis(10),
        |_| {},
    )
    .await
    .unwrap();
    assert_eq!(Stage::Complete, finished.stage);

    let events: Vec<common::match_analysis::Event> = json(
        router
            .clone()
            .oneshot(get(&format!("/api/games/{}/events", upload.game_id), "coach"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(200, events.len());
    assert!(events
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));

    let stats: common::GameStats = json(
        router
            .clone()
            .oneshot(get(&format!("/api/games/{}/stats", upload.game_id), "coach"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!((22, 2), (stats.players.len(), stats.teams.len()));

    let dashboard: common::DashboardStats = json(
        router
            .oneshot(get("/api/dashboard", "coach"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(1, dashboard.total_games);
    assert_eq!(200, dashboard.total_events);
    assert_eq!(1, dashboard.completed_games);

    worker.abort();
}

#[tokio::test]
#[traced_test]
async fn storage_failure_fails_the_game() {
    let mut harness = harness_with_storage(UploadLimits::default(), Arc::new(FullDisk));

    let response = harness
        .router
        .clone()
        .oneshot(upload_request(
            Some("coach"),
            &[
                Part::File {
                    name: "video",
                    file_name: "match.mp4",
                    content_type: "video/mp4",
                    data: b"not really a video",
                },
                Part::Text("gameInfo", GAME_INFO),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
    let body: ErrorBody = json(response).await;
    assert_eq!("Internal server error", body.error);

    let games = harness.gateway.list_games("coach").await.unwrap();
    assert_eq!(1, games.len());
    assert_eq!(GameStatus::Failed, games[0].status);
    assert_eq!(None, games[0].video_file);
    assert!(matches!(
        harness.gateway.latest_job(games[0].id).await,
        Err(backend::gateway::GatewayError::NotFound("job"))
    ));
    assert!(harness.tasks.try_recv().is_err());
    assert!(logs_contain("Storing video"));
    assert!(!logs_contain("Failing game after storage error"));
}
