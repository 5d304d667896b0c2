use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;

use backend::gateway::{Gateway, MemoryGateway, PgGateway};
use backend::settings::{Settings, StorageKind};
use backend::storage::{FileStorage, S3Storage, VideoStorage};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn gateway(settings: &Settings) -> Result<Arc<dyn Gateway>, BoxError> {
    match &settings.database_url {
        Some(url) => {
            let gateway = PgGateway::new(url.clone());

            tracing::info!("Applying Migrations");
            backend::run_migrations(&gateway).await?;
            tracing::info!("Completed Migrations");

            Ok(Arc::new(gateway))
        }
        None => {
            tracing::warn!("No database configured, records are kept in memory");
            Ok(Arc::new(MemoryGateway::new()))
        }
    }
}

async fn storage(settings: &Settings) -> Result<Arc<dyn VideoStorage>, BoxError> {
    match settings.storage {
        StorageKind::File => {
            tokio::fs::create_dir_all(&settings.upload_folder).await?;
            Ok(Arc::new(FileStorage::new(settings.upload_folder.clone())))
        }
        StorageKind::S3 => {
            let bucket = settings
                .s3_bucket
                .as_deref()
                .ok_or("--s3-bucket is required for s3 storage")?;
            let credentials = s3::creds::Credentials::default()?;

            Ok(Arc::new(S3Storage::new(
                bucket,
                settings.s3_region(),
                credentials,
            )?))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("backend=info,analysis=info"));
    let registry = tracing_subscriber::Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(filter);
    tracing::subscriber::set_global_default(registry)?;

    let settings = Settings::parse();
    tracing::info!("Starting...");

    let gateway = gateway(&settings).await?;
    let storage = storage(&settings).await?;

    let pipeline = backend::pipeline::Pipeline::new(
        gateway.clone(),
        storage.clone(),
        settings.analysis_config(),
    )
    .with_step_delay(settings.step_delay())
    .with_seed(settings.seed);

    let (queue, tasks) = backend::worker::queue();
    let worker = tokio::spawn(backend::worker::run(Arc::new(pipeline), tasks));

    let state = backend::api::AppState {
        gateway,
        storage,
        queue,
        limits: settings.upload_limits(),
    };

    let router = axum::Router::new()
        .nest("/api/", backend::api::router(state))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(settings.listen).await?;
    tracing::info!("Listening on {}", settings.listen);
    axum::serve(listener, router).await?;

    worker.abort();
    Ok(())
}
