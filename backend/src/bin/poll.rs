use clap::Parser;

/// Follows the processing job of a game until it finished.
#[derive(Debug, clap::Parser)]
struct Args {
    #[arg(long, env = "SERVER_URL", default_value = "http://localhost:3000")]
    server: String,

    #[arg(long, env = "API_TOKEN")]
    token: String,

    #[arg(long)]
    game: uuid::Uuid,

    #[arg(long, default_value_t = 2000)]
    interval_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("backend=warn")),
        )
        .init();

    let args = Args::parse();
    let source = backend::poller::HttpStatus::new(args.server, args.token);

    let result = backend::poller::wait_for_terminal(
        source,
        args.game,
        std::time::Duration::from_millis(args.interval_ms),
        |observation| {
            println!(
                "{:>10} {:>3}% {}",
                observation.stage.as_str(),
                observation.progress,
                observation.message.as_deref().unwrap_or("")
            );
        },
    )
    .await;

    match result {
        Ok(observation) if observation.stage == common::Stage::Complete => {
            std::process::ExitCode::SUCCESS
        }
        Ok(observation) => {
            eprintln!(
                "Processing failed: {}",
                observation.error_message.as_deref().unwrap_or("unknown error")
            );
            std::process::ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::ExitCode::FAILURE
        }
    }
}
