pub mod models;
pub mod schema;

pub mod gateway;
pub mod storage;

pub mod pipeline;
pub mod worker;

pub mod identity;
pub use identity::Identity;

pub mod api;
pub mod poller;
pub mod settings;

pub const MIGRATIONS: diesel_async_migrations::EmbeddedMigrations =
    diesel_async_migrations::embed_migrations!("../migrations/");

/// Applies every migration that was not yet run against the database.
pub async fn run_migrations(gateway: &gateway::PgGateway) -> Result<(), gateway::GatewayError> {
    let mut connection = gateway.connection().await?;
    MIGRATIONS.run_pending_migrations(&mut connection).await?;
    Ok(())
}
