//! Database migration command.
//!
//! Migrations live in `crates/api/migrations/` and are embedded at build time.

use sqlx::PgPool;

use super::CliError;

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn run(pool: &PgPool) -> Result<(), CliError> {
    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(pool).await?;
    tracing::info!("Migrations complete!");
    Ok(())
}
