//! Reference data seeding.

use sqlx::PgPool;
use storekeep_core::OrderStatusCode;

use super::CliError;

/// Insert a status row for every order status code that has none.
///
/// Existing rows, including relabelled ones, are left alone, so running this
/// twice is harmless.
///
/// # Errors
///
/// Returns an error if an insert fails.
pub async fn statuses(pool: &PgPool) -> Result<u64, CliError> {
    let mut inserted = 0;
    for code in OrderStatusCode::ALL {
        let result = sqlx::query(
            r"
            INSERT INTO storekeep.status (code, label)
            VALUES ($1, $2)
            ON CONFLICT (code) DO NOTHING
            ",
        )
        .bind(code)
        .bind(code.default_label())
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(%code, "Status seeded");
        }
        inserted += result.rows_affected();
    }

    tracing::info!(inserted, "Status seeding complete");
    Ok(inserted)
}
