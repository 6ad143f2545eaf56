use sqlx::{PgExecutor, Result as SqlxResult};
use uuid::Uuid;

use crate::models::CafeRow;

pub async fn get_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> SqlxResult<Option<CafeRow>> {
    sqlx::query_as::<_, CafeRow>(
        r#"
        SELECT id, name, address, latitude, longitude, opening_hours, total_seats,
               rate_cents, rate_unit, reservation_enabled, created_at, updated_at
        FROM cafes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Fetch a café and hold its row lock until the surrounding transaction ends.
///
/// Seat admission for a café is serialized on this lock.
pub async fn get_by_id_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<CafeRow>> {
    sqlx::query_as::<_, CafeRow>(
        r#"
        SELECT id, name, address, latitude, longitude, opening_hours, total_seats,
               rate_cents, rate_unit, reservation_enabled, created_at, updated_at
        FROM cafes
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}
