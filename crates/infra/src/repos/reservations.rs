use chrono::NaiveDateTime;
use sqlx::{PgExecutor, Result};
use uuid::Uuid;

use crate::models::{ReservationRow, SeatBookingRow};

#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub cafe_id: Uuid,
    pub user_id: Uuid,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub seat_count: i32,
    pub total_price: i64,
}

pub async fn create<'e>(
    executor: impl PgExecutor<'e>,
    data: CreateReservation,
) -> Result<ReservationRow> {
    sqlx::query_as::<_, ReservationRow>(
        r#"
        INSERT INTO reservations (cafe_id, user_id, start_at, end_at, seat_count, total_price, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'confirmed')
        RETURNING id, cafe_id, user_id, start_at, end_at, seat_count, total_price, status, created_at
        "#,
    )
    .bind(data.cafe_id)
    .bind(data.user_id)
    .bind(data.start_at)
    .bind(data.end_at)
    .bind(data.seat_count)
    .bind(data.total_price)
    .fetch_one(executor)
    .await
}

pub async fn get_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<ReservationRow>> {
    sqlx::query_as::<_, ReservationRow>(
        r#"
        SELECT id, cafe_id, user_id, start_at, end_at, seat_count, total_price, status, created_at
        FROM reservations
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Confirmed bookings of a café whose `[start_at, end_at)` overlaps `[from, to)`.
///
/// Bookings that merely touch the window (`end_at = from` or `start_at = to`)
/// are not returned.
pub async fn list_overlapping<'e>(
    executor: impl PgExecutor<'e>,
    cafe_id: Uuid,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<SeatBookingRow>> {
    sqlx::query_as::<_, SeatBookingRow>(
        r#"
        SELECT start_at, end_at, seat_count
        FROM reservations
        WHERE cafe_id = $1
          AND status = 'confirmed'
          AND start_at < $3
          AND end_at > $2
        ORDER BY start_at ASC
        "#,
    )
    .bind(cafe_id)
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await
}
