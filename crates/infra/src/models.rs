use crate::repos::orders::OrderStatus;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CafeRow {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub opening_hours: serde_json::Value, // JSONB field, keyed by weekday
    pub total_seats: i32,
    pub rate_cents: i64,
    pub rate_unit: String,
    pub reservation_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReservationRow {
    pub id: Uuid,
    pub cafe_id: Uuid,
    pub user_id: Uuid,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub seat_count: i32,
    pub total_price: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// The slice of a reservation the availability scan needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct SeatBookingRow {
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub seat_count: i32,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: Uuid,
    pub order_id: String,
    pub user_id: Uuid,
    pub order_name: String,
    pub amount: i64,
    pub status: OrderStatus,
    pub payment_key: Option<String>,
    pub payment_method: Option<String>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
