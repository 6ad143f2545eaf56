use chrono::{Local, NaiveDate, NaiveDateTime};
use sqlx::PgConnection;
use thiserror::Error;
use uuid::Uuid;

use infra::models::ReservationRow;
use infra::repos::{cafes, reservations, reservations::CreateReservation, users};

use super::availability::{
    self, Availability, Cafe, DurationUnit, OpeningHours, SlotOccupancy, SlotRequest, Unavailable,
};

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(Unavailable),

    #[error("cafe data is invalid: {0}")]
    InvalidCatalog(String),

    #[error("database error")]
    Storage(#[from] sqlx::Error),
}

impl ReservationError {
    /// Stable discriminator exposed to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ReservationError::Validation(_) => "VALIDATION_ERROR",
            ReservationError::NotFound(_) => "NOT_FOUND",
            ReservationError::Conflict(_) => "CONFLICT",
            ReservationError::InvalidCatalog(_) => "INTERNAL_ERROR",
            ReservationError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// Parameters for an availability check (parsed by the resolver).
#[derive(Debug, Clone)]
pub struct AvailabilityQuery {
    pub cafe_id: Uuid,
    pub date: String,
    pub time: String,
    pub duration: i32,
    pub unit: DurationUnit,
}

/// Parameters for a booking.
#[derive(Debug, Clone)]
pub struct ReservationParams {
    pub query: AvailabilityQuery,
    pub user_id: Uuid,
    pub seat_count: i32,
}

/// A committed reservation, with the café name resolved for display.
#[derive(Debug, Clone)]
pub struct ReservationRecord {
    pub reservation: ReservationRow,
    pub cafe_name: String,
}

pub struct DaySlots {
    pub cafe_id: Uuid,
    pub cafe_name: String,
    pub date: NaiveDate,
    pub reservation_enabled: bool,
    pub total_seats: i32,
    pub operating_hours: Option<OpeningHours>,
    pub closed_reason: Option<Unavailable>,
    pub slots: Vec<SlotOccupancy>,
}

fn server_now() -> NaiveDateTime {
    Local::now().naive_local()
}

async fn load_cafe(
    conn: &mut PgConnection,
    cafe_id: Uuid,
    lock: bool,
) -> Result<Cafe, ReservationError> {
    let row = if lock {
        cafes::get_by_id_for_update(&mut *conn, cafe_id).await?
    } else {
        cafes::get_by_id(&mut *conn, cafe_id).await?
    }
    .ok_or_else(|| ReservationError::NotFound(format!("Cafe {cafe_id}")))?;

    Cafe::try_from(row).map_err(ReservationError::InvalidCatalog)
}

/// Answer an availability query against the bookings visible on `conn`.
async fn assess(
    conn: &mut PgConnection,
    cafe: &Cafe,
    query: &AvailabilityQuery,
    now: NaiveDateTime,
) -> Result<(Availability, Option<SlotRequest>), ReservationError> {
    if !cafe.reservation_enabled {
        return Ok((Availability::disabled(cafe), None));
    }

    let request = SlotRequest::parse(&query.date, &query.time, query.duration, query.unit)
        .map_err(ReservationError::Validation)?;

    // Calendar rejections need no booking data.
    let bookings = if availability::screen(&cafe.schedule, &request, now).is_ok() {
        reservations::list_overlapping(&mut *conn, cafe.id, request.start_at(), request.end_at())
            .await?
    } else {
        Vec::new()
    };

    Ok((
        availability::evaluate(cafe, &request, &bookings, now),
        Some(request),
    ))
}

/// Can this window be booked right now? Negative answers are `Ok` with a reason.
pub async fn check_availability(
    pool: &sqlx::PgPool,
    query: &AvailabilityQuery,
) -> Result<Availability, ReservationError> {
    let mut conn = pool.acquire().await?;
    let cafe = load_cafe(&mut conn, query.cafe_id, false).await?;
    let (result, _) = assess(&mut conn, &cafe, query, server_now()).await?;
    Ok(result)
}

/// Book seats. The café row stays locked from the capacity check until commit,
/// so concurrent bookings for the same café are admitted one at a time and each
/// sees the seats taken by the ones before it.
pub async fn create_reservation(
    pool: &sqlx::PgPool,
    params: ReservationParams,
) -> Result<ReservationRecord, ReservationError> {
    if params.seat_count < 1 {
        return Err(ReservationError::Validation(
            "Seat count must be at least 1".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let cafe = load_cafe(&mut tx, params.query.cafe_id, true).await?;

    users::get_by_id(&mut *tx, params.user_id)
        .await?
        .ok_or_else(|| ReservationError::NotFound(format!("User {}", params.user_id)))?;

    let (result, request) = assess(&mut tx, &cafe, &params.query, server_now()).await?;

    if let Some(reason) = result.reason {
        return Err(ReservationError::Conflict(reason));
    }
    let Some(request) = request else {
        return Err(ReservationError::Conflict(Unavailable::ReservationDisabled));
    };
    if result.available_seats < params.seat_count {
        return Err(ReservationError::Conflict(Unavailable::NoCapacity {
            available_seats: result.available_seats,
        }));
    }

    let reservation = reservations::create(
        &mut *tx,
        CreateReservation {
            cafe_id: cafe.id,
            user_id: params.user_id,
            start_at: request.start_at(),
            end_at: request.end_at(),
            seat_count: params.seat_count,
            total_price: result.total_price,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        reservation_id = %reservation.id,
        cafe_id = %cafe.id,
        user_id = %params.user_id,
        seats = params.seat_count,
        "Reservation confirmed"
    );

    Ok(ReservationRecord {
        reservation,
        cafe_name: cafe.name,
    })
}

/// One of the caller's reservations. Someone else's booking reads as missing.
pub async fn get_reservation(
    pool: &sqlx::PgPool,
    reservation_id: Uuid,
    user_id: Uuid,
) -> Result<ReservationRecord, ReservationError> {
    let not_found = || ReservationError::NotFound(format!("Reservation {reservation_id}"));

    let reservation = reservations::get_by_id(pool, reservation_id)
        .await?
        .filter(|r| r.user_id == user_id)
        .ok_or_else(not_found)?;

    let cafe = cafes::get_by_id(pool, reservation.cafe_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(ReservationRecord {
        reservation,
        cafe_name: cafe.name,
    })
}

/// Load of every slot a café offers on `date`.
pub async fn list_day_slots(
    pool: &sqlx::PgPool,
    cafe_id: Uuid,
    date: &str,
) -> Result<DaySlots, ReservationError> {
    let mut conn = pool.acquire().await?;
    let cafe = load_cafe(&mut conn, cafe_id, false).await?;

    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        ReservationError::Validation("Invalid date format (expected YYYY-MM-DD)".to_string())
    })?;

    let mut board = DaySlots {
        cafe_id: cafe.id,
        cafe_name: cafe.name.clone(),
        date,
        reservation_enabled: cafe.reservation_enabled,
        total_seats: cafe.total_seats,
        operating_hours: None,
        closed_reason: None,
        slots: Vec::new(),
    };

    if !cafe.reservation_enabled {
        board.closed_reason = Some(Unavailable::ReservationDisabled);
        return Ok(board);
    }

    let weekday = chrono::Datelike::weekday(&date);
    let Some(hours) = cafe.schedule.hours_on(weekday) else {
        board.closed_reason = Some(Unavailable::ClosedDay { weekday });
        return Ok(board);
    };

    let bookings = reservations::list_overlapping(
        &mut *conn,
        cafe.id,
        date.and_time(hours.open),
        date.and_time(hours.close),
    )
    .await?;

    board.operating_hours = Some(hours);
    board.slots = availability::day_board(hours, date, cafe.total_seats, &bookings);
    Ok(board)
}
