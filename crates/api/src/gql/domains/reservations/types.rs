use async_graphql::{Enum, InputObject, SimpleObject, ID};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::availability::{self, DurationUnit, OpeningHours, SlotOccupancy, Unavailable};
use super::service::{DaySlots as DaySlotsResult, ReservationRecord};

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum BookingUnit {
    /// Whole hours
    #[default]
    Hours,
    /// 30-minute slots (legacy clients)
    Slots,
}

impl From<BookingUnit> for DurationUnit {
    fn from(unit: BookingUnit) -> Self {
        match unit {
            BookingUnit::Hours => DurationUnit::Hours,
            BookingUnit::Slots => DurationUnit::Slots,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum UnavailableReason {
    ReservationDisabled,
    PastTime,
    ClosedDay,
    OutsideHours,
    NoCapacity,
}

impl From<Unavailable> for UnavailableReason {
    fn from(reason: Unavailable) -> Self {
        match reason {
            Unavailable::ReservationDisabled => UnavailableReason::ReservationDisabled,
            Unavailable::PastTime => UnavailableReason::PastTime,
            Unavailable::ClosedDay { .. } => UnavailableReason::ClosedDay,
            Unavailable::OutsideHours { .. } => UnavailableReason::OutsideHours,
            Unavailable::NoCapacity { .. } => UnavailableReason::NoCapacity,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct OperatingHours {
    pub open: String,
    pub close: String,
}

impl From<OpeningHours> for OperatingHours {
    fn from(hours: OpeningHours) -> Self {
        Self {
            open: hours.open.format("%H:%M").to_string(),
            close: hours.close.format("%H:%M").to_string(),
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct Availability {
    pub cafe_id: ID,
    pub cafe_name: String,
    pub reservation_enabled: bool,
    pub is_available: bool,
    pub reason: Option<UnavailableReason>,
    pub message: String,
    pub operating_hours: Option<OperatingHours>,
    pub start_at: Option<NaiveDateTime>,
    pub end_at: Option<NaiveDateTime>,
    pub total_seats: i32,
    pub reserved_seats: i32,
    pub available_seats: i32,
    pub required_slots: i32,
    pub total_price: i64,
}

impl From<availability::Availability> for Availability {
    fn from(result: availability::Availability) -> Self {
        Self {
            is_available: result.is_available(),
            message: result.message(),
            cafe_id: result.cafe_id.into(),
            cafe_name: result.cafe_name,
            reservation_enabled: result.reservation_enabled,
            reason: result.reason.map(Into::into),
            operating_hours: result.operating_hours.map(Into::into),
            start_at: result.start_at,
            end_at: result.end_at,
            total_seats: result.total_seats,
            reserved_seats: result.reserved_seats,
            available_seats: result.available_seats,
            required_slots: i32::try_from(result.required_slots).unwrap_or(i32::MAX),
            total_price: result.total_price,
        }
    }
}

#[derive(InputObject)]
pub struct CreateReservationInput {
    pub cafe_id: ID,
    /// YYYY-MM-DD
    pub date: String,
    /// HH:MM
    pub time: String,
    pub duration: i32,
    #[graphql(default)]
    pub unit: BookingUnit,
    #[graphql(default = 1)]
    pub seat_count: i32,
}

#[derive(SimpleObject, Clone)]
pub struct Reservation {
    pub id: ID,
    pub cafe_id: ID,
    pub cafe_name: String,
    pub user_id: ID,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub seat_count: i32,
    pub total_price: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReservationRecord> for Reservation {
    fn from(record: ReservationRecord) -> Self {
        let row = record.reservation;
        Self {
            id: row.id.into(),
            cafe_id: row.cafe_id.into(),
            cafe_name: record.cafe_name,
            user_id: row.user_id.into(),
            start_at: row.start_at,
            end_at: row.end_at,
            seat_count: row.seat_count,
            total_price: row.total_price,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct TimeSlot {
    /// HH:MM
    pub time: String,
    pub reserved_seats: i32,
    pub available_seats: i32,
    pub is_available: bool,
    pub occupancy_rate: f64,
}

impl From<SlotOccupancy> for TimeSlot {
    fn from(slot: SlotOccupancy) -> Self {
        Self {
            time: slot.start.format("%H:%M").to_string(),
            reserved_seats: slot.reserved_seats,
            available_seats: slot.available_seats,
            is_available: slot.available_seats > 0,
            occupancy_rate: slot.occupancy_rate,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct DaySlots {
    pub cafe_id: ID,
    pub cafe_name: String,
    pub date: NaiveDate,
    pub reservation_enabled: bool,
    pub total_seats: i32,
    pub operating_hours: Option<OperatingHours>,
    pub closed_reason: Option<UnavailableReason>,
    pub message: Option<String>,
    pub slots: Vec<TimeSlot>,
}

impl From<DaySlotsResult> for DaySlots {
    fn from(board: DaySlotsResult) -> Self {
        Self {
            cafe_id: board.cafe_id.into(),
            cafe_name: board.cafe_name,
            date: board.date,
            reservation_enabled: board.reservation_enabled,
            total_seats: board.total_seats,
            operating_hours: board.operating_hours.map(Into::into),
            closed_reason: board.closed_reason.map(Into::into),
            message: board.closed_reason.map(|r| r.to_string()),
            slots: board.slots.into_iter().map(Into::into).collect(),
        }
    }
}
