//! Seat-capacity arithmetic for café reservations.
//!
//! Everything in this module is pure: callers load the café and the
//! overlapping bookings, and pass in the current time.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Deserialize;
use uuid::Uuid;

use infra::models::{CafeRow, SeatBookingRow};

/// Length of one bookkeeping slot.
pub const SLOT_MINUTES: i64 = 30;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

const WEEKDAYS: [(Weekday, &str); 7] = [
    (Weekday::Mon, "monday"),
    (Weekday::Tue, "tuesday"),
    (Weekday::Wed, "wednesday"),
    (Weekday::Thu, "thursday"),
    (Weekday::Fri, "friday"),
    (Weekday::Sat, "saturday"),
    (Weekday::Sun, "sunday"),
];

pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAYS[weekday.num_days_from_monday() as usize].1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl fmt::Display for OpeningHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}~{}",
            self.open.format(TIME_FORMAT),
            self.close.format(TIME_FORMAT)
        )
    }
}

/// Opening hours per weekday. A day without hours is a closed day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: [Option<OpeningHours>; 7],
}

#[derive(Deserialize)]
struct DayHoursJson {
    open: Option<String>,
    close: Option<String>,
}

impl WeeklySchedule {
    /// Parse the `opening_hours` JSONB column.
    ///
    /// Unknown keys are ignored. A day is closed when its key is missing, its
    /// value is `null`, or either bound is `null`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, String> {
        let raw: BTreeMap<String, Option<DayHoursJson>> = serde_json::from_value(value.clone())
            .map_err(|e| format!("malformed opening hours: {e}"))?;

        let mut schedule = Self::default();
        for (weekday, name) in WEEKDAYS {
            let Some(Some(day)) = raw.get(name) else {
                continue;
            };
            let (Some(open), Some(close)) = (day.open.as_deref(), day.close.as_deref()) else {
                continue;
            };
            let open = parse_time(open).map_err(|e| format!("{name}: {e}"))?;
            let close = parse_time(close).map_err(|e| format!("{name}: {e}"))?;
            schedule = schedule.with_day(weekday, open, close);
        }
        Ok(schedule)
    }

    pub fn with_day(mut self, weekday: Weekday, open: NaiveTime, close: NaiveTime) -> Self {
        self.days[weekday.num_days_from_monday() as usize] = Some(OpeningHours { open, close });
        self
    }

    pub fn hours_on(&self, weekday: Weekday) -> Option<OpeningHours> {
        self.days[weekday.num_days_from_monday() as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    Hour,
    Slot,
}

impl RateUnit {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "hour" => Ok(RateUnit::Hour),
            "slot" => Ok(RateUnit::Slot),
            _ => Err(format!("Unknown rate unit: {}", s)),
        }
    }
}

/// The reservation-relevant view of a café.
#[derive(Debug, Clone)]
pub struct Cafe {
    pub id: Uuid,
    pub name: String,
    pub schedule: WeeklySchedule,
    pub total_seats: i32,
    pub rate_cents: i64,
    pub rate_unit: RateUnit,
    pub reservation_enabled: bool,
}

impl TryFrom<CafeRow> for Cafe {
    type Error = String;

    fn try_from(row: CafeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            schedule: WeeklySchedule::from_json(&row.opening_hours)
                .map_err(|e| format!("cafe {}: {e}", row.id))?,
            rate_unit: RateUnit::parse(&row.rate_unit)?,
            id: row.id,
            name: row.name,
            total_seats: row.total_seats,
            rate_cents: row.rate_cents,
            reservation_enabled: row.reservation_enabled,
        })
    }
}

impl Cafe {
    /// Price of occupying `slots` consecutive slots. Hourly rates are charged
    /// per half hour, rounding up to the next minor unit.
    pub fn quote(&self, slots: u32) -> i64 {
        let slots = i64::from(slots);
        match self.rate_unit {
            RateUnit::Slot => self.rate_cents * slots,
            RateUnit::Hour => (self.rate_cents * slots + 1) / 2,
        }
    }
}

/// Unit the caller expresses the booking length in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationUnit {
    #[default]
    Hours,
    /// Legacy clients count in 30-minute slots.
    Slots,
}

/// A parsed, validated booking window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRequest {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub slots: u32,
    end: NaiveDateTime,
}

impl SlotRequest {
    pub fn parse(date: &str, time: &str, duration: i32, unit: DurationUnit) -> Result<Self, String> {
        let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
            .map_err(|_| "Invalid date format (expected YYYY-MM-DD)".to_string())?;
        let start = parse_time(time)?;

        if duration <= 0 {
            return Err("Duration must be a positive number".to_string());
        }
        let slots = match unit {
            DurationUnit::Hours => duration.checked_mul(2),
            DurationUnit::Slots => Some(duration),
        }
        .and_then(|s| u32::try_from(s).ok())
        .ok_or_else(|| "Duration is too long".to_string())?;

        let end = date
            .and_time(start)
            .checked_add_signed(Duration::minutes(SLOT_MINUTES * i64::from(slots)))
            .ok_or_else(|| "Duration is too long".to_string())?;

        Ok(Self {
            date,
            start,
            slots,
            end,
        })
    }

    pub fn start_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start)
    }

    pub fn end_at(&self) -> NaiveDateTime {
        self.end
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
        .map_err(|_| format!("Invalid time '{s}' (expected HH:MM)"))
}

/// Why a slot cannot be booked. Part of the public contract: callers branch on
/// the variant, never on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    ReservationDisabled,
    PastTime,
    ClosedDay { weekday: Weekday },
    OutsideHours { hours: OpeningHours },
    NoCapacity { available_seats: i32 },
}

impl Unavailable {
    pub fn code(&self) -> &'static str {
        match self {
            Unavailable::ReservationDisabled => "RESERVATION_DISABLED",
            Unavailable::PastTime => "PAST_TIME",
            Unavailable::ClosedDay { .. } => "CLOSED_DAY",
            Unavailable::OutsideHours { .. } => "OUTSIDE_HOURS",
            Unavailable::NoCapacity { .. } => "NO_CAPACITY",
        }
    }
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::ReservationDisabled => {
                write!(f, "This cafe does not accept reservations")
            }
            Unavailable::PastTime => write!(f, "Reservations cannot be made in the past"),
            Unavailable::ClosedDay { weekday } => {
                write!(f, "The cafe is closed on {}", weekday_name(*weekday))
            }
            Unavailable::OutsideHours { hours } => {
                write!(f, "Requested time is outside operating hours ({hours})")
            }
            Unavailable::NoCapacity { available_seats } => write!(
                f,
                "Not enough seats for the requested time ({available_seats} available)"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub cafe_id: Uuid,
    pub cafe_name: String,
    pub reservation_enabled: bool,
    pub reason: Option<Unavailable>,
    pub operating_hours: Option<OpeningHours>,
    pub start_at: Option<NaiveDateTime>,
    pub end_at: Option<NaiveDateTime>,
    pub total_seats: i32,
    pub reserved_seats: i32,
    pub available_seats: i32,
    pub required_slots: u32,
    pub total_price: i64,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        self.reason.is_none()
    }

    pub fn message(&self) -> String {
        match &self.reason {
            Some(reason) => reason.to_string(),
            None => "Seats are available".to_string(),
        }
    }

    /// Result for a café that has reservations switched off.
    pub fn disabled(cafe: &Cafe) -> Self {
        Self {
            cafe_id: cafe.id,
            cafe_name: cafe.name.clone(),
            reservation_enabled: false,
            reason: Some(Unavailable::ReservationDisabled),
            operating_hours: None,
            start_at: None,
            end_at: None,
            total_seats: cafe.total_seats,
            reserved_seats: 0,
            available_seats: 0,
            required_slots: 0,
            total_price: 0,
        }
    }
}

/// Calendar checks that need no reservation data: past time, closed day,
/// operating hours. Returns the day's hours when the window fits.
pub fn screen(
    schedule: &WeeklySchedule,
    request: &SlotRequest,
    now: NaiveDateTime,
) -> Result<OpeningHours, Unavailable> {
    if request.start_at() < now {
        return Err(Unavailable::PastTime);
    }

    let hours = schedule
        .hours_on(request.weekday())
        .ok_or(Unavailable::ClosedDay {
            weekday: request.weekday(),
        })?;

    // Whole timestamps, so a window running past midnight never fits.
    let opens_at = request.date.and_time(hours.open);
    let closes_at = request.date.and_time(hours.close);
    if request.start_at() < opens_at || request.end_at() > closes_at {
        return Err(Unavailable::OutsideHours { hours });
    }

    Ok(hours)
}

/// Consecutive `[start, end)` slot windows starting at `start`.
pub fn slot_windows(
    start: NaiveDateTime,
    slots: u32,
) -> impl Iterator<Item = (NaiveDateTime, NaiveDateTime)> {
    (0..i64::from(slots)).map(move |i| {
        let from = start + Duration::minutes(SLOT_MINUTES * i);
        (from, from + Duration::minutes(SLOT_MINUTES))
    })
}

/// Seats held by `bookings` during `[from, to)`, using half-open overlap.
pub fn reserved_during(bookings: &[SeatBookingRow], from: NaiveDateTime, to: NaiveDateTime) -> i32 {
    bookings
        .iter()
        .filter(|b| b.start_at < to && b.end_at > from)
        .map(|b| b.seat_count)
        .sum()
}

/// The busiest slot of the request decides: a seat is only free if it is free
/// in every slot.
pub fn peak_reserved(bookings: &[SeatBookingRow], start: NaiveDateTime, slots: u32) -> i32 {
    slot_windows(start, slots)
        .map(|(from, to)| reserved_during(bookings, from, to))
        .max()
        .unwrap_or(0)
}

/// Full availability answer for an enabled café.
pub fn evaluate(
    cafe: &Cafe,
    request: &SlotRequest,
    bookings: &[SeatBookingRow],
    now: NaiveDateTime,
) -> Availability {
    let mut result = Availability {
        cafe_id: cafe.id,
        cafe_name: cafe.name.clone(),
        reservation_enabled: true,
        reason: None,
        operating_hours: cafe.schedule.hours_on(request.weekday()),
        start_at: Some(request.start_at()),
        end_at: Some(request.end_at()),
        total_seats: cafe.total_seats,
        reserved_seats: 0,
        available_seats: 0,
        required_slots: request.slots,
        total_price: cafe.quote(request.slots),
    };

    if let Err(reason) = screen(&cafe.schedule, request, now) {
        result.reason = Some(reason);
        return result;
    }

    let reserved = peak_reserved(bookings, request.start_at(), request.slots);
    let available = (cafe.total_seats - reserved).max(0);

    result.reserved_seats = reserved;
    result.available_seats = available;
    if available == 0 {
        result.reason = Some(Unavailable::NoCapacity { available_seats: 0 });
    }
    result
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotOccupancy {
    pub start: NaiveTime,
    pub reserved_seats: i32,
    pub available_seats: i32,
    /// Percentage of seats taken, one decimal.
    pub occupancy_rate: f64,
}

/// Every slot between opening and closing on `date`, with its load.
pub fn day_board(
    hours: OpeningHours,
    date: NaiveDate,
    total_seats: i32,
    bookings: &[SeatBookingRow],
) -> Vec<SlotOccupancy> {
    let opens_at = date.and_time(hours.open);
    let closes_at = date.and_time(hours.close);
    let minutes = (closes_at - opens_at).num_minutes().max(0);
    let slots = u32::try_from(minutes / SLOT_MINUTES).unwrap_or(0);

    slot_windows(opens_at, slots)
        .map(|(from, to)| {
            let reserved = reserved_during(bookings, from, to);
            let occupancy_rate = if total_seats > 0 {
                (f64::from(reserved) / f64::from(total_seats) * 1000.0).round() / 10.0
            } else {
                0.0
            };
            SlotOccupancy {
                start: from.time(),
                reserved_seats: reserved,
                available_seats: (total_seats - reserved).max(0),
                occupancy_rate,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, TIME_FORMAT).unwrap()
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, DATE_FORMAT)
            .unwrap()
            .and_time(t(time))
    }

    // 2030-01-07 is a Monday.
    const MONDAY: &str = "2030-01-07";
    const SUNDAY: &str = "2030-01-13";

    fn now() -> NaiveDateTime {
        at("2030-01-01", "00:00")
    }

    fn cafe(total_seats: i32) -> Cafe {
        let mut schedule = WeeklySchedule::default();
        for weekday in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ] {
            schedule = schedule.with_day(weekday, t("09:00"), t("18:00"));
        }
        Cafe {
            id: Uuid::new_v4(),
            name: "Study Cafe".to_string(),
            schedule,
            total_seats,
            rate_cents: 1000,
            rate_unit: RateUnit::Hour,
            reservation_enabled: true,
        }
    }

    fn booking(date: &str, from: &str, to: &str, seats: i32) -> SeatBookingRow {
        SeatBookingRow {
            start_at: at(date, from),
            end_at: at(date, to),
            seat_count: seats,
        }
    }

    fn request(date: &str, time: &str, hours: i32) -> SlotRequest {
        SlotRequest::parse(date, time, hours, DurationUnit::Hours).unwrap()
    }

    #[test]
    fn two_hour_request_on_empty_cafe_is_priced_per_hour() {
        let result = evaluate(&cafe(2), &request(MONDAY, "14:00", 2), &[], now());

        assert!(result.is_available());
        assert_eq!(result.available_seats, 2);
        assert_eq!(result.total_price, 2000);
        assert_eq!(result.required_slots, 4);
        assert_eq!(
            result.operating_hours,
            Some(OpeningHours {
                open: t("09:00"),
                close: t("18:00")
            })
        );
    }

    #[test]
    fn fully_booked_window_reports_no_capacity() {
        let bookings = [booking(MONDAY, "14:00", "16:00", 2)];
        let result = evaluate(&cafe(2), &request(MONDAY, "14:00", 2), &bookings, now());

        assert!(!result.is_available());
        assert_eq!(result.available_seats, 0);
        assert_eq!(
            result.reason,
            Some(Unavailable::NoCapacity { available_seats: 0 })
        );
    }

    #[test]
    fn closed_day_is_a_negative_answer() {
        let result = evaluate(&cafe(5), &request(SUNDAY, "10:00", 1), &[], now());
        assert_eq!(
            result.reason,
            Some(Unavailable::ClosedDay {
                weekday: Weekday::Sun
            })
        );
        assert_eq!(result.reason.map(|r| r.code()), Some("CLOSED_DAY"));
    }

    #[test]
    fn half_open_schedule_counts_as_closed() {
        let schedule = WeeklySchedule::from_json(&json!({
            "monday": { "open": "09:00", "close": null },
            "tuesday": null,
            "wednesday": { "open": "10:00", "close": "20:00" }
        }))
        .unwrap();

        assert_eq!(schedule.hours_on(Weekday::Mon), None);
        assert_eq!(schedule.hours_on(Weekday::Tue), None);
        assert_eq!(schedule.hours_on(Weekday::Thu), None);
        assert_eq!(
            schedule.hours_on(Weekday::Wed),
            Some(OpeningHours {
                open: t("10:00"),
                close: t("20:00")
            })
        );
    }

    #[test]
    fn malformed_schedule_time_is_rejected() {
        let err = WeeklySchedule::from_json(&json!({
            "monday": { "open": "9am", "close": "18:00" }
        }))
        .unwrap_err();
        assert!(err.contains("monday"));
    }

    #[test]
    fn window_outside_hours_is_rejected_regardless_of_capacity() {
        for (time, hours) in [("08:30", 1), ("17:00", 2), ("07:00", 1), ("18:00", 1)] {
            let result = evaluate(&cafe(100), &request(MONDAY, time, hours), &[], now());
            assert!(
                matches!(result.reason, Some(Unavailable::OutsideHours { .. })),
                "{time} for {hours}h should be outside hours, got {:?}",
                result.reason
            );
        }
    }

    #[test]
    fn window_ending_exactly_at_close_is_allowed() {
        let result = evaluate(&cafe(1), &request(MONDAY, "16:00", 2), &[], now());
        assert!(result.is_available());
    }

    #[test]
    fn window_crossing_midnight_is_outside_hours() {
        let mut late = cafe(1);
        late.schedule = late.schedule.with_day(Weekday::Mon, t("18:00"), t("23:30"));
        let result = evaluate(&late, &request(MONDAY, "23:00", 2), &[], now());
        assert!(matches!(
            result.reason,
            Some(Unavailable::OutsideHours { .. })
        ));
    }

    #[test]
    fn past_start_is_rejected_before_calendar_checks() {
        let later = at(MONDAY, "15:00");
        let result = evaluate(&cafe(5), &request(MONDAY, "14:00", 1), &[], later);
        assert_eq!(result.reason, Some(Unavailable::PastTime));
    }

    #[test]
    fn start_equal_to_now_is_not_past() {
        let result = evaluate(&cafe(5), &request(MONDAY, "14:00", 1), &[], at(MONDAY, "14:00"));
        assert!(result.is_available());
    }

    #[test]
    fn touching_bookings_do_not_overlap() {
        let bookings = [
            booking(MONDAY, "12:00", "14:00", 1),
            booking(MONDAY, "16:00", "18:00", 1),
        ];
        let result = evaluate(&cafe(1), &request(MONDAY, "14:00", 2), &bookings, now());
        assert!(result.is_available());
        assert_eq!(result.reserved_seats, 0);
    }

    #[test]
    fn binding_constraint_is_the_busiest_slot_not_the_sum() {
        // Two bookings that never overlap each other each cover half the window.
        let bookings = [
            booking(MONDAY, "14:00", "15:00", 2),
            booking(MONDAY, "15:00", "16:00", 3),
        ];
        let result = evaluate(&cafe(4), &request(MONDAY, "14:00", 2), &bookings, now());
        assert_eq!(result.reserved_seats, 3);
        assert_eq!(result.available_seats, 1);
        assert!(result.is_available());
    }

    #[test]
    fn partial_slot_overlap_still_counts() {
        let bookings = [booking(MONDAY, "13:45", "14:15", 1)];
        assert_eq!(peak_reserved(&bookings, at(MONDAY, "14:00"), 1), 1);
    }

    #[test]
    fn overbooked_history_never_reports_negative_seats() {
        let bookings = [booking(MONDAY, "14:00", "15:00", 5)];
        let result = evaluate(&cafe(3), &request(MONDAY, "14:00", 1), &bookings, now());
        assert_eq!(result.available_seats, 0);
    }

    #[test]
    fn non_positive_duration_is_a_validation_error() {
        assert!(SlotRequest::parse(MONDAY, "14:00", 0, DurationUnit::Hours).is_err());
        assert!(SlotRequest::parse(MONDAY, "14:00", -2, DurationUnit::Hours).is_err());
        assert!(SlotRequest::parse(MONDAY, "14:00", 0, DurationUnit::Slots).is_err());
    }

    #[test]
    fn window_past_the_calendar_end_is_a_validation_error() {
        let err = SlotRequest::parse("+200000-01-03", "10:00", 1_000_000_000, DurationUnit::Hours)
            .unwrap_err();
        assert_eq!(err, "Duration is too long");

        let far = SlotRequest::parse("+200000-01-03", "10:00", 2, DurationUnit::Hours).unwrap();
        assert_eq!(far.end_at(), far.start_at() + Duration::hours(2));
    }

    #[test]
    fn malformed_date_or_time_is_a_validation_error() {
        assert!(SlotRequest::parse("2030/01/07", "14:00", 1, DurationUnit::Hours).is_err());
        assert!(SlotRequest::parse(MONDAY, "2pm", 1, DurationUnit::Hours).is_err());
        assert!(SlotRequest::parse(MONDAY, "25:00", 1, DurationUnit::Hours).is_err());
    }

    #[test]
    fn legacy_slot_units_map_to_half_hours() {
        let req = SlotRequest::parse(MONDAY, "14:00", 3, DurationUnit::Slots).unwrap();
        assert_eq!(req.slots, 3);
        assert_eq!(req.end_at(), at(MONDAY, "15:30"));

        // 1.5 hours at 1000/hour
        assert_eq!(cafe(1).quote(3), 1500);
    }

    #[test]
    fn per_slot_rate_multiplies_by_slot_count() {
        let mut per_slot = cafe(1);
        per_slot.rate_unit = RateUnit::Slot;
        per_slot.rate_cents = 700;
        assert_eq!(per_slot.quote(4), 2800);
    }

    #[test]
    fn disabled_cafe_answer_is_flagged() {
        let mut closed = cafe(3);
        closed.reservation_enabled = false;
        let result = Availability::disabled(&closed);
        assert!(!result.reservation_enabled);
        assert!(!result.is_available());
        assert_eq!(result.reason.map(|r| r.code()), Some("RESERVATION_DISABLED"));
    }

    #[test]
    fn day_board_covers_opening_hours_in_half_hours() {
        let hours = OpeningHours {
            open: t("09:00"),
            close: t("11:00"),
        };
        let date = NaiveDate::parse_from_str(MONDAY, DATE_FORMAT).unwrap();
        let bookings = [booking(MONDAY, "09:30", "10:30", 1)];

        let board = day_board(hours, date, 4, &bookings);

        let starts: Vec<_> = board.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![t("09:00"), t("09:30"), t("10:00"), t("10:30")]);
        let reserved: Vec<_> = board.iter().map(|s| s.reserved_seats).collect();
        assert_eq!(reserved, vec![0, 1, 1, 0]);
        assert_eq!(board[1].occupancy_rate, 25.0);
        assert_eq!(board[1].available_seats, 3);
    }
}
