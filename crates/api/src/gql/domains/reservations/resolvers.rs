use async_graphql::{Context, ErrorExtensions, Object, Result, ID};

use super::service::{self, AvailabilityQuery, ReservationParams};
use super::types::{Availability, BookingUnit, CreateReservationInput, DaySlots, Reservation};
use crate::gql::common::helpers::{parse_id, require_user};
use crate::state::AppState;

#[derive(Default)]
pub struct ReservationQuery;

#[Object]
impl ReservationQuery {
    /// Whether a window can be booked right now. A window that cannot be
    /// booked is a normal answer with `isAvailable = false` and a reason.
    async fn availability(
        &self,
        ctx: &Context<'_>,
        cafe_id: ID,
        date: String,
        time: String,
        #[graphql(default = 2)] duration: i32,
        #[graphql(default)] unit: BookingUnit,
    ) -> Result<Availability> {
        let state = ctx.data::<AppState>()?;

        let query = AvailabilityQuery {
            cafe_id: parse_id(&cafe_id, "cafe")?,
            date,
            time,
            duration,
            unit: unit.into(),
        };

        let result = service::check_availability(&state.db, &query)
            .await
            .map_err(|e| e.extend())?;

        Ok(result.into())
    }

    /// Occupancy of every 30-minute slot a café offers on `date`.
    async fn day_slots(&self, ctx: &Context<'_>, cafe_id: ID, date: String) -> Result<DaySlots> {
        let state = ctx.data::<AppState>()?;

        let board = service::list_day_slots(&state.db, parse_id(&cafe_id, "cafe")?, &date)
            .await
            .map_err(|e| e.extend())?;

        Ok(board.into())
    }

    /// A reservation made by the caller.
    async fn reservation(&self, ctx: &Context<'_>, id: ID) -> Result<Reservation> {
        let user_id = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let record = service::get_reservation(&state.db, parse_id(&id, "reservation")?, user_id)
            .await
            .map_err(|e| e.extend())?;

        Ok(record.into())
    }
}

#[derive(Default)]
pub struct ReservationMutation;

#[Object]
impl ReservationMutation {
    async fn create_reservation(
        &self,
        ctx: &Context<'_>,
        input: CreateReservationInput,
    ) -> Result<Reservation> {
        let user_id = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let params = ReservationParams {
            query: AvailabilityQuery {
                cafe_id: parse_id(&input.cafe_id, "cafe")?,
                date: input.date,
                time: input.time,
                duration: input.duration,
                unit: input.unit.into(),
            },
            user_id,
            seat_count: input.seat_count,
        };

        let record = service::create_reservation(&state.db, params)
            .await
            .map_err(|e| e.extend())?;

        Ok(record.into())
    }
}
