use async_graphql::{Context, ErrorExtensions, Object, Result};

use super::service::{self, PaymentError};
use super::types::{
    ConfirmPaymentInput, CreateOrderInput, Order, OrderCheckout, PaymentConfirmation,
    PaymentFailureAck, ReportPaymentFailureInput,
};
use crate::gql::common::helpers::require_user;
use crate::state::AppState;

#[derive(Default)]
pub struct PaymentQuery;

#[Object]
impl PaymentQuery {
    /// One of the caller's orders.
    async fn order(&self, ctx: &Context<'_>, order_id: String) -> Result<Order> {
        let user_id = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let order = service::get_order(&state.db, &order_id)
            .await
            .map_err(|e| e.extend())?;

        // Someone else's order is indistinguishable from a missing one.
        if order.user_id != user_id {
            return Err(PaymentError::OrderNotFound(order_id).extend());
        }

        Ok(order.into())
    }
}

#[derive(Default)]
pub struct PaymentMutation;

#[Object]
impl PaymentMutation {
    async fn create_order(&self, ctx: &Context<'_>, input: CreateOrderInput) -> Result<OrderCheckout> {
        let user_id = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let checkout = service::create_order(&state.db, user_id, &input.order_name, input.amount)
            .await
            .map_err(|e| e.extend())?;

        Ok(checkout.into())
    }

    async fn confirm_payment(
        &self,
        ctx: &Context<'_>,
        input: ConfirmPaymentInput,
    ) -> Result<PaymentConfirmation> {
        require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let confirmation = service::confirm_payment(
            &state.db,
            state.gateway.as_ref(),
            &input.payment_key,
            &input.order_id,
            input.amount,
        )
        .await
        .map_err(|e| e.extend())?;

        Ok(confirmation.into())
    }

    async fn report_payment_failure(
        &self,
        ctx: &Context<'_>,
        input: ReportPaymentFailureInput,
    ) -> Result<PaymentFailureAck> {
        require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let ack = service::handle_payment_failure(
            &state.db,
            &input.order_id,
            input.code.as_deref(),
            input.message.as_deref(),
        )
        .await;

        Ok(ack.into())
    }
}
