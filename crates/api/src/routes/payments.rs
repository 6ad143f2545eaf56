//! Redirect targets the payment provider sends the customer's browser to
//! after checkout. Both end with a redirect back to the frontend.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;

use crate::gql::domains::payments::service;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessQuery {
    pub payment_key: Option<String>,
    pub order_id: Option<String>,
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailQuery {
    pub code: Option<String>,
    pub message: Option<String>,
    pub order_id: Option<String>,
}

pub async fn success(State(state): State<AppState>, Query(query): Query<SuccessQuery>) -> Redirect {
    let frontend = state.config.frontend_url.trim_end_matches('/');

    let (Some(payment_key), Some(order_id), Some(amount)) =
        (query.payment_key, query.order_id, query.amount)
    else {
        return fail_redirect(frontend, "Missing payment parameters");
    };

    match service::confirm_payment(
        &state.db,
        state.gateway.as_ref(),
        &payment_key,
        &order_id,
        amount,
    )
    .await
    {
        Ok(confirmation) => Redirect::to(&format!(
            "{frontend}/payment/success?orderId={}",
            urlencoding::encode(&confirmation.order_id)
        )),
        Err(e) => {
            tracing::warn!(order_id = %order_id, code = e.code(), "Payment confirmation failed: {e}");
            fail_redirect(frontend, &e.to_string())
        }
    }
}

pub async fn fail(State(state): State<AppState>, Query(query): Query<FailQuery>) -> Redirect {
    let frontend = state.config.frontend_url.trim_end_matches('/');

    if let Some(order_id) = query.order_id.as_deref() {
        service::handle_payment_failure(
            &state.db,
            order_id,
            query.code.as_deref(),
            query.message.as_deref(),
        )
        .await;
    }

    let message = query.message.as_deref().unwrap_or("Payment failed");
    fail_redirect(frontend, message)
}

fn fail_redirect(frontend: &str, message: &str) -> Redirect {
    Redirect::to(&format!(
        "{frontend}/payment/fail?message={}",
        urlencoding::encode(message)
    ))
}
