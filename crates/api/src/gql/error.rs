//! Conversion of domain errors into GraphQL errors.
//!
//! Every error carries `extensions.code`, a stable discriminator clients can
//! branch on without parsing messages. Database details are logged server-side
//! and never reach the client.

use async_graphql::ErrorExtensions;

use super::domains::payments::service::PaymentError;
use super::domains::reservations::service::ReservationError;

impl ErrorExtensions for ReservationError {
    fn extend(&self) -> async_graphql::Error {
        match self {
            ReservationError::Storage(e) => tracing::error!("Database error: {e}"),
            ReservationError::InvalidCatalog(detail) => {
                tracing::error!("Cafe data rejected: {detail}")
            }
            _ => {}
        }

        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| {
            ext.set("code", self.code());
            if let ReservationError::Conflict(reason) = self {
                ext.set("reason", reason.code());
            }
        })
    }
}

impl ErrorExtensions for PaymentError {
    fn extend(&self) -> async_graphql::Error {
        if let PaymentError::Storage(e) = self {
            tracing::error!("Database error: {e}");
        }

        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| {
            ext.set("code", self.code());
            match self {
                PaymentError::DuplicatePayment { status, .. } => {
                    ext.set("status", status.as_str());
                }
                PaymentError::Gateway(gateway) => {
                    ext.set("gatewayCode", gateway.failure_code().to_string());
                }
                PaymentError::SettlementFailure {
                    payment_key,
                    outcome,
                    ..
                } => {
                    ext.set("paymentKey", payment_key.clone());
                    ext.set("outcome", outcome.as_str());
                }
                _ => {}
            }
        })
    }
}

/// Error for resolvers that need an identified caller.
pub fn unauthenticated() -> async_graphql::Error {
    async_graphql::Error::new("Authentication required")
        .extend_with(|_, ext| ext.set("code", "UNAUTHENTICATED"))
}

/// Extension trait that converts any `Result<T, E>` where `E: Display`
/// into `async_graphql::Result<T>` with a contextual message prefix and
/// a `VALIDATION_ERROR` code.
///
/// Usage: `Uuid::parse_str(id).gql_err("Invalid cafe ID")?`
pub trait ResultExt<T> {
    fn gql_err(self, context: &str) -> std::result::Result<T, async_graphql::Error>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn gql_err(self, context: &str) -> std::result::Result<T, async_graphql::Error> {
        self.map_err(|e| {
            async_graphql::Error::new(format!("{context}: {e}"))
                .extend_with(|_, ext| ext.set("code", "VALIDATION_ERROR"))
        })
    }
}
