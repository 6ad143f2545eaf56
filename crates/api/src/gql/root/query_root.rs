use async_graphql::MergedObject;

use crate::gql::domains::payments::PaymentQuery;
use crate::gql::domains::reservations::ReservationQuery;

#[derive(MergedObject, Default)]
pub struct QueryRoot(PaymentQuery, ReservationQuery);
