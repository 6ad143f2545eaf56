use async_graphql::MergedObject;

use crate::gql::domains::payments::PaymentMutation;
use crate::gql::domains::reservations::ReservationMutation;

#[derive(MergedObject, Default)]
pub struct MutationRoot(PaymentMutation, ReservationMutation);
