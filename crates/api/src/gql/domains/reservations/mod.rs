pub mod availability;
pub mod resolvers;
pub mod service;
pub mod types;

pub use resolvers::{ReservationMutation, ReservationQuery};
