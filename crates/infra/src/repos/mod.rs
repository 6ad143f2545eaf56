pub mod cafes;
pub mod orders;
pub mod reservations;
pub mod users;

pub use orders::{CreateOrder, OrderStatus};
pub use reservations::CreateReservation;
