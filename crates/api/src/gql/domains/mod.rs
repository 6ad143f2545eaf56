// Each domain contains: mod.rs, resolvers.rs, types.rs, service.rs

pub mod payments;
pub mod reservations;
