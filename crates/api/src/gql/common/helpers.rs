use async_graphql::Context;
use uuid::Uuid;

use crate::gql::error::{unauthenticated, ResultExt};
use crate::middleware::identity::AuthenticatedUser;

/// The caller's user id, or an `UNAUTHENTICATED` error.
pub fn require_user(ctx: &Context<'_>) -> async_graphql::Result<Uuid> {
    ctx.data_opt::<AuthenticatedUser>()
        .map(|user| user.user_id)
        .ok_or_else(unauthenticated)
}

pub fn parse_id(id: &async_graphql::ID, what: &str) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).gql_err(&format!("Invalid {what} ID"))
}
