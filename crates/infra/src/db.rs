use sqlx::PgPool;

/// Shared Postgres handle. Repositories accept any `PgExecutor`, so a `&Db`,
/// a pooled connection or an open transaction can be passed interchangeably.
pub type Db = PgPool;
