use sqlx::{PgExecutor, Result};
use std::fmt;
use uuid::Uuid;

use crate::models::OrderRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub order_id: String,
    pub user_id: Uuid,
    pub order_name: String,
    pub amount: i64,
}

pub async fn create<'e>(executor: impl PgExecutor<'e>, data: CreateOrder) -> Result<OrderRow> {
    sqlx::query_as::<_, OrderRow>(
        r#"
        INSERT INTO orders (order_id, user_id, order_name, amount, status)
        VALUES ($1, $2, $3, $4, 'PENDING')
        RETURNING id, order_id, user_id, order_name, amount, status, payment_key, payment_method,
                  failure_code, failure_message, created_at, updated_at
        "#,
    )
    .bind(data.order_id)
    .bind(data.user_id)
    .bind(data.order_name)
    .bind(data.amount)
    .fetch_one(executor)
    .await
}

pub async fn get_by_order_id<'e>(
    executor: impl PgExecutor<'e>,
    order_id: &str,
) -> Result<Option<OrderRow>> {
    sqlx::query_as::<_, OrderRow>(
        r#"
        SELECT id, order_id, user_id, order_name, amount, status, payment_key, payment_method,
               failure_code, failure_message, created_at, updated_at
        FROM orders
        WHERE order_id = $1
        "#,
    )
    .bind(order_id)
    .fetch_optional(executor)
    .await
}

/// Same as [`get_by_order_id`] but takes an exclusive row lock that is held
/// until the surrounding transaction commits or rolls back.
pub async fn get_by_order_id_for_update<'e>(
    executor: impl PgExecutor<'e>,
    order_id: &str,
) -> Result<Option<OrderRow>> {
    sqlx::query_as::<_, OrderRow>(
        r#"
        SELECT id, order_id, user_id, order_name, amount, status, payment_key, payment_method,
               failure_code, failure_message, created_at, updated_at
        FROM orders
        WHERE order_id = $1
        FOR UPDATE
        "#,
    )
    .bind(order_id)
    .fetch_optional(executor)
    .await
}

/// Compare-and-swap on the order status. Returns `false` when the order was not
/// in `from` (or does not exist), in which case nothing is written.
pub async fn transition_status<'e>(
    executor: impl PgExecutor<'e>,
    order_id: &str,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE orders SET status = $3, updated_at = NOW() WHERE order_id = $1 AND status = $2",
    )
    .bind(order_id)
    .bind(from)
    .bind(to)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Finalize a settled order. Only applies to an order still in `PROCESSING`.
pub async fn mark_paid<'e>(
    executor: impl PgExecutor<'e>,
    order_id: &str,
    payment_key: &str,
    payment_method: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'PAID', payment_key = $2, payment_method = $3, updated_at = NOW()
        WHERE order_id = $1 AND status = 'PROCESSING'
        "#,
    )
    .bind(order_id)
    .bind(payment_key)
    .bind(payment_method)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Move an order to `FAILED` and record why.
///
/// With `expected = Some(status)` the write only happens from that status;
/// with `None` it happens from any status except `PAID`.
pub async fn mark_failed<'e>(
    executor: impl PgExecutor<'e>,
    order_id: &str,
    expected: Option<OrderStatus>,
    failure_code: Option<&str>,
    failure_message: Option<&str>,
) -> Result<bool> {
    let result = match expected {
        Some(status) => {
            sqlx::query(
                r#"
                UPDATE orders
                SET status = 'FAILED', failure_code = $3, failure_message = $4, updated_at = NOW()
                WHERE order_id = $1 AND status = $2
                "#,
            )
            .bind(order_id)
            .bind(status)
            .bind(failure_code)
            .bind(failure_message)
            .execute(executor)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                UPDATE orders
                SET status = 'FAILED', failure_code = $2, failure_message = $3, updated_at = NOW()
                WHERE order_id = $1 AND status <> 'PAID'
                "#,
            )
            .bind(order_id)
            .bind(failure_code)
            .bind(failure_message)
            .execute(executor)
            .await?
        }
    };

    Ok(result.rows_affected() == 1)
}
