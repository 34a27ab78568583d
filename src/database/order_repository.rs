use crate::database::error::{DatabaseError, DatabaseErrorKind, DbResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "database")]
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    OnHold,
    Processing,
    Completed,
    Refunded,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Failed => "failed",
        }
    }

    /// Statuses from which a payment notification may complete the order.
    pub fn is_awaiting_payment(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::OnHold)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "on-hold" => Ok(OrderStatus::OnHold),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "refunded" => Ok(OrderStatus::Refunded),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(DatabaseError::new(DatabaseErrorKind::QueryError {
                message: format!("unknown order status '{}'", other),
            })),
        }
    }
}

/// Store order as seen by the reconciliation core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub total: Decimal,
    pub currency: String,
    /// Paid orders needing fulfilment go to `processing`, others to `completed`.
    pub needs_processing: bool,
    pub billing_email: String,
    pub billing_first_name: String,
    pub billing_last_name: String,
    pub billing_phone: String,
    pub processor_order_code: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_awaiting_payment(&self) -> bool {
        self.status.is_awaiting_payment()
    }

    pub fn paid_status(&self) -> OrderStatus {
        if self.needs_processing {
            OrderStatus::Processing
        } else {
            OrderStatus::Completed
        }
    }

    pub fn billing_full_name(&self) -> String {
        format!("{} {}", self.billing_first_name, self.billing_last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderNote {
    pub order_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Order persistence used by the reconciliation services.
///
/// The conditional writes (`assign_processor_code`, `complete_payment`,
/// `mark_refunded`) must be atomic per order: implementations perform the
/// check and the write as one operation and report whether it applied.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_id(&self, order_id: &str) -> DbResult<Option<Order>>;

    /// Lookup through the unique processor order code index.
    async fn find_by_processor_code(&self, order_code: &str) -> DbResult<Option<Order>>;

    /// Sets the processor order code only if the order has none yet.
    async fn assign_processor_code(&self, order_id: &str, order_code: &str) -> DbResult<bool>;

    /// Moves an order awaiting payment to its paid status, records the
    /// transaction id and appends `note`. Returns the new status, or `None`
    /// when the order was no longer awaiting payment.
    async fn complete_payment(
        &self,
        order_id: &str,
        transaction_id: &str,
        note: &str,
    ) -> DbResult<Option<OrderStatus>>;

    /// Marks the order refunded and appends `note`, unless it already is.
    async fn mark_refunded(&self, order_id: &str, note: &str) -> DbResult<bool>;

    async fn add_note(&self, order_id: &str, message: &str) -> DbResult<()>;

    async fn notes(&self, order_id: &str) -> DbResult<Vec<OrderNote>>;
}

#[cfg(feature = "database")]
#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: String,
    status: String,
    total: Decimal,
    currency: String,
    needs_processing: bool,
    billing_email: String,
    billing_first_name: String,
    billing_last_name: String,
    billing_phone: String,
    processor_order_code: Option<String>,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<OrderRow> for Order {
    type Error = DatabaseError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            status: row.status.parse()?,
            id: row.id,
            total: row.total,
            currency: row.currency,
            needs_processing: row.needs_processing,
            billing_email: row.billing_email,
            billing_first_name: row.billing_first_name,
            billing_last_name: row.billing_last_name,
            billing_phone: row.billing_phone,
            processor_order_code: row.processor_order_code,
            transaction_id: row.transaction_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(feature = "database")]
#[derive(Debug, Clone, FromRow)]
struct OrderNoteRow {
    order_id: String,
    message: String,
    created_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
const ORDER_COLUMNS: &str = "id, status, total, currency, needs_processing, billing_email, \
     billing_first_name, billing_last_name, billing_phone, processor_order_code, \
     transaction_id, created_at, updated_at";

/// Postgres-backed order store
#[cfg(feature = "database")]
pub struct PgOrderRepository {
    pool: PgPool,
}

#[cfg(feature = "database")]
impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE {} = $1", ORDER_COLUMNS, clause);
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?
            .map(Order::try_from)
            .transpose()
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl OrderStore for PgOrderRepository {
    async fn find_by_id(&self, order_id: &str) -> DbResult<Option<Order>> {
        self.fetch_one_where("id", order_id).await
    }

    async fn find_by_processor_code(&self, order_code: &str) -> DbResult<Option<Order>> {
        self.fetch_one_where("processor_order_code", order_code)
            .await
    }

    async fn assign_processor_code(&self, order_id: &str, order_code: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE orders
             SET processor_order_code = $2, updated_at = NOW()
             WHERE id = $1 AND processor_order_code IS NULL",
        )
        .bind(order_id)
        .bind(order_code)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete_payment(
        &self,
        order_id: &str,
        transaction_id: &str,
        note: &str,
    ) -> DbResult<Option<OrderStatus>> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let updated: Option<(String,)> = sqlx::query_as(
            "UPDATE orders
             SET status = CASE WHEN needs_processing THEN 'processing' ELSE 'completed' END,
                 transaction_id = $2,
                 updated_at = NOW()
             WHERE id = $1 AND status IN ('pending', 'on-hold')
             RETURNING status",
        )
        .bind(order_id)
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let status = match updated {
            Some((status,)) => status.parse::<OrderStatus>()?,
            None => {
                tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
                return Ok(None);
            }
        };

        sqlx::query("INSERT INTO order_notes (order_id, message) VALUES ($1, $2)")
            .bind(order_id)
            .bind(note)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;
        Ok(Some(status))
    }

    async fn mark_refunded(&self, order_id: &str, note: &str) -> DbResult<bool> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let result = sqlx::query(
            "UPDATE orders
             SET status = 'refunded', updated_at = NOW()
             WHERE id = $1 AND status <> 'refunded'",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO order_notes (order_id, message) VALUES ($1, $2)")
            .bind(order_id)
            .bind(note)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;
        Ok(true)
    }

    async fn add_note(&self, order_id: &str, message: &str) -> DbResult<()> {
        sqlx::query("INSERT INTO order_notes (order_id, message) VALUES ($1, $2)")
            .bind(order_id)
            .bind(message)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    async fn notes(&self, order_id: &str) -> DbResult<Vec<OrderNote>> {
        let rows = sqlx::query_as::<_, OrderNoteRow>(
            "SELECT order_id, message, created_at
             FROM order_notes
             WHERE order_id = $1
             ORDER BY id ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|row| OrderNote {
                order_id: row.order_id,
                message: row.message,
                created_at: row.created_at,
            })
            .collect())
    }
}
