use {
    crate::domain::{
        error::PipelineError,
        id::OrderId,
        money::{Hours, MoneyAmount},
        order::{Order, OrderLookup, OrderStatus, Settlement},
        store::{OrderStore, SettleError, SettleWrite},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    std::{future::Future, pin::Pin},
};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    status: String,
    hours: i32,
    amount_cents: i64,
    stripe_session_id: Option<String>,
    stripe_payment_intent: Option<String>,
    stripe_customer_id: Option<String>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = PipelineError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::new(row.id)?,
            user_id: row.user_id,
            status: OrderStatus::from(row.status.as_str()),
            hours: Hours::new(row.hours)?,
            amount: MoneyAmount::new(row.amount_cents)?,
            stripe_session_id: row.stripe_session_id,
            stripe_payment_intent: row.stripe_payment_intent,
            stripe_customer_id: row.stripe_customer_id,
            paid_at: row.paid_at,
        })
    }
}

const FIND_BY_ID: &str = r#"
    SELECT id, user_id, status, hours, amount_cents,
           stripe_session_id, stripe_payment_intent, stripe_customer_id, paid_at
    FROM orders WHERE id = $1
"#;

const FIND_BY_SESSION: &str = r#"
    SELECT id, user_id, status, hours, amount_cents,
           stripe_session_id, stripe_payment_intent, stripe_customer_id, paid_at
    FROM orders WHERE stripe_session_id = $1
    ORDER BY created_at DESC LIMIT 1
"#;

const FIND_BY_PAYMENT_INTENT: &str = r#"
    SELECT id, user_id, status, hours, amount_cents,
           stripe_session_id, stripe_payment_intent, stripe_customer_id, paid_at
    FROM orders WHERE stripe_payment_intent = $1
    ORDER BY created_at DESC LIMIT 1
"#;

/// `OrderStore` over the service-role Postgres connection.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_order_inner(&self, lookup: &OrderLookup) -> Result<Option<Order>, PipelineError> {
        let (sql, key) = match lookup {
            OrderLookup::Id(id) => (FIND_BY_ID, id.as_str()),
            OrderLookup::CheckoutSession(id) => (FIND_BY_SESSION, id.as_str()),
            OrderLookup::PaymentIntent(id) => (FIND_BY_PAYMENT_INTENT, id.as_str()),
        };

        let row = sqlx::query_as::<_, OrderRow>(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Conditional update and credit insert in one transaction. The
    /// `status <> 'paid'` guard is evaluated under the row lock, so of two
    /// concurrent deliveries only one sees a row affected.
    async fn settle_inner(&self, settlement: &Settlement) -> Result<SettleWrite, SettleError> {
        let status_err = |e: sqlx::Error| SettleError::StatusUpdate(e.into());

        let mut tx = self.pool.begin().await.map_err(status_err)?;

        sqlx::query("SET LOCAL lock_timeout = '5s'")
            .execute(&mut *tx)
            .await
            .map_err(status_err)?;

        let refs = &settlement.refs;
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'paid',
                paid_at = $2,
                stripe_session_id = COALESCE($3, stripe_session_id),
                stripe_payment_intent = COALESCE($4, stripe_payment_intent),
                stripe_customer_id = COALESCE($5, stripe_customer_id)
            WHERE id = $1 AND status <> 'paid'
            "#,
        )
        .bind(settlement.order_id.as_str())
        .bind(settlement.paid_at)
        .bind(refs.checkout_session.as_ref().map(|id| id.as_str()))
        .bind(refs.payment_intent.as_ref().map(|id| id.as_str()))
        .bind(refs.customer.as_ref().map(|id| id.as_str()))
        .execute(&mut *tx)
        .await
        .map_err(status_err)?;

        if updated.rows_affected() == 0 {
            // Either the guard filtered the row out or the id matched nothing.
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
                    .bind(settlement.order_id.as_str())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(status_err)?;
            tx.rollback().await.map_err(status_err)?;
            return Ok(if exists {
                SettleWrite::AlreadyPaid
            } else {
                SettleWrite::Missing
            });
        }

        let credit = &settlement.credit;
        let inserted = sqlx::query(
            r#"
            INSERT INTO balance_operations
                (id, user_id, type, hours_delta, amount_cents, source, order_id, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(credit.id)
        .bind(&credit.user_id)
        .bind(credit.kind.as_str())
        .bind(credit.hours_delta.get())
        .bind(credit.amount.cents())
        .bind(credit.source.as_str())
        .bind(credit.order_id.as_str())
        .bind(&credit.note)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(
                    error = %rollback,
                    "explicit rollback failed, connection drop will abort"
                );
            }
            return Err(SettleError::Ledger {
                source: e.into(),
                order_left_paid: false,
            });
        }

        // A failed commit leaves neither write applied.
        tx.commit().await.map_err(status_err)?;
        Ok(SettleWrite::Applied)
    }
}

impl OrderStore for PgOrderStore {
    fn find_order<'a>(
        &'a self,
        lookup: &'a OrderLookup,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Order>, PipelineError>> + Send + 'a>> {
        Box::pin(self.find_order_inner(lookup))
    }

    fn settle<'a>(
        &'a self,
        settlement: &'a Settlement,
    ) -> Pin<Box<dyn Future<Output = Result<SettleWrite, SettleError>> + Send + 'a>> {
        Box::pin(self.settle_inner(settlement))
    }
}
