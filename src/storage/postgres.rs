//! PostgreSQL store implementations
//!
//! Sessions and orders persist as rows with JSONB payloads. The session
//! CAS is a conditional `UPDATE ... WHERE version = $expected`; a zero
//! row count means a concurrent writer got there first.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Pool, Postgres};

use crate::config::DatabaseConfig;
use crate::models::order::{Order, PaymentStatus};
use crate::models::session::{CartLine, ConversationState, ProcessedEvent, Session};
use crate::utils::errors::{ChowBuddyError, Result};

use super::{OrderStore, SaveOutcome, SessionStore, StatusTransition};

pub type DatabasePool = Pool<Postgres>;

/// Create a new database connection pool
pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Some(Duration::from_secs(600)))
        .max_lifetime(Some(Duration::from_secs(1800)))
        .connect(&config.url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").execute(&pool).await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<()> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations").run(pool).await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: String,
    state: Json<ConversationState>,
    cart: Json<Vec<CartLine>>,
    pending_order_ref: Option<String>,
    delivery_address: Option<String>,
    processed_events: Json<Vec<ProcessedEvent>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            user_id: row.user_id,
            state: row.state.0,
            cart: row.cart.0,
            pending_order_ref: row.pending_order_ref,
            delivery_address: row.delivery_address,
            processed_events: row.processed_events.0,
            version: row.version as u64,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL-backed session store
#[derive(Clone)]
#[derive(Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load_or_create(&self, user_id: &str) -> Result<Session> {
        let now = Utc::now();
        let fresh = Session::new(user_id, now);

        sqlx::query(
            r#"
            INSERT INTO sessions (user_id, state, cart, pending_order_ref, delivery_address,
                                  processed_events, version, created_at, updated_at)
            VALUES ($1, $2, $3, NULL, NULL, $4, 0, $5, $5)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(Json(&fresh.state))
        .bind(Json(&fresh.cart))
        .bind(Json(&fresh.processed_events))
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT user_id, state, cart, pending_order_ref, delivery_address,
                   processed_events, version, created_at, updated_at
            FROM sessions WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn save(&self, session: &Session) -> Result<SaveOutcome> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE sessions
            SET state = $2,
                cart = $3,
                pending_order_ref = $4,
                delivery_address = $5,
                processed_events = $6,
                version = version + 1,
                updated_at = $7
            WHERE user_id = $1 AND version = $8
            RETURNING version
            "#,
        )
        .bind(&session.user_id)
        .bind(Json(&session.state))
        .bind(Json(&session.cart))
        .bind(&session.pending_order_ref)
        .bind(&session.delivery_address)
        .bind(Json(&session.processed_events))
        .bind(Utc::now())
        .bind(session.version as i64)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((new_version,)) => Ok(SaveOutcome::Committed { new_version: new_version as u64 }),
            None => Ok(SaveOutcome::VersionConflict),
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    order_ref: String,
    user_id: String,
    lines: Json<Vec<CartLine>>,
    address: String,
    amount_minor: i64,
    payment_status: String,
    payment_ref: Option<String>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = ChowBuddyError;

    fn try_from(row: OrderRow) -> Result<Order> {
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            ChowBuddyError::InvalidInput(format!(
                "Unknown payment status '{}' for order {}",
                row.payment_status, row.order_ref
            ))
        })?;

        Ok(Order {
            order_ref: row.order_ref,
            user_id: row.user_id,
            lines: row.lines.0,
            address: row.address,
            amount_minor: row.amount_minor as u64,
            payment_status,
            payment_ref: row.payment_ref,
            created_at: row.created_at,
            paid_at: row.paid_at,
        })
    }
}

const ORDER_COLUMNS: &str = "order_ref, user_id, lines, address, amount_minor, payment_status, payment_ref, created_at, paid_at";

/// PostgreSQL-backed order store
#[derive(Clone)]
#[derive(Debug)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (order_ref, user_id, lines, address, amount_minor,
                                payment_status, payment_ref, created_at, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&order.order_ref)
        .bind(&order.user_id)
        .bind(Json(&order.lines))
        .bind(&order.address)
        .bind(order.amount_minor as i64)
        .bind(order.payment_status.as_str())
        .bind(&order.payment_ref)
        .bind(order.created_at)
        .bind(order.paid_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_ref(&self, order_ref: &str) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE order_ref = $1",
            ORDER_COLUMNS
        ))
        .bind(order_ref)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn transition_status(
        &self,
        order_ref: &str,
        status: PaymentStatus,
        payment_ref: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StatusTransition> {
        // Only orders still PENDING are updated, which makes the
        // transition monotonic and duplicate confirmations no-ops
        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders
            SET payment_status = $2,
                payment_ref = COALESCE($3, payment_ref),
                paid_at = CASE WHEN $2 = 'paid' THEN $4 ELSE paid_at END
            WHERE order_ref = $1 AND payment_status = 'pending'
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_ref)
        .bind(status.as_str())
        .bind(payment_ref)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(StatusTransition::Applied(row.try_into()?));
        }

        match self.find_by_ref(order_ref).await? {
            Some(order) => Ok(StatusTransition::AlreadyFinal(order)),
            None => Ok(StatusTransition::NotFound),
        }
    }

    async fn list_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {} FROM orders
            WHERE payment_status = 'pending' AND created_at < $1
            ORDER BY created_at
            "#,
            ORDER_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }
}
