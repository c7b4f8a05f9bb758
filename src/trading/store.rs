//! Persistence for positions and order records
//!
//! The trading loop talks to `PositionStore`; `MemoryStore` backs tests and
//! simulation runs, `PgStore` backs live deployments.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::position::{OrderRecord, Position, PositionState};
use crate::common::errors::{Result, TraderError};
use crate::common::types::{OrderStatus, OrderType, Side};

/// Storage contract for the two row kinds the trading subsystem owns
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Fetch a position row, if one exists
    async fn position(&self, symbol: &str) -> Result<Option<Position>>;

    /// Fetch the position row, creating a flat one on first sight
    async fn ensure_position(&self, symbol: &str) -> Result<Position>;

    /// Persist a position mutation
    async fn save_position(&self, position: &Position) -> Result<()>;

    /// Append one order record to the audit log
    async fn record_order(&self, record: &OrderRecord) -> Result<()>;

    /// All position rows (dashboard reads)
    async fn positions(&self) -> Result<Vec<Position>>;

    /// Order records for one symbol, oldest first
    async fn orders(&self, symbol: &str) -> Result<Vec<OrderRecord>>;
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    positions: RwLock<HashMap<String, Position>>,
    orders: RwLock<Vec<OrderRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PositionStore for MemoryStore {
    async fn position(&self, symbol: &str) -> Result<Option<Position>> {
        Ok(self.positions.read().await.get(symbol).cloned())
    }

    async fn ensure_position(&self, symbol: &str) -> Result<Position> {
        let mut positions = self.positions.write().await;
        Ok(positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position::new(symbol))
            .clone())
    }

    async fn save_position(&self, position: &Position) -> Result<()> {
        self.positions
            .write()
            .await
            .insert(position.symbol.clone(), position.clone());
        Ok(())
    }

    async fn record_order(&self, record: &OrderRecord) -> Result<()> {
        self.orders.write().await.push(record.clone());
        Ok(())
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        Ok(self.positions.read().await.values().cloned().collect())
    }

    async fn orders(&self, symbol: &str) -> Result<Vec<OrderRecord>> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .filter(|o| o.symbol == symbol)
            .cloned()
            .collect())
    }
}

/// Postgres-backed store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables if they do not exist
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS positions (\
                symbol TEXT PRIMARY KEY, \
                qty NUMERIC NOT NULL, \
                avg_price NUMERIC, \
                state TEXT NOT NULL, \
                target_price NUMERIC, \
                stop_price NUMERIC, \
                last_buy_order_id TEXT, \
                last_sell_order_id TEXT, \
                updated_at TIMESTAMPTZ NOT NULL\
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS orders (\
                id BIGSERIAL PRIMARY KEY, \
                symbol TEXT NOT NULL, \
                side TEXT NOT NULL, \
                order_type TEXT NOT NULL, \
                price NUMERIC NOT NULL, \
                qty NUMERIC NOT NULL, \
                status TEXT NOT NULL, \
                is_test BOOLEAN NOT NULL, \
                client_order_id TEXT NOT NULL, \
                exchange_order_id TEXT, \
                error TEXT, \
                created_at TIMESTAMPTZ NOT NULL\
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn position_from_row(row: &sqlx::postgres::PgRow) -> Result<Position> {
        let state_text: String = row.try_get("state")?;
        let state: PositionState = state_text
            .parse()
            .map_err(TraderError::Internal)?;
        Ok(Position {
            symbol: row.try_get("symbol")?,
            qty: row.try_get("qty")?,
            avg_price: row.try_get("avg_price")?,
            state,
            target_price: row.try_get("target_price")?,
            stop_price: row.try_get("stop_price")?,
            last_buy_order_id: row.try_get("last_buy_order_id")?,
            last_sell_order_id: row.try_get("last_sell_order_id")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn order_from_row(row: &sqlx::postgres::PgRow) -> Result<OrderRecord> {
        let side_text: String = row.try_get("side")?;
        let side = match side_text.as_str() {
            "BUY" => Side::Buy,
            "SELL" => Side::Sell,
            other => return Err(TraderError::Internal(format!("unknown side: {}", other))),
        };
        let status_text: String = row.try_get("status")?;
        let status: OrderStatus = serde_json::from_value(serde_json::Value::String(status_text))?;
        Ok(OrderRecord {
            symbol: row.try_get("symbol")?,
            side,
            order_type: OrderType::Limit,
            price: row.try_get("price")?,
            qty: row.try_get("qty")?,
            status,
            is_test: row.try_get("is_test")?,
            client_order_id: row.try_get("client_order_id")?,
            exchange_order_id: row.try_get("exchange_order_id")?,
            error: row.try_get("error")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl PositionStore for PgStore {
    async fn position(&self, symbol: &str) -> Result<Option<Position>> {
        let row = sqlx::query("SELECT * FROM positions WHERE symbol = $1")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::position_from_row).transpose()
    }

    async fn ensure_position(&self, symbol: &str) -> Result<Position> {
        if let Some(existing) = self.position(symbol).await? {
            return Ok(existing);
        }
        let fresh = Position::new(symbol);
        self.save_position(&fresh).await?;
        Ok(fresh)
    }

    async fn save_position(&self, position: &Position) -> Result<()> {
        sqlx::query(
            "INSERT INTO positions \
             (symbol, qty, avg_price, state, target_price, stop_price, \
              last_buy_order_id, last_sell_order_id, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (symbol) DO UPDATE SET \
                qty = $2, avg_price = $3, state = $4, target_price = $5, \
                stop_price = $6, last_buy_order_id = $7, \
                last_sell_order_id = $8, updated_at = $9",
        )
        .bind(&position.symbol)
        .bind(position.qty)
        .bind(position.avg_price)
        .bind(position.state.to_string())
        .bind(position.target_price)
        .bind(position.stop_price)
        .bind(&position.last_buy_order_id)
        .bind(&position.last_sell_order_id)
        .bind(position.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_order(&self, record: &OrderRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders \
             (symbol, side, order_type, price, qty, status, is_test, \
              client_order_id, exchange_order_id, error, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&record.symbol)
        .bind(record.side.to_string())
        .bind(record.order_type.to_string())
        .bind(record.price)
        .bind(record.qty)
        .bind(record.status.to_string())
        .bind(record.is_test)
        .bind(&record.client_order_id)
        .bind(&record.exchange_order_id)
        .bind(&record.error)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        let rows = sqlx::query("SELECT * FROM positions ORDER BY symbol")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::position_from_row).collect()
    }

    async fn orders(&self, symbol: &str) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query("SELECT * FROM orders WHERE symbol = $1 ORDER BY id")
            .bind(symbol)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::order_from_row).collect()
    }
}

/// Latest buy order record for a symbol, newest first by insertion
pub async fn latest_buy_qty(
    store: &dyn PositionStore,
    symbol: &str,
    order_id: Option<&str>,
) -> Result<Option<Decimal>> {
    let orders = store.orders(symbol).await?;
    Ok(orders
        .iter()
        .rev()
        .find(|o| {
            o.side == Side::Buy
                && match order_id {
                    Some(id) => o.exchange_order_id.as_deref() == Some(id),
                    None => true,
                }
        })
        .map(|o| o.qty))
}
