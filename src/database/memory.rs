//! In-process stores used by tests and by `SKIP_EXTERNALS` runs.
//!
//! Every conditional write happens under a single lock, which gives the same
//! per-order atomicity as the conditional `UPDATE`s in Postgres.

use crate::database::error::{DatabaseError, DatabaseErrorKind, DbResult};
use crate::database::order_repository::{Order, OrderNote, OrderStatus, OrderStore};
use crate::database::settings_repository::SettingsStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct OrderTable {
    orders: HashMap<String, Order>,
    by_processor_code: HashMap<String, String>,
    notes: HashMap<String, Vec<OrderNote>>,
}

impl OrderTable {
    fn push_note(&mut self, order_id: &str, message: &str) {
        self.notes
            .entry(order_id.to_string())
            .or_default()
            .push(OrderNote {
                order_id: order_id.to_string(),
                message: message.to_string(),
                created_at: Utc::now(),
            });
    }
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    table: RwLock<OrderTable>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces an order. Orders are owned by the host store, so this
    /// is the only way one enters the in-memory table.
    pub async fn insert(&self, order: Order) -> DbResult<()> {
        let mut table = self.table.write().await;
        let taken = order.processor_order_code.as_ref().is_some_and(|code| {
            table
                .by_processor_code
                .get(code)
                .is_some_and(|owner| owner != &order.id)
        });
        if taken {
            return Err(DatabaseError::new(
                DatabaseErrorKind::UniqueConstraintViolation {
                    constraint: "orders_processor_order_code_key".to_string(),
                },
            ));
        }
        let stale = table
            .orders
            .get(&order.id)
            .and_then(|previous| previous.processor_order_code.clone());
        if let Some(stale) = stale {
            table.by_processor_code.remove(&stale);
        }
        if let Some(code) = &order.processor_order_code {
            table
                .by_processor_code
                .insert(code.clone(), order.id.clone());
        }
        table.orders.insert(order.id.clone(), order);
        Ok(())
    }
}

fn missing_order(order_id: &str) -> DatabaseError {
    DatabaseError::new(DatabaseErrorKind::NotFound {
        entity: "Order".to_string(),
        id: order_id.to_string(),
    })
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn find_by_id(&self, order_id: &str) -> DbResult<Option<Order>> {
        Ok(self.table.read().await.orders.get(order_id).cloned())
    }

    async fn find_by_processor_code(&self, order_code: &str) -> DbResult<Option<Order>> {
        let table = self.table.read().await;
        Ok(table
            .by_processor_code
            .get(order_code)
            .and_then(|id| table.orders.get(id))
            .cloned())
    }

    async fn assign_processor_code(&self, order_id: &str, order_code: &str) -> DbResult<bool> {
        let mut guard = self.table.write().await;
        let table = &mut *guard;

        if let Some(owner) = table.by_processor_code.get(order_code) {
            if owner != order_id {
                return Err(DatabaseError::new(
                    DatabaseErrorKind::UniqueConstraintViolation {
                        constraint: "orders_processor_order_code_key".to_string(),
                    },
                ));
            }
        }

        let order = table
            .orders
            .get_mut(order_id)
            .ok_or_else(|| missing_order(order_id))?;
        if order.processor_order_code.is_some() {
            return Ok(false);
        }

        order.processor_order_code = Some(order_code.to_string());
        order.updated_at = Utc::now();
        table
            .by_processor_code
            .insert(order_code.to_string(), order_id.to_string());
        Ok(true)
    }

    async fn complete_payment(
        &self,
        order_id: &str,
        transaction_id: &str,
        note: &str,
    ) -> DbResult<Option<OrderStatus>> {
        let mut table = self.table.write().await;
        let order = table
            .orders
            .get_mut(order_id)
            .ok_or_else(|| missing_order(order_id))?;
        if !order.is_awaiting_payment() {
            return Ok(None);
        }

        let status = order.paid_status();
        order.status = status;
        order.transaction_id = Some(transaction_id.to_string());
        order.updated_at = Utc::now();
        table.push_note(order_id, note);
        Ok(Some(status))
    }

    async fn mark_refunded(&self, order_id: &str, note: &str) -> DbResult<bool> {
        let mut table = self.table.write().await;
        let order = table
            .orders
            .get_mut(order_id)
            .ok_or_else(|| missing_order(order_id))?;
        if order.status == OrderStatus::Refunded {
            return Ok(false);
        }

        order.status = OrderStatus::Refunded;
        order.updated_at = Utc::now();
        table.push_note(order_id, note);
        Ok(true)
    }

    async fn add_note(&self, order_id: &str, message: &str) -> DbResult<()> {
        let mut table = self.table.write().await;
        if !table.orders.contains_key(order_id) {
            return Err(missing_order(order_id));
        }
        table.push_note(order_id, message);
        Ok(())
    }

    async fn notes(&self, order_id: &str) -> DbResult<Vec<OrderNote>> {
        Ok(self
            .table
            .read()
            .await
            .notes
            .get(order_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemorySettingsStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
