use std::collections::BTreeMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::debug;
use crate::actor_framework::Repository;
use crate::domain::{
    MenuItem, MenuItemCreate, MenuItemId, MenuQuery, Order, OrderCreate, OrderId, OrderItem,
    OrderQuery, RecordedStatus, OrderStatus, User, UserCreate, UserId, UserQuery,
};
use super::StoreError;

/// In-process store with the same tables and constraints as the PostgreSQL schema.
///
/// Clones share the tables. Every write happens under one lock, so an order and
/// its items become visible together or not at all.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    menu_items: BTreeMap<MenuItemId, MenuItem>,
    orders: BTreeMap<OrderId, OrderRow>,
    order_items: Vec<OrderItem>,
    last_user_id: UserId,
    last_menu_item_id: MenuItemId,
    last_order_id: OrderId,
}

struct OrderRow {
    id: OrderId,
    user_id: UserId,
    total: Decimal,
    status: RecordedStatus,
    created_at: DateTime<Utc>,
}

impl Tables {
    fn assemble(&self, row: &OrderRow) -> Order {
        Order {
            id: row.id,
            user_id: row.user_id,
            customer_name: self.users.get(&row.user_id).map(|user| user.name.clone()),
            total: row.total,
            status: row.status.clone(),
            created_at: row.created_at,
            items: self
                .order_items
                .iter()
                .filter(|item| item.order_id == row.id)
                .cloned()
                .collect(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the raw status text, as another client of the database might.
    #[cfg(test)]
    pub async fn write_raw_status(&self, id: OrderId, raw: &str) {
        if let Some(row) = self.tables.lock().await.orders.get_mut(&id) {
            row.status = RecordedStatus::parse(raw);
        }
    }

    #[cfg(test)]
    pub async fn delete_order_row(&self, id: OrderId) {
        let mut tables = self.tables.lock().await;
        tables.orders.remove(&id);
        tables.order_items.retain(|item| item.order_id != id);
    }

    /// (order rows, order item rows)
    #[cfg(test)]
    pub async fn order_row_counts(&self) -> (usize, usize) {
        let tables = self.tables.lock().await;
        (tables.orders.len(), tables.order_items.len())
    }
}

#[async_trait]
impl Repository<User> for MemoryStore {
    async fn insert(&self, payload: UserCreate) -> Result<UserId, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|user| user.email == payload.email) {
            return Err(StoreError::Conflict(format!("email {} is already registered", payload.email)));
        }
        tables.last_user_id += 1;
        let id = tables.last_user_id;
        tables.users.insert(id, User {
            id,
            name: payload.name,
            email: payload.email,
            password_digest: payload.password_digest,
            role: payload.role,
        });
        Ok(id)
    }

    async fn fetch(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(id).cloned())
    }

    async fn find(&self, query: &UserQuery) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(match query {
            UserQuery::ByEmail(email) => tables
                .users
                .values()
                .filter(|user| &user.email == email)
                .cloned()
                .collect(),
        })
    }
}

#[async_trait]
impl Repository<MenuItem> for MemoryStore {
    async fn insert(&self, payload: MenuItemCreate) -> Result<MenuItemId, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.last_menu_item_id += 1;
        let id = tables.last_menu_item_id;
        tables.menu_items.insert(id, MenuItem {
            id,
            name: payload.name,
            price: payload.price,
            available: payload.available,
            options: payload.options,
        });
        Ok(id)
    }

    async fn fetch(&self, id: &MenuItemId) -> Result<Option<MenuItem>, StoreError> {
        Ok(self.tables.lock().await.menu_items.get(id).cloned())
    }

    async fn find(&self, query: &MenuQuery) -> Result<Vec<MenuItem>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .menu_items
            .values()
            .filter(|item| *query == MenuQuery::All || item.available)
            .cloned()
            .collect())
    }

    async fn save(&self, item: &MenuItem) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.menu_items.get_mut(&item.id) {
            Some(row) => {
                *row = item.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("menu item {}", item.id))),
        }
    }

    async fn remove(&self, id: &MenuItemId) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.order_items.iter().any(|item| item.menu_item_id == *id) {
            return Err(StoreError::Conflict(format!("menu item {} appears on placed orders", id)));
        }
        Ok(tables.menu_items.remove(id).is_some())
    }
}

#[async_trait]
impl Repository<Order> for MemoryStore {
    async fn insert(&self, payload: OrderCreate) -> Result<OrderId, StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&payload.user_id) {
            return Err(StoreError::Integrity(format!("user {} does not exist", payload.user_id)));
        }

        // Stage every row first; nothing is written unless all lines resolve.
        let id = tables.last_order_id + 1;
        let mut items = Vec::with_capacity(payload.lines.len());
        for line in &payload.lines {
            let menu_item = tables.menu_items.get(&line.menu_item_id).ok_or_else(|| {
                StoreError::Integrity(format!("menu item {} does not exist", line.menu_item_id))
            })?;
            items.push(OrderItem {
                order_id: id,
                menu_item_id: line.menu_item_id,
                quantity: line.quantity,
                unit_price: menu_item.price,
                option_selected: line.option.clone(),
            });
        }
        let total: Decimal = items.iter().map(OrderItem::line_total).sum();

        tables.last_order_id = id;
        tables.orders.insert(id, OrderRow {
            id,
            user_id: payload.user_id,
            total,
            status: OrderStatus::Pending.into(),
            created_at: Utc::now(),
        });
        debug!(order_id = id, item_count = items.len(), "Order rows written");
        tables.order_items.extend(items);
        Ok(id)
    }

    async fn fetch(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.get(id).map(|row| tables.assemble(row)))
    }

    async fn find(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        let tables = self.tables.lock().await;
        // Ids grow with creation time, so reverse id order is newest first.
        let newest_first = tables.orders.values().rev();
        Ok(match *query {
            OrderQuery::All => newest_first.map(|row| tables.assemble(row)).collect(),
            OrderQuery::ForUser { user_id, limit } => newest_first
                .filter(|row| row.user_id == user_id)
                .take(usize::try_from(limit).unwrap_or(0))
                .map(|row| tables.assemble(row))
                .collect(),
        })
    }

    /// Only the status column is mutable.
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.orders.get_mut(&order.id) {
            Some(row) => {
                row.status = order.status.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("order {}", order.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::domain::{OrderLine, Registration};

    async fn seeded() -> (MemoryStore, UserId, MenuItemId) {
        let store = MemoryStore::new();
        let create = Registration::new("Ann", "ann@example.com", "pw").into_create().unwrap();
        let user_id = Repository::<User>::insert(&store, create).await.unwrap();
        let menu_id = Repository::<MenuItem>::insert(&store, MenuItemCreate::new("Soup", dec!(4.25))).await.unwrap();
        (store, user_id, menu_id)
    }

    #[tokio::test]
    async fn order_insert_snapshots_prices() {
        let (store, user_id, menu_id) = seeded().await;
        let payload = OrderCreate { user_id, lines: vec![OrderLine::new(menu_id, 2)] };
        let order_id = Repository::<Order>::insert(&store, payload).await.unwrap();

        let order = Repository::<Order>::fetch(&store, &order_id).await.unwrap().unwrap();
        assert_eq!(order.total, dec!(8.50));
        assert_eq!(order.status, RecordedStatus::Known(OrderStatus::Pending));
        assert_eq!(order.customer_name.as_deref(), Some("Ann"));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].unit_price, dec!(4.25));
    }

    #[tokio::test]
    async fn order_insert_with_unknown_item_writes_nothing() {
        let (store, user_id, menu_id) = seeded().await;
        let payload = OrderCreate {
            user_id,
            lines: vec![OrderLine::new(menu_id, 1), OrderLine::new(999, 1)],
        };
        let result = Repository::<Order>::insert(&store, payload).await;
        assert!(matches!(result, Err(StoreError::Integrity(_))));
        assert_eq!(store.order_row_counts().await, (0, 0));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (store, _, _) = seeded().await;
        let create = Registration::new("Ann Two", "ANN@example.com", "pw").into_create().unwrap();
        let result = Repository::<User>::insert(&store, create).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn customer_query_is_newest_first_and_limited() {
        let (store, user_id, menu_id) = seeded().await;
        for _ in 0..3 {
            let payload = OrderCreate { user_id, lines: vec![OrderLine::new(menu_id, 1)] };
            Repository::<Order>::insert(&store, payload).await.unwrap();
        }
        let orders = Repository::<Order>::find(&store, &OrderQuery::ForUser { user_id, limit: 2 }).await.unwrap();
        let ids: Vec<OrderId> = orders.iter().map(|order| order.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }
}
