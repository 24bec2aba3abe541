use std::str::FromStr;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::error::ErrorKind;
use sqlx::Row;
use tracing::{debug, info, instrument};
use crate::actor_framework::Repository;
use crate::app_system::SystemError;
use crate::config::DatabaseConfig;
use crate::domain::{
    join_options, parse_options, MenuItem, MenuItemCreate, MenuItemId, MenuQuery, Order,
    OrderCreate, OrderId, OrderItem, OrderQuery, OrderStatus, RecordedStatus, Role, User,
    UserCreate, UserId, UserQuery,
};
use super::StoreError;

const ORDER_COLUMNS: &str = r#"
    SELECT o.id, o.user_id, u.name AS customer_name, o.total, o.status, o.created_at
    FROM orders o
    LEFT JOIN users u ON u.id = o.user_id
"#;

/// PostgreSQL storage adapter for the cloud kitchen schema
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect using the configured URL, with user and password applied on top.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, SystemError> {
        let options = PgConnectOptions::from_str(&config.url)?
            .username(&config.user)
            .password(&config.password);
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        info!(max_connections = config.max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<(), SystemError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn load_items(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItem>, StoreError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT order_id, menu_item_id, qty, price, option_selected
            FROM order_items
            WHERE order_id = ANY($1)
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_item_from_row).collect()
    }

    async fn with_items(&self, rows: Vec<PgRow>) -> Result<Vec<Order>, StoreError> {
        let mut orders = rows.iter().map(order_from_row).collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<OrderId> = orders.iter().map(|order| order.id).collect();
        let mut items = self.load_items(&ids).await?;
        for order in &mut orders {
            let (mine, rest): (Vec<_>, Vec<_>) = items.into_iter().partition(|item| item.order_id == order.id);
            order.items = mine;
            items = rest;
        }
        Ok(orders)
    }
}

fn decode_err(column: &str, reason: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("bad value in column {}: {}", column, reason))
}

/// A delete that trips a foreign key still has rows pointing at it.
fn delete_error(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.kind() == ErrorKind::ForeignKeyViolation => {
            StoreError::Conflict(format!("{} is still referenced: {}", what, db.message()))
        }
        _ => StoreError::from(err),
    }
}

fn quantity_to_db(quantity: u32) -> Result<i32, StoreError> {
    i32::try_from(quantity).map_err(|_| StoreError::Integrity(format!("quantity {} out of range", quantity)))
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_digest: row.try_get("password")?,
        role: Role::parse(&role),
    })
}

fn menu_item_from_row(row: &PgRow) -> Result<MenuItem, StoreError> {
    let options: Option<String> = row.try_get("options")?;
    Ok(MenuItem {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        available: row.try_get("available")?,
        options: options.as_deref().map(parse_options).unwrap_or_default(),
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        customer_name: row.try_get("customer_name")?,
        total: row.try_get("total")?,
        status: RecordedStatus::parse(&status),
        created_at: row.try_get("created_at")?,
        items: Vec::new(),
    })
}

fn order_item_from_row(row: &PgRow) -> Result<OrderItem, StoreError> {
    let qty: i32 = row.try_get("qty")?;
    Ok(OrderItem {
        order_id: row.try_get("order_id")?,
        menu_item_id: row.try_get("menu_item_id")?,
        quantity: u32::try_from(qty).map_err(|e| decode_err("qty", e))?,
        unit_price: row.try_get("price")?,
        option_selected: row.try_get("option_selected")?,
    })
}

// ==================== Users ====================

#[async_trait]
impl Repository<User> for PgStore {
    #[instrument(skip(self, payload), fields(email = %payload.email))]
    async fn insert(&self, payload: UserCreate) -> Result<UserId, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (name, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&payload.name)
        .bind(&payload.email)
        .bind(&payload.password_digest)
        .bind(payload.role.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn fetch(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT id, name, email, password, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find(&self, query: &UserQuery) -> Result<Vec<User>, StoreError> {
        let rows = match query {
            UserQuery::ByEmail(email) => {
                sqlx::query("SELECT id, name, email, password, role FROM users WHERE email = $1")
                    .bind(email)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(user_from_row).collect()
    }
}

// ==================== Menu ====================

#[async_trait]
impl Repository<MenuItem> for PgStore {
    #[instrument(skip(self, payload), fields(name = %payload.name))]
    async fn insert(&self, payload: MenuItemCreate) -> Result<MenuItemId, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO menu_items (name, price, available, options)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&payload.name)
        .bind(payload.price)
        .bind(payload.available)
        .bind(join_options(&payload.options))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn fetch(&self, id: &MenuItemId) -> Result<Option<MenuItem>, StoreError> {
        let row = sqlx::query("SELECT id, name, price, available, options FROM menu_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(menu_item_from_row).transpose()
    }

    async fn find(&self, query: &MenuQuery) -> Result<Vec<MenuItem>, StoreError> {
        let sql = match query {
            MenuQuery::All => "SELECT id, name, price, available, options FROM menu_items ORDER BY id",
            MenuQuery::Available => {
                "SELECT id, name, price, available, options FROM menu_items WHERE available ORDER BY id"
            }
        };
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(menu_item_from_row).collect()
    }

    #[instrument(skip(self, item), fields(menu_item_id = item.id))]
    async fn save(&self, item: &MenuItem) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE menu_items SET name = $1, price = $2, available = $3, options = $4
            WHERE id = $5
            "#,
        )
        .bind(&item.name)
        .bind(item.price)
        .bind(item.available)
        .bind(join_options(&item.options))
        .bind(item.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("menu item {}", item.id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: &MenuItemId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| delete_error(e, &format!("menu item {}", id)))?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== Orders ====================

#[async_trait]
impl Repository<Order> for PgStore {
    /// Writes the order and its items in one transaction. Unit prices are read
    /// inside the transaction, so the total matches the stored item prices.
    #[instrument(skip(self, payload), fields(user_id = payload.user_id, lines = payload.lines.len()))]
    async fn insert(&self, payload: OrderCreate) -> Result<OrderId, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut priced = Vec::with_capacity(payload.lines.len());
        for line in &payload.lines {
            let price: Option<Decimal> = sqlx::query_scalar("SELECT price FROM menu_items WHERE id = $1")
                .bind(line.menu_item_id)
                .fetch_optional(&mut *tx)
                .await?;
            let price = price.ok_or_else(|| {
                StoreError::Integrity(format!("menu item {} does not exist", line.menu_item_id))
            })?;
            priced.push((line, price));
        }
        let total: Decimal = priced
            .iter()
            .map(|(line, price)| *price * Decimal::from(line.quantity))
            .sum();

        let order_id: OrderId = sqlx::query_scalar(
            r#"
            INSERT INTO orders (user_id, total, status)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(payload.user_id)
        .bind(total)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for (line, price) in &priced {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, menu_item_id, qty, price, option_selected)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind(line.menu_item_id)
            .bind(quantity_to_db(line.quantity)?)
            .bind(*price)
            .bind(line.option.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        // Dropping `tx` on any early return above rolls everything back.
        tx.commit().await?;
        debug!(order_id, %total, "Order committed");
        Ok(order_id)
    }

    async fn fetch(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("{} WHERE o.id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.with_items(vec![row]).await?.pop())
    }

    async fn find(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        let rows = match *query {
            OrderQuery::All => {
                sqlx::query(&format!("{} ORDER BY o.created_at DESC, o.id DESC", ORDER_COLUMNS))
                    .fetch_all(&self.pool)
                    .await?
            }
            OrderQuery::ForUser { user_id, limit } => {
                sqlx::query(&format!(
                    "{} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC LIMIT $2",
                    ORDER_COLUMNS
                ))
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        self.with_items(rows).await
    }

    /// Writes the status column only; last write wins.
    #[instrument(skip(self, order), fields(order_id = order.id, status = %order.status))]
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(order.status.as_str())
            .bind(order.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("order {}", order.id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    /// A server error as a German-locale PostgreSQL would report it.
    #[derive(Debug)]
    struct ServerError {
        code: &'static str,
        message: &'static str,
    }

    impl fmt::Display for ServerError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for ServerError {}

    impl sqlx::error::DatabaseError for ServerError {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                "23505" => ErrorKind::UniqueViolation,
                "23503" => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn server_error(code: &'static str, message: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ServerError { code, message }))
    }

    #[test]
    fn referenced_delete_is_a_conflict_in_any_locale() {
        let err = server_error(
            "23503",
            "Aktualisieren oder Löschen in Tabelle »menu_items« verletzt Fremdschlüssel-Constraint",
        );
        assert!(matches!(delete_error(err, "menu item 3"), StoreError::Conflict(msg) if msg.contains("menu item 3")));
    }

    #[test]
    fn insert_errors_keep_their_classification() {
        let missing = server_error("23503", "Einfügen verletzt Fremdschlüssel");
        assert!(matches!(StoreError::from(missing), StoreError::Integrity(_)));

        let duplicate = server_error("23505", "doppelter Schlüsselwert");
        assert!(matches!(StoreError::from(duplicate), StoreError::Conflict(_)));

        let other = server_error("57014", "Anfrage wurde abgebrochen");
        assert!(matches!(delete_error(other, "menu item 3"), StoreError::Backend(_)));
    }
}
