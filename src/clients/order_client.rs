use tracing::{debug, error, info, instrument, warn};
use crate::domain::{
    Order, OrderCreate, OrderId, OrderLine, OrderQuery, RecordedStatus, Session,
    CUSTOMER_ORDER_LIMIT,
};
use crate::order_actor::{OrderAction, OrderActionResult, OrderError};
use crate::actor_framework::ResourceClient;
use crate::clients::MenuClient;

/// Client for interacting with the Order actor.
///
/// Placement is orchestrated here: every basket line is checked against the
/// menu before the actor writes the order and its items in one step.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
    menu_client: MenuClient,
}

impl OrderClient {
    pub fn new(inner: ResourceClient<Order>, menu_client: MenuClient) -> Self {
        Self { inner, menu_client }
    }

    #[instrument(skip(self, session, lines), fields(user_id = session.user_id, line_count = lines.len()))]
    pub async fn place_order(&self, session: &Session, lines: Vec<OrderLine>) -> Result<OrderId, OrderError> {
        info!("Processing place_order request (Client Side)");

        // Step 1: Drop untouched lines
        let lines: Vec<OrderLine> = lines.into_iter().filter(|line| line.quantity > 0).collect();
        if lines.is_empty() {
            warn!("Basket is empty");
            return Err(OrderError::EmptyOrder);
        }

        // Step 2: Validate each menu item and its option
        let mut checked = Vec::with_capacity(lines.len());
        for line in lines {
            checked.push(self.check_line(line).await?);
        }

        // Step 3: Write the order and its items
        let payload = OrderCreate {
            user_id: session.user_id,
            lines: checked,
        };
        let id = self.inner.create(payload).await?;
        info!(order_id = id, "Order placed");
        Ok(id)
    }

    async fn check_line(&self, mut line: OrderLine) -> Result<OrderLine, OrderError> {
        let item = match self.menu_client.get_menu_item(line.menu_item_id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                error!(menu_item_id = line.menu_item_id, "Menu item not found");
                return Err(OrderError::InvalidMenuItem(line.menu_item_id));
            }
            Err(e) => {
                error!(error = %e, "Menu lookup failed");
                return Err(OrderError::DatabaseError(format!("Menu lookup failed: {}", e)));
            }
        };

        if !item.available {
            warn!(menu_item_id = item.id, "Menu item is unavailable");
            return Err(OrderError::Unavailable(item.name));
        }

        let option = if item.has_options() {
            let choice = line
                .option
                .as_deref()
                .map(str::trim)
                .filter(|choice| !choice.is_empty())
                .ok_or_else(|| OrderError::MissingOption(item.name.clone()))?;
            let label = item.option_matching(choice).ok_or_else(|| OrderError::InvalidOption {
                item: item.name.clone(),
                option: choice.to_string(),
            })?;
            Some(label.to_string())
        } else {
            None
        };
        line.option = option;
        debug!(menu_item_id = item.id, quantity = line.quantity, "Line accepted");
        Ok(line)
    }

    /// Moves an order one step forward. Completed or unrecognized orders come back
    /// as `NoTransition` and are left alone.
    #[instrument(skip(self, session))]
    pub async fn advance_order(&self, session: &Session, id: OrderId) -> Result<OrderActionResult, OrderError> {
        session.require_admin("advance orders").map_err(OrderError::Forbidden)?;
        debug!("Sending request");
        let result = self.inner.perform_action(id, OrderAction::Advance).await?;
        match &result {
            OrderActionResult::Advanced { from, to } => info!(order_id = id, %from, %to, "Order advanced"),
            OrderActionResult::NoTransition(status) => info!(order_id = id, %status, "No further transition"),
        }
        Ok(result)
    }

    /// Every order, newest first.
    #[instrument(skip(self, session))]
    pub async fn list_orders(&self, session: &Session) -> Result<Vec<Order>, OrderError> {
        session.require_admin("list all orders").map_err(OrderError::Forbidden)?;
        debug!("Sending request");
        self.inner.find(OrderQuery::All).await.map_err(OrderError::from)
    }

    /// The session owner's most recent orders, newest first.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn my_orders(&self, session: &Session) -> Result<Vec<Order>, OrderError> {
        debug!("Sending request");
        let query = OrderQuery::ForUser {
            user_id: session.user_id,
            limit: CUSTOMER_ORDER_LIMIT,
        };
        self.inner.find(query).await.map_err(OrderError::from)
    }

    /// Customers may follow their own orders; staff may follow any.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn check_tracking_access(&self, session: &Session, id: OrderId) -> Result<(), OrderError> {
        let order = self
            .get_order(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order {}", id)))?;
        if order.user_id != session.user_id && !session.is_admin() {
            warn!(order_id = id, "Tracking refused for another customer's order");
            return Err(OrderError::Forbidden(format!("order {} belongs to another customer", id)));
        }
        Ok(())
    }

    /// The stored status text of one order, `None` when the row is gone.
    pub async fn order_status(&self, id: OrderId) -> Result<Option<RecordedStatus>, OrderError> {
        Ok(self.get_order(id).await?.map(|order| order.status))
    }
}

impl_client_methods!(OrderClient, Order, OrderError, order);
