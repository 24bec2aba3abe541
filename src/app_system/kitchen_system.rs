use std::time::Duration;
use tracing::{error, info};
use crate::actor_framework::{Repository, ResourceActor};
use crate::clients::{MenuClient, OrderClient, UserClient};
use crate::domain::{MenuItem, Order, User};
use crate::tracker::OrderTracker;
use super::SystemError;

/// Channel capacity of each entity actor.
pub const ACTOR_BUFFER: usize = 32;

/// The main application system that orchestrates all actors.
///
/// Responsible for starting one actor per entity over a shared store, wiring the
/// clients together, and handling shutdown.
pub struct KitchenSystem {
    pub user_client: UserClient,
    pub menu_client: MenuClient,
    pub order_client: OrderClient,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl KitchenSystem {
    pub fn new<S>(store: S) -> Self
    where
        S: Repository<User> + Repository<MenuItem> + Repository<Order> + Clone,
    {
        // 1. Accounts
        let (user_actor, user_resource_client) = ResourceActor::<User, S>::new(ACTOR_BUFFER, store.clone());
        let user_client = UserClient::new(user_resource_client);
        let user_handle = tokio::spawn(user_actor.run());

        // 2. Menu
        let (menu_actor, menu_resource_client) = ResourceActor::<MenuItem, S>::new(ACTOR_BUFFER, store.clone());
        let menu_client = MenuClient::new(menu_resource_client);
        let menu_handle = tokio::spawn(menu_actor.run());

        // 3. Orders, validated against the menu
        let (order_actor, order_resource_client) = ResourceActor::<Order, S>::new(ACTOR_BUFFER, store);
        let order_client = OrderClient::new(order_resource_client, menu_client.clone());
        let order_handle = tokio::spawn(order_actor.run());

        info!("Kitchen system started");
        Self {
            user_client,
            menu_client,
            order_client,
            handles: vec![user_handle, menu_handle, order_handle],
        }
    }

    /// A status tracker reading through this system's order actor.
    pub fn tracker(&self, period: Duration) -> OrderTracker<OrderClient> {
        OrderTracker::new(self.order_client.clone(), period)
    }

    /// Waits for every actor to drain. Clones of the clients (including trackers)
    /// must be dropped first or this waits for them.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");

        // Actors stop once every sender is gone.
        drop(self.order_client);
        drop(self.menu_client);
        drop(self.user_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(SystemError::TaskFailed(e.to_string()));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
