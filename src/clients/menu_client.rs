use tracing::{debug, info, instrument};
use crate::domain::{MenuItem, MenuItemCreate, MenuItemId, MenuItemPatch, MenuQuery, Session};
use crate::menu_actor::MenuError;
use crate::actor_framework::ResourceClient;

/// Client for interacting with the MenuItem actor.
///
/// Reads are open to everyone; writes need a staff session.
#[derive(Clone)]
pub struct MenuClient {
    inner: ResourceClient<MenuItem>,
}

impl_basic_client!(MenuClient, MenuItem, MenuError, menu_item);

impl MenuClient {
    #[instrument(skip(self, session))]
    pub async fn add_menu_item(&self, session: &Session, item: MenuItemCreate) -> Result<MenuItemId, MenuError> {
        session.require_admin("add menu items").map_err(MenuError::Forbidden)?;
        debug!("Sending request");
        let id = self.inner.create(item).await?;
        info!(menu_item_id = id, "Menu item added");
        Ok(id)
    }

    #[instrument(skip(self, session))]
    pub async fn update_menu_item(
        &self,
        session: &Session,
        id: MenuItemId,
        patch: MenuItemPatch,
    ) -> Result<MenuItem, MenuError> {
        session.require_admin("update menu items").map_err(MenuError::Forbidden)?;
        debug!("Sending request");
        let item = self.inner.update(id, patch).await?;
        info!(menu_item_id = id, price = %item.price, available = item.available, "Menu item updated");
        Ok(item)
    }

    #[instrument(skip(self, session))]
    pub async fn delete_menu_item(&self, session: &Session, id: MenuItemId) -> Result<(), MenuError> {
        session.require_admin("delete menu items").map_err(MenuError::Forbidden)?;
        debug!("Sending request");
        self.inner.delete(id).await?;
        info!(menu_item_id = id, "Menu item deleted");
        Ok(())
    }

    /// Items in id order.
    #[instrument(skip(self))]
    pub async fn list_menu(&self, query: MenuQuery) -> Result<Vec<MenuItem>, MenuError> {
        debug!("Sending request");
        self.inner.find(query).await.map_err(MenuError::from)
    }
}
