use std::fmt::{Debug, Display};
use std::hash::Hash;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};
use crate::store::StoreError;

// =============================================================================
// 1. THE ABSTRACTION (Traits with Hooks, DTOs, Queries and Actions)
// =============================================================================

/// Trait that any domain entity must implement to be managed by ResourceActor
pub trait Entity: Clone + Send + Sync + 'static {
    /// Short name used in log fields and error messages
    const KIND: &'static str;

    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;
    type CreatePayload: Send + Sync + Debug;
    type Patch: Send + Sync + Debug;
    type Query: Send + Sync + Debug;

    type Action: Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;

    /// Get the ID of the entity
    fn id(&self) -> &Self::Id;

    // --- Lifecycle Hooks ---

    /// Checked before the payload reaches the store
    fn validate_create(_payload: &Self::CreatePayload) -> Result<(), String> { Ok(()) }
    fn on_update(&mut self, patch: Self::Patch) -> Result<(), String>;
    fn on_delete(&self) -> Result<(), String> { Ok(()) }

    // --- Action Handler ---

    /// Handle a custom domain-specific action. The outcome says whether the
    /// entity changed and has to be written back.
    fn handle_action(&mut self, action: Self::Action) -> Result<ActionOutcome<Self::ActionResult>, String>;
}

/// Result of [`Entity::handle_action`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome<R> {
    pub result: R,
    pub changed: bool,
}

impl<R> ActionOutcome<R> {
    pub fn changed(result: R) -> Self {
        Self { result, changed: true }
    }

    pub fn unchanged(result: R) -> Self {
        Self { result, changed: false }
    }
}

/// Storage backend a ResourceActor reads and writes through.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync + 'static {
    async fn insert(&self, payload: T::CreatePayload) -> Result<T::Id, StoreError>;
    async fn fetch(&self, id: &T::Id) -> Result<Option<T>, StoreError>;
    async fn find(&self, query: &T::Query) -> Result<Vec<T>, StoreError>;

    async fn save(&self, _item: &T) -> Result<(), StoreError> {
        Err(StoreError::Unsupported(format!("{} rows are never updated", T::KIND)))
    }

    /// Returns false when no row had that id.
    async fn remove(&self, _id: &T::Id) -> Result<bool, StoreError> {
        Err(StoreError::Unsupported(format!("{} rows are never deleted", T::KIND)))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped")]
    ActorDropped,
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    Create {
        payload: T::CreatePayload,
        respond_to: Response<T::Id>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Find {
        query: T::Query,
        respond_to: Response<Vec<T>>,
    },
    Update {
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<()>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    }
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

pub struct ResourceActor<T: Entity, R: Repository<T>> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    repository: R,
}

impl<T: Entity, R: Repository<T>> ResourceActor<T, R> {
    pub fn new(buffer_size: usize, repository: R) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self { receiver, repository };
        (actor, ResourceClient::new(sender))
    }

    #[instrument(name = "resource_actor", skip(self), fields(kind = T::KIND))]
    pub async fn run(mut self) {
        info!("Actor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { payload, respond_to } => {
                    let _ = respond_to.send(self.handle_create(payload).await);
                }
                ResourceRequest::Get { id, respond_to } => {
                    let _ = respond_to.send(self.repository.fetch(&id).await.map_err(Into::into));
                }
                ResourceRequest::Find { query, respond_to } => {
                    let _ = respond_to.send(self.repository.find(&query).await.map_err(Into::into));
                }
                ResourceRequest::Update { id, patch, respond_to } => {
                    let _ = respond_to.send(self.handle_update(id, patch).await);
                }
                ResourceRequest::Delete { id, respond_to } => {
                    let _ = respond_to.send(self.handle_delete(id).await);
                }
                ResourceRequest::Action { id, action, respond_to } => {
                    let _ = respond_to.send(self.handle_action(id, action).await);
                }
            }
        }
        info!("Actor stopped");
    }

    async fn handle_create(&self, payload: T::CreatePayload) -> Result<T::Id, FrameworkError> {
        if let Err(reason) = T::validate_create(&payload) {
            warn!(%reason, "Create rejected");
            return Err(FrameworkError::Rejected(reason));
        }
        let id = self.repository.insert(payload).await?;
        debug!(id = %id, "Created");
        Ok(id)
    }

    async fn load(&self, id: &T::Id) -> Result<T, FrameworkError> {
        self.repository
            .fetch(id)
            .await?
            .ok_or_else(|| FrameworkError::NotFound(T::KIND, id.to_string()))
    }

    async fn handle_update(&self, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError> {
        let mut item = self.load(&id).await?;
        item.on_update(patch).map_err(FrameworkError::Rejected)?;
        self.repository.save(&item).await?;
        debug!(id = %id, "Updated");
        Ok(item)
    }

    async fn handle_delete(&self, id: T::Id) -> Result<(), FrameworkError> {
        let item = self.load(&id).await?;
        item.on_delete().map_err(FrameworkError::Rejected)?;
        if !self.repository.remove(&id).await? {
            return Err(FrameworkError::NotFound(T::KIND, id.to_string()));
        }
        debug!(id = %id, "Deleted");
        Ok(())
    }

    async fn handle_action(&self, id: T::Id, action: T::Action) -> Result<T::ActionResult, FrameworkError> {
        let mut item = self.load(&id).await?;
        let outcome = item.handle_action(action).map_err(FrameworkError::Rejected)?;
        if outcome.changed {
            self.repository.save(&item).await?;
        }
        Ok(outcome.result)
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

// Derive would demand `T: Clone` on every payload type.
impl<T: Entity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<V>(
        &self,
        build: impl FnOnce(Response<V>) -> ResourceRequest<T>,
    ) -> Result<V, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender.send(build(respond_to))
            .await.map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(&self, payload: T::CreatePayload) -> Result<T::Id, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Create { payload, respond_to }).await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to }).await
    }

    pub async fn find(&self, query: T::Query) -> Result<Vec<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Find { query, respond_to }).await
    }

    pub async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Update { id, patch, respond_to }).await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), FrameworkError> {
        self.request(|respond_to| ResourceRequest::Delete { id, respond_to }).await
    }

    pub async fn perform_action(&self, id: T::Id, action: T::Action) -> Result<T::ActionResult, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Action { id, action, respond_to }).await
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    // --- Domain Definition ---

    #[derive(Clone, Debug, PartialEq)]
    struct Staff {
        id: u64,
        name: String,
        is_admin: bool,
    }

    #[derive(Debug)]
    struct StaffCreate {
        name: String,
    }

    #[derive(Debug)]
    struct StaffPatch {
        name: Option<String>,
    }

    #[derive(Debug)]
    enum StaffAction {
        Promote,
    }

    impl Entity for Staff {
        const KIND: &'static str = "staff";
        type Id = u64;
        type CreatePayload = StaffCreate;
        type Patch = StaffPatch;
        type Query = ();
        type Action = StaffAction;
        type ActionResult = bool;

        fn id(&self) -> &u64 { &self.id }

        fn validate_create(payload: &StaffCreate) -> Result<(), String> {
            if payload.name.is_empty() {
                return Err("name required".to_string());
            }
            Ok(())
        }

        fn on_update(&mut self, patch: StaffPatch) -> Result<(), String> {
            if let Some(name) = patch.name {
                self.name = name;
            }
            Ok(())
        }

        fn handle_action(&mut self, action: StaffAction) -> Result<ActionOutcome<bool>, String> {
            match action {
                StaffAction::Promote if self.is_admin => Ok(ActionOutcome::unchanged(false)),
                StaffAction::Promote => {
                    self.is_admin = true;
                    Ok(ActionOutcome::changed(true))
                }
            }
        }
    }

    #[derive(Clone, Default)]
    struct CountingRepo {
        rows: Arc<Mutex<HashMap<u64, Staff>>>,
        next_id: Arc<AtomicU64>,
        saves: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Repository<Staff> for CountingRepo {
        async fn insert(&self, payload: StaffCreate) -> Result<u64, StoreError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let staff = Staff { id, name: payload.name, is_admin: false };
            self.rows.lock().unwrap().insert(id, staff);
            Ok(id)
        }

        async fn fetch(&self, id: &u64) -> Result<Option<Staff>, StoreError> {
            Ok(self.rows.lock().unwrap().get(id).cloned())
        }

        async fn find(&self, _query: &()) -> Result<Vec<Staff>, StoreError> {
            Ok(self.rows.lock().unwrap().values().cloned().collect())
        }

        async fn save(&self, item: &Staff) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.rows.lock().unwrap().insert(item.id, item.clone());
            Ok(())
        }
    }

    // --- Test ---

    #[tokio::test]
    async fn test_resource_actor_with_actions() {
        let repo = CountingRepo::default();
        let (actor, client) = ResourceActor::new(10, repo.clone());
        tokio::spawn(actor.run());

        let id = client.create(StaffCreate { name: "Alice".into() }).await.unwrap();

        let changed = client.perform_action(id, StaffAction::Promote).await.unwrap();
        assert!(changed);
        assert_eq!(repo.saves.load(Ordering::SeqCst), 1);

        let staff = client.get(id).await.unwrap().unwrap();
        assert!(staff.is_admin);

        // Promote again: nothing changes, nothing is written
        let changed_again = client.perform_action(id, StaffAction::Promote).await.unwrap();
        assert!(!changed_again);
        assert_eq!(repo.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_validation_runs_before_store() {
        let repo = CountingRepo::default();
        let (actor, client) = ResourceActor::new(10, repo.clone());
        tokio::spawn(actor.run());

        let result = client.create(StaffCreate { name: String::new() }).await;
        assert_eq!(result, Err(FrameworkError::Rejected("name required".to_string())));
        assert!(repo.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_rows_and_unsupported_delete() {
        let repo = CountingRepo::default();
        let (actor, client) = ResourceActor::new(10, repo);
        tokio::spawn(actor.run());

        let result = client.update(42, StaffPatch { name: Some("Bob".into()) }).await;
        assert_eq!(result, Err(FrameworkError::NotFound("staff", "42".to_string())));

        let id = client.create(StaffCreate { name: "Carol".into() }).await.unwrap();
        let renamed = client.update(id, StaffPatch { name: Some("Caroline".into()) }).await.unwrap();
        assert_eq!(renamed.name, "Caroline");

        let result = client.delete(id).await;
        assert!(matches!(result, Err(FrameworkError::Store(StoreError::Unsupported(_)))));
        assert_eq!(client.find(()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_client_reports_closed_actor() {
        let (actor, client) = ResourceActor::<Staff, _>::new(1, CountingRepo::default());
        drop(actor);
        assert_eq!(client.get(1).await, Err(FrameworkError::ActorClosed));
    }
}
