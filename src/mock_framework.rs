//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver.
//! Then use helpers like [`expect_get`] or [`expect_create`] to answer each request by hand.

use crate::actor_framework::{Entity, ResourceClient, ResourceRequest, Response};
use tokio::sync::mpsc;

/// Creates a mock client and a receiver for asserting requests.
///
/// The client talks to a channel the test owns instead of a `ResourceActor`, so
/// orchestration in clients such as `OrderClient` can be checked message by
/// message, and each reply (row, missing row, store failure) is chosen by the test.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::CreatePayload, Response<T::Id>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { payload, respond_to }) => Some((payload, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Response<Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Find request
pub async fn expect_find<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Query, Response<Vec<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Find { query, respond_to }) => Some((query, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Response<T::ActionResult>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::FrameworkError;
    use rust_decimal_macros::dec;
    use crate::domain::{MenuItem, MenuItemCreate, MenuQuery};

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<MenuItem>(10);

        // Test Create
        let create_client = client.clone();
        let create_task = tokio::spawn(async move {
            create_client.create(MenuItemCreate::new("Dal", dec!(6.00))).await
        });

        let (payload, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(payload.name, "Dal");
        responder.send(Ok(41)).unwrap();
        assert_eq!(create_task.await.unwrap(), Ok(41));

        // Test Find
        let find_task = tokio::spawn(async move { client.find(MenuQuery::Available).await });
        let (query, responder) = expect_find(&mut receiver).await.expect("Expected Find request");
        assert_eq!(query, MenuQuery::Available);
        responder.send(Err(FrameworkError::ActorClosed)).unwrap();
        assert_eq!(find_task.await.unwrap(), Err(FrameworkError::ActorClosed));
    }
}
