//! Type-keyed registry of in-process clients.
//!
//! A provider module registers its client once under the interface type,
//! usually a trait object: `hub.register::<dyn my::Api>(client)`. Consumers
//! fetch it back by the same type with `hub.get::<dyn my::Api>()`.
//!
//! Re-registering replaces the previous client; `Arc`s already handed out
//! stay valid.

use parking_lot::RwLock;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientHubError {
    #[error("client not found: {type_name}")]
    NotFound { type_name: &'static str },
}

type Boxed = Box<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct ClientHub {
    map: RwLock<HashMap<TypeId, Boxed>>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under the interface type `T` (`T` may be `dyn Trait`).
    pub fn register<T>(&self, client: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        tracing::debug!(client = std::any::type_name::<T>(), "client registered");
        self.map.write().insert(TypeId::of::<T>(), Box::new(client));
    }

    /// Fetch the client registered under `T`.
    pub fn get<T>(&self) -> Result<Arc<T>, ClientHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.map
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<T>>())
            .cloned()
            .ok_or(ClientHubError::NotFound {
                type_name: std::any::type_name::<T>(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[async_trait::async_trait]
    trait Greeter: Send + Sync {
        async fn greet(&self) -> String;
    }

    struct Fixed(&'static str);

    #[async_trait::async_trait]
    impl Greeter for Fixed {
        async fn greet(&self) -> String {
            self.0.to_string()
        }
    }

    #[tokio::test]
    async fn register_and_get_dyn_trait() {
        let hub = ClientHub::new();
        let api: Arc<dyn Greeter> = Arc::new(Fixed("hello"));
        hub.register::<dyn Greeter>(api.clone());

        let got = hub.get::<dyn Greeter>().unwrap();
        assert_eq!(got.greet().await, "hello");
        assert!(Arc::ptr_eq(&api, &got));
    }

    #[tokio::test]
    async fn re_register_replaces_client() {
        let hub = ClientHub::new();
        hub.register::<dyn Greeter>(Arc::new(Fixed("first")));
        let old = hub.get::<dyn Greeter>().unwrap();
        hub.register::<dyn Greeter>(Arc::new(Fixed("second")));

        assert_eq!(hub.get::<dyn Greeter>().unwrap().greet().await, "second");
        assert_eq!(old.greet().await, "first");
    }

    #[test]
    fn missing_client_names_the_type() {
        let hub = ClientHub::new();
        let err = hub.get::<dyn Greeter>().err().unwrap();
        assert!(err.to_string().contains("Greeter"));
    }
}
