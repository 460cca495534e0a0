use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;

use super::SubscriptionStore;
use crate::{error::Error, model::Subscription};

/// Process-local subscriptions, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, Subscription>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn insert(&self, subscription: Subscription) {
        let mut items =
            self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(subscription.endpoint.to_owned(), subscription);
    }

    pub fn entries(&self) -> Vec<Subscription> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        items.values().cloned().collect()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), Error> {
        self.insert(subscription.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Subscription>, Error> {
        Ok(self.entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_replaces_by_endpoint() {
        let store = MemoryStore::new();
        let first = Subscription {
            endpoint: String::from("https://push.example/a"),
            payload: json!({"n": 1}),
        };
        let second = Subscription {
            endpoint: String::from("https://push.example/a"),
            payload: json!({"n": 2}),
        };

        store.insert(first);
        store.insert(second.clone());

        assert_eq!(store.entries(), vec![second]);
    }
}
