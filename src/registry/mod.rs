//! Subscription registry
//!
//! `Registry` validates incoming subscriptions and upserts them by endpoint into
//! a swappable `SubscriptionStore` (memory, postgres or Directus). Writes the
//! store rejects land in a process-local fallback, and reads degrade to that
//! fallback when the store cannot be listed.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{error::Error, model::Subscription};

pub use fallback::Fallback;
pub use memory::MemoryStore;

mod fallback;
mod memory;

#[async_trait]
pub trait SubscriptionStore: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Insert or replace the entry stored under `subscription.endpoint`.
    async fn save(&self, subscription: &Subscription) -> Result<(), Error>;

    async fn list(&self) -> Result<Vec<Subscription>, Error>;
}

#[derive(Debug)]
pub struct Registry {
    store: Arc<dyn SubscriptionStore>,
    fallback: Fallback,
    sequence: AtomicU64,
}

impl Registry {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Registry {
        Registry {
            store,
            fallback: Fallback::new(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn memory() -> Registry {
        Registry::new(Arc::new(MemoryStore::new()))
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    pub async fn save(&self, payload: Value) -> Result<(), Error> {
        let subscription = Subscription::from_value(payload)?;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        match self.store.save(&subscription).await {
            Ok(()) => {
                self.fallback.clear(sequence, &subscription.endpoint);
            },
            Err(e) => {
                warn!(
                    "Subscription store {} rejected {}, keeping it locally: {}",
                    self.store.name(),
                    subscription.endpoint,
                    e
                );
                let endpoint = subscription.endpoint.to_owned();
                if !self.fallback.keep(sequence, subscription) {
                    debug!("Newer save of {} already settled", endpoint);
                }
            },
        }

        Ok(())
    }

    /// Never fails: a store that cannot be read yields the fallback entries
    /// only.
    pub async fn list(&self) -> Vec<Subscription> {
        let local = self.fallback.entries();

        match self.store.list().await {
            Ok(rows) => merge(rows, local),
            Err(e) => {
                warn!(
                    "Subscription store {} unavailable, using {} local entries: {}",
                    self.store.name(),
                    local.len(),
                    e
                );
                local
            },
        }
    }
}

// Fallback entries are writes the store refused, so they are newer.
fn merge(remote: Vec<Subscription>, local: Vec<Subscription>) -> Vec<Subscription> {
    let mut items: HashMap<String, Subscription> = HashMap::new();

    for subscription in remote.into_iter().chain(local) {
        items.insert(subscription.endpoint.to_owned(), subscription);
    }

    items.into_values().collect()
}
