use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use crate::model::Subscription;

/// Writes the store refused, kept per endpoint together with the sequence
/// number of the save that produced them. A save only touches its endpoint's
/// slot when no later save has been there first, so a slow failure cannot
/// bring back a copy older than what the store already holds.
#[derive(Debug, Default)]
pub struct Fallback {
    slots: Mutex<HashMap<String, Slot>>,
}

#[derive(Debug)]
struct Slot {
    sequence: u64,
    subscription: Option<Subscription>,
}

impl Fallback {
    pub fn new() -> Fallback {
        Fallback::default()
    }

    /// Returns false when a later save already settled this endpoint.
    pub fn keep(&self, sequence: u64, subscription: Subscription) -> bool {
        let endpoint = subscription.endpoint.to_owned();
        self.apply(sequence, endpoint, Some(subscription))
    }

    /// Leaves a marker so older saves still in flight cannot refill the slot.
    pub fn clear(&self, sequence: u64, endpoint: &str) -> bool {
        self.apply(sequence, endpoint.to_owned(), None)
    }

    pub fn entries(&self) -> Vec<Subscription> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter_map(|slot| slot.subscription.clone())
            .collect()
    }

    fn apply(
        &self,
        sequence: u64,
        endpoint: String,
        subscription: Option<Subscription>,
    ) -> bool {
        let mut slots =
            self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        if slots.get(&endpoint).is_some_and(|slot| slot.sequence > sequence) {
            return false;
        }

        slots.insert(
            endpoint,
            Slot {
                sequence,
                subscription,
            },
        );
        true
    }
}
