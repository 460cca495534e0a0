use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::error::Error;

/// A browser push subscription keyed by its endpoint. The credential document
/// is kept verbatim in `payload`; only the transport reads `keys` from it.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: String,
    pub payload: Value,
}

impl Subscription {
    pub fn from_value(payload: Value) -> Result<Subscription, Error> {
        let object = payload.as_object().ok_or_else(|| {
            Error::InvalidSubscription(String::from("expected an object"))
        })?;

        let endpoint = match object.get("endpoint") {
            Some(Value::String(endpoint)) if !endpoint.is_empty() => {
                endpoint.to_owned()
            },
            _ => {
                return Err(Error::InvalidSubscription(String::from(
                    "endpoint is required",
                )))
            },
        };

        if !object.get("keys").is_some_and(Value::is_object) {
            return Err(Error::InvalidSubscription(String::from(
                "keys are required",
            )));
        }

        Ok(Subscription { endpoint, payload })
    }

    pub fn key(&self, name: &str) -> Option<&str> {
        self.payload.get("keys")?.get(name)?.as_str()
    }
}
