use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::{
    error::Error, model::Subscription, registry::SubscriptionStore,
};

const COLLECTION: &str = "push_subscriptions";
const LIST_LIMIT: u32 = 5000;

/// Subscription store backed by a Directus collection with the fields
/// `endpoint` (unique) and `payload` (json).
#[derive(Debug)]
pub struct Directus {
    http: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct Item<'a> {
    endpoint: &'a str,
    payload: &'a Value,
}

#[derive(Debug, Deserialize)]
struct Items {
    data: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    payload: Option<Value>,
}

impl Directus {
    pub fn new(
        http: Client,
        url: &str,
        token: Option<String>,
    ) -> Result<Directus, Error> {
        Ok(Directus {
            http,
            base_url: normalize_base_url(url)?,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn items_url(&self) -> String {
        format!("{}/items/{}", self.base_url, COLLECTION)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn create_item(
        &self,
        subscription: &Subscription,
    ) -> Result<(), Error> {
        let item = Item {
            endpoint: &subscription.endpoint,
            payload: &subscription.payload,
        };

        let response = self
            .authorize(self.http.post(self.items_url()))
            .json(&item)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "directus create responded {}",
                status
            )));
        }

        Ok(())
    }

    pub async fn read_items(&self) -> Result<Vec<Subscription>, Error> {
        let limit = LIST_LIMIT.to_string();
        let response = self
            .authorize(self.http.get(self.items_url()))
            .query(&[("fields", "endpoint,payload"), ("limit", limit.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "directus read responded {}",
                status
            )));
        }

        let items = response.json::<Items>().await?;
        let mut subscriptions = Vec::with_capacity(items.data.len());

        for row in items.data {
            let Some(payload) = row.payload else {
                continue;
            };

            match Subscription::from_value(payload) {
                Ok(subscription) => subscriptions.push(subscription),
                Err(e) => warn!("Skipping stored subscription: {}", e),
            }
        }

        Ok(subscriptions)
    }
}

#[async_trait]
impl SubscriptionStore for Directus {
    fn name(&self) -> &'static str {
        "directus"
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), Error> {
        self.create_item(subscription).await
    }

    async fn list(&self) -> Result<Vec<Subscription>, Error> {
        self.read_items().await
    }
}

/// Add a scheme when missing (plain http only for loopback hosts) and drop
/// trailing slashes.
pub fn normalize_base_url(url: &str) -> Result<String, Error> {
    let url = url.trim();

    if url.is_empty() {
        return Err(Error::ConfigurationError(String::from(
            "Missing DIRECTUS_URL",
        )));
    }

    let lower = url.to_ascii_lowercase();
    let with_scheme =
        if lower.starts_with("http://") || lower.starts_with("https://") {
            url.to_owned()
        } else {
            let local = ["localhost", "127.0.0.1"].iter().any(|host| {
                lower
                    .strip_prefix(host)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
            });
            let scheme = if local { "http" } else { "https" };
            format!("{}://{}", scheme, url)
        };

    Url::parse(&with_scheme).map_err(|e| {
        Error::ConfigurationError(format!(
            "Invalid DIRECTUS_URL \"{}\": {}",
            url, e
        ))
    })?;

    Ok(with_scheme.trim_end_matches('/').to_owned())
}
