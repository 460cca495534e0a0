use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::{
    configuration::{Config, State},
    error::Error,
    model::Subscription,
    push::PushTransport,
    types::NotificationPayload,
};

#[derive(Debug)]
pub struct DeliveryOutcome {
    pub endpoint: String,
    pub result: Result<(), Error>,
}

#[derive(Debug)]
pub struct BroadcastReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn sent(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .count()
    }
}

pub fn authorize(config: &Config, provided: Option<&str>) -> Result<(), Error> {
    match (config.notify_secret.as_deref(), provided) {
        (Some(secret), Some(provided)) if secret == provided => Ok(()),
        _ => Err(Error::Unauthorized),
    }
}

/// Check the operator secret, the key pair and the payload (in that order),
/// then deliver to every stored subscription.
pub async fn broadcast(
    state: &State,
    secret: Option<&str>,
    body: &[u8],
) -> Result<BroadcastReport, Error> {
    authorize(&state.config, secret)?;

    let transport = state.transport.as_ref().ok_or(Error::NotConfigured)?;
    let payload = NotificationPayload::parse(body)?;

    let subscriptions = state.registry.list().await;
    let report = send(
        transport.as_ref(),
        &state.push_permits,
        &subscriptions,
        &payload,
    )
    .await?;

    info!(
        "Broadcast delivered to {} of {} subscriptions",
        report.sent(),
        report.attempted()
    );

    Ok(report)
}

/// Settle-all fan out: every delivery runs to completion and a failure only
/// affects its own outcome.
pub async fn send(
    transport: &dyn PushTransport,
    permits: &Arc<Semaphore>,
    subscriptions: &[Subscription],
    payload: &NotificationPayload,
) -> Result<BroadcastReport, Error> {
    let data = payload.to_bytes()?;

    let deliveries = subscriptions.iter().map(|subscription| {
        let data = data.as_slice();
        async move {
            let result = match permits.acquire().await {
                Ok(_permit) => transport.deliver(subscription, data).await,
                Err(e) => Err(Error::from(e)),
            };

            match &result {
                Ok(()) => debug!("Push delivered to {}", subscription.endpoint),
                Err(e) => warn!("Push to {} failed: {}", subscription.endpoint, e),
            }

            DeliveryOutcome {
                endpoint: subscription.endpoint.to_owned(),
                result,
            }
        }
    });

    let outcomes = join_all(deliveries).await;

    Ok(BroadcastReport { outcomes })
}
