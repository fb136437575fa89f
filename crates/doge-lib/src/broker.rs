// ============================
// doge-lib/src/broker.rs
// ============================
//! Destination routing and subscriber fan-out.
//!
//! Destinations under the broker prefixes (`/queue/`, `/topic/`) are
//! broker-internal: publishes fan out to every current subscriber.
//! Destinations under the application prefix (`/app`) are routed to a
//! registered application handler instead.
use crate::config::BrokerSettings;
use crate::dispatch::DispatchPool;
use crate::error::AppError;
use crate::metrics as keys;
use async_trait::async_trait;
use dashmap::DashMap;
use doge_common::ServerFrame;
use metrics::counter;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifies one connected client (WebSocket or fallback session)
pub type ClientId = Uuid;

/// How a destination string is routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationKind {
    /// Routed to an application handler (`/app/...`)
    Application,
    /// Broker-internal fan-out (`/queue/...`, `/topic/...`)
    Broker,
    /// No matching prefix
    Unknown,
}

struct Subscriber {
    client_id: ClientId,
    tx: mpsc::Sender<ServerFrame>,
}

/// Message broker with prefix-based routing and bounded fan-out.
pub struct Broker {
    settings: BrokerSettings,
    subscriptions: DashMap<String, Vec<Subscriber>>,
    dispatch: DispatchPool,
}

impl Broker {
    pub fn new(settings: BrokerSettings, dispatch: DispatchPool) -> Self {
        Self {
            settings,
            subscriptions: DashMap::new(),
            dispatch,
        }
    }

    /// Classify a destination against the configured prefixes
    pub fn classify(&self, destination: &str) -> DestinationKind {
        if destination.starts_with(&self.settings.application_prefix) {
            return DestinationKind::Application;
        }
        if self
            .settings
            .broker_prefixes
            .iter()
            .any(|prefix| destination.starts_with(prefix.as_str()))
        {
            return DestinationKind::Broker;
        }
        DestinationKind::Unknown
    }

    /// Register a client's channel on a broker destination
    pub fn subscribe(
        &self,
        destination: &str,
        client_id: ClientId,
        tx: mpsc::Sender<ServerFrame>,
    ) -> Result<(), AppError> {
        if self.classify(destination) != DestinationKind::Broker {
            return Err(AppError::InvalidDestination(destination.to_string()));
        }
        let mut subscribers = self.subscriptions.entry(destination.to_string()).or_default();
        // resubscribing replaces the previous channel
        subscribers.retain(|s| s.client_id != client_id);
        subscribers.push(Subscriber { client_id, tx });
        Ok(())
    }

    /// Drop one subscription
    pub fn unsubscribe(&self, destination: &str, client_id: ClientId) {
        if let Some(mut subscribers) = self.subscriptions.get_mut(destination) {
            subscribers.retain(|s| s.client_id != client_id);
        }
    }

    /// Drop every subscription a client holds, used on disconnect
    pub fn unsubscribe_all(&self, client_id: ClientId) {
        for mut entry in self.subscriptions.iter_mut() {
            entry.value_mut().retain(|s| s.client_id != client_id);
        }
    }

    /// Number of current subscribers on a destination
    pub fn subscriber_count(&self, destination: &str) -> usize {
        self.subscriptions
            .get(destination)
            .map_or(0, |subscribers| subscribers.len())
    }

    /// Fan a payload out to every current subscriber of a broker
    /// destination. Each send goes through the bounded dispatch pool; a
    /// closed client channel is skipped silently.
    pub async fn publish(&self, destination: &str, body: Value) -> Result<(), AppError> {
        if self.classify(destination) != DestinationKind::Broker {
            return Err(AppError::InvalidDestination(destination.to_string()));
        }
        counter!(keys::BROKER_PUBLISH).increment(1);

        // snapshot under the shard lock, send outside it
        let targets: Vec<mpsc::Sender<ServerFrame>> = self
            .subscriptions
            .get(destination)
            .map(|subscribers| subscribers.iter().map(|s| s.tx.clone()).collect())
            .unwrap_or_default();

        for tx in targets {
            counter!(keys::BROKER_FANOUT).increment(1);
            let frame = ServerFrame::Message {
                destination: destination.to_string(),
                body: body.clone(),
            };
            self.dispatch
                .submit(async move {
                    let _ = tx.send(frame).await;
                })
                .await;
        }
        Ok(())
    }
}

/// Handler for one application destination.
#[async_trait]
pub trait AppHandler: Send + Sync {
    async fn handle(&self, body: Value, broker: &Broker) -> Result<(), AppError>;
}

/// Route table for application-bound destinations, keyed by the full
/// destination path (e.g. `/app/ping`). Built imperatively during startup.
#[derive(Default)]
pub struct AppRouter {
    routes: DashMap<String, Arc<dyn AppHandler>>,
}

impl AppRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an application destination
    pub fn route(&self, destination: impl Into<String>, handler: Arc<dyn AppHandler>) {
        self.routes.insert(destination.into(), handler);
    }

    /// Invoke the handler registered for `destination`
    pub async fn dispatch(
        &self,
        destination: &str,
        body: Value,
        broker: &Broker,
    ) -> Result<(), AppError> {
        let handler = self
            .routes
            .get(destination)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AppError::InvalidDestination(destination.to_string()))?;
        handler.handle(body, broker).await
    }
}
