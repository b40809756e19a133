//! Event subscription and publishing.
//!
//! A subscription is keyed by (event type, subscriber identity). Every
//! subscribe first retracts the previous subscription for that key, awaiting
//! the unsubscribe before sending the new subscription.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use config::ClientConfig;
use tracing::{debug, info};

use crate::{
    error::{ClientError, ClientResult},
    identity::Identity,
    keys::KeyMaterial,
    models::{EventPublishRequest, SubscriptionRequest, SystemDescriptor, UnsubscribeRequest},
    time::{Clock, SystemClock, format_timestamp},
    transport::Transport,
};

/// Optional narrowing of a subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub metadata: Option<HashMap<String, String>>,
    /// Only deliver events whose metadata matches `metadata`.
    pub match_metadata: bool,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Joins `base` and `path` with exactly one `/`. One leading slash is
/// dropped from `path` and one trailing slash from `base`.
pub fn notification_uri(base: &str, path: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{base}/{path}")
}

#[derive(Debug, Clone)]
pub struct EventClient {
    identity: Identity,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
}

impl EventClient {
    pub fn new(config: Arc<ClientConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            identity: Identity::new(config),
            transport,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_key_material(mut self, keys: Arc<dyn KeyMaterial>) -> Self {
        self.identity = self.identity.with_key_material(keys);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Subscribe to every event in `events` (event name -> relative
    /// notification path), one after another.
    pub async fn subscribe(
        &self,
        events: &BTreeMap<String, String>,
        providers: Option<&[SystemDescriptor]>,
    ) -> ClientResult<()> {
        for (event_type, path) in events {
            self.subscribe_event(event_type, path, providers).await?;
        }
        Ok(())
    }

    /// Subscribe to the events configured under `events.subscriber`.
    pub async fn subscribe_configured(
        &self,
        providers: Option<&[SystemDescriptor]>,
    ) -> ClientResult<()> {
        let events = &self.identity.config().events().subscriber;
        self.subscribe(events, providers).await
    }

    pub async fn subscribe_event(
        &self,
        event_type: &str,
        path: &str,
        providers: Option<&[SystemDescriptor]>,
    ) -> ClientResult<()> {
        self.subscribe_filtered(event_type, path, &SubscriptionFilter::default(), providers)
            .await
    }

    /// Replace any existing subscription for `event_type` with a new one.
    ///
    /// Only a [`ClientError::NotFound`] from the preliminary unsubscribe is
    /// ignored; any other error aborts before subscribing.
    pub async fn subscribe_filtered(
        &self,
        event_type: &str,
        path: &str,
        filter: &SubscriptionFilter,
        providers: Option<&[SystemDescriptor]>,
    ) -> ClientResult<()> {
        let request = self.subscription_request(event_type, path, filter, providers)?;

        match self.unsubscribe(event_type).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                debug!(event_type = %request.event_type, "no previous subscription to replace");
            }
            Err(err) => return Err(err),
        }

        self.transport.subscribe(&request).await?;
        info!(
            event_type = %request.event_type,
            notify_uri = %request.notify_uri,
            "subscribed"
        );
        Ok(())
    }

    /// Retract this client's subscription to `event_type`. The platform's
    /// [`ClientError::NotFound`] reaches the caller.
    pub async fn unsubscribe(&self, event_type: &str) -> ClientResult<()> {
        let system = self.identity.config().system();
        let request = UnsubscribeRequest {
            event_type: event_type.to_uppercase(),
            system_name: system.name.clone(),
            address: system.address.clone(),
            port: system.port,
        };
        self.transport.unsubscribe(&request).await
    }

    /// Publish one event stamped with the current UTC time. Not retried.
    pub async fn publish(
        &self,
        event_type: &str,
        metadata: HashMap<String, String>,
        payload: impl Into<String>,
    ) -> ClientResult<()> {
        let request = EventPublishRequest {
            event_type: event_type.to_uppercase(),
            source: self.identity.tls_system()?,
            meta_data: metadata,
            payload: payload.into(),
            time_stamp: format_timestamp(self.clock.now()),
        };
        debug!(
            event_type = %request.event_type,
            time_stamp = %request.time_stamp,
            "publishing event"
        );
        self.transport.publish(&request).await
    }

    /// Configured URI for `key`, from the publisher or the subscriber map.
    pub fn configured_event(&self, key: &str, is_publisher: bool) -> Option<&str> {
        self.configured_events(is_publisher)
            .get(key)
            .map(String::as_str)
    }

    pub fn configured_events(&self, is_publisher: bool) -> &BTreeMap<String, String> {
        let events = self.identity.config().events();
        if is_publisher {
            &events.publisher
        } else {
            &events.subscriber
        }
    }

    fn subscription_request(
        &self,
        event_type: &str,
        path: &str,
        filter: &SubscriptionFilter,
        providers: Option<&[SystemDescriptor]>,
    ) -> ClientResult<SubscriptionRequest> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            if start > end {
                return Err(ClientError::Validation(format!(
                    "subscription window starts ({start}) after it ends ({end})"
                )));
            }
        }
        let sources = providers
            .filter(|providers| !providers.is_empty())
            .map(|providers| {
                providers
                    .iter()
                    .map(SystemDescriptor::public_identity)
                    .collect::<BTreeSet<_>>()
            });
        let base = &self.identity.config().events().base_notification_uri;

        Ok(SubscriptionRequest {
            event_type: event_type.to_uppercase(),
            subscriber_system: self.identity.tls_system()?,
            filter_meta_data: filter.metadata.clone(),
            notify_uri: notification_uri(base, path),
            match_meta_data: filter.match_metadata,
            start_date: filter.start.map(format_timestamp),
            end_date: filter.end.map(format_timestamp),
            sources,
        })
    }
}
