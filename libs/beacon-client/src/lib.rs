//! # beacon-client
//!
//! Client-side protocol logic for joining a service-oriented platform:
//! discovering providers through the orchestrator, advertising services in
//! the registry, and exchanging events through the event broker.
//!
//! This library provides:
//! - **Security negotiation** ([`SecurityModeSelector`]) picking the security
//!   tag and interface name for each request.
//! - **Registration** ([`RegistrationClient`]) including fan-out over every
//!   local address when bound to the wildcard address.
//! - **Orchestration** ([`OrchestrationClient`]) with a bounded retry on
//!   empty answers and validation of returned providers.
//! - **Events** ([`EventClient`]) with idempotent re-subscription and UTC
//!   timestamped publishing.
//!
//! The network itself sits behind the [`Transport`] trait; this crate only
//! decides what to send and how to interpret the answer.

pub mod error;
pub mod events;
pub mod identity;
pub mod keys;
pub mod models;
pub mod nics;
pub mod orchestrator;
pub mod registry;
pub mod security;
pub mod senml;
pub mod time;
pub mod transport;

pub use error::{ClientError, ClientResult};
pub use events::{EventClient, SubscriptionFilter, notification_uri};
pub use identity::Identity;
pub use keys::{EncodedPublicKey, KeyMaterial};
pub use models::{
    EventPublishRequest, OrchestrationFlag, OrchestrationFlags, OrchestrationForm,
    OrchestrationResponse, OrchestrationResult, ServiceQuery, ServiceRegistryRequest,
    ServiceRemovalRequest, ServiceSecurity, SubscriptionRequest, SystemDescriptor,
    UnsubscribeRequest,
};
pub use nics::{InterfaceEnumerator, StaticInterfaces, SystemInterfaces};
pub use orchestrator::{OrchestrationClient, RetryPolicy};
pub use registry::{ExternalProvider, RegistrationClient, RegistrationReport};
pub use security::{SecurityMode, SecurityModeSelector};
pub use senml::SenML;
pub use time::{Clock, SystemClock};
pub use transport::Transport;

// Re-exported so callers can name HTTP methods without a direct dependency
pub use http::Method;
