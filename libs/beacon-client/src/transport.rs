//! The network seam.
//!
//! Implementations own wire encoding, HTTP verbs and TLS. They report a
//! missing remote record as [`ClientError::NotFound`](crate::ClientError) and
//! any other failure as `ClientError::Transport`.

use async_trait::async_trait;

use crate::{
    error::ClientResult,
    models::{
        EventPublishRequest, OrchestrationForm, OrchestrationResponse, ServiceRegistryRequest,
        ServiceRemovalRequest, SubscriptionRequest, UnsubscribeRequest,
    },
};

#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug + 'static {
    async fn register_service(&self, request: &ServiceRegistryRequest) -> ClientResult<()>;

    async fn unregister_service(&self, request: &ServiceRemovalRequest) -> ClientResult<()>;

    /// `Ok(None)` when the orchestrator answered without a body.
    async fn orchestrate(
        &self,
        form: &OrchestrationForm,
    ) -> ClientResult<Option<OrchestrationResponse>>;

    async fn subscribe(&self, request: &SubscriptionRequest) -> ClientResult<()>;

    async fn unsubscribe(&self, request: &UnsubscribeRequest) -> ClientResult<()>;

    async fn publish(&self, request: &EventPublishRequest) -> ClientResult<()>;
}
