//! Provider discovery through the platform orchestrator.

use std::{collections::HashMap, sync::Arc, time::Duration};

use config::{ClientConfig, OrchestrationConfig};
use http::Method;
use tracing::{debug, warn};

use crate::{
    error::{ClientError, ClientResult},
    identity::Identity,
    keys::KeyMaterial,
    models::{
        OrchestrationFlags, OrchestrationForm, OrchestrationResult, ServiceQuery, ServiceSecurity,
        VersionRange, request_metadata,
    },
    transport::Transport,
};

/// Bounded retry for empty orchestration answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts; 0 still makes one.
    pub max_retry: u32,
    /// Fixed delay between attempts.
    pub retry_wait: Duration,
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_retry.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry: 0,
            retry_wait: Duration::from_secs(1),
        }
    }
}

impl From<&OrchestrationConfig> for RetryPolicy {
    fn from(cfg: &OrchestrationConfig) -> Self {
        Self {
            max_retry: cfg.max_retry,
            retry_wait: cfg.retry_wait,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestrationClient {
    identity: Identity,
    transport: Arc<dyn Transport>,
    retry_policy: RetryPolicy,
}

impl OrchestrationClient {
    pub fn new(config: Arc<ClientConfig>, transport: Arc<dyn Transport>) -> Self {
        let retry_policy = RetryPolicy::from(config.orchestration());
        Self {
            identity: Identity::new(config),
            transport,
            retry_policy,
        }
    }

    /// Create a client with a retry policy other than the configured one.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_key_material(mut self, keys: Arc<dyn KeyMaterial>) -> Self {
        self.identity = self.identity.with_key_material(keys);
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Ask the orchestrator for providers of `service_definition` reachable
    /// over `interface_requirement`.
    ///
    /// Empty or absent answers are retried up to the retry budget, then
    /// reported as [`ClientError::Unavailable`]. Transport errors are not
    /// retried. Results keep the orchestrator's ranking.
    pub async fn orchestrate(
        &self,
        service_definition: &str,
        interface_requirement: &str,
        http_method: &Method,
        metadata: Option<&HashMap<String, String>>,
    ) -> ClientResult<Vec<OrchestrationResult>> {
        let form = self.build_form(
            service_definition,
            interface_requirement,
            http_method,
            metadata,
        )?;

        let attempts = self.retry_policy.attempts();
        for attempt in 1..=attempts {
            debug!(
                service_definition,
                attempt, attempts, "requesting orchestration"
            );
            match self.transport.orchestrate(&form).await? {
                Some(response) if !response.response.is_empty() => {
                    debug!(
                        service_definition,
                        providers = response.response.len(),
                        "orchestration succeeded"
                    );
                    return Ok(response.response);
                }
                _ => {
                    warn!(
                        service_definition,
                        attempt, attempts, "orchestration response is empty or not available"
                    );
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.retry_policy.retry_wait).await;
            }
        }

        Err(ClientError::Unavailable { attempts })
    }

    /// Checks a result against what was asked for: same service definition
    /// and an interface matching the current security mode, both compared
    /// case-insensitively.
    pub fn validate_result(
        &self,
        result: &OrchestrationResult,
        service_definition: &str,
    ) -> ClientResult<()> {
        if !result
            .service
            .service_definition
            .eq_ignore_ascii_case(service_definition)
        {
            return Err(ClientError::Validation(format!(
                "requested service {service_definition} but orchestrated {}",
                result.service.service_definition
            )));
        }

        let expected = self
            .identity
            .selector()
            .select_interface(self.identity.config().security());
        if !result
            .interfaces
            .iter()
            .any(|i| i.interface_name.eq_ignore_ascii_case(&expected))
        {
            return Err(ClientError::Validation(format!(
                "orchestrated provider {} does not offer interface {expected}",
                result.provider.system_name
            )));
        }
        Ok(())
    }

    fn build_form(
        &self,
        service_definition: &str,
        interface_requirement: &str,
        http_method: &Method,
        metadata: Option<&HashMap<String, String>>,
    ) -> ClientResult<OrchestrationForm> {
        let orchestration = self.identity.config().orchestration();
        Ok(OrchestrationForm {
            requester_system: self.identity.tls_system()?,
            requested_service: ServiceQuery {
                service_definition_requirement: service_definition.to_owned(),
                interface_requirements: vec![interface_requirement.to_owned()],
                version: orchestration.version.map(|v| VersionRange {
                    min: v.min,
                    max: v.max,
                }),
                metadata_requirements: request_metadata(Some(http_method), metadata),
                security_requirements: vec![ServiceSecurity::NotSecure],
            },
            orchestration_flags: OrchestrationFlags::from(&orchestration.flags),
        })
    }
}
