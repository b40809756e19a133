//! A transport that prints requests instead of sending them.
//!
//! Nothing is remembered between calls, so removals always succeed.

use std::{io::Write, path::Path, sync::Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use beacon_client::{
    ClientError, ClientResult, EventPublishRequest, OrchestrationForm, OrchestrationResponse,
    ServiceRegistryRequest, ServiceRemovalRequest, SubscriptionRequest, Transport,
    UnsubscribeRequest,
};
use serde::Serialize;
use tracing::debug;

#[derive(Debug)]
pub struct DryRunTransport<W> {
    out: Mutex<W>,
    orchestration: Option<OrchestrationResponse>,
}

impl DryRunTransport<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W> DryRunTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            orchestration: None,
        }
    }

    /// answer every orchestration with `response`
    pub fn with_orchestration_response(mut self, response: OrchestrationResponse) -> Self {
        self.orchestration = Some(response);
        self
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// load a canned orchestration answer from json
pub fn load_response<P: AsRef<Path>>(path: P) -> Result<OrchestrationResponse> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read orchestration response at {}", path.display()))?;
    serde_json::from_str(&input)
        .with_context(|| format!("invalid orchestration response in {}", path.display()))
}

impl<W: Write> DryRunTransport<W> {
    fn print<T: Serialize>(&self, operation: &str, request: &T) -> ClientResult<()> {
        let body = serde_json::to_string_pretty(request)
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| ClientError::Transport("output lock poisoned".into()))?;
        writeln!(out, ">>> {operation}\n{body}")
            .map_err(|err| ClientError::Transport(err.to_string()))
    }
}

#[async_trait]
impl<W> Transport for DryRunTransport<W>
where
    W: Write + Send + std::fmt::Debug + 'static,
{
    async fn register_service(&self, request: &ServiceRegistryRequest) -> ClientResult<()> {
        self.print("register", request)
    }

    async fn unregister_service(&self, request: &ServiceRemovalRequest) -> ClientResult<()> {
        self.print("unregister", request)
    }

    async fn orchestrate(
        &self,
        form: &OrchestrationForm,
    ) -> ClientResult<Option<OrchestrationResponse>> {
        self.print("orchestrate", form)?;
        debug!(answered = self.orchestration.is_some(), "dry-run orchestration");
        Ok(self.orchestration.clone())
    }

    async fn subscribe(&self, request: &SubscriptionRequest) -> ClientResult<()> {
        self.print("subscribe", request)
    }

    async fn unsubscribe(&self, request: &UnsubscribeRequest) -> ClientResult<()> {
        self.print("unsubscribe", request)
    }

    async fn publish(&self, request: &EventPublishRequest) -> ClientResult<()> {
        self.print("publish", request)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use beacon_client::{EventClient, Method, OrchestrationClient, RegistrationClient};
    use config::ClientConfig;

    use super::*;

    fn config() -> Arc<ClientConfig> {
        let yaml = "
system: {name: thermometer, address: 10.0.0.5, port: 8443}
events:
  base_notification_uri: http://127.0.0.1:8443/notify
";
        Arc::new(ClientConfig::parse_str(yaml).unwrap())
    }

    fn output(transport: Arc<DryRunTransport<Vec<u8>>>) -> String {
        let transport = Arc::try_unwrap(transport).unwrap();
        String::from_utf8(transport.into_inner()).unwrap()
    }

    #[tokio::test]
    async fn test_prints_requests() {
        let transport = Arc::new(DryRunTransport::new(Vec::new()));
        let events = EventClient::new(config(), transport.clone());
        events
            .subscribe_event("temp-updated", "/events/temp", None)
            .await
            .unwrap();
        events
            .publish("temp-updated", Default::default(), "21.5")
            .await
            .unwrap();
        drop(events);

        let out = output(transport);
        let unsubscribe = out.find(">>> unsubscribe").unwrap();
        let subscribe = out.find(">>> subscribe").unwrap();
        assert!(unsubscribe < subscribe);
        assert!(out.contains(r#""notifyUri": "http://127.0.0.1:8443/notify/events/temp""#));
        assert!(out.contains(r#""eventType": "TEMP-UPDATED""#));
        assert!(out.contains(">>> publish"));
    }

    #[tokio::test]
    async fn test_removals_succeed() {
        let transport = Arc::new(DryRunTransport::new(Vec::new()));
        let registry = RegistrationClient::new(config(), transport.clone());
        registry.unregister("temperature").await.unwrap();
        drop(registry);

        let out = output(transport);
        assert!(out.starts_with(">>> unregister\n"));
        assert!(out.contains(r#""serviceDefinition": "temperature""#));
        assert!(out.contains(r#""address": "10.0.0.5""#));
    }

    #[tokio::test]
    async fn test_orchestration_answers_from_file() {
        let path = std::env::temp_dir().join(format!("beacon-orch-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"response": [{
                "provider": {"systemName": "thermo-1", "address": "10.0.0.7", "port": 9001},
                "service": {"serviceDefinition": "temperature"},
                "serviceUri": "/temperature",
                "secure": "NOT_SECURE",
                "interfaces": [{"interfaceName": "HTTP-INSECURE-JSON"}]
            }]}"#,
        )
        .unwrap();
        let response = load_response(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let transport =
            Arc::new(DryRunTransport::new(Vec::new()).with_orchestration_response(response));
        let client = OrchestrationClient::new(config(), transport.clone());
        let results = client
            .orchestrate("temperature", "HTTP-INSECURE-JSON", &Method::GET, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        client.validate_result(&results[0], "Temperature").unwrap();
        drop(client);
        assert!(output(transport).contains(">>> orchestrate"));
    }

    #[tokio::test]
    async fn test_unanswered_orchestration_is_unavailable() {
        let transport = Arc::new(DryRunTransport::new(Vec::<u8>::new()));
        let err = OrchestrationClient::new(config(), transport)
            .orchestrate("temperature", "HTTP-INSECURE-JSON", &Method::GET, None)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_load_response_missing_file() {
        assert!(load_response("/nonexistent/beacon-orch.json").is_err());
    }
}
