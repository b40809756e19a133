//! Request and response shapes exchanged with the platform.
//!
//! Field names serialize in the platform's camelCase vocabulary. Exact wire
//! encoding belongs to the [`Transport`](crate::transport::Transport)
//! implementation; these types only fix the content of each request.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use http::Method;
use serde::{Deserialize, Serialize};

/// Metadata key carrying the HTTP method a service expects.
pub const HTTP_METHOD_KEY: &str = "http-method";

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// A participant on the platform: this client or a remote provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemDescriptor {
    pub system_name: String,
    pub address: String,
    pub port: u16,
    /// Encoded public key, present only for secured systems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_info: Option<String>,
}

impl SystemDescriptor {
    pub fn new(system_name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            system_name: system_name.into(),
            address: address.into(),
            port,
            authentication_info: None,
        }
    }

    /// Name, address and port only. Credentials are never forwarded.
    pub fn public_identity(&self) -> Self {
        Self::new(self.system_name.clone(), self.address.clone(), self.port)
    }
}

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

/// Transport security tier a service is offered or requested with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceSecurity {
    NotSecure,
    Certificate,
    Token,
}

impl std::fmt::Display for ServiceSecurity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceSecurity::NotSecure => write!(f, "NOT_SECURE"),
            ServiceSecurity::Certificate => write!(f, "CERTIFICATE"),
            ServiceSecurity::Token => write!(f, "TOKEN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Service advertisement submitted to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRegistryRequest {
    pub service_definition: String,
    pub provider_system: SystemDescriptor,
    pub service_uri: String,
    pub secure: ServiceSecurity,
    pub metadata: HashMap<String, String>,
    pub interfaces: Vec<String>,
}

/// Removal of one advertised service, keyed by definition and provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRemovalRequest {
    pub service_definition: String,
    pub system_name: String,
    pub address: String,
    pub port: u16,
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Inclusive version window a provider must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRange {
    #[serde(rename = "minVersionRequirement")]
    pub min: u32,
    #[serde(rename = "maxVersionRequirement")]
    pub max: u32,
}

/// What the client is looking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQuery {
    pub service_definition_requirement: String,
    pub interface_requirements: Vec<String>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionRange>,
    pub metadata_requirements: HashMap<String, String>,
    pub security_requirements: Vec<ServiceSecurity>,
}

/// Orchestration policy toggles understood by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrchestrationFlag {
    Matchmaking,
    OverrideStore,
    MetadataSearch,
    EnableInterCloud,
    #[serde(rename = "enableQoS")]
    EnableQos,
    ExternalServiceRequest,
    OnlyPreferred,
    TriggerInterCloud,
    PingProviders,
}

/// Explicitly set flags. A flag that is absent keeps the platform default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrchestrationFlags(BTreeMap<OrchestrationFlag, bool>);

impl OrchestrationFlags {
    pub fn set(&mut self, flag: OrchestrationFlag, value: bool) {
        self.0.insert(flag, value);
    }

    pub fn get(&self, flag: OrchestrationFlag) -> Option<bool> {
        self.0.get(&flag).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&config::OrchestrationFlags> for OrchestrationFlags {
    fn from(cfg: &config::OrchestrationFlags) -> Self {
        use OrchestrationFlag::*;
        Self(BTreeMap::from([
            (Matchmaking, cfg.matchmaking),
            (OverrideStore, cfg.override_store),
            (MetadataSearch, cfg.metadata_search),
            (EnableInterCloud, cfg.enable_inter_cloud),
            (EnableQos, cfg.enable_qos),
            (ExternalServiceRequest, cfg.external_service_request),
            (OnlyPreferred, cfg.only_preferred),
            (TriggerInterCloud, cfg.trigger_inter_cloud),
            (PingProviders, cfg.ping_providers),
        ]))
    }
}

/// Full orchestration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationForm {
    pub requester_system: SystemDescriptor,
    pub requested_service: ServiceQuery,
    pub orchestration_flags: OrchestrationFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub service_definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInterface {
    pub interface_name: String,
}

/// One matched provider, as ranked by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    pub provider: SystemDescriptor,
    pub service: ServiceDefinition,
    #[serde(default)]
    pub service_uri: String,
    pub secure: ServiceSecurity,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub interfaces: Vec<ServiceInterface>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationResponse {
    #[serde(default)]
    pub response: Vec<OrchestrationResult>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Standing interest in an event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub event_type: String,
    pub subscriber_system: SystemDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_meta_data: Option<HashMap<String, String>>,
    pub notify_uri: String,
    pub match_meta_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<BTreeSet<SystemDescriptor>>,
}

/// Identifies the subscription to retract: (event type, subscriber identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeRequest {
    pub event_type: String,
    pub system_name: String,
    pub address: String,
    pub port: u16,
}

/// One published event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPublishRequest {
    pub event_type: String,
    pub source: SystemDescriptor,
    pub meta_data: HashMap<String, String>,
    pub payload: String,
    pub time_stamp: String,
}

/// Default metadata (`http-method`) overlaid with caller metadata; caller
/// values win on key collision.
pub fn request_metadata(
    http_method: Option<&Method>,
    metadata: Option<&HashMap<String, String>>,
) -> HashMap<String, String> {
    let mut merged = HashMap::new();
    if let Some(method) = http_method {
        merged.insert(HTTP_METHOD_KEY.to_owned(), method.as_str().to_owned());
    }
    if let Some(metadata) = metadata {
        merged.extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_metadata_caller_wins() {
        let caller = HashMap::from([
            ("unit".to_owned(), "celsius".to_owned()),
            (HTTP_METHOD_KEY.to_owned(), "PATCH".to_owned()),
        ]);
        let merged = request_metadata(Some(&Method::GET), Some(&caller));
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[HTTP_METHOD_KEY], "PATCH");
        assert_eq!(merged["unit"], "celsius");

        let merged = request_metadata(Some(&Method::POST), None);
        assert_eq!(merged[HTTP_METHOD_KEY], "POST");

        assert!(request_metadata(None, None).is_empty());
    }

    #[test]
    fn test_public_identity_drops_credentials() {
        let mut system = SystemDescriptor::new("provider", "10.0.0.7", 9001);
        system.authentication_info = Some("MIIBIjAN".into());
        let public = system.public_identity();
        assert_eq!(public.system_name, "provider");
        assert_eq!(public.port, 9001);
        assert!(public.authentication_info.is_none());
    }

    #[test]
    fn test_flags_from_config() {
        let flags = OrchestrationFlags::from(&config::OrchestrationFlags::default());
        assert_eq!(flags.len(), 9);
        assert_eq!(flags.get(OrchestrationFlag::OverrideStore), Some(true));
        assert_eq!(flags.get(OrchestrationFlag::Matchmaking), Some(false));
        assert_eq!(flags.get(OrchestrationFlag::PingProviders), Some(true));

        let json = serde_json::to_value(&flags).unwrap();
        assert_eq!(json["enableQoS"], false);
        assert_eq!(json["metadataSearch"], true);
        assert_eq!(json["triggerInterCloud"], false);
    }

    #[test]
    fn test_absent_flag_is_unset() {
        let mut flags = OrchestrationFlags::default();
        assert!(flags.is_empty());
        flags.set(OrchestrationFlag::OnlyPreferred, true);
        assert_eq!(flags.get(OrchestrationFlag::OnlyPreferred), Some(true));
        assert_eq!(flags.get(OrchestrationFlag::EnableQos), None);
    }

    #[test]
    fn test_security_display_and_serde() {
        assert_eq!(ServiceSecurity::NotSecure.to_string(), "NOT_SECURE");
        assert_eq!(
            serde_json::to_string(&ServiceSecurity::Certificate).unwrap(),
            "\"CERTIFICATE\""
        );
        assert_eq!(
            serde_json::from_str::<ServiceSecurity>("\"TOKEN\"").unwrap(),
            ServiceSecurity::Token
        );
    }

    #[test]
    fn test_query_version_is_flattened() {
        let query = ServiceQuery {
            service_definition_requirement: "temperature".into(),
            interface_requirements: vec!["HTTP-INSECURE-JSON".into()],
            version: Some(VersionRange { min: 1, max: 3 }),
            metadata_requirements: HashMap::new(),
            security_requirements: vec![ServiceSecurity::NotSecure],
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["minVersionRequirement"], 1);
        assert_eq!(json["maxVersionRequirement"], 3);
        assert_eq!(json["securityRequirements"][0], "NOT_SECURE");
    }

    #[test]
    fn test_orchestration_response_decodes_platform_json() {
        let json = r#"{
            "response": [{
                "provider": {"id": 7, "systemName": "thermo-1", "address": "10.0.0.7", "port": 9001},
                "service": {"id": 3, "serviceDefinition": "temperature"},
                "serviceUri": "/temperature",
                "secure": "NOT_SECURE",
                "metadata": {"http-method": "GET"},
                "interfaces": [{"id": 1, "interfaceName": "HTTP-INSECURE-JSON"}],
                "version": 1
            }]
        }"#;
        let response: OrchestrationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.response.len(), 1);
        let result = &response.response[0];
        assert_eq!(result.provider.system_name, "thermo-1");
        assert_eq!(result.service.service_definition, "temperature");
        assert_eq!(result.interfaces[0].interface_name, "HTTP-INSECURE-JSON");
        assert_eq!(result.version, Some(1));
    }
}
