use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, de};

/// top-level config type
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    pub system: System,
    #[serde(default)]
    pub security: Security,
    #[serde(default)]
    pub orchestration: Orchestration,
    #[serde(default)]
    pub events: Events,
}

/// identity this client advertises to the platform
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct System {
    pub name: String,
    /// `0.0.0.0` means "every advertisable address on this host"
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub interface: Interfaces,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Interfaces {
    #[serde(default = "default_secure_interface")]
    pub secure: String,
    #[serde(default = "default_insecure_interface")]
    pub insecure: String,
}

impl Default for Interfaces {
    fn default() -> Self {
        Self {
            secure: default_secure_interface(),
            insecure: default_insecure_interface(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Security {
    #[serde(default)]
    pub ssl_enabled: bool,
    #[serde(default)]
    pub token_filter_enabled: bool,
    /// DER or PEM encoded public key attached as authentication info
    pub public_key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Orchestration {
    #[serde(default)]
    pub max_retry: u32,
    /// seconds between attempts, accepts "5", "5s", "2m", "1h"
    #[serde(
        default = "default_retry_wait",
        deserialize_with = "deserialize_duration"
    )]
    pub retry_wait: u64,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub flags: OrchestrationFlags,
}

impl Default for Orchestration {
    fn default() -> Self {
        Self {
            max_retry: 0,
            retry_wait: default_retry_wait(),
            version: Version::default(),
            flags: OrchestrationFlags::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Version {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub min: u32,
    #[serde(default = "default_max_version")]
    pub max: u32,
}

impl Default for Version {
    fn default() -> Self {
        Self {
            enabled: false,
            min: 0,
            max: default_max_version(),
        }
    }
}

/// orchestration policy toggles, passed through to the orchestrator untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrchestrationFlags {
    #[serde(default)]
    pub matchmaking: bool,
    #[serde(default = "default_true")]
    pub override_store: bool,
    #[serde(default = "default_true")]
    pub metadata_search: bool,
    #[serde(default)]
    pub enable_inter_cloud: bool,
    #[serde(default)]
    pub enable_qos: bool,
    #[serde(default)]
    pub external_service_request: bool,
    #[serde(default)]
    pub only_preferred: bool,
    #[serde(default)]
    pub trigger_inter_cloud: bool,
    #[serde(default = "default_true")]
    pub ping_providers: bool,
}

impl Default for OrchestrationFlags {
    fn default() -> Self {
        Self {
            matchmaking: false,
            override_store: true,
            metadata_search: true,
            enable_inter_cloud: false,
            enable_qos: false,
            external_service_request: false,
            only_preferred: false,
            trigger_inter_cloud: false,
            ping_providers: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Events {
    #[serde(default)]
    pub base_notification_uri: String,
    /// event name -> uri for events this client publishes
    #[serde(default)]
    pub publisher: BTreeMap<String, String>,
    /// event name -> relative notification path for events this client consumes
    #[serde(default)]
    pub subscriber: BTreeMap<String, String>,
}

pub const DEFAULT_SECURE_INTERFACE: &str = "HTTP-SECURE-JSON";
pub const DEFAULT_INSECURE_INTERFACE: &str = "HTTP-INSECURE-JSON";

pub fn default_secure_interface() -> String {
    DEFAULT_SECURE_INTERFACE.to_owned()
}

pub fn default_insecure_interface() -> String {
    DEFAULT_INSECURE_INTERFACE.to_owned()
}

pub const fn default_retry_wait() -> u64 {
    1
}

pub const fn default_max_version() -> u32 {
    100
}

pub const fn default_true() -> bool {
    true
}

/// Parse a duration string with optional time units
/// Accepts: "30", "30s", "5m", "1h"
/// If no unit is specified, assumes seconds
fn parse_duration(s: &str) -> Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(anyhow::Error::msg("empty duration string"));
    }

    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    // split units
    let (num, unit) = s.split_at(end);
    let num = num.parse::<u64>().context("invalid number")?;

    let num_seconds = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        other => anyhow::bail!(
            "unknown time unit '{}', only 'h', 'm', or 's' are supported",
            other
        ),
    };

    num.checked_mul(num_seconds)
        .context("duration value overflow")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WaitDuration {
    Seconds(u64),
    String(String),
}

fn deserialize_duration<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match WaitDuration::deserialize(de)? {
        WaitDuration::Seconds(secs) => Ok(secs),
        WaitDuration::String(s) => parse_duration(&s).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub static EXAMPLE: &str = include_str!("../../../../example.yaml");

    // test we can encode/decode example file
    #[test]
    fn test_example() {
        let cfg: crate::wire::Config = serde_yaml::from_str(EXAMPLE).unwrap();
        assert_eq!(cfg.system.name, "thermometer");
        assert_eq!(cfg.orchestration.retry_wait, 5);
        // back to the yaml
        let s = serde_yaml::to_string(&cfg).unwrap();
        let again: crate::wire::Config = serde_yaml::from_str(&s).unwrap();
        assert_eq!(cfg, again);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30").unwrap(), 30);
        assert_eq!(parse_duration("1s").unwrap(), 1);
        assert_eq!(parse_duration("0s").unwrap(), 0);
        assert_eq!(parse_duration("2m").unwrap(), 120);
        assert_eq!(parse_duration("1h").unwrap(), 3600);
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("5mins").is_err());
        assert!(parse_duration("s").is_err());
    }

    #[test]
    fn test_minimal_config_defaults() {
        let yaml = "
system:
  name: sensor
  address: 10.0.0.5
  port: 8080
";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.system.interface, Interfaces::default());
        assert_eq!(cfg.security, Security::default());
        assert_eq!(cfg.orchestration, Orchestration::default());
        assert_eq!(cfg.orchestration.retry_wait, 1);
        assert!(cfg.orchestration.flags.override_store);
        assert!(cfg.orchestration.flags.metadata_search);
        assert!(cfg.orchestration.flags.ping_providers);
        assert!(!cfg.orchestration.flags.matchmaking);
        assert!(cfg.events.subscriber.is_empty());
    }

    #[test]
    fn test_retry_wait_forms() {
        let json = r#"{"max_retry": 3, "retry_wait": "2m"}"#;
        let orch: Orchestration = serde_json::from_str(json).unwrap();
        assert_eq!(orch.max_retry, 3);
        assert_eq!(orch.retry_wait, 120);

        let json = r#"{"retry_wait": 7}"#;
        let orch: Orchestration = serde_json::from_str(json).unwrap();
        assert_eq!(orch.retry_wait, 7);

        let json = r#"{"retry_wait": "7 days"}"#;
        assert!(serde_json::from_str::<Orchestration>(json).is_err());
    }
}
