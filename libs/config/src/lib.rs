use std::{
    collections::BTreeMap,
    net::IpAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use pnet::datalink::NetworkInterface;
use tracing::debug;

pub mod wire;

pub use wire::OrchestrationFlags;

/// client config, validated and immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    system: SystemConfig,
    security: SecurityConfig,
    orchestration: OrchestrationConfig,
    events: EventsConfig,
    path: Option<PathBuf>,
}

/// this client's own identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemConfig {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub secure_interface: String,
    pub insecure_interface: String,
}

impl SystemConfig {
    /// is the client bound to every local address?
    pub fn is_wildcard(&self) -> bool {
        is_wildcard(&self.address)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityConfig {
    pub ssl_enabled: bool,
    pub token_filter_enabled: bool,
    pub public_key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationConfig {
    pub max_retry: u32,
    pub retry_wait: Duration,
    /// `None` when version filtering is disabled
    pub version: Option<VersionWindow>,
    pub flags: OrchestrationFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionWindow {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsConfig {
    pub base_notification_uri: String,
    pub publisher: BTreeMap<String, String>,
    pub subscriber: BTreeMap<String, String>,
}

impl ClientConfig {
    pub fn system(&self) -> &SystemConfig {
        &self.system
    }
    pub fn security(&self) -> &SecurityConfig {
        &self.security
    }
    pub fn orchestration(&self) -> &OrchestrationConfig {
        &self.orchestration
    }
    pub fn events(&self) -> &EventsConfig {
        &self.events
    }
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// attempts to decode the config first as JSON, then YAML, finally erroring if neither work
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .with_context(|| format!("failed to find config at {}", &path.display()))?;
        let mut config = Self::parse_str(input)?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// attempts to decode the config first as JSON, then YAML, finally erroring if neither work
    pub fn parse_str<S: AsRef<str>>(s: S) -> Result<Self> {
        let config = match Self::json(s.as_ref()) {
            Ok(config) => config,
            Err(_err) => Self::yaml(s.as_ref())?,
        };
        debug!(?config);
        Ok(config)
    }

    pub fn yaml<S: AsRef<str>>(input: S) -> Result<Self> {
        Self::try_from(serde_yaml::from_str::<wire::Config>(input.as_ref())?)
    }

    pub fn json<S: AsRef<str>>(input: S) -> Result<Self> {
        Self::try_from(serde_json::from_str::<wire::Config>(input.as_ref())?)
    }
}

impl TryFrom<wire::Config> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(cfg: wire::Config) -> Result<Self> {
        let wire::Config {
            system,
            security,
            orchestration,
            events,
        } = cfg;

        if system.name.trim().is_empty() {
            bail!("system.name must not be empty");
        }
        if system.address.trim().is_empty() {
            bail!("system.address must not be empty");
        }
        if system.port == 0 {
            bail!("system.port must be non-zero");
        }
        if system.interface.secure.trim().is_empty() || system.interface.insecure.trim().is_empty()
        {
            bail!("system.interface names must not be empty");
        }
        let version = orchestration.version;
        if version.min > version.max {
            bail!(
                "orchestration.version.min ({}) is greater than max ({})",
                version.min,
                version.max
            );
        }

        Ok(Self {
            system: SystemConfig {
                name: system.name,
                address: system.address,
                port: system.port,
                secure_interface: system.interface.secure,
                insecure_interface: system.interface.insecure,
            },
            security: SecurityConfig {
                ssl_enabled: security.ssl_enabled,
                token_filter_enabled: security.token_filter_enabled,
                public_key_path: security.public_key_path,
            },
            orchestration: OrchestrationConfig {
                max_retry: orchestration.max_retry,
                retry_wait: Duration::from_secs(orchestration.retry_wait),
                version: version.enabled.then_some(VersionWindow {
                    min: version.min,
                    max: version.max,
                }),
                flags: orchestration.flags,
            },
            events: EventsConfig {
                base_notification_uri: events.base_notification_uri,
                publisher: events.publisher,
                subscriber: events.subscriber,
            },
            path: None,
        })
    }
}

/// is this the "bind to all interfaces" address?
pub fn is_wildcard(address: &str) -> bool {
    address
        .trim()
        .parse::<IpAddr>()
        .map(|ip| ip.is_unspecified())
        .unwrap_or(false)
}

/// Returns true for addresses nobody else can reach us on: unspecified,
/// loopback, broadcast, `169.x.x.x` and IPv6 link-local (`fe80::/10`).
/// IPv4-mapped IPv6 addresses are classified as their IPv4 form.
pub fn is_advertisable(ip: &IpAddr) -> bool {
    match ip.to_canonical() {
        IpAddr::V4(v4) => {
            !v4.is_unspecified() && !v4.is_loopback() && !v4.is_broadcast() && v4.octets()[0] != 169
        }
        IpAddr::V6(v6) => {
            !v6.is_unspecified() && !v6.is_loopback() && (v6.segments()[0] & 0xffc0) != 0xfe80
        }
    }
}

/// Rejects wildcard and link-local addresses. Host names are passed through
/// untouched, the platform resolves them.
pub fn is_link_local_or_meta(address: &str) -> bool {
    match address.trim().parse::<IpAddr>() {
        Ok(ip) => {
            let ip = ip.to_canonical();
            ip.is_unspecified() || (!is_advertisable(&ip) && !ip.is_loopback())
        }
        Err(_) => false,
    }
}

/// every address on an 'up', non-loopback interface that other systems can reach
pub fn advertisable_addresses() -> Vec<IpAddr> {
    let addrs = advertisable_from(pnet::datalink::interfaces());
    debug!(?addrs, "resolved advertisable addresses");
    addrs
}

fn advertisable_from(interfaces: Vec<NetworkInterface>) -> Vec<IpAddr> {
    interfaces
        .into_iter()
        .filter(|e| e.is_up() && !e.is_loopback())
        .flat_map(|e| e.ips.into_iter().map(|net| net.ip()))
        .filter(is_advertisable)
        .collect()
}

#[cfg(test)]
mod test {
    use std::net::IpAddr;

    use pnet::{datalink::NetworkInterface, ipnetwork::IpNetwork};

    use super::*;

    const IFF_UP: u32 = 0x1;
    const IFF_LOOPBACK: u32 = 0x8;

    static EXAMPLE: &str = include_str!("../../../example.yaml");

    fn mock_interface(name: &str, ips: &[(&str, u8)], flags: u32) -> NetworkInterface {
        NetworkInterface {
            name: name.to_string(),
            description: String::new(),
            index: 0,
            mac: None,
            ips: ips
                .iter()
                .map(|(ip, prefix)| IpNetwork::new(ip.parse::<IpAddr>().unwrap(), *prefix).unwrap())
                .collect(),
            flags,
        }
    }

    #[test]
    fn test_parse_example() {
        let cfg = ClientConfig::parse_str(EXAMPLE).unwrap();
        assert_eq!(cfg.system().name, "thermometer");
        assert!(cfg.system().is_wildcard());
        assert_eq!(cfg.system().port, 8443);
        assert_eq!(cfg.system().secure_interface, "HTTP-SECURE-JSON");
        assert_eq!(cfg.orchestration().max_retry, 3);
        assert_eq!(cfg.orchestration().retry_wait, Duration::from_secs(5));
        assert_eq!(cfg.orchestration().version, None);
        assert_eq!(
            cfg.events().subscriber.get("heater-state").map(String::as_str),
            Some("heater")
        );
        assert!(cfg.path().is_none());
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "system": {"name": "sensor", "address": "10.0.0.5", "port": 9000},
            "orchestration": {"version": {"enabled": true, "min": 2, "max": 4}}
        }"#;
        let cfg = ClientConfig::parse_str(json).unwrap();
        assert_eq!(cfg.system().address, "10.0.0.5");
        assert!(!cfg.system().is_wildcard());
        assert_eq!(
            cfg.orchestration().version,
            Some(VersionWindow { min: 2, max: 4 })
        );
    }

    #[test]
    fn test_invalid_configs() {
        let bad_version = "
system: {name: a, address: 10.0.0.1, port: 1}
orchestration:
  version: {enabled: true, min: 5, max: 1}
";
        assert!(ClientConfig::parse_str(bad_version).is_err());

        let empty_name = "system: {name: '', address: 10.0.0.1, port: 1}";
        assert!(ClientConfig::parse_str(empty_name).is_err());

        let zero_port = "system: {name: a, address: 10.0.0.1, port: 0}";
        assert!(ClientConfig::parse_str(zero_port).is_err());

        let empty_interface = "
system:
  name: a
  address: 10.0.0.1
  port: 1
  interface: {secure: '', insecure: x}
";
        assert!(ClientConfig::parse_str(empty_interface).is_err());
    }

    #[test]
    fn test_wildcard() {
        assert!(is_wildcard("0.0.0.0"));
        assert!(is_wildcard("::"));
        assert!(!is_wildcard("10.0.0.5"));
        assert!(!is_wildcard("my-host.local"));
    }

    #[test]
    fn test_link_local_or_meta() {
        assert!(is_link_local_or_meta("0.0.0.0"));
        assert!(is_link_local_or_meta("169.254.3.4"));
        assert!(is_link_local_or_meta("169.1.2.3"));
        assert!(is_link_local_or_meta("fe80::1"));
        assert!(is_link_local_or_meta("255.255.255.255"));
        assert!(!is_link_local_or_meta("10.0.0.5"));
        assert!(!is_link_local_or_meta("127.0.0.1"));
        assert!(!is_link_local_or_meta("2001:db8::1"));
        assert!(!is_link_local_or_meta("provider.example.com"));
    }

    #[test]
    fn test_link_local_ipv4_mapped() {
        assert!(is_link_local_or_meta("::ffff:169.254.3.4"));
        assert!(is_link_local_or_meta("::ffff:0.0.0.0"));
        assert!(!is_link_local_or_meta("::ffff:127.0.0.1"));
        assert!(!is_link_local_or_meta("::ffff:10.0.0.5"));
        assert!(!is_advertisable(&"::ffff:169.254.10.1".parse().unwrap()));
    }

    #[test]
    fn test_advertisable_from() {
        let interfaces = vec![
            mock_interface("lo", &[("127.0.0.1", 8), ("::1", 128)], IFF_UP | IFF_LOOPBACK),
            mock_interface("eth0", &[("10.0.0.5", 24), ("fe80::1", 64)], IFF_UP),
            mock_interface("eth1", &[("192.168.1.9", 24), ("169.254.10.1", 16)], IFF_UP),
            mock_interface("eth2", &[("172.16.0.1", 16)], 0),
            mock_interface("eth3", &[("2001:db8::5", 64)], IFF_UP),
        ];
        let addrs = advertisable_from(interfaces);
        let expected: Vec<IpAddr> = vec![
            "10.0.0.5".parse().unwrap(),
            "192.168.1.9".parse().unwrap(),
            "2001:db8::5".parse().unwrap(),
        ];
        assert_eq!(addrs, expected);
    }
}
