use std::net::IpAddr;

use crate::error::ClientResult;

/// Lists the local addresses a wildcard-bound client is reachable on.
pub trait InterfaceEnumerator: Send + Sync + std::fmt::Debug {
    /// Up, non-loopback, non-link-local addresses in interface order.
    fn advertisable_addresses(&self) -> ClientResult<Vec<IpAddr>>;
}

/// Host NICs, via `pnet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceEnumerator for SystemInterfaces {
    fn advertisable_addresses(&self) -> ClientResult<Vec<IpAddr>> {
        Ok(config::advertisable_addresses())
    }
}

/// A fixed address list, for hosts where enumeration is not wanted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticInterfaces(pub Vec<IpAddr>);

impl InterfaceEnumerator for StaticInterfaces {
    fn advertisable_addresses(&self) -> ClientResult<Vec<IpAddr>> {
        Ok(self.0.clone())
    }
}
