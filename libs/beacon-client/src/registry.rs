//! Service advertisement against the platform registry.
//!
//! No local record of registered services is kept; the registry is the only
//! source of truth.

use std::{collections::HashMap, net::IpAddr, sync::Arc};

use config::{ClientConfig, is_link_local_or_meta};
use http::Method;
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, ClientResult},
    identity::Identity,
    keys::KeyMaterial,
    models::{ServiceRegistryRequest, ServiceRemovalRequest, SystemDescriptor, request_metadata},
    nics::{InterfaceEnumerator, SystemInterfaces},
    security::{SecurityMode, SecurityModeSelector},
    transport::Transport,
};

/// A system other than this client, registered on its behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProvider {
    pub system_name: String,
    pub address: String,
    pub port: u16,
    pub token_filter_enabled: bool,
    pub ssl_enabled: bool,
    pub secure_interface: String,
    pub insecure_interface: String,
}

impl ExternalProvider {
    /// Insecure provider using the default interface names.
    pub fn new(system_name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            system_name: system_name.into(),
            address: address.into(),
            port,
            token_filter_enabled: false,
            ssl_enabled: false,
            secure_interface: config::wire::DEFAULT_SECURE_INTERFACE.to_owned(),
            insecure_interface: config::wire::DEFAULT_INSECURE_INTERFACE.to_owned(),
        }
    }
}

/// Result of registering on one address.
#[derive(Debug)]
pub struct RegistrationOutcome {
    pub address: String,
    pub result: ClientResult<()>,
}

/// Per-address outcomes of one `register` or `unregister` call. A
/// wildcard-bound client calls the registry once per advertisable address
/// and each attempt stands alone.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    outcomes: Vec<RegistrationOutcome>,
}

impl RegistrationReport {
    pub fn outcomes(&self) -> &[RegistrationOutcome] {
        &self.outcomes
    }

    /// Addresses whose call succeeded.
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.address.as_str())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &ClientError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.address.as_str(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Addresses handled, or the first failure.
    pub fn into_result(self) -> ClientResult<Vec<String>> {
        self.outcomes
            .into_iter()
            .map(|o| o.result.map(|()| o.address))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RegistrationClient {
    identity: Identity,
    transport: Arc<dyn Transport>,
    interfaces: Arc<dyn InterfaceEnumerator>,
}

impl RegistrationClient {
    pub fn new(config: Arc<ClientConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            identity: Identity::new(config),
            transport,
            interfaces: Arc::new(SystemInterfaces),
        }
    }

    pub fn with_key_material(mut self, keys: Arc<dyn KeyMaterial>) -> Self {
        self.identity = self.identity.with_key_material(keys);
        self
    }

    pub fn with_interfaces(mut self, interfaces: Arc<dyn InterfaceEnumerator>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Advertise `service_definition` under this client's identity.
    ///
    /// A wildcard-bound client (`0.0.0.0`) registers once per advertisable
    /// local address; a failure on one address does not stop the others.
    /// Otherwise the configured address must be routable and the single
    /// registration's error is returned directly.
    pub async fn register(
        &self,
        service_definition: &str,
        service_uri: &str,
        http_method: Option<&Method>,
        metadata: Option<&HashMap<String, String>>,
    ) -> ClientResult<RegistrationReport> {
        let config = self.identity.config();
        let mode = self.identity.selector().select_for(config.security());
        let metadata = request_metadata(http_method, metadata);

        if !config.system().is_wildcard() {
            let address = &config.system().address;
            if is_link_local_or_meta(address) {
                return Err(ClientError::Validation(format!(
                    "configured address {address} is link local or meta"
                )));
            }
            let provider = self.identity.system();
            let request = self.build_request(
                service_definition,
                service_uri,
                provider,
                &mode,
                metadata,
            )?;
            self.submit(&request).await?;
            return Ok(RegistrationReport {
                outcomes: vec![RegistrationOutcome {
                    address: address.clone(),
                    result: Ok(()),
                }],
            });
        }

        let addresses = self.wildcard_addresses()?;
        debug!(?addresses, "registering on every advertisable address");

        let mut report = RegistrationReport::default();
        for ip in addresses {
            let address = ip.to_string();
            let provider = self.identity.system_at(&address);
            let request = self.build_request(
                service_definition,
                service_uri,
                provider,
                &mode,
                metadata.clone(),
            )?;
            let result = self.submit(&request).await;
            report.outcomes.push(RegistrationOutcome { address, result });
        }
        Ok(report)
    }

    /// Advertise a service on behalf of another system, authenticated with
    /// this client's key when the provider's security mode needs one.
    pub async fn register_external(
        &self,
        provider: &ExternalProvider,
        service_definition: &str,
        service_uri: &str,
        http_method: Option<&Method>,
        metadata: Option<&HashMap<String, String>>,
    ) -> ClientResult<()> {
        if is_link_local_or_meta(&provider.address) {
            return Err(ClientError::Validation(format!(
                "no link local or meta addresses allowed: {}",
                provider.address
            )));
        }
        let selector =
            SecurityModeSelector::new(&provider.secure_interface, &provider.insecure_interface);
        let mode =
            selector.select_security_mode(provider.token_filter_enabled, provider.ssl_enabled);
        let system = SystemDescriptor::new(&provider.system_name, &provider.address, provider.port);
        let request = self.build_request(
            service_definition,
            service_uri,
            system,
            &mode,
            request_metadata(http_method, metadata),
        )?;
        self.submit(&request).await
    }

    /// Remove this client's advertisement of `service_definition`.
    ///
    /// A wildcard-bound client removes the advertisement from every address
    /// `register` would have used, one independent call each. Otherwise a
    /// [`ClientError::NotFound`] from the registry is returned as is.
    pub async fn unregister(&self, service_definition: &str) -> ClientResult<RegistrationReport> {
        let system = self.identity.config().system();
        if !system.is_wildcard() {
            self.remove(service_definition, &system.address).await?;
            return Ok(RegistrationReport {
                outcomes: vec![RegistrationOutcome {
                    address: system.address.clone(),
                    result: Ok(()),
                }],
            });
        }

        let addresses = self.wildcard_addresses()?;
        debug!(?addresses, "unregistering from every advertisable address");

        let mut report = RegistrationReport::default();
        for ip in addresses {
            let address = ip.to_string();
            let result = self.remove(service_definition, &address).await;
            report.outcomes.push(RegistrationOutcome { address, result });
        }
        Ok(report)
    }

    fn wildcard_addresses(&self) -> ClientResult<Vec<IpAddr>> {
        let addresses = self.interfaces.advertisable_addresses()?;
        if addresses.is_empty() {
            return Err(ClientError::Interfaces(
                "no advertisable address found for wildcard-bound client".into(),
            ));
        }
        Ok(addresses)
    }

    async fn remove(&self, service_definition: &str, address: &str) -> ClientResult<()> {
        let system = self.identity.config().system();
        let request = ServiceRemovalRequest {
            service_definition: service_definition.to_owned(),
            system_name: system.name.clone(),
            address: address.to_owned(),
            port: system.port,
        };
        match self.transport.unregister_service(&request).await {
            Ok(()) => {
                info!(service_definition, address, "service unregistered");
                Ok(())
            }
            Err(err) => {
                debug!(?err, service_definition, address, "service removal failed");
                Err(err)
            }
        }
    }

    fn build_request(
        &self,
        service_definition: &str,
        service_uri: &str,
        provider: SystemDescriptor,
        mode: &SecurityMode,
        metadata: HashMap<String, String>,
    ) -> ClientResult<ServiceRegistryRequest> {
        Ok(ServiceRegistryRequest {
            service_definition: service_definition.to_owned(),
            provider_system: self
                .identity
                .authenticate(provider, mode.requires_auth_info)?,
            service_uri: service_uri.to_owned(),
            secure: mode.security,
            metadata,
            interfaces: vec![mode.interface.clone()],
        })
    }

    async fn submit(&self, request: &ServiceRegistryRequest) -> ClientResult<()> {
        let provider = &request.provider_system;
        match self.transport.register_service(request).await {
            Ok(()) => {
                info!(
                    service_definition = %request.service_definition,
                    address = %provider.address,
                    port = provider.port,
                    "service registered"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    ?err,
                    service_definition = %request.service_definition,
                    address = %provider.address,
                    "service registration failed"
                );
                Err(err)
            }
        }
    }
}
