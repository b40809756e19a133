//! This client's own system descriptor, shared by every component.

use std::sync::Arc;

use config::ClientConfig;

use crate::{
    error::{ClientError, ClientResult},
    keys::KeyMaterial,
    models::SystemDescriptor,
    security::SecurityModeSelector,
};

#[derive(Debug, Clone)]
pub struct Identity {
    config: Arc<ClientConfig>,
    keys: Option<Arc<dyn KeyMaterial>>,
}

impl Identity {
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self { config, keys: None }
    }

    pub fn with_key_material(mut self, keys: Arc<dyn KeyMaterial>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn selector(&self) -> SecurityModeSelector {
        SecurityModeSelector::from_config(self.config.system())
    }

    /// Name, configured address and port, no credentials.
    pub fn system(&self) -> SystemDescriptor {
        self.system_at(&self.config.system().address)
    }

    /// Same identity advertised on a specific address.
    pub fn system_at(&self, address: &str) -> SystemDescriptor {
        let system = self.config.system();
        SystemDescriptor::new(&system.name, address, system.port)
    }

    /// Own descriptor carrying authentication info when TLS is enabled.
    pub fn tls_system(&self) -> ClientResult<SystemDescriptor> {
        self.authenticate(self.system(), self.config.security().ssl_enabled)
    }

    /// Attaches the encoded public key when `required`.
    pub fn authenticate(
        &self,
        mut system: SystemDescriptor,
        required: bool,
    ) -> ClientResult<SystemDescriptor> {
        if required {
            system.authentication_info = Some(self.encoded_public_key()?);
        }
        Ok(system)
    }

    fn encoded_public_key(&self) -> ClientResult<String> {
        match &self.keys {
            Some(keys) => keys.encoded_public_key(),
            None => Err(ClientError::Config(
                "authentication info required but no public key is configured".into(),
            )),
        }
    }
}
