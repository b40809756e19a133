//! Transport security negotiation.
//!
//! The selector holds only the two interface names; the security switches are
//! passed in on every call so a changed configuration is picked up on the
//! next request.

use config::{SecurityConfig, SystemConfig};
use tracing::debug;

use crate::models::ServiceSecurity;

/// Outcome of one security negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityMode {
    pub security: ServiceSecurity,
    pub interface: String,
    /// Caller must attach its encoded public key.
    pub requires_auth_info: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityModeSelector {
    secure_interface: String,
    insecure_interface: String,
}

impl SecurityModeSelector {
    pub fn new(secure_interface: impl Into<String>, insecure_interface: impl Into<String>) -> Self {
        Self {
            secure_interface: secure_interface.into(),
            insecure_interface: insecure_interface.into(),
        }
    }

    pub fn from_config(system: &SystemConfig) -> Self {
        Self::new(&system.secure_interface, &system.insecure_interface)
    }

    /// Token filter first, then TLS, then plain.
    pub fn select_security_mode(
        &self,
        token_filter_enabled: bool,
        tls_enabled: bool,
    ) -> SecurityMode {
        let mode = if token_filter_enabled {
            SecurityMode {
                security: ServiceSecurity::Token,
                interface: self.secure_interface.clone(),
                requires_auth_info: true,
            }
        } else if tls_enabled {
            SecurityMode {
                security: ServiceSecurity::Certificate,
                interface: self.secure_interface.clone(),
                requires_auth_info: true,
            }
        } else {
            SecurityMode {
                security: ServiceSecurity::NotSecure,
                interface: self.insecure_interface.clone(),
                requires_auth_info: false,
            }
        };
        debug!(
            token_filter_enabled,
            tls_enabled,
            security = %mode.security,
            interface = %mode.interface,
            "selected security mode"
        );
        mode
    }

    /// Convenience over [`Self::select_security_mode`] reading the switches
    /// from `security`.
    pub fn select_for(&self, security: &SecurityConfig) -> SecurityMode {
        self.select_security_mode(security.token_filter_enabled, security.ssl_enabled)
    }

    /// Interface name a request made under `security` goes out on.
    pub fn select_interface(&self, security: &SecurityConfig) -> String {
        self.select_for(security).interface
    }
}
