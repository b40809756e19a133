//! Public key material attached as authentication info.

use std::{fmt, path::Path};

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{ClientError, ClientResult};

const PEM_BEGIN: &str = "-----BEGIN";

/// Supplies this client's public key, already encoded for transport.
pub trait KeyMaterial: Send + Sync + fmt::Debug {
    fn encoded_public_key(&self) -> ClientResult<String>;
}

/// Base64 body of a public key (the DER bytes, standard alphabet).
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedPublicKey(String);

impl EncodedPublicKey {
    pub fn from_der(der: &[u8]) -> ClientResult<Self> {
        if der.is_empty() {
            return Err(ClientError::Config("public key is empty".into()));
        }
        Ok(Self(STANDARD.encode(der)))
    }

    /// Strips the armor lines and joins the body. The body is checked to be
    /// valid base64.
    pub fn from_pem(pem: &str) -> ClientResult<Self> {
        let body: String = pem
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("-----"))
            .collect();
        if body.is_empty() {
            return Err(ClientError::Config("PEM contains no key body".into()));
        }
        STANDARD
            .decode(&body)
            .map_err(|err| ClientError::Config(format!("PEM body is not base64: {err}")))?;
        Ok(Self(body))
    }

    /// Reads a DER or PEM key file, sniffing the format from its content.
    pub fn load<P: AsRef<Path>>(path: P) -> ClientResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|err| {
            ClientError::Config(format!("failed to read key {}: {err}", path.display()))
        })?;
        match std::str::from_utf8(&bytes) {
            Ok(text) if text.trim_start().starts_with(PEM_BEGIN) => Self::from_pem(text),
            _ => Self::from_der(&bytes),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// keys are not secret but they are long; keep logs readable
impl fmt::Debug for EncodedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(12).collect();
        write!(f, "EncodedPublicKey({prefix}...)")
    }
}

impl KeyMaterial for EncodedPublicKey {
    fn encoded_public_key(&self) -> ClientResult<String> {
        Ok(self.0.clone())
    }
}
