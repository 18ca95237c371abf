//! Validated identity handed to the transport layer

use std::time::SystemTime;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::chain::CertificateChain;
use crate::material::{ParsedCertificate, ParsedPrivateKey};

/// Private key plus the trusted chain it belongs to
///
/// Owns both; dropping the bundle wipes the key material.
#[derive(Debug)]
pub struct IdentityBundle {
    key: ParsedPrivateKey,
    chain: CertificateChain,
    effective_expiry: SystemTime,
}

impl IdentityBundle {
    pub(crate) fn new(
        key: ParsedPrivateKey,
        chain: CertificateChain,
        effective_expiry: SystemTime,
    ) -> Self {
        Self {
            key,
            chain,
            effective_expiry,
        }
    }

    /// The private key
    #[must_use]
    pub fn private_key(&self) -> &ParsedPrivateKey {
        &self.key
    }

    /// The validated chain, leaf first
    #[must_use]
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }

    /// The leaf certificate
    #[must_use]
    pub fn leaf(&self) -> &ParsedCertificate {
        self.chain.leaf()
    }

    /// Earliest expiry across the chain and its trust anchor
    #[must_use]
    pub fn effective_expiry(&self) -> SystemTime {
        self.effective_expiry
    }

    /// Whether the identity is still inside its validity window at `now`
    #[must_use]
    pub fn is_current(&self, now: SystemTime) -> bool {
        now <= self.effective_expiry
    }

    /// Certificate chain in the form rustls expects
    #[must_use]
    pub fn certificate_chain_der(&self) -> Vec<CertificateDer<'static>> {
        self.chain.to_rustls()
    }

    /// Private key in the form rustls expects
    #[must_use]
    pub fn private_key_der(&self) -> PrivateKeyDer<'static> {
        self.key.to_rustls()
    }

    /// Split into key and chain
    #[must_use]
    pub fn into_parts(self) -> (ParsedPrivateKey, CertificateChain) {
        (self.key, self.chain)
    }
}
