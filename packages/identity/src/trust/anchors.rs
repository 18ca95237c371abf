//! Trust anchor sets and the swappable trust store

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::Result;
use crate::logging::IdentityLogger;
use crate::material::{DistinguishedName, EncodedBlob, ParsedCertificate, parse_certificates};

/// Immutable set of certificates trusted as roots
///
/// Cloning is cheap; clones share the same certificates.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorSet {
    anchors: Arc<Vec<ParsedCertificate>>,
}

impl TrustAnchorSet {
    /// Build a set, dropping duplicates by fingerprint
    #[must_use]
    pub fn new(certs: impl IntoIterator<Item = ParsedCertificate>) -> Self {
        let mut anchors: Vec<ParsedCertificate> = Vec::new();
        for cert in certs {
            let fingerprint = cert.fingerprint();
            if anchors.iter().any(|a| a.fingerprint() == fingerprint) {
                tracing::debug!(
                    "Duplicate trust anchor {} ignored",
                    IdentityLogger::certificate_tag(&cert)
                );
                continue;
            }
            anchors.push(cert);
        }
        Self {
            anchors: Arc::new(anchors),
        }
    }

    /// Parse every certificate of a blob as an anchor
    ///
    /// # Errors
    ///
    /// Fails like `parse_certificates`.
    pub fn from_blob(blob: &EncodedBlob) -> Result<Self> {
        Ok(Self::new(parse_certificates(blob)?))
    }

    /// Parse PEM text holding one or more root certificates
    ///
    /// # Errors
    ///
    /// Fails like `parse_certificates`.
    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_blob(&EncodedBlob::pem(pem))
    }

    /// Load anchors from a PEM or DER file
    ///
    /// # Errors
    ///
    /// Returns `Unreadable` if the file cannot be read, otherwise fails like
    /// `parse_certificates`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let set = Self::from_blob(&EncodedBlob::from_path(path)?)?;
        tracing::debug!("Loaded {} trust anchor(s) from {}", set.len(), path.display());
        Ok(set)
    }

    /// Number of anchors
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Iterate over the anchors
    pub fn iter(&self) -> std::slice::Iter<'_, ParsedCertificate> {
        self.anchors.iter()
    }

    /// Anchors whose subject is `name`
    pub fn by_subject<'a>(
        &'a self,
        name: &'a DistinguishedName,
    ) -> impl Iterator<Item = &'a ParsedCertificate> + 'a {
        self.anchors.iter().filter(move |a| &a.subject == name)
    }

    /// Whether any anchor has `name` as subject
    #[must_use]
    pub fn contains_subject(&self, name: &DistinguishedName) -> bool {
        self.by_subject(name).next().is_some()
    }

    /// Whether `cert` itself is an anchor
    #[must_use]
    pub fn contains(&self, cert: &ParsedCertificate) -> bool {
        let fingerprint = cert.fingerprint();
        self.anchors.iter().any(|a| a.fingerprint() == fingerprint)
    }
}

impl<'a> IntoIterator for &'a TrustAnchorSet {
    type Item = &'a ParsedCertificate;
    type IntoIter = std::slice::Iter<'a, ParsedCertificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Holder of the current trust anchor set
///
/// Readers take a snapshot with `current`; reloading builds a complete new set
/// and swaps it in atomically, so a validation never sees a partial update.
#[derive(Debug)]
pub struct TrustStore {
    current: ArcSwap<TrustAnchorSet>,
}

impl TrustStore {
    /// Create a store holding `anchors`
    #[must_use]
    pub fn new(anchors: TrustAnchorSet) -> Self {
        Self {
            current: ArcSwap::from_pointee(anchors),
        }
    }

    /// Create a store from an anchor file
    ///
    /// # Errors
    ///
    /// Fails like `TrustAnchorSet::from_path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::new(TrustAnchorSet::from_path(path)?))
    }

    /// Snapshot of the current anchors
    #[must_use]
    pub fn current(&self) -> Arc<TrustAnchorSet> {
        self.current.load_full()
    }

    /// Swap in a new anchor set, returning the previous one
    pub fn replace(&self, anchors: TrustAnchorSet) -> Arc<TrustAnchorSet> {
        tracing::info!("Trust store replaced ({} anchor(s))", anchors.len());
        self.current.swap(Arc::new(anchors))
    }

    /// Re-read an anchor file and swap it in
    ///
    /// The current set stays in place when the file cannot be loaded.
    ///
    /// # Errors
    ///
    /// Fails like `TrustAnchorSet::from_path`.
    pub fn reload_from_path(&self, path: &Path) -> Result<()> {
        let anchors = TrustAnchorSet::from_path(path)?;
        self.replace(anchors);
        Ok(())
    }
}

impl Default for TrustStore {
    fn default() -> Self {
        Self::new(TrustAnchorSet::default())
    }
}
