//! Chain building
//!
//! Orders an unordered certificate pool into a leaf-first chain. Linking is by
//! name only; signatures are checked later by the trust validator.

use rustls::pki_types::CertificateDer;

use crate::error::{PkiError, Result};
use crate::logging::IdentityLogger;
use crate::material::{DistinguishedName, ParsedCertificate};
use crate::trust::TrustAnchorSet;

/// Default upper bound on chain length, leaf included
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 10;

/// Ordered, leaf-first certificate chain
///
/// Non-empty, each entry's subject equals the previous entry's issuer, and no
/// certificate appears twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    certs: Vec<ParsedCertificate>,
}

impl CertificateChain {
    /// Build a chain from already ordered certificates, checking its invariants
    ///
    /// # Errors
    ///
    /// - `BrokenChain` if `certs` is empty or two neighbours do not link
    /// - `ChainTooLong` if a certificate appears twice
    pub fn new(certs: Vec<ParsedCertificate>) -> Result<Self> {
        if certs.is_empty() {
            return Err(PkiError::BrokenChain("Chain is empty".to_string()));
        }

        for pair in certs.windows(2) {
            if pair[1].subject != pair[0].issuer {
                return Err(PkiError::BrokenChain(format!(
                    "'{}' is not the issuer of '{}'",
                    pair[1].subject, pair[0].subject
                )));
            }
        }

        let mut seen: Vec<[u8; 32]> = Vec::with_capacity(certs.len());
        for cert in &certs {
            let fingerprint = cert.fingerprint();
            if seen.contains(&fingerprint) {
                return Err(PkiError::ChainTooLong(format!(
                    "Certificate '{}' appears twice",
                    cert.subject
                )));
            }
            seen.push(fingerprint);
        }

        Ok(Self { certs })
    }

    /// End-entity certificate
    #[must_use]
    pub fn leaf(&self) -> &ParsedCertificate {
        &self.certs[0]
    }

    /// Number of certificates
    #[must_use]
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// Always false; chains are never empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Leaf-first iteration
    pub fn iter(&self) -> std::slice::Iter<'_, ParsedCertificate> {
        self.certs.iter()
    }

    /// Leaf-first slice
    #[must_use]
    pub fn as_slice(&self) -> &[ParsedCertificate] {
        &self.certs
    }

    /// Unwrap into the ordered certificates
    #[must_use]
    pub fn into_vec(self) -> Vec<ParsedCertificate> {
        self.certs
    }

    /// DER copies for the TLS layer, leaf first
    #[must_use]
    pub fn to_rustls(&self) -> Vec<CertificateDer<'static>> {
        self.certs
            .iter()
            .map(|c| CertificateDer::from(c.to_der()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a CertificateChain {
    type Item = &'a ParsedCertificate;
    type IntoIter = std::slice::Iter<'a, ParsedCertificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Identifies the leaf when the pool alone is ambiguous
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafHint {
    /// Leaf subject name
    Subject(DistinguishedName),
    /// SHA-256 fingerprint of the leaf DER
    Fingerprint([u8; 32]),
}

impl LeafHint {
    /// Hint pointing at exactly `cert`
    #[must_use]
    pub fn for_certificate(cert: &ParsedCertificate) -> Self {
        Self::Fingerprint(cert.fingerprint())
    }

    fn matches(&self, cert: &ParsedCertificate) -> bool {
        match self {
            Self::Subject(name) => &cert.subject == name,
            Self::Fingerprint(fp) => &cert.fingerprint() == fp,
        }
    }
}

/// Builder that orders a certificate pool into a chain
///
/// ```ignore
/// let chain = ChainBuilder::new()
///     .max_depth(5)
///     .anchors(&anchors)
///     .build(pool, None)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ChainBuilder<'a> {
    max_depth: usize,
    anchors: Option<&'a TrustAnchorSet>,
}

impl Default for ChainBuilder<'_> {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_CHAIN_DEPTH,
            anchors: None,
        }
    }
}

impl<'a> ChainBuilder<'a> {
    /// Builder with the default depth limit and no anchors
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum chain length, leaf included
    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Anchors that may terminate the chain without being in the pool
    #[must_use]
    pub fn anchors(mut self, anchors: &'a TrustAnchorSet) -> Self {
        self.anchors = Some(anchors);
        self
    }

    fn anchor_has_subject(&self, name: &DistinguishedName) -> bool {
        self.anchors.is_some_and(|a| a.contains_subject(name))
    }

    fn is_anchor(&self, cert: &ParsedCertificate) -> bool {
        self.anchors.is_some_and(|a| a.contains(cert))
    }

    /// Order `pool` into a leaf-first chain
    ///
    /// Linking stops at a self-issued certificate, at an intermediate that is
    /// itself a trust anchor, or below an issuer known only as an anchor. With
    /// no hint, several unlinked candidates are `AmbiguousLeaf` as long as each
    /// one's issuer resolves or it is self-issued; two unrelated self-signed
    /// certificates therefore count as competing leaves.
    ///
    /// # Errors
    ///
    /// - `AmbiguousLeaf` when the hint matches nothing, or several leaf
    ///   candidates exist and every one of them has a resolvable issuer
    /// - `BrokenChain` for an empty pool or an issuer found neither in the pool
    ///   nor among the anchors
    /// - `ChainTooLong` when the depth limit is exceeded or linking loops back
    pub fn build(
        &self,
        pool: impl IntoIterator<Item = ParsedCertificate>,
        hint: Option<&LeafHint>,
    ) -> Result<CertificateChain> {
        let pool = dedup(pool);
        if pool.is_empty() {
            return Err(PkiError::BrokenChain("Certificate pool is empty".to_string()));
        }

        let leaf = self.select_leaf(&pool, hint)?;
        let order = self.link(&pool, leaf)?;

        let mut slots: Vec<Option<ParsedCertificate>> = pool.into_iter().map(Some).collect();
        let certs: Vec<ParsedCertificate> = order.iter().filter_map(|&i| slots[i].take()).collect();
        for unused in slots.iter().flatten() {
            IdentityLogger::log_unused_certificate(unused);
        }

        tracing::debug!("Built chain of {} certificate(s)", certs.len());
        CertificateChain::new(certs)
    }

    fn select_leaf(&self, pool: &[ParsedCertificate], hint: Option<&LeafHint>) -> Result<usize> {
        if let Some(hint) = hint {
            return pool.iter().position(|c| hint.matches(c)).ok_or_else(|| {
                PkiError::AmbiguousLeaf("Leaf hint matches no certificate in the pool".to_string())
            });
        }

        let candidates: Vec<usize> = (0..pool.len())
            .filter(|&i| {
                !pool
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && other.issuer == pool[i].subject)
            })
            .collect();

        match candidates.as_slice() {
            [] => {
                tracing::debug!("Every pool entry issues another; starting from the first");
                Ok(0)
            }
            [only] => Ok(*only),
            many => {
                let unresolved = many.iter().map(|&i| &pool[i]).find(|c| {
                    !c.is_self_issued()
                        && !pool.iter().any(|o| o.subject == c.issuer)
                        && !self.anchor_has_subject(&c.issuer)
                });
                match unresolved {
                    Some(cert) => Err(PkiError::BrokenChain(format!(
                        "Issuer '{}' of '{}' is not in the pool or the trust anchors",
                        cert.issuer, cert.subject
                    ))),
                    None => Err(PkiError::AmbiguousLeaf(format!(
                        "{} certificates qualify as leaf",
                        many.len()
                    ))),
                }
            }
        }
    }

    fn link(&self, pool: &[ParsedCertificate], leaf: usize) -> Result<Vec<usize>> {
        let mut used = vec![false; pool.len()];
        used[leaf] = true;
        let mut order = vec![leaf];

        loop {
            let tail = &pool[order[order.len() - 1]];
            if tail.is_self_issued() {
                break;
            }
            if order.len() > 1 && self.is_anchor(tail) {
                tracing::debug!("Chain reaches trust anchor '{}'", tail.subject);
                break;
            }

            let next = (0..pool.len()).find(|&j| !used[j] && pool[j].subject == tail.issuer);
            if let Some(next) = next {
                if order.len() >= self.max_depth {
                    return Err(PkiError::ChainTooLong(format!(
                        "Chain exceeds the maximum depth of {}",
                        self.max_depth
                    )));
                }
                used[next] = true;
                order.push(next);
                continue;
            }

            if order.iter().any(|&i| pool[i].subject == tail.issuer) {
                return Err(PkiError::ChainTooLong(format!(
                    "Issuer '{}' of '{}' is already on the chain",
                    tail.issuer, tail.subject
                )));
            }

            if self.anchor_has_subject(&tail.issuer) {
                break;
            }

            return Err(PkiError::BrokenChain(format!(
                "Issuer '{}' of '{}' is not in the pool or the trust anchors",
                tail.issuer, tail.subject
            )));
        }

        if order.len() > self.max_depth {
            return Err(PkiError::ChainTooLong(format!(
                "Chain exceeds the maximum depth of {}",
                self.max_depth
            )));
        }
        Ok(order)
    }
}

/// Drop repeated certificates, keeping the first occurrence
fn dedup(pool: impl IntoIterator<Item = ParsedCertificate>) -> Vec<ParsedCertificate> {
    let mut seen: Vec<[u8; 32]> = Vec::new();
    let mut out = Vec::new();
    for cert in pool {
        let fingerprint = cert.fingerprint();
        if seen.contains(&fingerprint) {
            continue;
        }
        seen.push(fingerprint);
        out.push(cert);
    }
    out
}
