//! Chain validation against trust anchors, a clock and a required usage
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. validity windows of every chain entry, leaf first
//! 2. trust point lookup, then the matched anchor's validity window
//! 3. CA capability of every non-leaf entry up to the trust point
//! 4. leaf usage
//! 5. signatures, the trust point verified with the anchor key

use std::fmt;
use std::time::SystemTime;

use flagset::FlagSet;
use serde::{Deserialize, Serialize};

use super::anchors::TrustAnchorSet;
use super::signature::verify_signed_by;
use crate::chain::CertificateChain;
use crate::error::{PkiError, ReasonCode};
use crate::logging::{IdentityLogger, format_time};
use crate::material::{ParsedCertificate, Usage};

/// Why a chain was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectReason {
    /// Reason code
    pub code: ReasonCode,
    /// Human readable context
    pub detail: String,
}

impl RejectReason {
    fn new(code: ReasonCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.detail)
    }
}

impl From<RejectReason> for PkiError {
    fn from(reason: RejectReason) -> Self {
        PkiError::from_reason(reason.code, reason.detail)
    }
}

impl From<PkiError> for RejectReason {
    fn from(err: PkiError) -> Self {
        Self::new(err.reason(), err.detail())
    }
}

/// Outcome of validating a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    /// Chain is trusted until `effective_expiry`
    Accepted {
        /// Earliest `not_after` across the path and the anchor
        effective_expiry: SystemTime,
    },
    /// Chain is not trusted
    Rejected(RejectReason),
}

impl ValidationVerdict {
    /// Whether the chain was accepted
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Reason code of a rejection
    #[must_use]
    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected(reason) => Some(reason.code),
        }
    }

    /// Convert into a result carrying the effective expiry
    ///
    /// # Errors
    ///
    /// Returns the rejection as a `PkiError`.
    pub fn into_result(self) -> crate::error::Result<SystemTime> {
        match self {
            Self::Accepted { effective_expiry } => Ok(effective_expiry),
            Self::Rejected(reason) => Err(reason.into()),
        }
    }
}

type Check<T> = std::result::Result<T, RejectReason>;

/// Validate `chain` against `anchors` at time `now`
///
/// The leaf must carry every flag in `required_usage`.
pub fn validate(
    chain: &CertificateChain,
    anchors: &TrustAnchorSet,
    now: SystemTime,
    required_usage: impl Into<FlagSet<Usage>>,
) -> ValidationVerdict {
    match run_checks(chain, anchors, now, required_usage.into()) {
        Ok(effective_expiry) => {
            tracing::debug!(
                "Chain for '{}' accepted until {}",
                chain.leaf().subject,
                format_time(effective_expiry)
            );
            ValidationVerdict::Accepted { effective_expiry }
        }
        Err(reason) => {
            tracing::debug!("Chain for '{}' rejected: {}", chain.leaf().subject, reason);
            ValidationVerdict::Rejected(reason)
        }
    }
}

fn run_checks(
    chain: &CertificateChain,
    anchors: &TrustAnchorSet,
    now: SystemTime,
    required_usage: FlagSet<Usage>,
) -> Check<SystemTime> {
    let entries = chain.as_slice();

    for cert in entries {
        check_window(cert, now)?;
    }

    let (trust_index, anchor) = find_trust_point(entries, anchors)?;
    check_window(anchor, now)?;
    tracing::debug!(
        "Trust point '{}' anchored by {}",
        entries[trust_index].subject,
        IdentityLogger::certificate_tag(anchor)
    );

    let path = &entries[..=trust_index];
    for (depth, cert) in path.iter().enumerate().skip(1) {
        check_ca(cert, depth)?;
    }

    let leaf = &entries[0];
    if !leaf.usage.contains(required_usage) {
        return Err(RejectReason::new(
            ReasonCode::UsageMismatch,
            format!(
                "Leaf '{}' carries {:?}, required {:?}",
                leaf.subject, leaf.usage, required_usage
            ),
        ));
    }

    for pair in path.windows(2) {
        verify_signed_by(&pair[0], &pair[1])?;
    }
    verify_signed_by(&path[trust_index], anchor)?;

    let effective_expiry = path
        .iter()
        .chain(std::iter::once(anchor))
        .map(|c| c.not_after)
        .min()
        .unwrap_or(anchor.not_after);
    Ok(effective_expiry)
}

fn check_window(cert: &ParsedCertificate, now: SystemTime) -> Check<()> {
    if now > cert.not_after {
        return Err(RejectReason::new(
            ReasonCode::Expired,
            format!(
                "'{}' expired at {}",
                cert.subject,
                format_time(cert.not_after)
            ),
        ));
    }
    if now < cert.not_before {
        return Err(RejectReason::new(
            ReasonCode::NotYetValid,
            format!(
                "'{}' is not valid before {}",
                cert.subject,
                format_time(cert.not_before)
            ),
        ));
    }
    Ok(())
}

/// Walk from the root-ward end to the first entry issued by an anchor
///
/// Among anchors sharing the issuer name, one whose key verifies the entry wins.
fn find_trust_point<'a>(
    entries: &[ParsedCertificate],
    anchors: &'a TrustAnchorSet,
) -> Check<(usize, &'a ParsedCertificate)> {
    for (index, cert) in entries.iter().enumerate().rev() {
        let mut candidates = anchors
            .iter()
            .filter(|a| a.subject == cert.issuer)
            .peekable();
        let Some(&first) = candidates.peek() else {
            continue;
        };
        let anchor = candidates
            .find(|a| verify_signed_by(cert, a).is_ok())
            .unwrap_or(first);
        return Ok((index, anchor));
    }

    let root = &entries[entries.len() - 1];
    Err(RejectReason::new(
        ReasonCode::UntrustedRoot,
        format!(
            "No trust anchor issued '{}' (issuer '{}')",
            root.subject, root.issuer
        ),
    ))
}

/// `depth` is the position on the path; `depth - 1` intermediates sit below it
fn check_ca(cert: &ParsedCertificate, depth: usize) -> Check<()> {
    if !cert.is_ca {
        return Err(RejectReason::new(
            ReasonCode::NotACertificateAuthority,
            format!("'{}' is not a CA (BasicConstraints cA unset)", cert.subject),
        ));
    }
    if cert.key_usage_present && !cert.usage.contains(Usage::KeyCertSign) {
        return Err(RejectReason::new(
            ReasonCode::NotACertificateAuthority,
            format!("'{}' KeyUsage lacks keyCertSign", cert.subject),
        ));
    }
    if let Some(path_len) = cert.path_len {
        let below = depth - 1;
        if below > usize::from(path_len) {
            return Err(RejectReason::new(
                ReasonCode::NotACertificateAuthority,
                format!(
                    "'{}' allows {} intermediate(s) below it, found {}",
                    cert.subject, path_len, below
                ),
            ));
        }
    }
    Ok(())
}
