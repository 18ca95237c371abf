//! Trust anchors and chain validation

pub mod anchors;
pub mod signature;
pub mod validator;

pub use anchors::{TrustAnchorSet, TrustStore};
pub use signature::verify_signed_by;
pub use validator::{RejectReason, ValidationVerdict, validate};

use std::time::SystemTime;

use flagset::FlagSet;

use crate::chain::CertificateChain;
use crate::material::Usage;

/// Validator bound to one anchor set
///
/// Convenience wrapper for callers validating many chains against the same
/// anchors.
#[derive(Debug, Clone)]
pub struct TrustValidator {
    anchors: TrustAnchorSet,
}

impl TrustValidator {
    /// Validator over `anchors`
    #[must_use]
    pub fn new(anchors: TrustAnchorSet) -> Self {
        Self { anchors }
    }

    /// Anchors in use
    #[must_use]
    pub fn anchors(&self) -> &TrustAnchorSet {
        &self.anchors
    }

    /// Validate `chain` at time `now`
    pub fn validate(
        &self,
        chain: &CertificateChain,
        now: SystemTime,
        required_usage: impl Into<FlagSet<Usage>>,
    ) -> ValidationVerdict {
        validate(chain, &self.anchors, now, required_usage)
    }
}
