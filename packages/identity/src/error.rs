//! Comprehensive error handling for identity loading

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason code attached to every failure surfaced by the engine
///
/// Codes are stable identifiers meant for logs and metrics. They never carry
/// key material, only the category of the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonCode {
    /// Bytes could not be decoded as the expected structure
    MalformedEncoding,
    /// Password-protected container could not be unlocked
    DecryptionFailed,
    /// Key or certificate uses an algorithm the engine cannot handle
    UnsupportedAlgorithm,
    /// More than one certificate qualifies as the leaf
    AmbiguousLeaf,
    /// An issuer is referenced but absent from the pool and the anchors
    BrokenChain,
    /// Chain exceeds the configured depth or loops back on itself
    ChainTooLong,
    /// No trust anchor vouches for the chain
    UntrustedRoot,
    /// A certificate's validity window ended before the verification time
    Expired,
    /// A certificate's validity window starts after the verification time
    NotYetValid,
    /// A non-leaf certificate is not allowed to sign certificates
    NotACertificateAuthority,
    /// The leaf does not carry the required usage
    UsageMismatch,
    /// A certificate signature does not verify with its issuer's key
    SignatureInvalid,
    /// The private key belongs to none of the supplied certificates
    KeyMismatch,
    /// A configured file could not be read
    Unreadable,
}

impl ReasonCode {
    /// Stable string form of the code
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedEncoding => "MalformedEncoding",
            Self::DecryptionFailed => "DecryptionFailed",
            Self::UnsupportedAlgorithm => "UnsupportedAlgorithm",
            Self::AmbiguousLeaf => "AmbiguousLeaf",
            Self::BrokenChain => "BrokenChain",
            Self::ChainTooLong => "ChainTooLong",
            Self::UntrustedRoot => "UntrustedRoot",
            Self::Expired => "Expired",
            Self::NotYetValid => "NotYetValid",
            Self::NotACertificateAuthority => "NotACertificateAuthority",
            Self::UsageMismatch => "UsageMismatch",
            Self::SignatureInvalid => "SignatureInvalid",
            Self::KeyMismatch => "KeyMismatch",
            Self::Unreadable => "Unreadable",
        }
    }

    /// Trust failures must never be downgraded to warnings by callers
    #[must_use]
    pub fn is_security_relevant(self) -> bool {
        matches!(
            self,
            Self::UntrustedRoot
                | Self::Expired
                | Self::NotYetValid
                | Self::NotACertificateAuthority
                | Self::UsageMismatch
                | Self::SignatureInvalid
        )
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity loading and validation errors
#[derive(Debug, Error)]
pub enum PkiError {
    /// Malformed certificate, key or container bytes
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// Missing or wrong passphrase for a protected container
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Unsupported key, curve, container or signature algorithm
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Leaf certificate cannot be determined
    #[error("Ambiguous leaf: {0}")]
    AmbiguousLeaf(String),

    /// Issuer referenced but not resolvable
    #[error("Broken chain: {0}")]
    BrokenChain(String),

    /// Chain depth limit exceeded or cycle detected
    #[error("Chain too long: {0}")]
    ChainTooLong(String),

    /// Chain does not end at a configured trust anchor
    #[error("Untrusted root: {0}")]
    UntrustedRoot(String),

    /// Certificate expired
    #[error("Certificate expired: {0}")]
    Expired(String),

    /// Certificate not yet valid
    #[error("Certificate not yet valid: {0}")]
    NotYetValid(String),

    /// Issuing certificate lacks CA capability
    #[error("Not a certificate authority: {0}")]
    NotACertificateAuthority(String),

    /// Leaf lacks the required usage
    #[error("Usage mismatch: {0}")]
    UsageMismatch(String),

    /// Signature verification failed
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// Private key matches no certificate
    #[error("Private key does not match the certificate: {0}")]
    KeyMismatch(String),

    /// File could not be read
    #[error("Unreadable input: {0}")]
    Unreadable(String),
}

impl PkiError {
    /// Build an error from a reason code and its context
    pub fn from_reason(reason: ReasonCode, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match reason {
            ReasonCode::MalformedEncoding => Self::MalformedEncoding(detail),
            ReasonCode::DecryptionFailed => Self::DecryptionFailed(detail),
            ReasonCode::UnsupportedAlgorithm => Self::UnsupportedAlgorithm(detail),
            ReasonCode::AmbiguousLeaf => Self::AmbiguousLeaf(detail),
            ReasonCode::BrokenChain => Self::BrokenChain(detail),
            ReasonCode::ChainTooLong => Self::ChainTooLong(detail),
            ReasonCode::UntrustedRoot => Self::UntrustedRoot(detail),
            ReasonCode::Expired => Self::Expired(detail),
            ReasonCode::NotYetValid => Self::NotYetValid(detail),
            ReasonCode::NotACertificateAuthority => Self::NotACertificateAuthority(detail),
            ReasonCode::UsageMismatch => Self::UsageMismatch(detail),
            ReasonCode::SignatureInvalid => Self::SignatureInvalid(detail),
            ReasonCode::KeyMismatch => Self::KeyMismatch(detail),
            ReasonCode::Unreadable => Self::Unreadable(detail),
        }
    }

    /// Create a `MalformedEncoding` error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEncoding(msg.into())
    }

    /// Create an `UnsupportedAlgorithm` error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm(msg.into())
    }

    /// Create an `Unreadable` error for a file that failed to load
    pub fn unreadable(path: &Path, err: &std::io::Error) -> Self {
        Self::Unreadable(format!("{}: {err}", path.display()))
    }

    /// Context message without the reason prefix
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::MalformedEncoding(d)
            | Self::DecryptionFailed(d)
            | Self::UnsupportedAlgorithm(d)
            | Self::AmbiguousLeaf(d)
            | Self::BrokenChain(d)
            | Self::ChainTooLong(d)
            | Self::UntrustedRoot(d)
            | Self::Expired(d)
            | Self::NotYetValid(d)
            | Self::NotACertificateAuthority(d)
            | Self::UsageMismatch(d)
            | Self::SignatureInvalid(d)
            | Self::KeyMismatch(d)
            | Self::Unreadable(d) => d,
        }
    }

    /// Reason code of this error
    #[must_use]
    pub fn reason(&self) -> ReasonCode {
        match self {
            Self::MalformedEncoding(_) => ReasonCode::MalformedEncoding,
            Self::DecryptionFailed(_) => ReasonCode::DecryptionFailed,
            Self::UnsupportedAlgorithm(_) => ReasonCode::UnsupportedAlgorithm,
            Self::AmbiguousLeaf(_) => ReasonCode::AmbiguousLeaf,
            Self::BrokenChain(_) => ReasonCode::BrokenChain,
            Self::ChainTooLong(_) => ReasonCode::ChainTooLong,
            Self::UntrustedRoot(_) => ReasonCode::UntrustedRoot,
            Self::Expired(_) => ReasonCode::Expired,
            Self::NotYetValid(_) => ReasonCode::NotYetValid,
            Self::NotACertificateAuthority(_) => ReasonCode::NotACertificateAuthority,
            Self::UsageMismatch(_) => ReasonCode::UsageMismatch,
            Self::SignatureInvalid(_) => ReasonCode::SignatureInvalid,
            Self::KeyMismatch(_) => ReasonCode::KeyMismatch,
            Self::Unreadable(_) => ReasonCode::Unreadable,
        }
    }
}

/// Result type for identity operations
pub type Result<T> = std::result::Result<T, PkiError>;
