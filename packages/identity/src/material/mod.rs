//! Encoded-material parsing
//!
//! Decodes certificates and private keys from DER, PEM and password-protected
//! containers. Detection looks at the bytes, never at the caller's label alone.

pub mod blob;
pub mod certificate;
pub(crate) mod der_probe;
pub mod private_key;
pub mod sequence;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

pub use blob::{ContainerFormat, EncodedBlob};
pub use certificate::{
    DistinguishedName, KeyFamily, ParsedCertificate, PublicKeyAlgorithm, PublicKeyInfo,
    SignatureAlgorithm, Usage,
};
pub use private_key::{KeyAlgorithm, KeyEncoding, ParsedPrivateKey, parse_private_key};
pub use sequence::{CertificateSequence, parse_certificates};

use crate::error::Result;

/// What the caller expects a blob to contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialKind {
    /// One or more certificates
    Certificate,
    /// A single private key
    PrivateKey,
}

/// Result of parsing a blob
#[derive(Debug)]
pub enum ParsedMaterial {
    /// Certificates in the order they appear in the blob
    Certificates(Vec<ParsedCertificate>),
    /// A decoded private key
    PrivateKey(ParsedPrivateKey),
}

/// Parse a blob as the given kind of material
///
/// The passphrase is only consulted for protected private keys.
///
/// # Errors
///
/// Returns `MalformedEncoding`, `DecryptionFailed` or `UnsupportedAlgorithm`
/// depending on what went wrong.
pub fn parse(
    blob: &EncodedBlob,
    kind: MaterialKind,
    passphrase: Option<&SecretString>,
) -> Result<ParsedMaterial> {
    match kind {
        MaterialKind::Certificate => parse_certificates(blob).map(ParsedMaterial::Certificates),
        MaterialKind::PrivateKey => {
            parse_private_key(blob, passphrase).map(ParsedMaterial::PrivateKey)
        }
    }
}

/// Lazy sequence over the certificates of a blob
#[must_use]
pub fn certificates(blob: &EncodedBlob) -> CertificateSequence<'_> {
    CertificateSequence::new(blob)
}
