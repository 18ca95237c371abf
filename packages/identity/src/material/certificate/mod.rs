//! X.509 certificate model
//!
//! This module decomposes certificate parsing into focused extraction steps:
//! - `core`: Decoding and structural checks
//! - `name_extraction`: Distinguished names
//! - `key_extraction`: Public key algorithm and size
//! - `details_extraction`: BasicConstraints, KeyUsage and ExtendedKeyUsage

mod core;
mod details_extraction;
mod key_extraction;
mod name_extraction;

use std::time::SystemTime;

use const_oid::ObjectIdentifier;
use flagset::FlagSet;

pub use self::core::parse_certificate_der;
pub use details_extraction::Usage;
pub use key_extraction::{KeyFamily, PublicKeyAlgorithm, PublicKeyInfo};
pub(crate) use key_extraction::classify_algorithm;
pub use name_extraction::DistinguishedName;

use crate::error::Result;
use crate::oids;

/// Signature algorithm of a certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// sha256WithRSAEncryption
    RsaPkcs1Sha256,
    /// sha384WithRSAEncryption
    RsaPkcs1Sha384,
    /// sha512WithRSAEncryption
    RsaPkcs1Sha512,
    /// ecdsa-with-SHA256
    EcdsaSha256,
    /// ecdsa-with-SHA384
    EcdsaSha384,
    /// Ed25519
    Ed25519,
    /// Anything else, kept by OID so verification can report it
    Other(ObjectIdentifier),
}

impl SignatureAlgorithm {
    /// Map a signature algorithm OID
    #[must_use]
    pub fn from_oid(oid: ObjectIdentifier) -> Self {
        match oid {
            o if o == oids::SHA256_WITH_RSA => Self::RsaPkcs1Sha256,
            o if o == oids::SHA384_WITH_RSA => Self::RsaPkcs1Sha384,
            o if o == oids::SHA512_WITH_RSA => Self::RsaPkcs1Sha512,
            o if o == oids::ECDSA_WITH_SHA256 => Self::EcdsaSha256,
            o if o == oids::ECDSA_WITH_SHA384 => Self::EcdsaSha384,
            o if o == oids::ID_ED25519 => Self::Ed25519,
            other => Self::Other(other),
        }
    }

    /// Key family able to produce this signature
    #[must_use]
    pub fn family(self) -> Option<KeyFamily> {
        match self {
            Self::RsaPkcs1Sha256 | Self::RsaPkcs1Sha384 | Self::RsaPkcs1Sha512 => {
                Some(KeyFamily::Rsa)
            }
            Self::EcdsaSha256 | Self::EcdsaSha384 => Some(KeyFamily::Ec),
            Self::Ed25519 => Some(KeyFamily::Edwards),
            Self::Other(_) => None,
        }
    }
}

/// Decoded X.509 certificate
///
/// Holds a copy of its own DER encoding for re-export and fingerprinting.
/// Two parsed certificates are equal when every extracted field is equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCertificate {
    /// Subject name
    pub subject: DistinguishedName,
    /// Issuer name
    pub issuer: DistinguishedName,
    /// Subject public key
    pub public_key: PublicKeyInfo,
    /// Start of the validity window
    pub not_before: SystemTime,
    /// End of the validity window
    pub not_after: SystemTime,
    /// Serial number bytes
    pub serial: Vec<u8>,
    /// Usage flags from KeyUsage and ExtendedKeyUsage
    pub usage: FlagSet<Usage>,
    /// Whether a KeyUsage extension was present
    pub key_usage_present: bool,
    /// BasicConstraints cA flag
    pub is_ca: bool,
    /// BasicConstraints pathLenConstraint
    pub path_len: Option<u8>,
    /// Algorithm used by the issuer to sign this certificate
    pub signature_algorithm: SignatureAlgorithm,
    /// Raw signature bytes
    pub signature: Vec<u8>,
    /// DER of the signed `TBSCertificate`
    pub tbs_der: Vec<u8>,
    /// Full DER encoding
    pub der: Vec<u8>,
}

impl ParsedCertificate {
    /// Parse a single DER-encoded certificate
    ///
    /// # Errors
    ///
    /// Returns `MalformedEncoding` when the bytes are not a well-formed certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        parse_certificate_der(der)
    }

    /// SHA-256 fingerprint of the DER encoding
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 32] {
        let digest = ring::digest::digest(&ring::digest::SHA256, &self.der);
        let mut out = [0u8; 32];
        out.copy_from_slice(digest.as_ref());
        out
    }

    /// Hex form of the fingerprint
    #[must_use]
    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint())
    }

    /// Subject equals issuer
    #[must_use]
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    /// Whether `time` falls inside the validity window
    #[must_use]
    pub fn is_valid_at(&self, time: SystemTime) -> bool {
        self.not_before <= time && time <= self.not_after
    }

    /// Re-export as PEM
    #[must_use]
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new("CERTIFICATE", self.der.clone()))
    }

    /// Re-export as DER
    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        self.der.clone()
    }
}
