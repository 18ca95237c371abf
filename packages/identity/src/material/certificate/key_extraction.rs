//! Public key extraction
//!
//! Maps SubjectPublicKeyInfo algorithm identifiers onto the closed set of key
//! algorithms the binder and the validator know how to use.

use const_oid::ObjectIdentifier;
use der::asn1::AnyRef;
use der::{Encode, SliceReader, Tag};
use serde::{Deserialize, Serialize};
use spki::SubjectPublicKeyInfoOwned;

use crate::error::{PkiError, Result};
use crate::material::der_probe::read_tlv;
use crate::oids;

/// Cryptographic family of a key
///
/// Keys and certificates of different families can never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyFamily {
    /// RSA
    Rsa,
    /// Elliptic curve over a prime field (ECDSA)
    Ec,
    /// Edwards curve (EdDSA)
    Edwards,
}

/// Public key algorithm carried by a certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKeyAlgorithm {
    /// RSA
    Rsa,
    /// ECDSA on NIST P-256
    EcdsaP256,
    /// ECDSA on NIST P-384
    EcdsaP384,
    /// Ed25519
    Ed25519,
    /// Any other algorithm or curve, identified by OID
    Other(ObjectIdentifier),
}

impl PublicKeyAlgorithm {
    /// Family of the algorithm, `None` when it is not supported
    #[must_use]
    pub fn family(self) -> Option<KeyFamily> {
        match self {
            Self::Rsa => Some(KeyFamily::Rsa),
            Self::EcdsaP256 | Self::EcdsaP384 => Some(KeyFamily::Ec),
            Self::Ed25519 => Some(KeyFamily::Edwards),
            Self::Other(_) => None,
        }
    }

    /// Human readable algorithm name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::EcdsaP256 => "ECDSA P-256",
            Self::EcdsaP384 => "ECDSA P-384",
            Self::Ed25519 => "Ed25519",
            Self::Other(_) => "Unknown",
        }
    }
}

/// Public key of a certificate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyInfo {
    /// Key algorithm
    pub algorithm: PublicKeyAlgorithm,
    /// Contents of the `subjectPublicKey` BIT STRING
    pub key: Vec<u8>,
    /// Full SubjectPublicKeyInfo encoding
    pub spki_der: Vec<u8>,
    /// Key size in bits when known
    pub key_size: Option<u32>,
}

/// Classify an algorithm identifier, using the curve for EC keys
pub(crate) fn classify_algorithm(
    oid: ObjectIdentifier,
    parameters: Option<AnyRef<'_>>,
) -> PublicKeyAlgorithm {
    if oid == oids::RSA_ENCRYPTION {
        PublicKeyAlgorithm::Rsa
    } else if oid == oids::ID_ED25519 {
        PublicKeyAlgorithm::Ed25519
    } else if oid == oids::ID_EC_PUBLIC_KEY {
        match parameters.and_then(|p| p.decode_as::<ObjectIdentifier>().ok()) {
            Some(curve) if curve == oids::SECP256R1 => PublicKeyAlgorithm::EcdsaP256,
            Some(curve) if curve == oids::SECP384R1 => PublicKeyAlgorithm::EcdsaP384,
            Some(curve) => PublicKeyAlgorithm::Other(curve),
            None => PublicKeyAlgorithm::Other(oid),
        }
    } else {
        PublicKeyAlgorithm::Other(oid)
    }
}

/// Extract the public key of a certificate
pub(super) fn extract_public_key(spki: &SubjectPublicKeyInfoOwned) -> Result<PublicKeyInfo> {
    let algorithm = classify_algorithm(
        spki.algorithm.oid,
        spki.algorithm.parameters.as_ref().map(AnyRef::from),
    );

    let key = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| PkiError::malformed("Public key BIT STRING has unused bits"))?
        .to_vec();

    let spki_der = spki
        .to_der()
        .map_err(|e| PkiError::malformed(format!("Failed to encode public key: {e}")))?;

    let key_size = match algorithm {
        PublicKeyAlgorithm::Rsa => extract_rsa_key_size(&key),
        PublicKeyAlgorithm::EcdsaP256 | PublicKeyAlgorithm::Ed25519 => Some(256),
        PublicKeyAlgorithm::EcdsaP384 => Some(384),
        PublicKeyAlgorithm::Other(_) => None,
    };

    Ok(PublicKeyInfo {
        algorithm,
        key,
        spki_der,
        key_size,
    })
}

/// Compute the bit length of a big-endian byte slice representing a positive integer
fn compute_bit_length(bytes: &[u8]) -> Option<u32> {
    let start = bytes.iter().position(|&b| b != 0)?;
    let effective = &bytes[start..];
    let high_bits = 8u32 - effective[0].leading_zeros();
    let rest_bits = u32::try_from((effective.len() - 1) * 8).ok()?;
    Some(high_bits + rest_bits)
}

/// Modulus size of an `RSAPublicKey ::= SEQUENCE { modulus INTEGER, publicExponent INTEGER }`
fn extract_rsa_key_size(key: &[u8]) -> Option<u32> {
    let mut outer = SliceReader::new(key).ok()?;
    let (tag, body) = read_tlv(&mut outer)?;
    if tag != Tag::Sequence {
        return None;
    }
    let mut inner = SliceReader::new(body).ok()?;
    let (tag, modulus) = read_tlv(&mut inner)?;
    if tag != Tag::Integer {
        return None;
    }
    compute_bit_length(modulus)
}
