//! Key-pair binding
//!
//! Proves that a private key is the counterpart of a certificate's public key by
//! signing a fresh random challenge and verifying it with the certificate key.
//! The private key is only ever used through ring's signing API.

use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{self, EcdsaKeyPair, Ed25519KeyPair, RsaKeyPair, UnparsedPublicKey};

use crate::error::{PkiError, Result};
use crate::logging::IdentityLogger;
use crate::material::{KeyAlgorithm, ParsedCertificate, ParsedPrivateKey};

const CHALLENGE_LEN: usize = 32;

/// Check whether `key` is the private half of `cert`'s public key
///
/// A mismatch, including a different curve of the same family, is `Ok(false)`.
///
/// # Errors
///
/// Returns `UnsupportedAlgorithm` when the key and certificate belong to
/// different families, when the certificate key is of an unsupported algorithm,
/// or when ring cannot load the private key.
pub fn matches(key: &ParsedPrivateKey, cert: &ParsedCertificate) -> Result<bool> {
    let cert_algorithm = cert.public_key.algorithm;
    let cert_family = cert_algorithm.family().ok_or_else(|| {
        PkiError::unsupported(format!(
            "Certificate key algorithm {cert_algorithm:?} is not supported"
        ))
    })?;

    let key_family = key.algorithm().family();
    if cert_family != key_family {
        return Err(PkiError::unsupported(format!(
            "{key_family:?} key cannot belong to a {cert_family:?} certificate"
        )));
    }

    if !key.algorithm().pairs_with(cert_algorithm) {
        return Ok(false);
    }

    let rng = SystemRandom::new();
    let mut challenge = [0u8; CHALLENGE_LEN];
    rng.fill(&mut challenge)
        .map_err(|_| PkiError::unsupported("System randomness unavailable"))?;

    let sig = sign_challenge(key, &challenge, &rng)?;
    let public_key =
        UnparsedPublicKey::new(verification_algorithm(key.algorithm()), &cert.public_key.key);
    Ok(public_key.verify(&challenge, &sig).is_ok())
}

/// Index of the first certificate whose public key belongs to `key`
///
/// Certificates of other key families are skipped.
///
/// # Errors
///
/// Returns `UnsupportedAlgorithm` when no certificate shares the key's family
/// and `KeyMismatch` when some do but none matches.
pub fn find_leaf(key: &ParsedPrivateKey, certs: &[ParsedCertificate]) -> Result<usize> {
    let mut compatible = 0usize;

    for (index, cert) in certs.iter().enumerate() {
        match matches(key, cert) {
            Ok(true) => {
                tracing::debug!(
                    "Private key matches certificate {}",
                    IdentityLogger::certificate_tag(cert)
                );
                return Ok(index);
            }
            Ok(false) => compatible += 1,
            Err(PkiError::UnsupportedAlgorithm(_)) => {}
            Err(e) => return Err(e),
        }
    }

    if compatible == 0 {
        Err(PkiError::unsupported(format!(
            "No certificate uses the {:?} key family",
            key.algorithm().family()
        )))
    } else {
        Err(PkiError::KeyMismatch(format!(
            "Private key matches none of {compatible} candidate certificate(s)"
        )))
    }
}

/// Verification algorithm matching the signature made by `sign_challenge`
fn verification_algorithm(algorithm: KeyAlgorithm) -> &'static dyn signature::VerificationAlgorithm {
    match algorithm {
        KeyAlgorithm::Rsa => &signature::RSA_PKCS1_2048_8192_SHA256,
        KeyAlgorithm::EcdsaP256 => &signature::ECDSA_P256_SHA256_ASN1,
        KeyAlgorithm::EcdsaP384 => &signature::ECDSA_P384_SHA384_ASN1,
        KeyAlgorithm::Ed25519 => &signature::ED25519,
    }
}

fn sign_challenge(key: &ParsedPrivateKey, msg: &[u8], rng: &SystemRandom) -> Result<Vec<u8>> {
    let der = key.pkcs8_der();
    let rejected = |e: ring::error::KeyRejected| {
        PkiError::unsupported(format!("Private key rejected by signer: {e}"))
    };
    let failed =
        |_: ring::error::Unspecified| PkiError::unsupported("Signing the binding challenge failed");

    match key.algorithm() {
        KeyAlgorithm::Rsa => {
            let pair = RsaKeyPair::from_pkcs8(der).map_err(rejected)?;
            let mut sig = vec![0u8; pair.public().modulus_len()];
            pair.sign(&signature::RSA_PKCS1_SHA256, rng, msg, &mut sig)
                .map_err(failed)?;
            Ok(sig)
        }
        KeyAlgorithm::EcdsaP256 => {
            let pair =
                EcdsaKeyPair::from_pkcs8(&signature::ECDSA_P256_SHA256_ASN1_SIGNING, der, rng)
                    .map_err(rejected)?;
            Ok(pair.sign(rng, msg).map_err(failed)?.as_ref().to_vec())
        }
        KeyAlgorithm::EcdsaP384 => {
            let pair =
                EcdsaKeyPair::from_pkcs8(&signature::ECDSA_P384_SHA384_ASN1_SIGNING, der, rng)
                    .map_err(rejected)?;
            Ok(pair.sign(rng, msg).map_err(failed)?.as_ref().to_vec())
        }
        KeyAlgorithm::Ed25519 => {
            let pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(der).map_err(rejected)?;
            Ok(pair.sign(msg).as_ref().to_vec())
        }
    }
}
