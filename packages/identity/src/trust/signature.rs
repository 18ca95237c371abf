//! Certificate signature verification with ring

use ring::signature::{self, UnparsedPublicKey};

use crate::error::{PkiError, Result};
use crate::material::{ParsedCertificate, PublicKeyAlgorithm, SignatureAlgorithm};

/// ring verification algorithm for a signature made with an issuer key
///
/// For ECDSA the digest comes from the signature algorithm and the curve from
/// the issuer key.
fn verification_algorithm(
    signature_algorithm: SignatureAlgorithm,
    issuer_key: PublicKeyAlgorithm,
) -> Option<&'static dyn signature::VerificationAlgorithm> {
    use PublicKeyAlgorithm as K;
    use SignatureAlgorithm as S;

    let algorithm: &'static dyn signature::VerificationAlgorithm =
        match (signature_algorithm, issuer_key) {
            (S::RsaPkcs1Sha256, K::Rsa) => &signature::RSA_PKCS1_2048_8192_SHA256,
            (S::RsaPkcs1Sha384, K::Rsa) => &signature::RSA_PKCS1_2048_8192_SHA384,
            (S::RsaPkcs1Sha512, K::Rsa) => &signature::RSA_PKCS1_2048_8192_SHA512,
            (S::EcdsaSha256, K::EcdsaP256) => &signature::ECDSA_P256_SHA256_ASN1,
            (S::EcdsaSha384, K::EcdsaP256) => &signature::ECDSA_P256_SHA384_ASN1,
            (S::EcdsaSha256, K::EcdsaP384) => &signature::ECDSA_P384_SHA256_ASN1,
            (S::EcdsaSha384, K::EcdsaP384) => &signature::ECDSA_P384_SHA384_ASN1,
            (S::Ed25519, K::Ed25519) => &signature::ED25519,
            _ => return None,
        };
    Some(algorithm)
}

/// Verify that `issuer`'s key signed `cert`
///
/// # Errors
///
/// Returns `SignatureInvalid` when the signature does not verify or the
/// algorithm pairing is not supported.
pub fn verify_signed_by(cert: &ParsedCertificate, issuer: &ParsedCertificate) -> Result<()> {
    let algorithm = verification_algorithm(cert.signature_algorithm, issuer.public_key.algorithm)
        .ok_or_else(|| {
            PkiError::SignatureInvalid(format!(
                "Unsupported signature algorithm {:?} with {} issuer key for '{}'",
                cert.signature_algorithm,
                issuer.public_key.algorithm.name(),
                cert.subject
            ))
        })?;

    UnparsedPublicKey::new(algorithm, &issuer.public_key.key)
        .verify(&cert.tbs_der, &cert.signature)
        .map_err(|_| {
            PkiError::SignatureInvalid(format!(
                "Signature on '{}' does not verify with the key of '{}'",
                cert.subject, issuer.subject
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecdsa_curve_comes_from_issuer() {
        use PublicKeyAlgorithm as K;
        use SignatureAlgorithm as S;

        assert!(verification_algorithm(S::EcdsaSha384, K::EcdsaP256).is_some());
        assert!(verification_algorithm(S::EcdsaSha256, K::Rsa).is_none());
        assert!(verification_algorithm(S::Ed25519, K::Ed25519).is_some());
        assert!(verification_algorithm(S::Other(crate::oids::PBES2), K::Rsa).is_none());
    }
}
