//! Core certificate parsing operations
//!
//! Coordinates the extraction steps and enforces the structural invariants
//! every `ParsedCertificate` carries.

use der::Decode;
use x509_cert::Certificate as X509CertCert;

use super::details_extraction::extract_certificate_details;
use super::key_extraction::extract_public_key;
use super::name_extraction::DistinguishedName;
use super::{ParsedCertificate, SignatureAlgorithm};
use crate::error::{PkiError, Result};
use crate::material::der_probe::first_child;

/// Parse one DER-encoded certificate
///
/// # Errors
///
/// Returns `MalformedEncoding` when the DER does not decode, the outer and inner
/// signature algorithms disagree, or the validity window is inverted.
pub fn parse_certificate_der(der: &[u8]) -> Result<ParsedCertificate> {
    let cert = X509CertCert::from_der(der)
        .map_err(|e| PkiError::malformed(format!("X.509 parsing failed: {e}")))?;

    let tbs = &cert.tbs_certificate;

    if cert.signature_algorithm.oid != tbs.signature.oid {
        return Err(PkiError::malformed(format!(
            "Signature algorithm {} does not match TBS algorithm {}",
            cert.signature_algorithm.oid, tbs.signature.oid
        )));
    }

    let not_before = tbs.validity.not_before.to_system_time();
    let not_after = tbs.validity.not_after.to_system_time();
    if not_before > not_after {
        return Err(PkiError::malformed("Validity window ends before it starts"));
    }

    let subject = DistinguishedName::from_name(&tbs.subject)?;
    let issuer = DistinguishedName::from_name(&tbs.issuer)?;
    let public_key = extract_public_key(&tbs.subject_public_key_info)?;
    let details = extract_certificate_details(&cert)?;

    let signature = cert
        .signature
        .as_bytes()
        .ok_or_else(|| PkiError::malformed("Signature BIT STRING has unused bits"))?
        .to_vec();

    // Signatures cover the TBS bytes exactly as encoded, so take them from the input
    let tbs_der = first_child(der)
        .ok_or_else(|| PkiError::malformed("Missing TBSCertificate"))?
        .to_vec();

    Ok(ParsedCertificate {
        subject,
        issuer,
        public_key,
        not_before,
        not_after,
        serial: tbs.serial_number.as_bytes().to_vec(),
        usage: details.usage,
        key_usage_present: details.key_usage_present,
        is_ca: details.is_ca,
        path_len: details.path_len,
        signature_algorithm: SignatureAlgorithm::from_oid(cert.signature_algorithm.oid),
        signature,
        tbs_der,
        der: der.to_vec(),
    })
}
