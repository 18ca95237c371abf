//! Certificate extension details
//!
//! Extracts `BasicConstraints`, `KeyUsage` and `ExtendedKeyUsage` into the
//! flat usage model used by the validator.

use der::Decode;
use flagset::{FlagSet, flags};
use x509_cert::Certificate as X509CertCert;
use x509_cert::ext::pkix::{BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages};

use crate::error::{PkiError, Result};
use crate::oids;

flags! {
    /// Capabilities a certificate is permitted to exercise
    pub enum Usage: u16 {
        /// KeyUsage digitalSignature
        DigitalSignature,
        /// KeyUsage keyEncipherment
        KeyEncipherment,
        /// KeyUsage keyAgreement
        KeyAgreement,
        /// KeyUsage keyCertSign
        KeyCertSign,
        /// KeyUsage cRLSign
        CrlSign,
        /// ExtendedKeyUsage id-kp-serverAuth
        ServerAuth,
        /// ExtendedKeyUsage id-kp-clientAuth
        ClientAuth,
    }
}

/// Extension-derived facts about a certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct CertificateDetails {
    pub(super) usage: FlagSet<Usage>,
    pub(super) key_usage_present: bool,
    pub(super) is_ca: bool,
    pub(super) path_len: Option<u8>,
}

const KEY_USAGE_MAP: [(KeyUsages, Usage); 5] = [
    (KeyUsages::DigitalSignature, Usage::DigitalSignature),
    (KeyUsages::KeyEncipherment, Usage::KeyEncipherment),
    (KeyUsages::KeyAgreement, Usage::KeyAgreement),
    (KeyUsages::KeyCertSign, Usage::KeyCertSign),
    (KeyUsages::CRLSign, Usage::CrlSign),
];

/// Extract extension details using x509-cert
pub(super) fn extract_certificate_details(cert: &X509CertCert) -> Result<CertificateDetails> {
    let mut details = CertificateDetails {
        usage: FlagSet::default(),
        key_usage_present: false,
        is_ca: false,
        path_len: None,
    };

    let Some(extensions) = &cert.tbs_certificate.extensions else {
        return Ok(details);
    };

    for ext in extensions {
        let value = ext.extn_value.as_bytes();

        if ext.extn_id == oids::BASIC_CONSTRAINTS {
            let bc = BasicConstraints::from_der(value)
                .map_err(|e| PkiError::malformed(format!("Invalid BasicConstraints: {e}")))?;
            details.is_ca = bc.ca;
            details.path_len = bc.path_len_constraint;
        } else if ext.extn_id == oids::KEY_USAGE {
            let ku = KeyUsage::from_der(value)
                .map_err(|e| PkiError::malformed(format!("Invalid KeyUsage: {e}")))?;
            details.key_usage_present = true;
            for (bit, usage) in KEY_USAGE_MAP {
                if ku.0.contains(bit) {
                    details.usage |= usage;
                }
            }
        } else if ext.extn_id == oids::EXTENDED_KEY_USAGE {
            let eku = ExtendedKeyUsage::from_der(value)
                .map_err(|e| PkiError::malformed(format!("Invalid ExtendedKeyUsage: {e}")))?;
            details.usage |= extended_usage(&eku);
        }
    }

    Ok(details)
}

fn extended_usage(eku: &ExtendedKeyUsage) -> FlagSet<Usage> {
    let mut usage = FlagSet::default();
    for purpose in &eku.0 {
        if *purpose == oids::KP_SERVER_AUTH {
            usage |= Usage::ServerAuth;
        } else if *purpose == oids::KP_CLIENT_AUTH {
            usage |= Usage::ClientAuth;
        } else if *purpose == oids::ANY_EXTENDED_KEY_USAGE {
            usage |= Usage::ServerAuth | Usage::ClientAuth;
        }
    }
    usage
}
