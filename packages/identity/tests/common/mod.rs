//! Certificate fixtures generated with rcgen

#![allow(dead_code)]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cryypt_identity::{EncodedBlob, ParsedCertificate, TrustAnchorSet};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose,
};

pub const Y2020: u64 = 1_577_836_800;
pub const Y2025: u64 = 1_735_689_600;
pub const Y2030: u64 = 1_893_456_000;
pub const Y2031: u64 = 1_924_992_000;
pub const Y2033: u64 = 1_988_150_400;
pub const Y2035: u64 = 2_051_222_400;
pub const Y2040: u64 = 2_208_988_800;

/// 2048-bit RSA key as `RSA PRIVATE KEY` PEM, DER and PKCS#8 PEM
pub const RSA_PKCS1_PEM: &str = include_str!("../fixtures/rsa-2048.pkcs1.pem");
pub const RSA_PKCS1_DER: &[u8] = include_bytes!("../fixtures/rsa-2048.pkcs1.der");
pub const RSA_PKCS8_PEM: &str = include_str!("../fixtures/rsa-2048.pkcs8.pem");

/// P-256 key as bare SEC1 DER and as PKCS#8 PEM
pub const P256_SEC1_DER: &[u8] = include_bytes!("../fixtures/p256.sec1.der");
pub const P256_PKCS8_PEM: &str = include_str!("../fixtures/p256.pkcs8.pem");

/// Verification time used throughout the tests
pub fn now() -> SystemTime {
    at(Y2030)
}

pub fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// How a fixture certificate is issued
#[derive(Clone)]
pub struct Profile {
    name: String,
    ca: Option<BasicConstraints>,
    eku: Vec<ExtendedKeyUsagePurpose>,
    not_before: (i32, u8, u8),
    not_after: (i32, u8, u8),
    algorithm: &'static rcgen::SignatureAlgorithm,
}

impl Profile {
    /// CA valid 2020..2040
    pub fn ca(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ca: Some(BasicConstraints::Unconstrained),
            eku: Vec::new(),
            not_before: (2020, 1, 1),
            not_after: (2040, 1, 1),
            algorithm: &rcgen::PKCS_ECDSA_P256_SHA256,
        }
    }

    /// Server leaf valid 2020..2035
    pub fn leaf(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ca: None,
            eku: vec![ExtendedKeyUsagePurpose::ServerAuth],
            not_before: (2020, 1, 1),
            not_after: (2035, 1, 1),
            algorithm: &rcgen::PKCS_ECDSA_P256_SHA256,
        }
    }

    pub fn path_len(mut self, len: u8) -> Self {
        self.ca = Some(BasicConstraints::Constrained(len));
        self
    }

    pub fn eku(mut self, eku: Vec<ExtendedKeyUsagePurpose>) -> Self {
        self.eku = eku;
        self
    }

    pub fn valid(mut self, not_before: (i32, u8, u8), not_after: (i32, u8, u8)) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn algorithm(mut self, algorithm: &'static rcgen::SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    fn params(&self) -> CertificateParams {
        let mut params = CertificateParams::new(Vec::<String>::new())
            .expect("Failed to create certificate parameters");

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, self.name.as_str());
        dn.push(DnType::OrganizationName, "Cryypt Test");
        params.distinguished_name = dn;

        let (y, m, d) = self.not_before;
        params.not_before = rcgen::date_time_ymd(y, m, d);
        let (y, m, d) = self.not_after;
        params.not_after = rcgen::date_time_ymd(y, m, d);

        match &self.ca {
            Some(constraints) => {
                params.is_ca = IsCa::Ca(constraints.clone());
                params.key_usages = vec![
                    KeyUsagePurpose::KeyCertSign,
                    KeyUsagePurpose::CrlSign,
                    KeyUsagePurpose::DigitalSignature,
                ];
            }
            None => {
                params.is_ca = IsCa::ExplicitNoCa;
                params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
                params.extended_key_usages = self.eku.clone();
            }
        }
        params
    }
}

/// Generated certificate with its key
pub struct Fixture {
    pub cert: Certificate,
    pub key: KeyPair,
    params: CertificateParams,
}

impl Fixture {
    /// Self-signed certificate
    pub fn self_signed(profile: &Profile) -> Self {
        let params = profile.params();
        let key = KeyPair::generate_for(profile.algorithm).expect("Failed to generate key pair");
        let cert = params
            .self_signed(&key)
            .expect("Failed to create self-signed certificate");
        Self { cert, key, params }
    }

    /// Certificate issued by `issuer`
    pub fn issued_by(profile: &Profile, issuer: &Fixture) -> Self {
        let params = profile.params();
        let key = KeyPair::generate_for(profile.algorithm).expect("Failed to generate key pair");
        let cert = params
            .signed_by(&key, &issuer.issuer())
            .expect("Failed to sign certificate");
        Self { cert, key, params }
    }

    /// Certificate for an existing key, self-signed when `issuer` is `None`
    ///
    /// The signature algorithm follows the key, not the profile.
    pub fn with_key(profile: &Profile, key_pem: &str, issuer: Option<&Fixture>) -> Self {
        let params = profile.params();
        let key = KeyPair::from_pem(key_pem).expect("Failed to load key pair");
        let cert = match issuer {
            Some(issuer) => params.signed_by(&key, &issuer.issuer()),
            None => params.self_signed(&key),
        }
        .expect("Failed to create certificate");
        Self { cert, key, params }
    }

    /// Same subject and key as `self`, signed by `issuer`
    pub fn reissued_by(&self, issuer: &Fixture) -> Certificate {
        self.params
            .signed_by(&self.key, &issuer.issuer())
            .expect("Failed to sign certificate")
    }

    fn issuer(&self) -> Issuer<'static, KeyPair> {
        let key = KeyPair::from_pem(&self.key.serialize_pem()).expect("Failed to copy key pair");
        Issuer::new(self.params.clone(), key)
    }

    pub fn der(&self) -> Vec<u8> {
        self.cert.der().to_vec()
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    pub fn parsed(&self) -> ParsedCertificate {
        ParsedCertificate::from_der(self.cert.der()).expect("Failed to parse fixture certificate")
    }

    pub fn key_pem(&self) -> String {
        self.key.serialize_pem()
    }

    pub fn key_blob(&self) -> EncodedBlob {
        EncodedBlob::pem(self.key_pem())
    }

    pub fn anchors(&self) -> TrustAnchorSet {
        TrustAnchorSet::new([self.parsed()])
    }
}

/// Root, intermediate and server leaf with default validity
pub struct Hierarchy {
    pub root: Fixture,
    pub intermediate: Fixture,
    pub leaf: Fixture,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::with_leaf(Profile::leaf("server.test"))
    }

    pub fn with_leaf(leaf: Profile) -> Self {
        let root = Fixture::self_signed(&Profile::ca("Test Root CA"));
        let intermediate = Fixture::issued_by(&Profile::ca("Test Intermediate CA"), &root);
        let leaf = Fixture::issued_by(&leaf, &intermediate);
        Self {
            root,
            intermediate,
            leaf,
        }
    }

    /// Leaf followed by the intermediate, as served on the wire
    pub fn served_pem(&self) -> String {
        format!("{}{}", self.leaf.pem(), self.intermediate.pem())
    }
}
