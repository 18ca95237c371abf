//! Integration tests for the identity loading pipeline

#![allow(clippy::uninlined_format_args)]

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{Fixture, Hierarchy, Profile, at, now};
use cryypt_identity::{
    BindingConfig, EncodedBlob, IdentityConfig, IdentityLoader, IdentityLogger, ReasonCode,
    SecretString, TrustStore,
};
use tempfile::TempDir;

/// Identity files laid out in a temporary directory
struct Workspace {
    dir: TempDir,
    hierarchy: Hierarchy,
}

impl Workspace {
    fn new() -> Self {
        Self::with(Hierarchy::new())
    }

    fn with(hierarchy: Hierarchy) -> Self {
        IdentityLogger::init_test();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("server.pem"), hierarchy.served_pem()).expect("write");
        std::fs::write(dir.path().join("server.key"), hierarchy.leaf.key_pem()).expect("write");
        std::fs::write(dir.path().join("ca.pem"), hierarchy.root.pem()).expect("write");
        Self { dir, hierarchy }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn loader(&self) -> IdentityLoader {
        IdentityLoader::new(
            BindingConfig::server()
                .with_cert_dir(self.dir.path())
                .with_verify_time(now()),
        )
    }
}

#[test]
fn test_load_from_cert_dir() {
    let ws = Workspace::new();
    let bundle = ws
        .loader()
        .load(
            Path::new("server.pem"),
            Path::new("server.key"),
            None,
            Path::new("ca.pem"),
        )
        .expect("Identity loads");

    assert_eq!(bundle.chain().len(), 2);
    assert_eq!(bundle.leaf().subject.common_name(), Some("server.test"));
    assert_eq!(bundle.effective_expiry(), at(common::Y2035));
    assert!(bundle.is_current(now()));
    assert!(!bundle.is_current(at(common::Y2040)));

    let certs = bundle.certificate_chain_der();
    assert_eq!(certs.len(), 2);
    assert_eq!(certs[0].as_ref(), ws.hierarchy.leaf.der().as_slice());
    assert_eq!(
        bundle.private_key_der().secret_der(),
        ws.hierarchy.leaf.key.serialize_der().as_slice()
    );
}

#[test]
fn test_absolute_paths_ignore_cert_dir() {
    let ws = Workspace::new();
    let loader = IdentityLoader::new(
        BindingConfig::server()
            .with_cert_dir("/nonexistent")
            .with_verify_time(now()),
    );
    let bundle = loader
        .load(
            &ws.path("server.pem"),
            &ws.path("server.key"),
            None,
            &ws.path("ca.pem"),
        )
        .expect("Identity loads");
    assert_eq!(bundle.chain().len(), 2);
}

#[test]
fn test_missing_file_is_unreadable() {
    let ws = Workspace::new();
    let err = ws
        .loader()
        .load(
            Path::new("missing.pem"),
            Path::new("server.key"),
            None,
            Path::new("ca.pem"),
        )
        .expect_err("File does not exist");
    assert_eq!(err.reason(), ReasonCode::Unreadable);
}

#[test]
fn test_foreign_key_is_rejected() {
    let ws = Workspace::new();
    let stranger = Fixture::self_signed(&Profile::leaf("stranger.test"));
    std::fs::write(ws.path("stranger.key"), stranger.key_pem()).expect("write");

    let err = ws
        .loader()
        .load(
            Path::new("server.pem"),
            Path::new("stranger.key"),
            None,
            Path::new("ca.pem"),
        )
        .expect_err("Key belongs to another certificate");
    assert_eq!(err.reason(), ReasonCode::KeyMismatch);
}

#[test]
fn test_expired_identity_is_rejected() {
    let ws = Workspace::new();
    let loader = IdentityLoader::new(
        BindingConfig::server()
            .with_cert_dir(ws.dir.path())
            .with_verify_time(at(common::Y2035 + 1)),
    );
    let err = loader
        .load(
            Path::new("server.pem"),
            Path::new("server.key"),
            None,
            Path::new("ca.pem"),
        )
        .expect_err("Leaf has expired");
    assert_eq!(err.reason(), ReasonCode::Expired);
}

#[test]
fn test_client_role_requires_client_usage() {
    let ws = Workspace::new();
    let loader = IdentityLoader::new(
        BindingConfig::client()
            .with_cert_dir(ws.dir.path())
            .with_verify_time(now()),
    );
    let err = loader
        .load(
            Path::new("server.pem"),
            Path::new("server.key"),
            None,
            Path::new("ca.pem"),
        )
        .expect_err("Server leaf used as client");
    assert_eq!(err.reason(), ReasonCode::UsageMismatch);
}

#[test]
fn test_load_from_blobs_with_encrypted_key() {
    let h = Hierarchy::new();
    let der = h.leaf.key.serialize_der();
    let info = pkcs8::PrivateKeyInfo::try_from(der.as_slice()).expect("Valid PKCS#8");
    let params = pkcs8::pkcs5::pbes2::Parameters::pbkdf2_sha256_aes256cbc(
        2048,
        b"fedcba9876543210",
        &[3u8; 16],
    )
    .expect("Valid PBES2 parameters");
    let encrypted = info
        .encrypt_with_params(params, "s3cret")
        .expect("Failed to encrypt key");

    let loader = IdentityLoader::new(BindingConfig::server().with_verify_time(now()));
    let cert_blob = EncodedBlob::pem(h.served_pem());
    let key_blob = EncodedBlob::der(encrypted.as_bytes().to_vec());
    let anchors = h.root.anchors();

    let pass = SecretString::from("s3cret");
    let bundle = loader
        .load_from_blobs(&cert_blob, &key_blob, Some(&pass), &anchors)
        .expect("Identity loads");
    assert!(bundle.private_key().passphrase().is_some());

    let err = loader
        .load_from_blobs(&cert_blob, &key_blob, None, &anchors)
        .expect_err("Passphrase required");
    assert_eq!(err.reason(), ReasonCode::DecryptionFailed);
}

#[test]
fn test_trust_store_swap() {
    let ws = Workspace::new();
    let other = Fixture::self_signed(&Profile::ca("Other Root"));
    let store = TrustStore::new(other.anchors());
    let loader = ws.loader();

    let load = |store: &TrustStore| {
        loader.load_with_store(
            Path::new("server.pem"),
            Path::new("server.key"),
            None,
            store,
        )
    };

    let err = load(&store).expect_err("Root not trusted yet");
    assert_eq!(err.reason(), ReasonCode::UntrustedRoot);

    let previous = store.replace(ws.hierarchy.root.anchors());
    assert_eq!(previous.len(), 1);
    load(&store).expect("Root trusted after swap");

    store
        .reload_from_path(&ws.path("ca.pem"))
        .expect("Reload from file");
    load(&store).expect("Still trusted after reload");
}

#[test]
fn test_concurrent_loads_share_loader() {
    let ws = Workspace::new();
    let loader = Arc::new(ws.loader());
    let store = Arc::new(TrustStore::new(ws.hierarchy.root.anchors()));

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let loader = Arc::clone(&loader);
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    loader
                        .load_with_store(
                            Path::new("server.pem"),
                            Path::new("server.key"),
                            None,
                            &store,
                        )
                        .map(|bundle| bundle.leaf().fingerprint())
                })
            })
            .collect();

        let expected = ws.hierarchy.leaf.parsed().fingerprint();
        for handle in handles {
            let fingerprint = handle
                .join()
                .expect("Thread panicked")
                .expect("Identity loads");
            assert_eq!(fingerprint, expected);
        }
    });
}

#[test]
fn test_load_identity_from_config_file() {
    let ws = Workspace::new();
    let config = format!(
        r#"{{"cert_dir": {:?}, "cert_file": "server.pem", "key_file": "server.key",
            "trust_store_file": "ca.pem", "role": "server", "max_chain_depth": 4}}"#,
        ws.dir.path().display().to_string()
    );
    std::fs::write(ws.path("identity.json"), config).expect("write");

    let identity = IdentityConfig::from_json_file(&ws.path("identity.json")).expect("Config");
    let mut binding = identity.binding_config();
    binding.verify_time = Some(now());
    let loader = IdentityLoader::new(binding);
    assert_eq!(loader.config().max_chain_depth, 4);

    let bundle = loader.load_identity(&identity, None).expect("Identity loads");
    assert_eq!(bundle.chain().len(), 2);
}

#[test]
fn test_load_identity_uses_its_own_settings() {
    let ws = Workspace::new();
    let identity = |role: &str| {
        IdentityConfig::from_json_str(&format!(
            r#"{{"cert_dir": {:?}, "cert_file": "server.pem", "key_file": "server.key",
                "trust_store_file": "ca.pem", "role": {:?}}}"#,
            ws.dir.path().display().to_string(),
            role
        ))
        .expect("Config")
    };

    // No cert_dir and the opposite role on the loader itself
    let loader = IdentityLoader::new(BindingConfig::client().with_verify_time(now()));
    let bundle = loader
        .load_identity(&identity("server"), None)
        .expect("Server identity loads");
    assert_eq!(bundle.chain().len(), 2);

    let loader = IdentityLoader::new(BindingConfig::server().with_verify_time(now()));
    let err = loader
        .load_identity(&identity("client"), None)
        .expect_err("Server leaf used as client");
    assert_eq!(err.reason(), ReasonCode::UsageMismatch);
}

#[test]
fn test_load_with_trusted_intermediate() {
    let ws = Workspace::new();
    std::fs::write(ws.path("intermediate.pem"), ws.hierarchy.intermediate.pem()).expect("write");

    let bundle = ws
        .loader()
        .load(
            Path::new("server.pem"),
            Path::new("server.key"),
            None,
            Path::new("intermediate.pem"),
        )
        .expect("Identity loads under the intermediate");
    assert_eq!(bundle.chain().len(), 2);
    assert_eq!(bundle.effective_expiry(), at(common::Y2035));
}

#[tokio::test]
async fn test_load_async() {
    let ws = Workspace::new();
    let bundle = ws
        .loader()
        .load_async(
            Path::new("server.pem"),
            Path::new("server.key"),
            None,
            Path::new("ca.pem"),
        )
        .await
        .expect("Identity loads");
    assert_eq!(bundle.chain().len(), 2);

    let err = ws
        .loader()
        .load_async(
            Path::new("server.pem"),
            Path::new("server.key"),
            None,
            Path::new("missing-ca.pem"),
        )
        .await
        .expect_err("Trust store missing");
    assert_eq!(err.reason(), ReasonCode::Unreadable);
}
