//! Transport binding facade
//!
//! Single entry point for connection setup: parse, bind, build, validate. The
//! first failure short-circuits and is returned unchanged; nothing is retried.

use std::path::Path;

use secrecy::SecretString;

use crate::binding::find_leaf;
use crate::bundle::IdentityBundle;
use crate::chain::{ChainBuilder, LeafHint};
use crate::config::{BindingConfig, IdentityConfig};
use crate::error::Result;
use crate::logging::IdentityLogger;
use crate::material::{EncodedBlob, parse_certificates, parse_private_key};
use crate::trust::{TrustAnchorSet, TrustStore, validate};

/// Loads and validates identities according to a `BindingConfig`
///
/// Holds no mutable state; one loader can serve concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct IdentityLoader {
    config: BindingConfig,
}

impl IdentityLoader {
    /// Loader with the given configuration
    #[must_use]
    pub fn new(config: BindingConfig) -> Self {
        Self { config }
    }

    /// Loader configured from an `IdentityConfig`
    #[must_use]
    pub fn from_identity_config(identity: &IdentityConfig) -> Self {
        Self::new(identity.binding_config())
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Load an identity from files
    ///
    /// Relative paths are resolved against the configured `cert_dir`.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any stage; see `PkiError::reason`.
    pub fn load(
        &self,
        cert_path: &Path,
        key_path: &Path,
        passphrase: Option<&SecretString>,
        trust_store_path: &Path,
    ) -> Result<IdentityBundle> {
        let anchors = stage(
            "read trust store",
            TrustAnchorSet::from_path(&self.config.resolve(trust_store_path)),
        )?;
        self.load_files_with_anchors(cert_path, key_path, passphrase, &anchors)
    }

    /// Load an identity from files, validating against a shared trust store
    ///
    /// # Errors
    ///
    /// Returns the first failure of any stage.
    pub fn load_with_store(
        &self,
        cert_path: &Path,
        key_path: &Path,
        passphrase: Option<&SecretString>,
        store: &TrustStore,
    ) -> Result<IdentityBundle> {
        let anchors = store.current();
        self.load_files_with_anchors(cert_path, key_path, passphrase, &anchors)
    }

    /// Load the identity described by `identity`
    ///
    /// Directory, role and depth limit come from `identity`; only the
    /// verification time is taken from this loader.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any stage.
    pub fn load_identity(
        &self,
        identity: &IdentityConfig,
        passphrase: Option<&SecretString>,
    ) -> Result<IdentityBundle> {
        let mut config = identity.binding_config();
        config.verify_time = self.config.verify_time;
        Self::new(config).load(
            &identity.cert_file,
            &identity.key_file,
            passphrase,
            &identity.trust_store_file,
        )
    }

    /// Load an identity, reading the files with tokio
    ///
    /// Only file access is asynchronous; parsing and validation run inline.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any stage.
    pub async fn load_async(
        &self,
        cert_path: &Path,
        key_path: &Path,
        passphrase: Option<&SecretString>,
        trust_store_path: &Path,
    ) -> Result<IdentityBundle> {
        let cert_blob = stage(
            "read certificate",
            EncodedBlob::from_path_async(&self.config.resolve(cert_path)).await,
        )?;
        let key_blob = stage(
            "read private key",
            EncodedBlob::from_path_async(&self.config.resolve(key_path)).await,
        )?;
        let anchor_blob = stage(
            "read trust store",
            EncodedBlob::from_path_async(&self.config.resolve(trust_store_path)).await,
        )?;
        let anchors = stage("parse trust store", TrustAnchorSet::from_blob(&anchor_blob))?;

        self.load_from_blobs(&cert_blob, &key_blob, passphrase, &anchors)
    }

    /// Load an identity from in-memory material
    ///
    /// # Errors
    ///
    /// Returns the first failure of any stage.
    pub fn load_from_blobs(
        &self,
        cert_blob: &EncodedBlob,
        key_blob: &EncodedBlob,
        passphrase: Option<&SecretString>,
        anchors: &TrustAnchorSet,
    ) -> Result<IdentityBundle> {
        let pool = stage("parse certificates", parse_certificates(cert_blob))?;
        let key = stage("parse private key", parse_private_key(key_blob, passphrase))?;

        let leaf = stage("bind private key", find_leaf(&key, &pool))?;
        let hint = LeafHint::for_certificate(&pool[leaf]);

        let chain = stage(
            "build chain",
            ChainBuilder::new()
                .max_depth(self.config.max_chain_depth)
                .anchors(anchors)
                .build(pool, Some(&hint)),
        )?;

        let verdict = validate(&chain, anchors, self.config.now(), self.config.required_usage);
        let effective_expiry = stage("validate chain", verdict.into_result())?;

        IdentityLogger::log_identity_loaded(chain.leaf(), chain.len(), effective_expiry);
        Ok(IdentityBundle::new(key, chain, effective_expiry))
    }

    fn load_files_with_anchors(
        &self,
        cert_path: &Path,
        key_path: &Path,
        passphrase: Option<&SecretString>,
        anchors: &TrustAnchorSet,
    ) -> Result<IdentityBundle> {
        let cert_blob = stage(
            "read certificate",
            EncodedBlob::from_path(&self.config.resolve(cert_path)),
        )?;
        let key_blob = stage(
            "read private key",
            EncodedBlob::from_path(&self.config.resolve(key_path)),
        )?;
        self.load_from_blobs(&cert_blob, &key_blob, passphrase, anchors)
    }
}

/// Log a failing stage with its reason code and pass the result through
fn stage<T>(name: &str, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        IdentityLogger::log_rejection(name, &e);
        e
    })
}

/// Load a server identity with the default configuration
///
/// # Errors
///
/// Returns the first failure of any stage.
pub fn load(
    cert_path: &Path,
    key_path: &Path,
    passphrase: Option<&SecretString>,
    trust_store_path: &Path,
) -> Result<IdentityBundle> {
    IdentityLoader::default().load(cert_path, key_path, passphrase, trust_store_path)
}
