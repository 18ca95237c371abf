#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

//! Certificate and private key ingestion for secure transports
//!
//! Turns encoded certificate and key material into a validated identity:
//!
//! - [`material`] decodes DER, PEM and encrypted PKCS#8 input
//! - [`binding`] proves a private key belongs to a certificate
//! - [`chain`] orders an unordered pool into a leaf-first chain
//! - [`trust`] validates the chain against trust anchors, a clock and a usage
//! - [`loader`] runs the whole pipeline and returns an [`IdentityBundle`]
//!
//! ```no_run
//! use std::path::Path;
//! use cryypt_identity::{BindingConfig, IdentityLoader};
//!
//! let loader = IdentityLoader::new(BindingConfig::server().with_cert_dir("/etc/certs"));
//! let bundle = loader.load(
//!     Path::new("server.pem"),
//!     Path::new("server.key"),
//!     None,
//!     Path::new("ca.pem"),
//! )?;
//! println!("{} valid until {:?}", bundle.leaf().subject, bundle.effective_expiry());
//! # Ok::<(), cryypt_identity::PkiError>(())
//! ```

pub mod binding;
pub mod bundle;
pub mod chain;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod material;
pub mod trust;

mod oids;

pub use bundle::IdentityBundle;
pub use chain::{CertificateChain, ChainBuilder, DEFAULT_MAX_CHAIN_DEPTH, LeafHint};
pub use config::{BindingConfig, IdentityConfig, Role};
pub use error::{PkiError, ReasonCode, Result};
pub use loader::{IdentityLoader, load};
pub use logging::IdentityLogger;
pub use material::{
    ContainerFormat, DistinguishedName, EncodedBlob, KeyAlgorithm, MaterialKind, ParsedCertificate,
    ParsedMaterial, ParsedPrivateKey, Usage, parse, parse_certificates, parse_private_key,
};
pub use trust::{
    RejectReason, TrustAnchorSet, TrustStore, TrustValidator, ValidationVerdict, validate,
};

// Passphrases are handed in as `SecretString`; re-exported so callers need not
// depend on `secrecy` directly.
pub use secrecy::SecretString;
