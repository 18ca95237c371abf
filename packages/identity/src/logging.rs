//! Structured logging for identity loading
//!
//! Events are emitted through `tracing`; with the `log` feature they reach the
//! `env_logger` backend installed here when no tracing subscriber is set.
//! Certificates are referred to by a fingerprint tag. Key material, passphrases
//! and decrypted bytes are never logged.

use std::sync::Once;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::error::PkiError;
use crate::material::ParsedCertificate;

static INIT_LOGGER: Once = Once::new();

/// Logging helpers for the identity pipeline
pub struct IdentityLogger;

impl IdentityLogger {
    /// Initialize logging (call once at application startup)
    ///
    /// Levels come from `RUST_LOG`, e.g. `RUST_LOG=cryypt_identity=debug`.
    pub fn init() {
        INIT_LOGGER.call_once(|| {
            env_logger::Builder::from_default_env()
                .format_timestamp_micros()
                .init();

            info!("Identity logging initialized");
        });
    }

    /// Initialize logging for tests
    pub fn init_test() {
        let _ = env_logger::Builder::from_default_env()
            .is_test(true)
            .try_init();
    }

    /// Short fingerprint tag identifying a certificate in logs
    #[must_use]
    pub fn certificate_tag(cert: &ParsedCertificate) -> String {
        let hex = cert.fingerprint_hex();
        format!("#{}", &hex[..12])
    }

    /// Log a successfully loaded identity
    pub fn log_identity_loaded(leaf: &ParsedCertificate, chain_len: usize, expiry: SystemTime) {
        info!(
            "Identity loaded: {} {} (chain_len: {}, expires: {})",
            leaf.subject,
            Self::certificate_tag(leaf),
            chain_len,
            format_time(expiry)
        );
    }

    /// Log a failed load with its reason code
    pub fn log_rejection(stage: &str, err: &PkiError) {
        let reason = err.reason();
        if reason.is_security_relevant() {
            warn!(reason = %reason, "Identity rejected at {}: {}", stage, err);
        } else {
            warn!(reason = %reason, "Identity load failed at {}: {}", stage, err);
        }
    }

    /// Log a pool certificate that did not end up on the chain
    pub fn log_unused_certificate(cert: &ParsedCertificate) {
        debug!(
            "Ignoring certificate not on the chain: {} {}",
            cert.subject,
            Self::certificate_tag(cert)
        );
    }
}

/// RFC 3339 rendering of a timestamp for messages
pub(crate) fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}
