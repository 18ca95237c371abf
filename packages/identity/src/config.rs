//! Identity configuration
//!
//! `BindingConfig` drives a single loader. `IdentityConfig` is the serialisable
//! description of where identity files live; it never holds a passphrase.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use flagset::FlagSet;
use serde::{Deserialize, Serialize};

use crate::chain::DEFAULT_MAX_CHAIN_DEPTH;
use crate::error::{PkiError, Result};
use crate::material::Usage;

/// Side of the connection the identity is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Accepts connections
    #[default]
    Server,
    /// Initiates connections
    Client,
}

impl Role {
    /// Usage the leaf must carry for this role
    #[must_use]
    pub fn required_usage(self) -> Usage {
        match self {
            Self::Server => Usage::ServerAuth,
            Self::Client => Usage::ClientAuth,
        }
    }
}

/// Loader configuration
#[derive(Debug, Clone)]
pub struct BindingConfig {
    /// Connection side
    pub role: Role,
    /// Flags the leaf must carry
    pub required_usage: FlagSet<Usage>,
    /// Maximum chain length, leaf included
    pub max_chain_depth: usize,
    /// Base directory for relative paths
    pub cert_dir: Option<PathBuf>,
    /// Fixed verification time instead of the system clock
    pub verify_time: Option<SystemTime>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self::server()
    }
}

impl BindingConfig {
    /// Configuration for a server identity
    #[must_use]
    pub fn server() -> Self {
        Self::for_role(Role::Server)
    }

    /// Configuration for a client identity
    #[must_use]
    pub fn client() -> Self {
        Self::for_role(Role::Client)
    }

    fn for_role(role: Role) -> Self {
        Self {
            role,
            required_usage: role.required_usage().into(),
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            cert_dir: None,
            verify_time: None,
        }
    }

    /// Resolve relative paths against `dir`
    #[must_use]
    pub fn with_cert_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cert_dir = Some(dir.into());
        self
    }

    /// Limit chain length
    #[must_use]
    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth;
        self
    }

    /// Validate at a fixed time
    #[must_use]
    pub fn with_verify_time(mut self, time: SystemTime) -> Self {
        self.verify_time = Some(time);
        self
    }

    /// Override the usage required of the leaf
    #[must_use]
    pub fn with_required_usage(mut self, usage: impl Into<FlagSet<Usage>>) -> Self {
        self.required_usage = usage.into();
        self
    }

    /// Verification time
    #[must_use]
    pub fn now(&self) -> SystemTime {
        self.verify_time.unwrap_or_else(SystemTime::now)
    }

    /// Resolve `path` against `cert_dir` when it is relative
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.cert_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn default_max_chain_depth() -> usize {
    DEFAULT_MAX_CHAIN_DEPTH
}

/// File locations of an identity, as stored in configuration files
///
/// ```json
/// {
///   "cert_dir": "/etc/cryypt/certs",
///   "cert_file": "server.pem",
///   "key_file": "server.key",
///   "trust_store_file": "ca.pem",
///   "role": "server"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Certificate chain file
    pub cert_file: PathBuf,
    /// Private key file
    pub key_file: PathBuf,
    /// Trust anchor file
    pub trust_store_file: PathBuf,
    /// Base directory for relative paths
    #[serde(default)]
    pub cert_dir: Option<PathBuf>,
    /// Connection side
    #[serde(default)]
    pub role: Role,
    /// Maximum chain length
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,
}

impl IdentityConfig {
    /// Parse from JSON text
    ///
    /// # Errors
    ///
    /// Returns `MalformedEncoding` for invalid JSON or unknown fields.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PkiError::malformed(format!("Invalid identity configuration: {e}")))
    }

    /// Read and parse a JSON file
    ///
    /// # Errors
    ///
    /// Returns `Unreadable` if the file cannot be read, `MalformedEncoding` if it
    /// does not parse.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PkiError::unreadable(path, &e))?;
        Self::from_json_str(&text)
    }

    /// Loader configuration for this identity
    #[must_use]
    pub fn binding_config(&self) -> BindingConfig {
        let mut config = BindingConfig::for_role(self.role).with_max_chain_depth(self.max_chain_depth);
        config.cert_dir.clone_from(&self.cert_dir);
        config
    }
}
