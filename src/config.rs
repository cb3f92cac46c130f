//! Reader configuration and the context handle passed to every component.
//!
//! Configuration is layered with figment (lowest to highest priority):
//!
//! 1. Built-in defaults ([`ReaderConfig::default`])
//! 2. `blockcache.toml` in the platform config directory (or an explicit file)
//! 3. `BLOCKCACHE_*` environment variables (e.g. `BLOCKCACHE_MAX_CHAIN_LENGTH`)
//!
//! # Example
//!
//! ```no_run
//! use blockcache::config::{ReaderConfig, ReaderContext};
//!
//! let config = ReaderConfig::load();
//! let ctx = ReaderContext::new(config).with_target("forensics::cache");
//! assert!(ctx.config().max_chain_length > 0);
//! ```

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Default upper bound on records visited in one collision chain.
pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 65_536;

/// Default upper bound on a single data stream (64 MiB).
pub const DEFAULT_MAX_STREAM_SIZE: u64 = 64 * 1024 * 1024;

/// Default upper bound on a decoded body (256 MiB).
pub const DEFAULT_MAX_DECODED_SIZE: u64 = 256 * 1024 * 1024;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "BLOCKCACHE_";

/// Tunables for the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Maximum number of records walked in a single chain before the index
    /// is reported as corrupt.
    pub max_chain_length: usize,

    /// Maximum recorded size of a data stream that will be read.
    pub max_stream_size: u64,

    /// Maximum size of a body after `Content-Encoding` decoding. Bodies that
    /// expand past it are returned undecoded.
    pub max_decoded_size: u64,

    /// Apply `Content-Encoding` decoding to bodies.
    pub decode_bodies: bool,

    /// Compare the stored key bytes in addition to the hash on lookup.
    pub verify_keys: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_chain_length: DEFAULT_MAX_CHAIN_LENGTH,
            max_stream_size: DEFAULT_MAX_STREAM_SIZE,
            max_decoded_size: DEFAULT_MAX_DECODED_SIZE,
            decode_bodies: true,
            verify_keys: true,
        }
    }
}

impl ReaderConfig {
    /// Load the configuration from the default locations.
    ///
    /// Falls back to defaults if the file is malformed or invalid.
    pub fn load() -> Self {
        match Self::load_from(Self::config_path().as_deref()) {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load reader config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load the configuration using an explicit TOML file (if any).
    ///
    /// A missing file is not an error; figment simply skips it.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the layered figment without extracting it.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Reject values that would disable the reader's safety bounds.
    pub fn validate(&self) -> Result<()> {
        if self.max_chain_length == 0 {
            anyhow::bail!("max_chain_length must be at least 1");
        }
        if self.max_stream_size == 0 {
            anyhow::bail!("max_stream_size must be at least 1");
        }
        if self.max_decoded_size == 0 {
            anyhow::bail!("max_decoded_size must be at least 1");
        }
        Ok(())
    }

    /// Default platform-specific configuration file path.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "blockcache", "blockcache")
            .map(|dirs| dirs.config_dir().join("blockcache.toml"))
    }
}

/// Explicit context handed to each component: configuration plus the log
/// target used for every record the component emits.
#[derive(Debug, Clone)]
pub struct ReaderContext {
    config: ReaderConfig,
    target: Cow<'static, str>,
}

impl Default for ReaderContext {
    fn default() -> Self {
        Self::new(ReaderConfig::default())
    }
}

impl ReaderContext {
    /// Create a context with the crate's default log target.
    #[must_use]
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            target: Cow::Borrowed("blockcache"),
        }
    }

    /// Route this context's log records to a different target.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<Cow<'static, str>>) -> Self {
        self.target = target.into();
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// The log target.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}
