//! Configuration types for the alias directory
//!
//! This module defines all configuration structures used throughout the crate.
//! The configuration is loaded once at startup, validated, and then passed
//! explicitly to every component that needs it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::catalog::{Endpoint, EndpointCatalog};
use crate::codec;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasConfig {
    /// Domain the aliases live under (e.g., "example.com")
    pub domain: String,

    /// Label prepended to the domain to form the TXT record name
    pub record_prefix: String,

    /// Catch-all destination, stored as the sentinel segment
    pub default_email: String,

    /// Remote record store configuration
    pub store: StoreConfig,

    /// Forwarding destinations, in catalog order
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl AliasConfig {
    /// Create a new configuration with an empty catalog
    pub fn new(
        domain: impl Into<String>,
        record_prefix: impl Into<String>,
        default_email: impl Into<String>,
        store: StoreConfig,
    ) -> Self {
        Self {
            domain: domain.into(),
            record_prefix: record_prefix.into(),
            default_email: default_email.into(),
            store,
            endpoints: Vec::new(),
            engine: EngineConfig::default(),
        }
    }

    /// Add an endpoint to the catalog
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Fully qualified name of the TXT record
    pub fn record_name(&self) -> String {
        format!("{}.{}", self.record_prefix, self.domain)
    }

    /// Build the endpoint catalog
    pub fn catalog(&self) -> EndpointCatalog {
        EndpointCatalog::new(self.endpoints.clone())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.trim().is_empty() {
            return Err(crate::Error::config("Domain cannot be empty"));
        }
        if self.record_prefix.trim().is_empty() {
            return Err(crate::Error::config("Record prefix cannot be empty"));
        }
        codec::validate_email(&self.default_email)
            .map_err(|e| crate::Error::config(format!("Default email: {e}")))?;

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            codec::validate_email(&endpoint.email)
                .map_err(|e| crate::Error::config(format!("Endpoint email: {e}")))?;
            if !seen.insert(endpoint.email.as_str()) {
                return Err(crate::Error::config(format!(
                    "Duplicate endpoint email: {}",
                    endpoint.email
                )));
            }
        }

        self.store.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// Remote record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Cloudflare API v4
    Cloudflare {
        /// Cloudflare API token
        #[serde(default)]
        api_token: String,
        /// Zone ID (optional, looked up from the domain when absent)
        #[serde(default)]
        zone_id: Option<String>,
        /// Per-request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        /// Log writes instead of sending them
        #[serde(default)]
        dry_run: bool,
        /// API base URL override
        #[serde(default)]
        api_base: Option<String>,
    },

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        #[serde(default)]
        config: serde_json::Value,
    },
}

impl StoreConfig {
    /// Cloudflare store with defaults
    pub fn cloudflare(api_token: impl Into<String>) -> Self {
        StoreConfig::Cloudflare {
            api_token: api_token.into(),
            zone_id: None,
            timeout_secs: default_timeout_secs(),
            dry_run: false,
            api_base: None,
        }
    }

    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Cloudflare {
                api_token,
                timeout_secs,
                ..
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if !(1..=300).contains(timeout_secs) {
                    return Err(crate::Error::config(format!(
                        "Store timeout must be between 1 and 300 seconds. Got: {}",
                        timeout_secs
                    )));
                }
                Ok(())
            }
            StoreConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom store factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Cloudflare { .. } => "cloudflare",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }

    /// Replace the API token, for stores that have one
    ///
    /// Tokens belong in the environment; this lets the front end override
    /// whatever the file carries.
    pub fn set_api_token(&mut self, token: impl Into<String>) {
        if let StoreConfig::Cloudflare { api_token, .. } = self {
            *api_token = token.into();
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the notice channel
    ///
    /// When full, operations wait until the receiver catches up.
    #[serde(default = "default_notice_channel_capacity")]
    pub notice_channel_capacity: usize,
}

impl EngineConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.notice_channel_capacity == 0 {
            return Err(crate::Error::config("Notice channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            notice_channel_capacity: default_notice_channel_capacity(),
        }
    }
}

fn default_notice_channel_capacity() -> usize {
    256
}
