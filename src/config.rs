//! Admission control configuration.
//!
//! The struct is deserializable with serde so a host can load it from any
//! format it already uses; the CLI reads YAML.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::evaluator::DefaultAction;
use crate::rule::{Rule, RuleList};

/// Default status returned for rejected requests (403 Forbidden).
pub const DEFAULT_DISALLOWED_STATUS: u16 = 403;

/// Private and loopback ranges blocked by default.
pub const DEFAULT_BLOCKLIST: &[&str] = &[
    "127.0.0.0/8",    // IPv4 loopback
    "10.0.0.0/8",     // RFC1918
    "172.16.0.0/12",  // RFC1918
    "192.168.0.0/16", // RFC1918
    "169.254.0.0/16", // RFC3927 link-local
    "::1/128",        // IPv6 loopback
    "fe80::/10",      // IPv6 link-local
    "fc00::/7",       // IPv6 unique local addr
];

/// Configuration for a [`Guard`](crate::Guard).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Enable admission control; a disabled guard passes everything
    pub enabled: bool,
    /// Let ACME HTTP-01 challenge requests through
    pub allow_lets_encrypt: bool,
    /// Database paths, one per address family
    pub databases: Vec<PathBuf>,
    /// Embedded asset bundle used when a database file is absent
    pub assets: Option<PathBuf>,
    /// HTTP status for rejected requests
    pub disallowed_status_code: u16,
    /// Verdict when no rule matches
    pub default_action: DefaultAction,
    pub allowlist: Vec<Rule>,
    pub blocklist: Vec<Rule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_lets_encrypt: true,
            databases: Vec::new(),
            assets: None,
            disallowed_status_code: DEFAULT_DISALLOWED_STATUS,
            default_action: DefaultAction::Block,
            allowlist: Vec::new(),
            blocklist: DEFAULT_BLOCKLIST.iter().map(|cidr| Rule::cidr(*cidr)).collect(),
        }
    }
}

impl Config {
    /// Load a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a YAML configuration. Missing fields take their defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// A disabled configuration only needs a valid default action, which
    /// serde already enforces.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if !(400..=599).contains(&self.disallowed_status_code) {
            return Err(Error::Config(format!(
                "{} is not a valid HTTP error status code",
                self.disallowed_status_code
            )));
        }

        if self.databases.is_empty() {
            return Err(Error::Config(
                "no database file path configured".to_string(),
            ));
        }

        RuleList::compile(&self.allowlist)?;
        RuleList::compile(&self.blocklist)?;

        Ok(())
    }
}
