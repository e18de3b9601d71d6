//! Configuration data structures for jamgate.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and to
//! `JAMGATE__*` environment variables. Every field has a default so that the
//! server runs without any configuration file at all.
use std::{path::PathBuf, time::Duration};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::core::auth::DEFAULT_REALM;

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_root() -> String {
    ".".to_string()
}

pub const DEFAULT_HEADERS_FILE: &str = "_headers";
pub const DEFAULT_REDIRECTS_FILE: &str = "_redirects";

fn default_headers_file() -> String {
    DEFAULT_HEADERS_FILE.to_string()
}

fn default_redirects_file() -> String {
    DEFAULT_REDIRECTS_FILE.to_string()
}

fn default_auth_realm() -> String {
    DEFAULT_REALM.to_string()
}

/// Settings for proxy rules
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Upper bound for one proxied exchange, parsed by humantime (e.g. "30s", "2m")
    pub timeout: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout: "30s".to_string(),
        }
    }
}

impl ProxyConfig {
    pub fn timeout_duration(&self) -> Result<Duration> {
        humantime::parse_duration(&self.timeout)
            .wrap_err_with(|| format!("Invalid proxy timeout: {}", self.timeout))
    }
}

/// Log output settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "jamgate=debug,tower_http=info"
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Site directory; rule files are looked up relative to it
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default = "default_headers_file")]
    pub headers_file: String,
    #[serde(default = "default_redirects_file")]
    pub redirects_file: String,
    /// Realm announced in `WWW-Authenticate` challenges
    #[serde(default = "default_auth_realm")]
    pub auth_realm: String,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Create a new server configuration builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Location of the `_headers` file.
    pub fn headers_path(&self) -> PathBuf {
        PathBuf::from(&self.root).join(&self.headers_file)
    }

    /// Location of the `_redirects` file.
    pub fn redirects_path(&self) -> PathBuf {
        PathBuf::from(&self.root).join(&self.redirects_file)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            root: default_root(),
            headers_file: default_headers_file(),
            redirects_file: default_redirects_file(),
            auth_realm: default_auth_realm(),
            proxy: ProxyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Builder for ServerConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the site directory
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.config.root = root.into();
        self
    }

    /// Set the Basic-Auth realm
    pub fn auth_realm(mut self, realm: impl Into<String>) -> Self {
        self.config.auth_realm = realm.into();
        self
    }

    /// Set the proxy timeout (humantime syntax)
    pub fn proxy_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.config.proxy.timeout = timeout.into();
        self
    }

    /// Build the ServerConfig
    pub fn build(self) -> ServerConfig {
        self.config
    }
}
