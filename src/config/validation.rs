use std::{net::SocketAddr, path::Path};

use eyre::Result;

use crate::config::models::{ProxyConfig, ServerConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Invalid site root '{root}': {reason}")]
    InvalidRoot { root: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_root(&config.root) {
            errors.push(e);
        }

        for (field, file) in [
            ("headers_file", &config.headers_file),
            ("redirects_file", &config.redirects_file),
        ] {
            if file.trim().is_empty() {
                errors.push(ValidationError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        if let Err(e) = Self::validate_realm(&config.auth_realm) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_proxy(&config.proxy) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// The site root must be an existing directory
    fn validate_root(root: &str) -> ValidationResult<()> {
        if root.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "root".to_string(),
            });
        }
        match std::fs::metadata(Path::new(root)) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(ValidationError::InvalidRoot {
                root: root.to_string(),
                reason: "Not a directory".to_string(),
            }),
            Err(e) => Err(ValidationError::InvalidRoot {
                root: root.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// The realm ends up inside a quoted header parameter
    fn validate_realm(realm: &str) -> ValidationResult<()> {
        if realm.contains('"') || realm.chars().any(char::is_control) {
            return Err(ValidationError::InvalidField {
                field: "auth_realm".to_string(),
                message: "Must not contain quotes or control characters".to_string(),
            });
        }
        Ok(())
    }

    fn validate_proxy(proxy: &ProxyConfig) -> ValidationResult<()> {
        match humantime::parse_duration(&proxy.timeout) {
            Ok(timeout) if timeout.is_zero() => Err(ValidationError::InvalidField {
                field: "proxy.timeout".to_string(),
                message: "Must be greater than zero".to_string(),
            }),
            Ok(_) => Ok(()),
            Err(e) => Err(ValidationError::InvalidField {
                field: "proxy.timeout".to_string(),
                message: format!("'{}' is not a duration: {e}", proxy.timeout),
            }),
        }
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }

        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
