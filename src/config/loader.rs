use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::{
    config::models::ServerConfig,
    core::{Pipeline, parse_header_rules, parse_redirect_rules},
};

/// Prefix of environment variables read by [`load_config`], e.g. `JAMGATE__LISTEN_ADDR`.
pub const ENV_PREFIX: &str = "JAMGATE";
const ENV_SEPARATOR: &str = "__";

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub root: Option<String>,
    pub listen_addr: Option<String>,
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR)
}

/// Load configuration from an optional file, the environment and CLI overrides.
/// File formats: YAML, JSON, TOML, INI (by extension).
pub async fn load_config(
    config_path: Option<&str>,
    overrides: &ConfigOverrides,
) -> Result<ServerConfig> {
    load_config_sync(config_path, overrides)
}

/// Load configuration synchronously
pub fn load_config_sync(
    config_path: Option<&str>,
    overrides: &ConfigOverrides,
) -> Result<ServerConfig> {
    build_config(config_path, overrides, environment())
}

fn build_config(
    config_path: Option<&str>,
    overrides: &ConfigOverrides,
    environment: Environment,
) -> Result<ServerConfig> {
    let mut builder = Config::builder();

    if let Some(config_path) = config_path {
        let path = Path::new(config_path);
        // Determine file format based on extension
        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            Some("ini") => FileFormat::Ini,
            _ => FileFormat::Toml,
        };
        builder = builder.add_source(File::new(config_path, format));
    }

    let settings = builder
        .add_source(environment)
        .set_override_option("root", overrides.root.clone())
        .wrap_err("Invalid root override")?
        .set_override_option("listen_addr", overrides.listen_addr.clone())
        .wrap_err("Invalid listen address override")?
        .build()
        .with_context(|| match config_path {
            Some(path) => format!("Failed to build config from {path}"),
            None => "Failed to build config from environment".to_string(),
        })?;

    let server_config: ServerConfig = settings
        .try_deserialize()
        .wrap_err("Failed to deserialize configuration")?;

    Ok(server_config)
}

/// Read a rule file; a missing file counts as empty.
pub async fn read_rule_file(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No rule file at {}, continuing without it", path.display());
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Parse the site's `_headers` and `_redirects` files into a pipeline.
pub async fn load_pipeline(config: &ServerConfig) -> Result<Pipeline> {
    let headers_path = config.headers_path();
    let header_rules = match read_rule_file(&headers_path).await? {
        Some(contents) => parse_header_rules(&contents)
            .with_context(|| format!("Invalid header rules in {}", headers_path.display()))?,
        None => Vec::new(),
    };

    let redirects_path = config.redirects_path();
    let redirect_rules = match read_rule_file(&redirects_path).await? {
        Some(contents) => parse_redirect_rules(&contents)
            .with_context(|| format!("Invalid redirect rules in {}", redirects_path.display()))?,
        None => Vec::new(),
    };

    tracing::info!(
        "Loaded {} header rules and {} redirect rules",
        header_rules.len(),
        redirect_rules.len()
    );
    Ok(Pipeline::new(header_rules, redirect_rules))
}
