//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! The store access token may also come from SHOPIFY_ACCESS_TOKEN, which
//! takes precedence over the file.

use crate::io::sales_sheet::{
    SheetLayout, DEFAULT_BARCODE_COLUMN, DEFAULT_QUANTITY_COLUMN, DEFAULT_SKIP_ROWS,
};
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const ACCESS_TOKEN_ENV: &str = "SHOPIFY_ACCESS_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreScheme {
    Http,
    Https,
}

impl StoreScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreScheme::Http => "http",
            StoreScheme::Https => "https",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_host")]
    pub host: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_store_scheme")]
    pub scheme: StoreScheme,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: default_store_host(),
            api_version: default_api_version(),
            scheme: default_store_scheme(),
            access_token: None,
            timeout_ms: default_store_timeout_ms(),
        }
    }
}

fn default_store_host() -> String {
    "chaplostyle.myshopify.com".to_string()
}

fn default_api_version() -> String {
    "2024-04".to_string()
}

fn default_store_scheme() -> StoreScheme {
    StoreScheme::Https
}

fn default_store_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_server_port() }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    10000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetConfig {
    /// Banner rows above the header row
    #[serde(default = "default_skip_rows")]
    pub skip_rows: usize,
    #[serde(default = "default_barcode_column")]
    pub barcode_column: String,
    #[serde(default = "default_quantity_column")]
    pub quantity_column: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            skip_rows: default_skip_rows(),
            barcode_column: default_barcode_column(),
            quantity_column: default_quantity_column(),
        }
    }
}

fn default_skip_rows() -> usize {
    DEFAULT_SKIP_ROWS
}

fn default_barcode_column() -> String {
    DEFAULT_BARCODE_COLUMN.to_string()
}

fn default_quantity_column() -> String {
    DEFAULT_QUANTITY_COLUMN.to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sheet: SheetConfig,
}

/// Main configuration struct, built once at startup and passed by reference
#[derive(Debug, Clone)]
pub struct Config {
    store_host: String,
    store_api_version: String,
    store_scheme: StoreScheme,
    access_token: Option<String>,
    store_timeout_ms: u64,
    bind_address: String,
    port: u16,
    sheet_layout: SheetLayout,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            store_host: toml_config.store.host,
            store_api_version: toml_config.store.api_version,
            store_scheme: toml_config.store.scheme,
            access_token: toml_config.store.access_token.filter(|t| !t.trim().is_empty()),
            store_timeout_ms: toml_config.store.timeout_ms,
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            sheet_layout: SheetLayout {
                skip_rows: toml_config.sheet.skip_rows,
                barcode_column: toml_config.sheet.barcode_column,
                quantity_column: toml_config.sheet.quantity_column,
            },
            config_file,
        }
    }

    /// Determine config file path: explicit argument, then CONFIG_FILE, then default
    pub fn resolve_config_path(arg: Option<&str>) -> String {
        if let Some(path) = arg {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries the TOML file first, falls back to defaults.
    /// The access token from the environment is applied either way.
    pub fn load_from_path(path: &str) -> Self {
        let config = match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config_fallback_to_defaults");
                Self::default()
            }
        };
        config.with_env_token(env::var(ACCESS_TOKEN_ENV).ok())
    }

    /// Apply a token read from the environment, if it is non-empty
    pub fn with_env_token(self, token: Option<String>) -> Self {
        match token.filter(|t| !t.trim().is_empty()) {
            Some(token) => self.with_access_token(token),
            None => self,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Base URL of the Admin REST API, without trailing slash
    pub fn store_api_base(&self) -> String {
        format!(
            "{}://{}/admin/api/{}",
            self.store_scheme.as_str(),
            self.store_host,
            self.store_api_version
        )
    }

    pub fn store_host(&self) -> &str {
        &self.store_host
    }

    pub fn store_api_version(&self) -> &str {
        &self.store_api_version
    }

    pub fn store_scheme(&self) -> StoreScheme {
        self.store_scheme
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn store_timeout_ms(&self) -> u64 {
        self.store_timeout_ms
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn sheet_layout(&self) -> &SheetLayout {
        &self.sheet_layout
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store_host(), "chaplostyle.myshopify.com");
        assert_eq!(config.store_api_version(), "2024-04");
        assert_eq!(config.store_scheme(), StoreScheme::Https);
        assert_eq!(config.access_token(), None);
        assert_eq!(config.port(), 10000);
        assert_eq!(config.bind_address(), "0.0.0.0");
        assert_eq!(config.sheet_layout(), &SheetLayout::default());
    }

    #[test]
    fn test_store_api_base() {
        let config = Config::default();
        assert_eq!(
            config.store_api_base(),
            "https://chaplostyle.myshopify.com/admin/api/2024-04"
        );
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        assert_eq!(Config::resolve_config_path(Some("config/prod.toml")), "config/prod.toml");
    }

    #[test]
    fn test_env_token_overrides() {
        let config = Config::default().with_access_token("from-file");
        let config = config.with_env_token(Some("from-env".to_string()));
        assert_eq!(config.access_token(), Some("from-env"));
    }

    #[test]
    fn test_blank_env_token_ignored() {
        let config = Config::default().with_access_token("from-file");
        let config = config.with_env_token(Some("  ".to_string()));
        assert_eq!(config.access_token(), Some("from-file"));

        let config = Config::default().with_env_token(None);
        assert_eq!(config.access_token(), None);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[store]
scheme = "http"
host = "localhost:9900"
"#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());
        assert_eq!(config.store_api_base(), "http://localhost:9900/admin/api/2024-04");
        assert_eq!(config.port(), 10000);
        assert_eq!(config.sheet_layout().skip_rows, 4);
    }
}
