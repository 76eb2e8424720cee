use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::storage::DEFAULT_RECORD_NAME;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub catalog: CatalogConfig,
    pub widget: WidgetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
    /// Name of the row holding the visited-state snapshot
    pub record_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the packaged countries/regions JSON
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetMode {
    None,
    File,
    Webhook,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub mode: WidgetMode,
    pub file_path: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub reload_url: Option<String>,
    #[serde(default = "WidgetConfig::default_debounce_ms")]
    pub debounce_ms: u64,
}

impl WidgetConfig {
    const fn default_debounce_ms() -> u64 {
        250
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "memory" => DatabaseBackend::Memory,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres, memory"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./wayfar.db?mode=rwc".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let record_name =
            std::env::var("STATE_RECORD_NAME").unwrap_or_else(|_| DEFAULT_RECORD_NAME.to_string());

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let catalog_path =
            std::env::var("CATALOG_PATH").unwrap_or_else(|_| "data/countries.json".to_string());

        let widget_mode = match std::env::var("WIDGET_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => WidgetMode::None,
            "file" => WidgetMode::File,
            "webhook" => WidgetMode::Webhook,
            other => {
                tracing::warn!(
                    "Unknown WIDGET_MODE '{other}', falling back to 'none'. Supported values: none, file, webhook"
                );
                WidgetMode::None
            }
        };

        let webhook_url = std::env::var("WIDGET_WEBHOOK_URL").ok();
        if matches!(widget_mode, WidgetMode::Webhook) && webhook_url.is_none() {
            anyhow::bail!("WIDGET_WEBHOOK_URL must be set when WIDGET_MODE=webhook");
        }

        let debounce_ms = parse_debounce_ms(std::env::var("WIDGET_DEBOUNCE_MS").ok().as_deref())?;

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
                record_name,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            catalog: CatalogConfig { path: catalog_path },
            widget: WidgetConfig {
                mode: widget_mode,
                file_path: std::env::var("WIDGET_FILE_PATH")
                    .unwrap_or_else(|_| "./widget.json".to_string()),
                webhook_url,
                reload_url: std::env::var("WIDGET_RELOAD_URL").ok(),
                debounce_ms,
            },
        })
    }
}

fn parse_debounce_ms(value: Option<&str>) -> anyhow::Result<u64> {
    match value {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .context("WIDGET_DEBOUNCE_MS must be a non-negative integer"),
        None => Ok(WidgetConfig::default_debounce_ms()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_defaults_when_unset() {
        assert_eq!(parse_debounce_ms(None).unwrap(), 250);
    }

    #[test]
    fn test_debounce_parses_value() {
        assert_eq!(parse_debounce_ms(Some("40")).unwrap(), 40);
    }

    #[test]
    fn test_invalid_debounce_is_rejected() {
        let err = parse_debounce_ms(Some("fast")).unwrap_err();
        assert!(err.to_string().contains("WIDGET_DEBOUNCE_MS"));
    }
}
