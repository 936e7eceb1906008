use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::deadlock::DEFAULT_CRITICAL_TABLES;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub analyzer: AnalyzerConfig,
    pub logging: LoggingConfig,
}

/// Analyzer tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Tables whose involvement raises the severity score
    pub critical_tables: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            critical_tables: DEFAULT_CRITICAL_TABLES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,lockgraph=debug".to_string(), file: None }
    }
}

/// Command line arguments for configuration overrides
#[derive(Parser, Debug, Clone)]
#[command(name = "lockgraph")]
#[command(version, about = "Lockgraph - PostgreSQL deadlock diagnostics analyzer")]
pub struct CommandLineArgs {
    /// File containing the raw error message; stdin when omitted
    pub input: Option<String>,

    /// Treat the input as an event-record JSON object instead of raw text
    #[arg(long)]
    pub event_json: bool,

    /// Pretty-print the resulting JSON
    #[arg(long)]
    pub pretty: bool,

    /// Print the static lock-compatibility matrix and exit
    #[arg(long)]
    pub compat_matrix: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Critical tables, comma-separated (overrides config file)
    #[arg(long, value_name = "TABLES")]
    pub critical_tables: Option<String>,

    /// Logging level (overrides config file, e.g., "info,lockgraph=debug")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log file path (overrides config file)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<String>,
}

impl Config {
    /// Load configuration with command line, environment variable, and file
    /// support
    ///
    /// Loading order (priority from highest to lowest):
    /// 1. Command line arguments
    /// 2. Environment variables (prefixed with APP_)
    /// 3. Configuration file (config.toml)
    /// 4. Default values
    pub fn load(cli_args: &CommandLineArgs) -> Result<Self, anyhow::Error> {
        let config_path = cli_args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.apply_cli_overrides(cli_args);
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_CRITICAL_TABLES: comma-separated critical-table allowlist
    /// - APP_LOG_LEVEL: logging level (e.g., "info,lockgraph=debug")
    /// - APP_LOG_FILE: log file path
    fn apply_env_overrides(&mut self) {
        if let Ok(tables) = std::env::var("APP_CRITICAL_TABLES") {
            self.analyzer.critical_tables = split_tables(&tables);
            tracing::info!("Override analyzer.critical_tables from env");
        }

        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Ok(file) = std::env::var("APP_LOG_FILE") {
            self.logging.file = Some(file);
            tracing::info!("Override logging.file from env");
        }
    }

    /// Apply command line argument overrides (highest priority)
    fn apply_cli_overrides(&mut self, args: &CommandLineArgs) {
        if let Some(tables) = &args.critical_tables {
            self.analyzer.critical_tables = split_tables(tables);
            tracing::info!("Override analyzer.critical_tables from CLI");
        }

        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
            tracing::info!("Override logging.level from CLI: {}", self.logging.level);
        }

        if let Some(file) = &args.log_file {
            self.logging.file = Some(file.clone());
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.analyzer.critical_tables.iter().any(|t| t.trim().is_empty()) {
            anyhow::bail!("analyzer.critical_tables must not contain empty names");
        }
        if self.logging.level.trim().is_empty() {
            anyhow::bail!("logging.level cannot be empty");
        }
        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

fn split_tables(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
