use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "openai" (alias "remote") or "ollama"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,
}

const ENV_PREFIX: &str = "EMPSEARCH";

/// Local overrides read from the working directory at startup.
const DOTENV_LOCAL: &str = ".env.local";

/// Plain variables honoured on top of the prefixed ones, mapped to their config keys.
const ENV_OVERRIDES: [(&str, &str); 6] = [
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_NAME", "database.name"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("OPENAI_API_KEY", "llm.api_key"),
];

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut vars: HashMap<String, String> = std::env::vars().collect();
        overlay_dotenv(&mut vars, Path::new(DOTENV_LOCAL))?;
        Self::from_env_map(args, vars)
    }

    /// Builds the configuration from defaults, an optional TOML file, the given
    /// environment variables and finally the command line.
    pub fn from_env_map(
        args: &CliArgs,
        vars: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        // Start with default configuration
        let mut config_builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            let default_locations = [
                "config.toml",
                "config/config.toml",
                "/etc/employee-search/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        let prefixed: config::Map<String, String> = vars
            .iter()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        config_builder = config_builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(Some(prefixed)),
        );

        for (var, key) in ENV_OVERRIDES {
            config_builder = config_builder.set_override_option(key, vars.get(var).cloned())?;
        }

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }

        Ok(config)
    }
}

/// Merges `KEY=value` pairs from a dotenv file into `vars`.
///
/// Values from the file replace variables already set in the process
/// environment. A missing file is not an error.
pub fn overlay_dotenv(vars: &mut HashMap<String, String>, path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }

    let entries = dotenvy::from_path_iter(path).map_err(|e| ConfigError::Foreign(Box::new(e)))?;
    for entry in entries {
        let (key, value) = entry.map_err(|e| ConfigError::Foreign(Box::new(e)))?;
        vars.insert(key, value);
    }

    Ok(())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 5432,
                name: "postgres".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                connect_timeout_secs: 10,
            },
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            llm: LlmConfig {
                backend: "openai".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: None,
                api_url: None,
                timeout_secs: 60,
            },
        }
    }
}
