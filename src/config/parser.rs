//! Task file parser.
//!
//! This module handles loading a task from YAML and applying environment
//! variable overrides, with `.env` support for credentials.

use crate::error::{ConfigError, FabricError, Result};
use crate::model::Verb;
use std::path::Path;
use tracing::{debug, info};

use super::spec::{TaskConfig, VersionSetting};

/// Environment variable holding a bearer token.
pub const TOKEN_ENV: &str = "FABRIC_VRF_TOKEN";

/// Environment variable holding an ND API key.
pub const API_KEY_ENV: &str = "FABRIC_VRF_API_KEY";

/// Environment variable holding the user name sent with an API key.
pub const USERNAME_ENV: &str = "FABRIC_VRF_USERNAME";

/// Credentials used to authenticate to the controller.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`.
    Token(String),
    /// ND API key headers.
    ApiKey {
        /// User name.
        username: String,
        /// API key.
        key: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::ApiKey { username, .. } => write!(f, "ApiKey({username}, ***)"),
        }
    }
}

/// Task file parser.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new task parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving the `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a task from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<TaskConfig> {
        let path = path.as_ref();
        info!("Loading task from: {}", path.display());

        if !path.exists() {
            return Err(FabricError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            FabricError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a task from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<TaskConfig> {
        debug!("Parsing YAML task");

        let task: TaskConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            FabricError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed task: state {} with {} entries",
            task.state,
            task.entries().len()
        );
        Ok(task)
    }

    /// Loads a task with environment variable overrides.
    ///
    /// Recognized variables: `FABRIC_VRF_CONTROLLER_URL`,
    /// `FABRIC_VRF_CONTROLLER_VERSION` (`auto`, `v11`, `v12`) and
    /// `FABRIC_VRF_STATE`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an
    /// override holds an unknown value.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<TaskConfig> {
        let mut task = self.load_file(path)?;
        Self::apply_env_overrides(&mut task)?;
        Ok(task)
    }

    /// Applies environment variable overrides to the task.
    fn apply_env_overrides(task: &mut TaskConfig) -> Result<()> {
        if let Ok(url) = std::env::var("FABRIC_VRF_CONTROLLER_URL") {
            debug!("Overriding controller.url from environment");
            task.controller.url = Some(url);
        }

        if let Ok(version) = std::env::var("FABRIC_VRF_CONTROLLER_VERSION") {
            debug!("Overriding controller.version from environment");
            task.controller.version = parse_enum::<VersionSetting>(&version, "FABRIC_VRF_CONTROLLER_VERSION")?;
        }

        if let Ok(state) = std::env::var("FABRIC_VRF_STATE") {
            debug!("Overriding state from environment");
            task.state = parse_enum::<Verb>(&state, "FABRIC_VRF_STATE")?;
        }

        if task.controller.username.is_none()
            && let Ok(username) = std::env::var(USERNAME_ENV)
        {
            task.controller.username = Some(username);
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                FabricError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Reads controller credentials from the environment.
    ///
    /// A bearer token wins over an API key.
    ///
    /// # Errors
    ///
    /// Returns an error if neither a token nor an API key is set.
    pub fn credentials(task: &TaskConfig) -> Result<Credentials> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            return Ok(Credentials::Token(token));
        }

        let key = std::env::var(API_KEY_ENV).map_err(|_| {
            FabricError::Config(ConfigError::MissingEnvVar {
                name: format!("{TOKEN_ENV} or {API_KEY_ENV}"),
            })
        })?;

        let username = task.controller.username.clone().ok_or_else(|| {
            FabricError::Config(ConfigError::MissingEnvVar {
                name: String::from(USERNAME_ENV),
            })
        })?;

        Ok(Credentials::ApiKey { username, key })
    }
}

/// Parses a lowercase enum value the same way the task file does.
fn parse_enum<T: serde::de::DeserializeOwned>(raw: &str, name: &str) -> Result<T> {
    serde_yaml::from_str(&raw.trim().to_ascii_lowercase()).map_err(|_| {
        FabricError::Config(ConfigError::validation(
            format!("{name} has unsupported value '{raw}'"),
            name,
        ))
    })
}

/// Default task file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["fabric-vrf.yaml", "fabric-vrf.yml", "vrf.yaml", "vrf.yml"];

/// Finds the task file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no task file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found task file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(FabricError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
