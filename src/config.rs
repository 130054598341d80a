//! Configuration file handling for BudgetZen.
//!
//! The configuration file is stored at `$BUDGETZEN_HOME/config.json` and contains the URL of the
//! BudgetZen API along with the behavior switches of the data store.

use crate::store::StoreOptions;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "budgetzen";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CONFIG_JSON: &str = "config.json";
const SESSION_JSON: &str = "session.json";
const TEST_STATE_JSON: &str = "test_state.json";

/// The API a fresh home directory points to.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$BUDGETZEN_HOME` and from there it loads `$BUDGETZEN_HOME/config.json`. It
/// provides paths to the other files the app keeps in the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory, its `.secrets` subdirectory and an initial `config.json`.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the home directory, e.g. `$HOME/budgetzen`
    /// - `api_url` - The root of the BudgetZen API, e.g. `http://localhost:8000/api`
    ///
    /// # Errors
    /// - Returns an error if `api_url` is not an http(s) URL or if any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, api_url: &str) -> Result<Self> {
        let api_url = validate_api_url(api_url)?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the budgetzen home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            api_url,
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
        })
    }

    /// This will
    /// - validate that `budgetzen_home` and its config file exist
    /// - load the config file
    /// - validate that the secrets directory exists
    /// - return the loaded configuration object
    pub async fn load(budgetzen_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = budgetzen_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("BudgetZen home is missing, run `budgetzen init` first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn api_url(&self) -> &str {
        &self.config_file.api_url
    }

    /// Where the session credential and profile are kept.
    pub fn session_path(&self) -> PathBuf {
        self.secrets.join(SESSION_JSON)
    }

    /// Where the in-memory test backend keeps its state between runs in test mode.
    pub fn test_state_path(&self) -> PathBuf {
        self.root.join(TEST_STATE_JSON)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            serialize_mutations: self.config_file.serialize_mutations,
        }
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "budgetzen",
///   "config_version": 1,
///   "api_url": "http://localhost:8000/api",
///   "serialize_mutations": false
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "budgetzen"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The root of the BudgetZen API
    #[serde(default = "default_api_url")]
    api_url: String,

    /// Queue mutations per collection instead of letting them race
    #[serde(default)]
    serialize_mutations: bool,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            api_url: default_api_url(),
            serialize_mutations: false,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it belongs to another app.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .context("Unable to load the config file")?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        validate_api_url(&config.api_url)?;

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

/// Checks that `url` is an absolute http(s) URL and returns it without a trailing slash.
fn validate_api_url(url: &str) -> Result<String> {
    let parsed =
        url::Url::parse(url).with_context(|| format!("Invalid API URL '{url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("The API URL must use http or https, got '{url}'")
    }
    Ok(url.trim_end_matches('/').to_string())
}
