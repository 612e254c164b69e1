//! Run configuration: a `KEY: value` file with per-key environment overrides.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;
use crate::util::env::{env_opt, log_snapshot};

pub const DEFAULT_CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_ALLGAMES_URL: &str = "https://api.steampowered.com/ISteamApps/GetAppList/v2/";

pub const KEY_TIMEOUT: &str = "TIMEOUT";
pub const KEY_DATABASE_FILENAME: &str = "DATABASE_FILENAME";
pub const KEY_ALLGAMES_FILENAME: &str = "ALLGAMES_FILENAME";
pub const KEY_STARTING_APPID: &str = "STARTING_APPID";
pub const KEY_JSON_MAX_FILE_AGE: &str = "JSON_MAX_FILE_AGE";
pub const KEY_LOGFILE_NAME: &str = "LOGFILE_NAME";
pub const KEY_ALLGAMES_URL: &str = "ALLGAMES_URL";

const RECOGNIZED_KEYS: [&str; 7] = [
    KEY_TIMEOUT,
    KEY_DATABASE_FILENAME,
    KEY_ALLGAMES_FILENAME,
    KEY_STARTING_APPID,
    KEY_JSON_MAX_FILE_AGE,
    KEY_LOGFILE_NAME,
    KEY_ALLGAMES_URL,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperConfig {
    /// Pause between retry attempts.
    pub timeout: Duration,
    pub database_file: PathBuf,
    /// Cached copy of the Steam app list.
    pub allgames_file: PathBuf,
    pub starting_appid: u64,
    /// Age in days after which the cached app list is offered for refresh.
    pub json_max_file_age_days: u64,
    /// Receives status lines when not running verbose.
    pub logfile: PathBuf,
    pub allgames_url: String,
}

impl ScraperConfig {
    /// Read `path` (a missing file is treated as empty) and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut values = match read_config_file(path) {
            Ok(values) => values,
            Err(ConfigError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found; using environment only");
                HashMap::new()
            }
            Err(err) => return Err(err),
        };
        for key in RECOGNIZED_KEYS {
            if let Some(value) = env_opt(key) {
                values.insert(key.to_string(), value.trim().to_string());
            }
        }
        Self::from_map(&values)
    }

    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Ok(Self {
            timeout: Duration::from_secs(numeric(values, KEY_TIMEOUT)?),
            database_file: required(values, KEY_DATABASE_FILENAME)?.into(),
            allgames_file: required(values, KEY_ALLGAMES_FILENAME)?.into(),
            starting_appid: numeric(values, KEY_STARTING_APPID)?,
            json_max_file_age_days: numeric(values, KEY_JSON_MAX_FILE_AGE)?,
            logfile: required(values, KEY_LOGFILE_NAME)?.into(),
            allgames_url: values
                .get(KEY_ALLGAMES_URL)
                .cloned()
                .unwrap_or_else(|| DEFAULT_ALLGAMES_URL.to_string()),
        })
    }

    pub fn log_snapshot(&self) {
        log_snapshot(
            "steam-scraper",
            [
                (KEY_TIMEOUT, self.timeout.as_secs().to_string()),
                (KEY_DATABASE_FILENAME, self.database_file.display().to_string()),
                (KEY_ALLGAMES_FILENAME, self.allgames_file.display().to_string()),
                (KEY_STARTING_APPID, self.starting_appid.to_string()),
                (KEY_JSON_MAX_FILE_AGE, self.json_max_file_age_days.to_string()),
                (KEY_LOGFILE_NAME, self.logfile.display().to_string()),
                (KEY_ALLGAMES_URL, self.allgames_url.clone()),
            ],
        );
    }
}

fn required<'a>(
    values: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, ConfigError> {
    values
        .get(key)
        .map(String::as_str)
        .ok_or(ConfigError::Missing(key))
}

fn numeric(values: &HashMap<String, String>, key: &'static str) -> Result<u64, ConfigError> {
    let raw = required(values, key)?;
    raw.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        expected: "a non-negative integer",
    })
}

pub fn read_config_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_config(&text))
}

/// `KEY: value # comment` per line. Lines without `": "` and empty values are ignored.
pub fn parse_config(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(": ")?;
            let value = rest.split('#').next().unwrap_or_default().trim();
            if value.is_empty() {
                return None;
            }
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}
