use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("missing required config key {0}")]
    Missing(&'static str),
    #[error("config key {key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Failure observed while talking to a remote source. Never leaves a fetcher:
/// every variant is classified into a `FetchOutcome` first.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("too many redirects")]
    RedirectLoop,
    #[error("http {0}")]
    Status(u16),
    #[error("undecodable body: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
#[error("storage failure for #{appid}: {source}")]
pub struct PersistenceError {
    pub appid: String,
    #[source]
    pub source: rusqlite::Error,
}

impl PersistenceError {
    pub fn new(appid: impl ToString, source: rusqlite::Error) -> Self {
        Self {
            appid: appid.to_string(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog snapshot {path} is not a Steam app list: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog download failed: {0}")]
    Download(#[from] SourceError),
}

/// Errors that stop a run before its first fetch.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot enumerate work list: {0}")]
    Catalog(#[from] CatalogError),
    #[error("cannot enumerate work list: {0}")]
    Storage(#[from] rusqlite::Error),
}
