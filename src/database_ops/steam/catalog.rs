//! Cached snapshot of Steam's full app list (`GetAppList`).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use itertools::Itertools;
use serde::Deserialize;
use tracing::{info, warn};

use super::http::HttpGet;
use super::AppId;
use crate::error::{CatalogError, SourceError};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Deserialize)]
struct AppListFile {
    applist: AppList,
}

#[derive(Debug, Deserialize)]
struct AppList {
    apps: Vec<AppEntry>,
}

#[derive(Debug, Deserialize)]
struct AppEntry {
    appid: u64,
}

/// Source of every app id Steam knows about.
pub trait AppCatalog {
    fn app_ids(&self) -> Result<Vec<AppId>, CatalogError>;
}

impl<T: AppCatalog + ?Sized> AppCatalog for &T {
    fn app_ids(&self) -> Result<Vec<AppId>, CatalogError> {
        (**self).app_ids()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Missing,
    Fresh { age_days: u64 },
    Stale { age_days: u64 },
}

pub fn freshness(path: &Path, max_age_days: u64, now: SystemTime) -> Result<Freshness, CatalogError> {
    let modified = match fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(modified) => modified,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Freshness::Missing),
        Err(source) => {
            return Err(CatalogError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    let age_days = age.as_secs() / SECS_PER_DAY;
    Ok(if age_days > max_age_days {
        Freshness::Stale { age_days }
    } else {
        Freshness::Fresh { age_days }
    })
}

/// Ascending, duplicate-free ids from an app list document. Ids too large to store
/// are dropped.
pub fn parse_app_list(text: &str) -> Result<Vec<AppId>, serde_json::Error> {
    let file: AppListFile = serde_json::from_str(text)?;
    let (storable, oversized): (Vec<AppId>, Vec<AppId>) = file
        .applist
        .apps
        .into_iter()
        .map(|app| AppId(app.appid))
        .partition(|id| id.to_db().is_some());
    if !oversized.is_empty() {
        warn!(
            count = oversized.len(),
            first = %oversized[0],
            "dropping app ids beyond the storable range"
        );
    }
    Ok(storable.into_iter().sorted().dedup().collect())
}

pub fn load_app_ids(path: &Path) -> Result<Vec<AppId>, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_app_list(&text).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Fetch the list and replace `path`. The old snapshot survives a failed download.
pub fn download(http: &impl HttpGet, url: &str, path: &Path) -> Result<(), CatalogError> {
    info!(%url, "downloading app list");
    let resp = http.get(url)?;
    if resp.status != 200 {
        return Err(SourceError::Status(resp.status).into());
    }
    let apps = parse_app_list(&resp.body).map_err(|err| SourceError::Decode(err.to_string()))?;

    let partial = path.with_extension("part");
    let io_err = |source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&partial, resp.body.as_bytes()).map_err(io_err)?;
    fs::rename(&partial, path).map_err(io_err)?;
    info!(apps = apps.len(), path = %path.display(), "app list saved");
    Ok(())
}

/// App list backed by a local JSON file, downloaded when missing and refreshed on
/// request when older than `max_age_days`.
pub struct AppListSnapshot<'a, H> {
    path: PathBuf,
    url: String,
    max_age_days: u64,
    http: H,
    confirm_refresh: Box<dyn Fn(u64) -> bool + 'a>,
}

impl<'a, H: HttpGet> AppListSnapshot<'a, H> {
    pub fn new(path: impl Into<PathBuf>, url: impl Into<String>, max_age_days: u64, http: H) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            max_age_days,
            http,
            confirm_refresh: Box::new(|_| false),
        }
    }

    /// Asked with the snapshot's age in days whenever it is stale.
    pub fn with_refresh_prompt(mut self, confirm: impl Fn(u64) -> bool + 'a) -> Self {
        self.confirm_refresh = Box::new(confirm);
        self
    }

    fn ensure_current(&self) -> Result<(), CatalogError> {
        match freshness(&self.path, self.max_age_days, SystemTime::now())? {
            Freshness::Missing => {
                warn!(path = %self.path.display(), "app list snapshot missing");
                download(&self.http, &self.url, &self.path)
            }
            Freshness::Stale { age_days } if (self.confirm_refresh)(age_days) => {
                download(&self.http, &self.url, &self.path)
            }
            Freshness::Stale { age_days } => {
                info!(age_days, "keeping stale app list snapshot");
                Ok(())
            }
            Freshness::Fresh { age_days } => {
                info!(age_days, "app list snapshot is current");
                Ok(())
            }
        }
    }
}

impl<H: HttpGet> AppCatalog for AppListSnapshot<'_, H> {
    fn app_ids(&self) -> Result<Vec<AppId>, CatalogError> {
        self.ensure_current()?;
        load_app_ids(&self.path)
    }
}
