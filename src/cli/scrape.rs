use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{info, warn};

use crate::cli::prompt::confirm;
use crate::config::ScraperConfig;
use crate::database_ops::db::Db;
use crate::database_ops::games::{InsertGamePersister, UpdateGamePersister};
use crate::database_ops::record_sets::{
    AllGamesProvider, CatalogDiffProvider, MissingTagsProvider,
};
use crate::database_ops::steam::appdetails::AppDetailsFetcher;
use crate::database_ops::steam::catalog::AppListSnapshot;
use crate::database_ops::steam::http::BlockingHttp;
use crate::database_ops::steam::store_page::{RatingFetcher, StorePageFetcher};
use crate::database_ops::steam::AppId;
use crate::database_ops::tags::{RatingPersister, TagsPersister};
use crate::engine::{
    Backoff, BarProgress, IngestionEngine, Persister, RecordSetProvider, RetryableFetcher,
    RunOptions, RunState, SummaryReporter,
};
use crate::normalization::date::DateFormatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// New games, then tags for every game without any.
    All,
    /// Games present in the app list but not in the database.
    Games,
    /// Tags and rating for stored games without tags.
    Tags,
    /// Refresh every stored game from appdetails.
    Update,
    /// Refresh the rating of every stored game.
    #[value(name = "rating_update")]
    RatingUpdate,
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub mode: RunMode,
    /// Retry ids previously found inaccessible.
    pub force: bool,
    pub settings: ScraperConfig,
}

/// Verify the schema, offering to recreate it. Returns false when the user declines.
pub fn ensure_schema(db: &Db) -> Result<bool> {
    let Err(err) = db.verify() else {
        return Ok(true);
    };
    warn!(error = %err, path = %db.path().display(), "database failed verification");
    println!("Database failed verification. Do you want to create a new database?");
    println!("WARNING: THIS WILL DELETE ALL DATA IN THE DATABASE FILE.");
    if !confirm("Type 'yes' to continue: ") {
        return Ok(false);
    }
    db.create_tables()
        .with_context(|| format!("creating tables in {}", db.path().display()))?;
    Ok(true)
}

struct Session<'a> {
    cfg: &'a ScrapeConfig,
    db: Db,
    http: BlockingHttp,
    progress: &'a BarProgress,
}

impl Session<'_> {
    fn backoff(&self) -> Backoff {
        Backoff::new(self.cfg.settings.timeout)
    }

    fn options(&self) -> RunOptions<AppId> {
        RunOptions {
            min_identifier: Some(AppId(self.cfg.settings.starting_appid)),
        }
    }

    fn drive<R, F, P>(
        &self,
        label: &'static str,
        provider: R,
        fetcher: F,
        persister: P,
    ) -> Result<RunState>
    where
        R: RecordSetProvider<AppId>,
        F: RetryableFetcher<AppId>,
        P: Persister<AppId, Payload = F::Payload>,
    {
        let state = IngestionEngine::new(
            provider,
            fetcher,
            persister,
            SummaryReporter::new(label),
            self.options(),
        )
        .with_progress(self.progress.clone())
        .run()?;
        Ok(state)
    }

    fn games(&self) -> Result<RunState> {
        let settings = &self.cfg.settings;
        let catalog = AppListSnapshot::new(
            &settings.allgames_file,
            &settings.allgames_url,
            settings.json_max_file_age_days,
            &self.http,
        )
        .with_refresh_prompt(|age_days| {
            self.progress.bar().suspend(|| {
                println!("The app list is {age_days} days old.");
                confirm("Type 'yes' to download a fresh copy: ")
            })
        });
        self.drive(
            "New records",
            CatalogDiffProvider::new(catalog, self.db.clone(), self.cfg.force),
            AppDetailsFetcher::new(&self.http, self.backoff()),
            InsertGamePersister::new(self.db.clone(), DateFormatter::steam_release_dates()),
        )
    }

    fn tags(&self) -> Result<RunState> {
        self.drive(
            "Tagged",
            MissingTagsProvider::new(self.db.clone()),
            StorePageFetcher::new(&self.http, self.backoff()),
            TagsPersister::new(self.db.clone()),
        )
    }

    fn update(&self) -> Result<RunState> {
        self.drive(
            "Updated",
            AllGamesProvider::new(self.db.clone()),
            AppDetailsFetcher::new(&self.http, self.backoff()),
            UpdateGamePersister::new(self.db.clone(), DateFormatter::steam_release_dates()),
        )
    }

    fn rating_update(&self) -> Result<RunState> {
        self.drive(
            "Ratings updated",
            AllGamesProvider::new(self.db.clone()),
            RatingFetcher::new(&self.http, self.backoff()),
            RatingPersister::new(self.db.clone()),
        )
    }
}

/// Run the selected mode; `All` yields one state per phase.
pub fn run(cfg: &ScrapeConfig, progress: &BarProgress) -> Result<Vec<RunState>> {
    let session = Session {
        cfg,
        db: Db::new(&cfg.settings.database_file),
        http: BlockingHttp::new().context("building HTTP client")?,
        progress,
    };
    info!(mode = ?cfg.mode, force = cfg.force, "starting run");
    let states = match cfg.mode {
        RunMode::Games => vec![session.games()?],
        RunMode::Tags => vec![session.tags()?],
        RunMode::Update => vec![session.update()?],
        RunMode::RatingUpdate => vec![session.rating_update()?],
        RunMode::All => vec![session.games()?, session.tags()?],
    };
    Ok(states)
}
