use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use steam_scraper::cli::scrape::{self, RunMode, ScrapeConfig};
use steam_scraper::config::{ScraperConfig, DEFAULT_CONFIG_FILE};
use steam_scraper::database_ops::db::Db;
use steam_scraper::engine::report::format_elapsed;
use steam_scraper::engine::BarProgress;
use steam_scraper::util::env;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "steam-scraper", version, about = "Scrape the Steam store into SQLite")]
struct Cli {
    /// What to scrape
    #[arg(value_enum)]
    runtype: RunMode,
    /// Print status lines to the console instead of the log file
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
    /// Also retry apps previously found inaccessible
    #[arg(short, long, default_value_t = false)]
    force: bool,
    /// Configuration file (`KEY: value` per line)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env::init_env();

    let settings = ScraperConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let progress = BarProgress::new();
    steam_scraper::tracing::init_tracing(cli.verbose, &settings.logfile, progress.bar())?;
    settings.log_snapshot();

    println!("Initialising scraper...");
    let db = Db::new(&settings.database_file);
    if !scrape::ensure_schema(&db)? {
        println!("Exiting...");
        return Ok(());
    }

    let started = Instant::now();
    let cfg = ScrapeConfig {
        mode: cli.runtype,
        force: cli.force,
        settings,
    };
    let states = scrape::run(&cfg, &progress)?;
    info!(
        mode = ?cfg.mode,
        phases = states.len(),
        elapsed = %format_elapsed(started.elapsed()),
        "scraper finished"
    );
    Ok(())
}
