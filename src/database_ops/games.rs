//! `games` rows and their child tables, written from appdetails payloads.

use rusqlite::{params, Connection, Transaction};
use tracing::{info, warn};

use crate::database_ops::db::{is_recorded, Db, CHILD_TABLES};
use crate::database_ops::steam::appdetails::{AppDetails, Described};
use crate::database_ops::steam::AppId;
use crate::engine::Persister;
use crate::error::PersistenceError;
use crate::normalization::date::DateFormatter;
use crate::normalization::text::split_languages;

/// One game flattened into column values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameRecord {
    pub name: String,
    pub app_type: Option<String>,
    pub required_age: Option<i64>,
    pub is_free: Option<bool>,
    pub full_game_id: Option<i64>,
    pub detailed_description: Option<String>,
    pub about_the_game: Option<String>,
    pub short_description: Option<String>,
    pub price: i64,
    pub recommendations: i64,
    pub is_released: Option<bool>,
    pub release_date: Option<String>,
    pub screenshots: i64,
    pub movies: i64,
    pub achievements: i64,
    pub languages: Vec<String>,
    pub developers: Vec<String>,
    pub publishers: Vec<String>,
    pub platforms: Vec<(String, bool)>,
    pub metacritic: Option<(Option<i64>, Option<String>)>,
    pub categories: Vec<String>,
    pub genres: Vec<String>,
}

impl GameRecord {
    pub fn from_details(details: AppDetails, dates: &DateFormatter) -> Self {
        let count = |items: Option<Vec<serde_json::Value>>| items.map_or(0, |v| v.len() as i64);
        Self {
            name: details.name.unwrap_or_default(),
            app_type: details.app_type,
            required_age: details.required_age,
            is_free: details.is_free,
            full_game_id: details.fullgame.and_then(|g| g.appid),
            detailed_description: details.detailed_description,
            about_the_game: details.about_the_game,
            short_description: details.short_description,
            price: details.price_overview.and_then(|p| p.initial).unwrap_or(0),
            recommendations: details
                .recommendations
                .and_then(|r| r.total)
                .unwrap_or(0),
            is_released: details.release_date.as_ref().map(|r| !r.coming_soon),
            release_date: details
                .release_date
                .as_ref()
                .map(|r| r.date.trim())
                .filter(|d| !d.is_empty())
                .map(|d| dates.normalize(d)),
            screenshots: count(details.screenshots),
            movies: count(details.movies),
            achievements: details.achievements.and_then(|a| a.total).unwrap_or(0),
            languages: details
                .supported_languages
                .as_deref()
                .map(split_languages)
                .unwrap_or_default(),
            developers: details.developers,
            publishers: details.publishers,
            platforms: details.platforms.into_iter().collect(),
            metacritic: details.metacritic.map(|m| (m.score, m.url)),
            categories: described(details.categories),
            genres: described(details.genres),
        }
    }
}

fn described(items: Vec<Described>) -> Vec<String> {
    items.into_iter().filter_map(|d| d.description).collect()
}

fn insert_game_row(tx: &Transaction<'_>, appid: AppId, g: &GameRecord) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO games (id, name, type, required_age, is_free, full_game_id, \
         detailed_description, about_the_game, short_description, price, recommendations, \
         is_released, release_date, screenshots, movies, achievements) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            appid,
            g.name,
            g.app_type,
            g.required_age,
            g.is_free,
            g.full_game_id,
            g.detailed_description,
            g.about_the_game,
            g.short_description,
            g.price,
            g.recommendations,
            g.is_released,
            g.release_date,
            g.screenshots,
            g.movies,
            g.achievements,
        ],
    )?;
    Ok(())
}

/// Returns the number of rows touched; zero when the game is not stored.
fn update_game_row(tx: &Transaction<'_>, appid: AppId, g: &GameRecord) -> rusqlite::Result<usize> {
    tx.execute(
        "UPDATE games SET name = ?2, type = ?3, required_age = ?4, is_free = ?5, \
         full_game_id = ?6, detailed_description = ?7, about_the_game = ?8, \
         short_description = ?9, price = ?10, recommendations = ?11, is_released = ?12, \
         release_date = ?13, screenshots = ?14, movies = ?15, achievements = ?16 \
         WHERE id = ?1",
        params![
            appid,
            g.name,
            g.app_type,
            g.required_age,
            g.is_free,
            g.full_game_id,
            g.detailed_description,
            g.about_the_game,
            g.short_description,
            g.price,
            g.recommendations,
            g.is_released,
            g.release_date,
            g.screenshots,
            g.movies,
            g.achievements,
        ],
    )
}

fn insert_names(
    tx: &Transaction<'_>,
    table: &str,
    appid: AppId,
    names: &[String],
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare(&format!("INSERT INTO {table} (name, gameid) VALUES (?1, ?2)"))?;
    for name in names {
        stmt.execute(params![name, appid])?;
    }
    Ok(())
}

fn insert_children(tx: &Transaction<'_>, appid: AppId, g: &GameRecord) -> rusqlite::Result<()> {
    insert_names(tx, "languages", appid, &g.languages)?;
    insert_names(tx, "developers", appid, &g.developers)?;
    insert_names(tx, "publishers", appid, &g.publishers)?;
    insert_names(tx, "categories", appid, &g.categories)?;
    insert_names(tx, "genres", appid, &g.genres)?;

    let mut platforms =
        tx.prepare("INSERT INTO platforms (name, status, gameid) VALUES (?1, ?2, ?3)")?;
    for (name, status) in &g.platforms {
        platforms.execute(params![name, status, appid])?;
    }

    if let Some((score, url)) = &g.metacritic {
        tx.execute(
            "INSERT INTO metacritic (score, url, gameid) VALUES (?1, ?2, ?3)",
            params![score, url, appid],
        )?;
    }
    Ok(())
}

fn delete_children(tx: &Transaction<'_>, appid: AppId) -> rusqlite::Result<()> {
    for table in CHILD_TABLES {
        tx.execute(
            &format!("DELETE FROM {table} WHERE gameid = ?1"),
            params![appid],
        )?;
    }
    Ok(())
}

fn mark_inaccessible(conn: &Connection, appid: AppId) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO inaccessible (id) VALUES (?1)",
        params![appid],
    )?;
    Ok(())
}

/// Stores games that are not recorded yet; an already stored id is left untouched.
#[derive(Debug, Clone)]
pub struct InsertGamePersister {
    db: Db,
    dates: DateFormatter,
}

impl InsertGamePersister {
    pub fn new(db: Db, dates: DateFormatter) -> Self {
        Self { db, dates }
    }

    fn write(&self, record: &GameRecord, appid: AppId) -> rusqlite::Result<bool> {
        let mut conn = self.db.open()?;
        let tx = conn.transaction()?;
        if is_recorded(&tx, appid)? {
            return Ok(false);
        }
        insert_game_row(&tx, appid, record)?;
        insert_children(&tx, appid, record)?;
        tx.execute(
            "DELETE FROM inaccessible WHERE id = ?1",
            params![appid],
        )?;
        tx.commit()?;
        Ok(true)
    }
}

impl Persister<AppId> for InsertGamePersister {
    type Payload = AppDetails;

    fn persist(&self, payload: AppDetails, id: &AppId) -> Result<(), PersistenceError> {
        let record = GameRecord::from_details(payload, &self.dates);
        match self.write(&record, *id) {
            Ok(true) => info!(appid = %id, "Records for #{id} inserted."),
            Ok(false) => info!(appid = %id, "#{id} already recorded, skipping"),
            Err(err) => return Err(PersistenceError::new(id, err)),
        }
        Ok(())
    }

    fn record_absent(&self, id: &AppId) -> Result<(), PersistenceError> {
        let conn = self.db.open().map_err(|err| PersistenceError::new(id, err))?;
        mark_inaccessible(&conn, *id).map_err(|err| PersistenceError::new(id, err))?;
        info!(appid = %id, "#{id} marked inaccessible");
        Ok(())
    }
}

/// Rewrites stored games: the row is updated and every child table is replaced.
#[derive(Debug, Clone)]
pub struct UpdateGamePersister {
    db: Db,
    dates: DateFormatter,
}

impl UpdateGamePersister {
    pub fn new(db: Db, dates: DateFormatter) -> Self {
        Self { db, dates }
    }

    fn write(&self, record: &GameRecord, appid: AppId) -> rusqlite::Result<bool> {
        let mut conn = self.db.open()?;
        let tx = conn.transaction()?;
        if update_game_row(&tx, appid, record)? == 0 {
            return Ok(false);
        }
        delete_children(&tx, appid)?;
        insert_children(&tx, appid, record)?;
        tx.commit()?;
        Ok(true)
    }
}

impl Persister<AppId> for UpdateGamePersister {
    type Payload = AppDetails;

    fn persist(&self, payload: AppDetails, id: &AppId) -> Result<(), PersistenceError> {
        let record = GameRecord::from_details(payload, &self.dates);
        match self.write(&record, *id) {
            Ok(true) => info!(appid = %id, "Records for #{id} updated."),
            Ok(false) => warn!(appid = %id, "#{id} is not stored, nothing to update"),
            Err(err) => return Err(PersistenceError::new(id, err)),
        }
        Ok(())
    }
}
