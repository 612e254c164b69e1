use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, instrument};

use crate::database_ops::steam::AppId;

/// Child tables holding one row per multi-valued attribute of a game.
pub const CHILD_TABLES: [&str; 7] = [
    "languages",
    "developers",
    "publishers",
    "platforms",
    "metacritic",
    "categories",
    "genres",
];

const VERIFY_QUERIES: [&str; 10] = [
    "SELECT id, name, type, required_age, is_free, full_game_id, detailed_description, \
     about_the_game, short_description, price, rating, recommendations, is_released, \
     release_date, screenshots, movies, achievements FROM games LIMIT 0",
    "SELECT name, gameid FROM tags LIMIT 0",
    "SELECT name, gameid FROM languages LIMIT 0",
    "SELECT name, gameid FROM developers LIMIT 0",
    "SELECT name, gameid FROM publishers LIMIT 0",
    "SELECT score, url, gameid FROM metacritic LIMIT 0",
    "SELECT name, gameid FROM categories LIMIT 0",
    "SELECT name, gameid FROM genres LIMIT 0",
    "SELECT name, status, gameid FROM platforms LIMIT 0",
    "SELECT id FROM inaccessible LIMIT 0",
];

const SCHEMA: &str = r#"
DROP TABLE IF EXISTS languages;
DROP TABLE IF EXISTS developers;
DROP TABLE IF EXISTS publishers;
DROP TABLE IF EXISTS metacritic;
DROP TABLE IF EXISTS categories;
DROP TABLE IF EXISTS genres;
DROP TABLE IF EXISTS platforms;
DROP TABLE IF EXISTS tags;
DROP TABLE IF EXISTS inaccessible;
DROP TABLE IF EXISTS games;
CREATE TABLE games(
    id INTEGER PRIMARY KEY NOT NULL,
    name VARCHAR(200) NOT NULL,
    type VARCHAR(50),
    required_age INTEGER,
    is_free BOOLEAN,
    full_game_id INTEGER,
    detailed_description TEXT,
    about_the_game TEXT,
    short_description TEXT,
    price INTEGER,
    rating TINYINT,
    recommendations INTEGER,
    is_released BOOLEAN,
    release_date DATETIME,
    screenshots INTEGER,
    movies INTEGER,
    achievements INTEGER);
CREATE TABLE languages(name VARCHAR(40), gameid INTEGER, FOREIGN KEY(gameid) REFERENCES games(id));
CREATE TABLE developers(name VARCHAR(60), gameid INTEGER, FOREIGN KEY(gameid) REFERENCES games(id));
CREATE TABLE publishers(name VARCHAR(60), gameid INTEGER, FOREIGN KEY(gameid) REFERENCES games(id));
CREATE TABLE metacritic(score INTEGER, url TEXT, gameid INTEGER, FOREIGN KEY(gameid) REFERENCES games(id));
CREATE TABLE categories(name VARCHAR(120), gameid INTEGER, FOREIGN KEY(gameid) REFERENCES games(id));
CREATE TABLE genres(name VARCHAR(120), gameid INTEGER, FOREIGN KEY(gameid) REFERENCES games(id));
CREATE TABLE platforms(name VARCHAR(30), status BOOLEAN, gameid INTEGER, FOREIGN KEY(gameid) REFERENCES games(id));
CREATE TABLE tags(name VARCHAR(120), gameid INTEGER, FOREIGN KEY(gameid) REFERENCES games(id));
CREATE TABLE inaccessible(id INTEGER PRIMARY KEY NOT NULL);
"#;

/// Handle to the SQLite database file. Holds no connection: every unit of work
/// opens its own, so no transaction ever spans two identifiers.
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection; creates the file if it does not exist.
    pub fn open(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(conn)
    }

    /// Probe every table and column the scraper reads or writes.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn verify(&self) -> rusqlite::Result<()> {
        let conn = self.open()?;
        for query in VERIFY_QUERIES {
            conn.prepare(query)?;
        }
        info!("database passed verification");
        Ok(())
    }

    /// Drop and recreate every table. Existing data is lost.
    pub fn create_tables(&self) -> rusqlite::Result<()> {
        let conn = self.open()?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %self.path.display(), "database schema created");
        Ok(())
    }

    pub fn is_recorded(&self, appid: AppId) -> rusqlite::Result<bool> {
        let conn = self.open()?;
        is_recorded(&conn, appid)
    }

    /// Every id in `games`, ascending.
    pub fn all_ids(&self) -> rusqlite::Result<Vec<AppId>> {
        self.ids("SELECT id FROM games ORDER BY id")
    }

    pub fn inaccessible_ids(&self) -> rusqlite::Result<Vec<AppId>> {
        self.ids("SELECT id FROM inaccessible ORDER BY id")
    }

    /// Games without a single tag row, ascending.
    pub fn ids_missing_tags(&self) -> rusqlite::Result<Vec<AppId>> {
        self.ids(
            "SELECT g.id FROM games g \
             LEFT JOIN tags t ON t.gameid = g.id \
             WHERE t.gameid IS NULL \
             ORDER BY g.id",
        )
    }

    fn ids(&self, sql: &str) -> rusqlite::Result<Vec<AppId>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(AppId::from_db))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}

pub fn is_recorded(conn: &Connection, appid: AppId) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM games WHERE id = ?1",
            params![appid],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn empty_database_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::new(dir.path().join("empty.db"));
        assert!(db.verify().is_err());
    }

    #[test]
    fn created_schema_passes_verification() {
        let (_dir, db) = fresh_db();
        db.verify().unwrap();
    }

    #[test]
    fn recreating_tables_discards_rows() {
        let (_dir, db) = fresh_db();
        insert_game(&db, 10, "Counter-Strike");
        db.create_tables().unwrap();
        assert_eq!(count(&db, "SELECT COUNT(*) FROM games"), 0);
    }

    #[test]
    fn is_recorded_checks_games_table() {
        let (_dir, db) = fresh_db();
        insert_game(&db, 20, "Team Fortress Classic");
        assert!(db.is_recorded(AppId(20)).unwrap());
        assert!(!db.is_recorded(AppId(10)).unwrap());
    }

    #[test]
    fn missing_tags_is_an_anti_join() {
        let (_dir, db) = fresh_db();
        for id in [3, 1, 2] {
            insert_game(&db, id, "game");
        }
        insert_tag(&db, 2, "Action");
        insert_tag(&db, 2, "FPS");
        assert_eq!(db.ids_missing_tags().unwrap(), vec![AppId(1), AppId(3)]);
        assert_eq!(db.all_ids().unwrap(), vec![AppId(1), AppId(2), AppId(3)]);
    }
}
