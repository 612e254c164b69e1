//! Store-page derived data: user tags and the positive review percentage.

use rusqlite::params;
use tracing::info;

use crate::database_ops::db::Db;
use crate::database_ops::steam::store_page::StorePage;
use crate::database_ops::steam::AppId;
use crate::engine::Persister;
use crate::error::PersistenceError;

/// Inserts tags for games that have none yet and stores the rating alongside.
#[derive(Debug, Clone)]
pub struct TagsPersister {
    db: Db,
}

impl TagsPersister {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn write(&self, page: &StorePage, appid: AppId) -> rusqlite::Result<usize> {
        let mut conn = self.db.open()?;
        let tx = conn.transaction()?;
        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM tags WHERE gameid = ?1",
            params![appid],
            |row| row.get(0),
        )?;
        let mut inserted = 0;
        if existing == 0 {
            let mut stmt = tx.prepare("INSERT INTO tags (name, gameid) VALUES (?1, ?2)")?;
            for tag in &page.tags {
                inserted += stmt.execute(params![tag, appid])?;
            }
        }
        if let Some(rating) = page.rating {
            tx.execute(
                "UPDATE games SET rating = ?1 WHERE id = ?2",
                params![rating, appid],
            )?;
        }
        tx.commit()?;
        Ok(inserted)
    }
}

impl Persister<AppId> for TagsPersister {
    type Payload = StorePage;

    fn persist(&self, payload: StorePage, id: &AppId) -> Result<(), PersistenceError> {
        let inserted = self
            .write(&payload, *id)
            .map_err(|err| PersistenceError::new(id, err))?;
        info!(appid = %id, tags = inserted, rating = ?payload.rating, "Records for #{id} inserted.");
        Ok(())
    }
}

/// Overwrites the stored rating of a game.
#[derive(Debug, Clone)]
pub struct RatingPersister {
    db: Db,
}

impl RatingPersister {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl Persister<AppId> for RatingPersister {
    type Payload = u8;

    fn persist(&self, rating: u8, id: &AppId) -> Result<(), PersistenceError> {
        let conn = self.db.open().map_err(|err| PersistenceError::new(id, err))?;
        conn.execute(
            "UPDATE games SET rating = ?1 WHERE id = ?2",
            params![rating, id],
        )
        .map_err(|err| PersistenceError::new(id, err))?;
        info!(appid = %id, rating, "Rating for #{id} updated.");
        Ok(())
    }
}
