//! Work lists for each run mode.

use std::collections::HashSet;
use std::hash::Hash;

use itertools::Itertools;
use tracing::info;

use crate::database_ops::db::Db;
use crate::database_ops::steam::catalog::AppCatalog;
use crate::database_ops::steam::AppId;
use crate::engine::RecordSetProvider;
use crate::error::EngineError;

/// Members of `primary` absent from every `excluded` set, ascending and unique.
pub fn anti_join<Id, E>(primary: impl IntoIterator<Item = Id>, excluded: E) -> Vec<Id>
where
    Id: Ord + Hash + Clone,
    E: IntoIterator<Item = Id>,
{
    let excluded: HashSet<Id> = excluded.into_iter().collect();
    primary
        .into_iter()
        .filter(|id| !excluded.contains(id))
        .sorted()
        .dedup()
        .collect()
}

/// Catalog ids that are not stored yet. Ids known to be inaccessible are left out
/// unless `force` is set.
pub struct CatalogDiffProvider<C> {
    catalog: C,
    db: Db,
    force: bool,
}

impl<C: AppCatalog> CatalogDiffProvider<C> {
    pub fn new(catalog: C, db: Db, force: bool) -> Self {
        Self { catalog, db, force }
    }
}

impl<C: AppCatalog> RecordSetProvider<AppId> for CatalogDiffProvider<C> {
    fn enumerate(&self) -> Result<Vec<AppId>, EngineError> {
        let catalog = self.catalog.app_ids()?;
        let mut excluded = self.db.all_ids()?;
        let recorded = excluded.len();
        if !self.force {
            excluded.extend(self.db.inaccessible_ids()?);
        }
        let work = anti_join(catalog, excluded);
        info!(recorded, force = self.force, pending = work.len(), "catalog diff computed");
        Ok(work)
    }
}

/// Stored games without any tag row.
pub struct MissingTagsProvider {
    db: Db,
}

impl MissingTagsProvider {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl RecordSetProvider<AppId> for MissingTagsProvider {
    fn enumerate(&self) -> Result<Vec<AppId>, EngineError> {
        Ok(self.db.ids_missing_tags()?)
    }
}

/// Every stored game.
pub struct AllGamesProvider {
    db: Db,
}

impl AllGamesProvider {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl RecordSetProvider<AppId> for AllGamesProvider {
    fn enumerate(&self) -> Result<Vec<AppId>, EngineError> {
        Ok(self.db.all_ids()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::db::testing::{count, fresh_db, insert_game, insert_tag};
    use crate::database_ops::games::InsertGamePersister;
    use crate::database_ops::steam::appdetails::testing::HALF_LIFE;
    use crate::database_ops::steam::appdetails::AppDetailsFetcher;
    use crate::database_ops::steam::http::testing::ScriptedHttp;
    use crate::database_ops::steam::store_page::StorePageFetcher;
    use crate::database_ops::tags::TagsPersister;
    use crate::engine::retry::testing::RecordingSleeper;
    use crate::engine::{Backoff, IngestionEngine, NoProgress, RunOptions, RunState};
    use crate::error::CatalogError;
    use crate::normalization::date::DateFormatter;
    use rusqlite::params;
    use std::time::Duration;

    struct FixedCatalog(Vec<u64>);

    impl AppCatalog for FixedCatalog {
        fn app_ids(&self) -> Result<Vec<AppId>, CatalogError> {
            Ok(self.0.iter().copied().map(AppId).collect())
        }
    }

    fn mark_inaccessible(db: &Db, id: u64) {
        db.open()
            .unwrap()
            .execute("INSERT INTO inaccessible (id) VALUES (?1)", params![id as i64])
            .unwrap();
    }

    #[test]
    fn anti_join_orders_and_dedups() {
        assert_eq!(anti_join(vec![3, 1, 2, 3], vec![2]), vec![1, 3]);
        assert!(anti_join(Vec::<u32>::new(), vec![1]).is_empty());
    }

    #[test]
    fn catalog_diff_skips_recorded_and_inaccessible() {
        let (_dir, db) = fresh_db();
        insert_game(&db, 20, "Team Fortress Classic");
        mark_inaccessible(&db, 30);
        let catalog = FixedCatalog(vec![40, 10, 20, 30, 10]);

        let provider = CatalogDiffProvider::new(&catalog, db.clone(), false);
        assert_eq!(provider.enumerate().unwrap(), vec![AppId(10), AppId(40)]);

        let forced = CatalogDiffProvider::new(&catalog, db, true);
        assert_eq!(
            forced.enumerate().unwrap(),
            vec![AppId(10), AppId(30), AppId(40)]
        );
    }

    #[test]
    fn tag_and_update_sets_come_from_storage() {
        let (_dir, db) = fresh_db();
        for id in [1, 2, 3] {
            insert_game(&db, id, "game");
        }
        insert_tag(&db, 2, "Indie");

        assert_eq!(
            MissingTagsProvider::new(db.clone()).enumerate().unwrap(),
            vec![AppId(1), AppId(3)]
        );
        assert_eq!(AllGamesProvider::new(db).enumerate().unwrap().len(), 3);
    }

    struct Quiet;

    impl crate::engine::CompletionReporter for Quiet {
        fn on_finished(&self, _state: &RunState, _elapsed: Duration) {}
    }

    fn table_counts(db: &Db) -> Vec<i64> {
        ["games", "languages", "developers", "platforms", "metacritic", "inaccessible"]
            .iter()
            .map(|table| count(db, &format!("SELECT COUNT(*) FROM {table}")))
            .collect()
    }

    #[test]
    fn second_games_run_changes_nothing() {
        let (_dir, db) = fresh_db();
        let catalog = FixedCatalog(vec![70, 5]);
        let http = ScriptedHttp::new(vec![
            ScriptedHttp::ok(200, r#"{"5":{"success":false}}"#),
            ScriptedHttp::ok(200, HALF_LIFE),
        ]);
        let sleeper = RecordingSleeper::default();
        let run = || {
            IngestionEngine::new(
                CatalogDiffProvider::new(&catalog, db.clone(), false),
                AppDetailsFetcher::new(&http, Backoff::with_sleeper(Duration::ZERO, &sleeper)),
                InsertGamePersister::new(db.clone(), DateFormatter::steam_release_dates()),
                Quiet,
                RunOptions::default(),
            )
            .with_progress(NoProgress)
            .run()
            .unwrap()
        };

        let first = run();
        let after_first = table_counts(&db);
        let second = run();

        assert_eq!((first.succeeded, first.failed), (1, 1));
        assert_eq!(second, RunState::default());
        assert_eq!(table_counts(&db), after_first);
        assert_eq!(http.requested.borrow().len(), 2);
    }

    #[test]
    fn tags_run_counts_storefront_page_as_failed() {
        let (_dir, db) = fresh_db();
        insert_game(&db, 70, "Half-Life");
        let http = ScriptedHttp::new(vec![ScriptedHttp::ok(
            200,
            "<html><body>Welcome to Steam</body></html>",
        )]);
        let sleeper = RecordingSleeper::default();

        let state = IngestionEngine::new(
            MissingTagsProvider::new(db.clone()),
            StorePageFetcher::new(&http, Backoff::with_sleeper(Duration::ZERO, &sleeper)),
            TagsPersister::new(db.clone()),
            Quiet,
            RunOptions::default(),
        )
        .with_progress(NoProgress)
        .run()
        .unwrap();

        assert_eq!((state.current, state.succeeded, state.failed), (1, 0, 1));
        assert_eq!(count(&db, "SELECT COUNT(*) FROM tags"), 0);
        assert_eq!(db.ids_missing_tags().unwrap(), vec![AppId(70)]);
    }
}
