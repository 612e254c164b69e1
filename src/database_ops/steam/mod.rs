pub mod appdetails;
pub mod catalog;
pub mod http;
pub mod store_page;

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};

/// Steam application id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct AppId(pub u64);

impl AppId {
    /// SQLite integers are signed, so ids above `i64::MAX` cannot be stored.
    pub fn to_db(self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }

    pub fn from_db(raw: i64) -> Self {
        Self(raw as u64)
    }
}

impl ToSql for AppId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let raw = i64::try_from(self.0)
            .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
        Ok(ToSqlOutput::from(raw))
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AppId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(AppId)
    }
}

impl From<u64> for AppId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
