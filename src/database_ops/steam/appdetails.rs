//! Store `appdetails` endpoint: payload model, payload validation and the retrying fetcher.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::http::{classify, BlockingHttp, HttpGet};
use super::AppId;
use crate::engine::{Backoff, FetchOutcome, Resolved, RetryableFetcher, Sleeper, ThreadSleeper};
use crate::error::SourceError;
use crate::normalization::text::str_to_bool;

pub const APP_DETAILS_URL: &str = "https://store.steampowered.com/api/appdetails?appids=";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppDetails {
    #[serde(rename = "type")]
    pub app_type: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub required_age: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_free: Option<bool>,
    pub fullgame: Option<FullGame>,
    pub detailed_description: Option<String>,
    pub about_the_game: Option<String>,
    pub short_description: Option<String>,
    pub supported_languages: Option<String>,
    #[serde(default)]
    pub developers: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    pub price_overview: Option<PriceOverview>,
    #[serde(default)]
    pub platforms: BTreeMap<String, bool>,
    pub metacritic: Option<Metacritic>,
    #[serde(default)]
    pub categories: Vec<Described>,
    #[serde(default)]
    pub genres: Vec<Described>,
    pub recommendations: Option<Total>,
    pub screenshots: Option<Vec<Value>>,
    pub movies: Option<Vec<Value>>,
    pub achievements: Option<Total>,
    pub release_date: Option<ReleaseDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FullGame {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub appid: Option<i64>,
    pub name: Option<String>,
}

/// Prices are in the smallest currency unit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PriceOverview {
    pub initial: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Metacritic {
    pub score: Option<i64>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Described {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Total {
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReleaseDate {
    #[serde(default)]
    pub coming_soon: bool,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    data: Option<Value>,
}

/// Steam sends some integers as strings ("required_age": "18").
fn lenient_i64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(Value::Bool(b)) => Some(i64::from(b)),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(de: D) -> Result<Option<bool>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => Some(str_to_bool(&s)),
        Some(Value::Number(n)) => n.as_i64().map(|n| n != 0),
        _ => None,
    })
}

/// Validate a 200 body for `appid`.
///
/// `null`, a missing entry and `"success": false` all mean the store has no such app.
/// Bytes that are not JSON are treated as a truncated response and retried; JSON that
/// does not fit the model is a permanent failure.
pub fn parse_app_details(body: &str, appid: AppId) -> FetchOutcome<AppDetails> {
    let root: Option<HashMap<String, Envelope>> = match serde_json::from_str(body) {
        Ok(root) => root,
        Err(err) if err.is_data() => {
            return FetchOutcome::PermanentFailure(SourceError::Decode(err.to_string()))
        }
        Err(err) => return FetchOutcome::TransientError(SourceError::Decode(err.to_string())),
    };
    let Some(envelope) = root.and_then(|mut map| map.remove(&appid.to_string())) else {
        return FetchOutcome::NotFound;
    };
    match envelope.data {
        Some(data) if envelope.success => match serde_json::from_value(data) {
            Ok(details) => FetchOutcome::Success(details),
            Err(err) => FetchOutcome::PermanentFailure(SourceError::Decode(err.to_string())),
        },
        _ => FetchOutcome::NotFound,
    }
}

pub struct AppDetailsFetcher<H = BlockingHttp, S = ThreadSleeper> {
    http: H,
    backoff: Backoff<S>,
    base_url: String,
}

impl<H: HttpGet, S: Sleeper> AppDetailsFetcher<H, S> {
    pub fn new(http: H, backoff: Backoff<S>) -> Self {
        Self::with_base_url(http, backoff, APP_DETAILS_URL)
    }

    pub fn with_base_url(http: H, backoff: Backoff<S>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            backoff,
            base_url: base_url.into(),
        }
    }
}

impl<H: HttpGet, S: Sleeper> RetryableFetcher<AppId> for AppDetailsFetcher<H, S> {
    type Payload = AppDetails;

    fn fetch(&self, id: &AppId) -> Resolved<AppDetails> {
        let url = format!("{}{}", self.base_url, id);
        self.backoff.resolve(id, || {
            classify(self.http.get(&url), |body| parse_app_details(&body, *id))
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    /// Trimmed copy of a real appdetails response for Half-Life (appid 70).
    pub const HALF_LIFE: &str = r#"{"70":{"success":true,"data":{
        "type":"game","name":"Half-Life","steam_appid":70,"required_age":"0","is_free":false,
        "detailed_description":"Named Game of the Year","about_the_game":"Named Game of the Year",
        "short_description":"Named Game of the Year by over 50 publications",
        "supported_languages":"English<strong>*</strong>, French<strong>*</strong>, German<br><strong>*</strong>languages with full audio support",
        "developers":["Valve"],"publishers":["Valve"],
        "price_overview":{"currency":"EUR","initial":819,"final":819},
        "platforms":{"windows":true,"mac":true,"linux":true},
        "metacritic":{"score":96,"url":"https://www.metacritic.com/game/pc/half-life"},
        "categories":[{"id":2,"description":"Single-player"},{"id":1,"description":"Multi-player"}],
        "genres":[{"id":"1","description":"Action"}],
        "screenshots":[{"id":0},{"id":1},{"id":2}],
        "recommendations":{"total":98000},
        "achievements":{"total":0},
        "release_date":{"coming_soon":false,"date":"8 Nov, 1998"}}}}"#;
}
