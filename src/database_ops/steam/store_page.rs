//! Store page scraping: user tags and the all-time positive review percentage.

use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};

use super::http::{classify, BlockingHttp, HttpGet};
use super::AppId;
use crate::engine::{Backoff, FetchOutcome, Resolved, RetryableFetcher, Sleeper, ThreadSleeper};
use crate::normalization::rating::all_time_rating;

pub const STORE_PAGE_URL: &str = "https://store.steampowered.com/app/";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorePage {
    pub tags: Vec<String>,
    pub rating: Option<u8>,
}

fn tag_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("a.app_tag").expect("static tag selector"))
}

fn summary_row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse("div.user_reviews_summary_row").expect("static review selector")
    })
}

/// Concatenate the element's text nodes, each trimmed.
fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

pub fn parse_store_page(html: &str) -> StorePage {
    let doc = Html::parse_document(html);
    let tags = doc
        .select(tag_selector())
        .map(stripped_text)
        .filter(|tag| !tag.is_empty())
        .collect();
    let rows: Vec<String> = doc.select(summary_row_selector()).map(stripped_text).collect();
    StorePage {
        tags,
        rating: all_time_rating(&rows),
    }
}

/// Fetches tags and rating together. A page with neither counts as not found; Steam
/// serves its front page for delisted apps.
pub struct StorePageFetcher<H = BlockingHttp, S = ThreadSleeper> {
    http: H,
    backoff: Backoff<S>,
    base_url: String,
}

impl<H: HttpGet, S: Sleeper> StorePageFetcher<H, S> {
    pub fn new(http: H, backoff: Backoff<S>) -> Self {
        Self::with_base_url(http, backoff, STORE_PAGE_URL)
    }

    pub fn with_base_url(http: H, backoff: Backoff<S>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            backoff,
            base_url: base_url.into(),
        }
    }

    fn resolve_page<T>(
        &self,
        id: &AppId,
        extract: impl Fn(StorePage) -> FetchOutcome<T>,
    ) -> Resolved<T> {
        let url = format!("{}{}", self.base_url, id);
        self.backoff.resolve(id, || {
            classify(self.http.get(&url), |body| extract(parse_store_page(&body)))
        })
    }
}

impl<H: HttpGet, S: Sleeper> RetryableFetcher<AppId> for StorePageFetcher<H, S> {
    type Payload = StorePage;

    fn fetch(&self, id: &AppId) -> Resolved<StorePage> {
        self.resolve_page(id, |page| {
            if page.tags.is_empty() && page.rating.is_none() {
                FetchOutcome::NotFound
            } else {
                FetchOutcome::Success(page)
            }
        })
    }
}

/// Fetches only the rating. A page without an all-time review row counts as not found.
pub struct RatingFetcher<H = BlockingHttp, S = ThreadSleeper> {
    page: StorePageFetcher<H, S>,
}

impl<H: HttpGet, S: Sleeper> RatingFetcher<H, S> {
    pub fn new(http: H, backoff: Backoff<S>) -> Self {
        Self {
            page: StorePageFetcher::new(http, backoff),
        }
    }
}

impl<H: HttpGet, S: Sleeper> RetryableFetcher<AppId> for RatingFetcher<H, S> {
    type Payload = u8;

    fn fetch(&self, id: &AppId) -> Resolved<u8> {
        self.page
            .resolve_page(id, |page| match page.rating {
                Some(rating) => FetchOutcome::Success(rating),
                None => FetchOutcome::NotFound,
            })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    pub const STORE_PAGE: &str = r#"<html><body>
        <div class="user_reviews_summary_row">
            <div class="subtitle">Recent Reviews:</div>
            <div class="summary">Mostly Positive (120) - 74% of the 120 user reviews in the last 30 days are positive.</div>
        </div>
        <div class="user_reviews_summary_row">
            <div class="subtitle">All Reviews:</div>
            <div class="summary">Overwhelmingly Positive (98,000) - 96% of the 98,000 user reviews for this game are positive.</div>
        </div>
        <div class="glance_tags popular_tags">
            <a href="/tags/en/FPS/" class="app_tag">
                FPS
            </a>
            <a href="/tags/en/Classic/" class="app_tag">	Classic	</a>
            <a href="/tags/en/Sci-fi/" class="app_tag">Sci-fi</a>
        </div>
    </body></html>"#;
}

#[cfg(test)]
mod tests {
    use super::testing::STORE_PAGE;
    use super::*;
    use crate::database_ops::steam::http::testing::ScriptedHttp;
    use crate::engine::retry::testing::RecordingSleeper;
    use crate::error::SourceError;
    use std::time::Duration;

    #[test]
    fn extracts_tags_and_all_time_rating() {
        let page = parse_store_page(STORE_PAGE);
        assert_eq!(page.tags, vec!["FPS", "Classic", "Sci-fi"]);
        assert_eq!(page.rating, Some(96));
    }

    #[test]
    fn page_with_single_review_row_has_no_rating() {
        let page = parse_store_page(
            r#"<div class="user_reviews_summary_row">All Reviews: 80% positive</div>"#,
        );
        assert!(page.tags.is_empty());
        assert_eq!(page.rating, None);
    }

    #[test]
    fn rating_fetcher_treats_missing_rating_as_not_found() {
        let http = ScriptedHttp::new(vec![ScriptedHttp::ok(200, "<html></html>")]);
        let sleeper = RecordingSleeper::default();
        let fetcher = RatingFetcher::new(&http, Backoff::with_sleeper(Duration::ZERO, &sleeper));
        assert!(matches!(fetcher.fetch(&AppId(4)), Resolved::NotFound));
    }

    #[test]
    fn page_without_tags_or_rating_is_not_found() {
        let http = ScriptedHttp::new(vec![ScriptedHttp::ok(
            200,
            "<html><body>Welcome to Steam</body></html>",
        )]);
        let sleeper = RecordingSleeper::default();
        let fetcher = StorePageFetcher::new(&http, Backoff::with_sleeper(Duration::ZERO, &sleeper));
        assert!(matches!(fetcher.fetch(&AppId(70)), Resolved::NotFound));
        assert!(sleeper.slept.borrow().is_empty());
    }

    #[test]
    fn page_with_rating_but_no_tags_is_kept() {
        let http = ScriptedHttp::new(vec![ScriptedHttp::ok(
            200,
            r#"<div class="user_reviews_summary_row">Recent: 50%</div>
               <div class="user_reviews_summary_row">All Reviews: 81% of 10 reviews</div>"#,
        )]);
        let sleeper = RecordingSleeper::default();
        let fetcher = StorePageFetcher::new(&http, Backoff::with_sleeper(Duration::ZERO, &sleeper));
        let Resolved::Success(page) = fetcher.fetch(&AppId(70)) else {
            panic!("expected success");
        };
        assert!(page.tags.is_empty());
        assert_eq!(page.rating, Some(81));
    }

    #[test]
    fn store_page_fetcher_retries_transport_errors() {
        let http = ScriptedHttp::new(vec![
            Err(SourceError::Transport("connection reset".into())),
            ScriptedHttp::ok(200, STORE_PAGE),
        ]);
        let sleeper = RecordingSleeper::default();
        let fetcher =
            StorePageFetcher::new(&http, Backoff::with_sleeper(Duration::from_secs(2), &sleeper));

        let Resolved::Success(page) = fetcher.fetch(&AppId(70)) else {
            panic!("expected success");
        };
        assert_eq!(page.rating, Some(96));
        assert_eq!(sleeper.slept.borrow().len(), 1);
        assert_eq!(http.requested.borrow()[0], format!("{STORE_PAGE_URL}70"));
    }

    #[test]
    fn redirect_loop_is_not_retried() {
        let http = ScriptedHttp::new(vec![Err(SourceError::RedirectLoop)]);
        let sleeper = RecordingSleeper::default();
        let fetcher = StorePageFetcher::new(&http, Backoff::with_sleeper(Duration::ZERO, &sleeper));
        assert!(matches!(
            fetcher.fetch(&AppId(70)),
            Resolved::PermanentFailure(SourceError::RedirectLoop)
        ));
        assert_eq!(http.requested.borrow().len(), 1);
    }
}
