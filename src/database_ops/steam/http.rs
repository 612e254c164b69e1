//! Blocking HTTP transport and the status classification shared by every Steam fetcher.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use crate::engine::FetchOutcome;
use crate::error::SourceError;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; steam-scraper/0.1)";
const MAX_REDIRECTS: usize = 10;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Minimal GET seam so fetchers can run against scripted responses.
pub trait HttpGet {
    fn get(&self, url: &str) -> Result<HttpResponse, SourceError>;
}

impl<T: HttpGet + ?Sized> HttpGet for &T {
    fn get(&self, url: &str) -> Result<HttpResponse, SourceError> {
        (**self).get(url)
    }
}

#[derive(Debug, Clone)]
pub struct BlockingHttp {
    client: Client,
}

impl BlockingHttp {
    pub fn new() -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport_error)?;
        Ok(Self { client })
    }
}

impl HttpGet for BlockingHttp {
    fn get(&self, url: &str) -> Result<HttpResponse, SourceError> {
        let resp = self.client.get(url).send().map_err(transport_error)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(transport_error)?;
        Ok(HttpResponse { status, body })
    }
}

fn transport_error(err: reqwest::Error) -> SourceError {
    if err.is_redirect() {
        SourceError::RedirectLoop
    } else {
        SourceError::Transport(err.to_string())
    }
}

/// Map one response to an attempt outcome; `on_ok` validates a 2xx body.
///
/// Redirect loops are structural and never retried. Every other transport error and
/// unexpected status is treated as transient.
pub fn classify<T>(
    result: Result<HttpResponse, SourceError>,
    on_ok: impl FnOnce(String) -> FetchOutcome<T>,
) -> FetchOutcome<T> {
    match result {
        Err(SourceError::RedirectLoop) => FetchOutcome::PermanentFailure(SourceError::RedirectLoop),
        Err(err) => FetchOutcome::TransientError(err),
        Ok(resp) => match resp.status {
            200..=299 => on_ok(resp.body),
            404 | 410 => FetchOutcome::NotFound,
            429 => FetchOutcome::RateLimited,
            status => FetchOutcome::TransientError(SourceError::Status(status)),
        },
    }
}
