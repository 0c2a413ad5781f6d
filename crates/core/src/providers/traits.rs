use std::time::Duration;

use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::commodity::Commodity;

/// One GET against a remote document.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub url: &'a str,
    pub referer: Option<&'a str>,
    pub timeout: Duration,
}

/// Retrieves the raw body of a remote HTML page.
///
/// The HTTP implementation lives in `http.rs`; tests swap in scripted
/// fetchers so retry and fallback logic can run without a network.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Return the response body, or an error for transport failures and
    /// non-2xx statuses.
    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<String, CoreError>;
}

/// Pulls a single price out of a fetched document.
///
/// `None` means "this document does not carry a usable price". It is never
/// an error: malformed pages are expected and simply cost an attempt.
pub trait PriceExtractor: Send + Sync {
    fn extract_price(&self, document: &str) -> Option<f64>;
}

/// A commodity price source with its own retry policy.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Which commodity this source reports.
    fn commodity(&self) -> Commodity;

    /// Current price in the commodity's report unit, or
    /// `CoreError::PriceNotFound` once every attempt is used up.
    async fn fetch_price(&self) -> Result<f64, CoreError>;
}
