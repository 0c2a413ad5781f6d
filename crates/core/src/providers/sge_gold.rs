use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};

use crate::config::GoldSourceConfig;
use crate::errors::CoreError;
use crate::models::commodity::Commodity;
use super::extract::SgeTableExtractor;
use super::traits::{PageFetcher, PageRequest, PriceExtractor, PriceSource};

const PROVIDER: &str = "SGE";

/// Gold price from the Shanghai Gold Exchange daily quotation page.
///
/// Two independent retry dimensions:
/// - **Dates**: today first, then each previous day, `lookback_days` in total.
///   Weekends and holidays publish nothing, so the most recent trading day wins.
/// - **Attempts**: up to `retry.max_attempts` requests per date, with a random
///   pause between attempts.
pub struct GoldPriceFetcher {
    pages: Arc<dyn PageFetcher>,
    extractor: Box<dyn PriceExtractor>,
    config: GoldSourceConfig,
}

impl GoldPriceFetcher {
    pub fn new(pages: Arc<dyn PageFetcher>, config: GoldSourceConfig) -> Self {
        let extractor = Box::new(SgeTableExtractor::new(config.ticker.clone()));
        Self::with_extractor(pages, extractor, config)
    }

    pub fn with_extractor(
        pages: Arc<dyn PageFetcher>,
        extractor: Box<dyn PriceExtractor>,
        config: GoldSourceConfig,
    ) -> Self {
        Self {
            pages,
            extractor,
            config,
        }
    }

    /// Quotation URL for one trading day.
    pub fn url_for(&self, date: NaiveDate) -> String {
        self.config
            .url_template
            .replace("{date}", &date.format("%Y-%m-%d").to_string())
    }

    /// Candidate dates, most recent first.
    pub fn candidate_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        (0..self.config.lookback_days.max(1))
            .filter_map(|back| today.checked_sub_days(Days::new(back as u64)))
            .collect()
    }

    /// Walk back from `today` until one date yields a close.
    pub async fn fetch_price_as_of(&self, today: NaiveDate) -> Result<f64, CoreError> {
        for date in self.candidate_dates(today) {
            match self.fetch_for_date(date).await {
                Ok(price) => {
                    tracing::info!(%date, price, "gold price found");
                    return Ok(price);
                }
                Err(e) => {
                    tracing::debug!(%date, error = %e, "no gold price for date, trying previous day");
                }
            }
        }

        tracing::warn!(
            lookback_days = self.config.lookback_days,
            "gold price not found in any candidate date"
        );
        Err(CoreError::PriceNotFound {
            commodity: Commodity::Gold.to_string(),
        })
    }

    /// Inner retry loop for a single date.
    async fn fetch_for_date(&self, date: NaiveDate) -> Result<f64, CoreError> {
        let url = self.url_for(date);
        let request = PageRequest {
            url: &url,
            referer: Some(&self.config.referer),
            timeout: self.config.timeout,
        };

        let mut last_error = None;
        for attempt in self.config.retry.attempts() {
            self.config.retry.pause_before(attempt).await;

            match self.pages.fetch_page(request).await {
                Ok(body) => match self.extractor.extract_price(&body) {
                    Some(price) => return Ok(price),
                    None => {
                        tracing::debug!(%date, attempt, "quotation table has no usable close");
                        last_error = Some(CoreError::Api {
                            provider: PROVIDER.into(),
                            message: format!(
                                "no {} close on page for {date}",
                                self.config.ticker
                            ),
                        });
                    }
                },
                Err(e) => {
                    tracing::debug!(%date, attempt, error = %e, "gold page request failed");
                    last_error = Some(e);
                }
            }
        }

        Err(CoreError::Api {
            provider: PROVIDER.into(),
            message: format!(
                "{date}: gave up after {} attempts ({})",
                self.config.retry.max_attempts.max(1),
                last_error.map(|e| e.to_string()).unwrap_or_default()
            ),
        })
    }
}

#[async_trait]
impl PriceSource for GoldPriceFetcher {
    fn commodity(&self) -> Commodity {
        Commodity::Gold
    }

    async fn fetch_price(&self) -> Result<f64, CoreError> {
        self.fetch_price_as_of(Local::now().date_naive()).await
    }
}
