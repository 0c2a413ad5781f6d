use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EggSourceConfig;
use crate::errors::CoreError;
use crate::models::commodity::Commodity;
use super::extract::TextPatternExtractor;
use super::traits::{PageFetcher, PageRequest, PriceExtractor, PriceSource};

/// The bulletin quotes eggs per kilogram-equivalent; reports use jin.
///
/// Fixed unit conversion tied to this one source's format, not a tunable.
pub const EGG_UNIT_DIVISOR: f64 = 2.0;

/// Egg reference price from the 100ppi egg bulletin page.
///
/// Single URL, no date fallback: the bulletin always shows the latest quote.
pub struct EggPriceFetcher {
    pages: Arc<dyn PageFetcher>,
    extractor: Box<dyn PriceExtractor>,
    config: EggSourceConfig,
}

impl EggPriceFetcher {
    pub fn new(pages: Arc<dyn PageFetcher>, config: EggSourceConfig) -> Self {
        Self::with_extractor(pages, Box::new(TextPatternExtractor::egg_reference_price()), config)
    }

    pub fn with_extractor(
        pages: Arc<dyn PageFetcher>,
        extractor: Box<dyn PriceExtractor>,
        config: EggSourceConfig,
    ) -> Self {
        Self {
            pages,
            extractor,
            config,
        }
    }
}

#[async_trait]
impl PriceSource for EggPriceFetcher {
    fn commodity(&self) -> Commodity {
        Commodity::Egg
    }

    async fn fetch_price(&self) -> Result<f64, CoreError> {
        let request = PageRequest {
            url: &self.config.url,
            referer: Some(&self.config.referer),
            timeout: self.config.timeout,
        };

        for attempt in self.config.retry.attempts() {
            self.config.retry.pause_before(attempt).await;

            match self.pages.fetch_page(request).await {
                Ok(body) => match self.extractor.extract_price(&body) {
                    Some(quoted) => {
                        let price = quoted / EGG_UNIT_DIVISOR;
                        tracing::info!(quoted, price, "egg price found");
                        return Ok(price);
                    }
                    None => {
                        tracing::debug!(attempt, "egg reference price phrase not on page");
                    }
                },
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "egg page request failed");
                }
            }
        }

        tracing::warn!(
            attempts = self.config.retry.max_attempts,
            "egg price not found"
        );
        Err(CoreError::PriceNotFound {
            commodity: Commodity::Egg.to_string(),
        })
    }
}
