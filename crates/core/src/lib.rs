pub mod config;
pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::path::Path;
use std::sync::Arc;

use chrono::Local;

use config::TrackerConfig;
use errors::CoreError;
use models::band::GOLD_EGG_BAND;
use models::record::PriceRecord;
use providers::egg_100ppi::EggPriceFetcher;
use providers::http::HttpPageFetcher;
use providers::sge_gold::GoldPriceFetcher;
use providers::traits::{PageFetcher, PriceSource};
use services::ratio_service::RatioCalculator;
use services::report_service::ReportFormatter;
use storage::history::HistoryStore;

/// Outcome of one full pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The record built by this run.
    pub record: PriceRecord,
    /// History after the upsert, newest first.
    pub history: Vec<PriceRecord>,
    /// Whether the history file was written.
    pub persisted: bool,
}

/// Main entry point for the tracker: owns the two price sources, the
/// history store and the formatters, and runs the daily pipeline
/// fetch → ratio → upsert → render.
#[must_use]
pub struct PriceTracker {
    config: TrackerConfig,
    gold: Box<dyn PriceSource>,
    egg: Box<dyn PriceSource>,
    history: HistoryStore,
    ratios: RatioCalculator,
    formatter: ReportFormatter,
}

impl std::fmt::Debug for PriceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceTracker")
            .field("history_path", &self.config.history_path)
            .field("html_path", &self.config.html_path)
            .field("max_history", &self.config.max_history)
            .finish()
    }
}

impl PriceTracker {
    /// Tracker wired to the live SGE and 100ppi pages over HTTP.
    pub fn new(config: TrackerConfig) -> Self {
        let pages: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new());
        let gold = Box::new(GoldPriceFetcher::new(pages.clone(), config.gold.clone()));
        let egg = Box::new(EggPriceFetcher::new(pages, config.egg.clone()));
        Self::with_sources(config, gold, egg)
    }

    /// Tracker with caller-supplied sources (fixtures, alternative sites).
    pub fn with_sources(
        config: TrackerConfig,
        gold: Box<dyn PriceSource>,
        egg: Box<dyn PriceSource>,
    ) -> Self {
        let history = HistoryStore::new(config.history_path.clone(), config.max_history);
        Self {
            config,
            gold,
            egg,
            history,
            ratios: RatioCalculator::new(),
            formatter: ReportFormatter::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn history_store(&self) -> &HistoryStore {
        &self.history
    }

    pub fn formatter(&self) -> &ReportFormatter {
        &self.formatter
    }

    /// Fetch both prices (sequentially) and build today's record.
    ///
    /// Never fails: a source that gives up leaves its price absent and adds
    /// one line to `errors`.
    pub async fn collect(&self) -> PriceRecord {
        let now = Local::now().naive_local();
        let mut record = PriceRecord::new(now.date(), now);

        record.gold_price = self.fetch_into_errors(self.gold.as_ref(), &mut record.errors).await;
        record.egg_price = self.fetch_into_errors(self.egg.as_ref(), &mut record.errors).await;

        self.ratios.apply(&mut record);
        record
    }

    async fn fetch_into_errors(
        &self,
        source: &dyn PriceSource,
        errors: &mut Vec<String>,
    ) -> Option<f64> {
        match source.fetch_price().await {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::warn!(commodity = %source.commodity(), error = %e, "price fetch failed");
                errors.push(format!("{} price fetch failed: {e}", source.commodity()));
                None
            }
        }
    }

    /// Merge `record` into the stored history.
    ///
    /// A failed write is logged and the merged history is still returned,
    /// so the page and report reflect this run either way.
    pub fn record(&self, record: &PriceRecord) -> (Vec<PriceRecord>, bool) {
        match self.history.upsert(record.clone()) {
            Ok(history) => (history, true),
            Err(e) => {
                tracing::warn!(path = %self.history.path().display(), error = %e, "failed to persist history");
                let history =
                    HistoryStore::merge(self.history.load(), record.clone(), self.config.max_history);
                (history, false)
            }
        }
    }

    /// Full daily run. Only an HTML write failure is returned as an error.
    pub async fn run(&self) -> Result<RunReport, CoreError> {
        let record = self.collect().await;
        let (history, persisted) = self.record(&record);
        self.write_html(&history)?;
        Ok(RunReport {
            record,
            history,
            persisted,
        })
    }

    /// Re-render the dashboard from stored history without fetching.
    pub fn render_only(&self) -> Result<Vec<PriceRecord>, CoreError> {
        let history = self.history.load();
        if history.is_empty() {
            tracing::warn!("no history yet, rendering an empty page");
        }
        self.write_html(&history)?;
        Ok(history)
    }

    /// Render `history` and write it to the configured HTML path.
    pub fn write_html(&self, history: &[PriceRecord]) -> Result<(), CoreError> {
        let html = self
            .formatter
            .render_html(history, self.config.chart_window, GOLD_EGG_BAND);
        write_artifact(&self.config.html_path, &html)?;
        tracing::info!(path = %self.config.html_path.display(), records = history.len(), "dashboard written");
        Ok(())
    }
}

fn write_artifact(path: &Path, contents: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).map_err(|e| {
        CoreError::FileIO(format!("Failed to write {}: {e}", path.display()))
    })
}
