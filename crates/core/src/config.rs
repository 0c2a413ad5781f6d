use std::path::PathBuf;
use std::time::Duration;

use crate::errors::CoreError;
use crate::providers::retry::RetryPolicy;

/// Shanghai Gold Exchange daily quotation page. `{date}` is replaced by the
/// candidate trading day (`YYYY-MM-DD`) in both query parameters.
pub const DEFAULT_GOLD_URL_TEMPLATE: &str =
    "https://www.sge.com.cn/sjzx/quotation_daily_new?start_date={date}&end_date={date}";

/// China egg industry price bulletin page.
pub const DEFAULT_EGG_URL: &str = "https://egg.100ppi.com/kx/";

/// Where the gold price comes from and how hard to try.
#[derive(Debug, Clone)]
pub struct GoldSourceConfig {
    pub url_template: String,
    pub referer: String,
    /// Contract code matched against the table's contract column.
    pub ticker: String,
    /// Candidate dates tried: today plus `lookback_days - 1` earlier days.
    pub lookback_days: u32,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for GoldSourceConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_GOLD_URL_TEMPLATE.to_string(),
            referer: "https://www.sge.com.cn/".to_string(),
            ticker: "Au99.99".to_string(),
            lookback_days: 5,
            timeout: Duration::from_secs(20),
            retry: RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(3)),
        }
    }
}

/// Where the egg price comes from and how hard to try.
#[derive(Debug, Clone)]
pub struct EggSourceConfig {
    pub url: String,
    pub referer: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for EggSourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_EGG_URL.to_string(),
            referer: "https://egg.100ppi.com/".to_string(),
            timeout: Duration::from_secs(15),
            retry: RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(2)),
        }
    }
}

/// Everything a run needs, passed explicitly into each component.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub gold: GoldSourceConfig,
    pub egg: EggSourceConfig,
    /// JSON history file.
    pub history_path: PathBuf,
    /// Generated dashboard page.
    pub html_path: PathBuf,
    /// Retention cap for the history.
    pub max_history: usize,
    /// Number of most recent records shown in the dashboard charts and table.
    pub chart_window: usize,
    /// Gold price (currency per gram) above which the mail subject is escalated.
    pub alert_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            gold: GoldSourceConfig::default(),
            egg: EggSourceConfig::default(),
            history_path: PathBuf::from("data/price_history.json"),
            html_path: PathBuf::from("index.html"),
            max_history: 365,
            chart_window: 30,
            alert_threshold: 960.0,
        }
    }
}

/// SMTP submission settings. Only present when every required value is set.
#[derive(Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub recipients: Vec<String>,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sender", &self.sender)
            .field("recipients", &self.recipients)
            .finish()
    }
}

impl MailConfig {
    pub const DEFAULT_PORT: u16 = 587;

    /// Read `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`,
    /// `EMAIL_SENDER` and `EMAIL_RECIPIENT` from the process environment.
    ///
    /// `Ok(None)` means "not configured": the caller skips sending.
    pub fn from_env() -> Result<Option<Self>, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`MailConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let (Some(host), Some(username), Some(password), Some(sender), Some(raw_recipients)) = (
            get("SMTP_HOST"),
            get("SMTP_USERNAME"),
            get("SMTP_PASSWORD"),
            get("EMAIL_SENDER"),
            get("EMAIL_RECIPIENT"),
        ) else {
            return Ok(None);
        };

        let recipients = parse_recipients(&raw_recipients);
        if recipients.is_empty() {
            return Ok(None);
        }

        let port = match get("SMTP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| CoreError::Config(format!("Invalid SMTP_PORT '{raw}': {e}")))?,
            None => Self::DEFAULT_PORT,
        };

        Ok(Some(Self {
            host,
            port,
            username,
            password,
            sender,
            recipients,
        }))
    }

    /// Port 465 speaks TLS from the first byte; everything else upgrades via STARTTLS.
    pub fn uses_implicit_tls(&self) -> bool {
        self.port == 465
    }
}

/// Split a `,`- or `;`-separated recipient list, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
