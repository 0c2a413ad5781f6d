use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;
use crate::errors::CoreError;
use crate::models::record::PriceRecord;
use super::report_service::ReportFormatter;

/// Subject used when nothing is out of the ordinary.
pub const REPORT_TITLE: &str = "黄金/鸡蛋价格日报";

/// Prefix marking an escalated subject.
pub const ALERT_MARKER: &str = "⚠️";

/// What happened to a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Submitted to the relay for this many recipients.
    Sent { recipients: usize },
    /// Mail is not configured; nothing was attempted.
    Skipped,
}

/// Sends the daily report through an SMTP submission relay.
///
/// Built from an optional `MailConfig`: without one every `notify` is a
/// `Skipped` no-op, which is the normal state for local runs.
pub struct Notifier {
    config: Option<MailConfig>,
    alert_threshold: f64,
    formatter: ReportFormatter,
}

impl Notifier {
    pub fn new(config: Option<MailConfig>, alert_threshold: f64) -> Self {
        Self {
            config,
            alert_threshold,
            formatter: ReportFormatter::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Plain title, or the title escalated with the alert marker when gold
    /// is strictly above `threshold`.
    pub fn subject(record: &PriceRecord, threshold: f64) -> String {
        match record.gold_price {
            Some(gold) if gold > threshold => format!("{ALERT_MARKER} 金价预警 | {REPORT_TITLE}"),
            _ => REPORT_TITLE.to_string(),
        }
    }

    /// Assemble the message without sending it.
    pub fn build_message(
        &self,
        config: &MailConfig,
        record: &PriceRecord,
        history: &[PriceRecord],
    ) -> Result<Message, CoreError> {
        let from: Mailbox = config.sender.parse()?;
        let mut builder = Message::builder()
            .from(from)
            .subject(Self::subject(record, self.alert_threshold))
            .header(ContentType::TEXT_PLAIN);

        for recipient in &config.recipients {
            let to: Mailbox = recipient.parse()?;
            builder = builder.to(to);
        }

        let body = self
            .formatter
            .format_email_body(record, history, self.alert_threshold);
        Ok(builder.body(body)?)
    }

    fn transport(config: &MailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, CoreError> {
        let builder = if config.uses_implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        Ok(builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build())
    }

    /// Send the report for `record` (with `history` as context).
    pub async fn notify(
        &self,
        record: &PriceRecord,
        history: &[PriceRecord],
    ) -> Result<NotifyOutcome, CoreError> {
        let Some(config) = &self.config else {
            tracing::info!("mail settings incomplete, skipping notification");
            return Ok(NotifyOutcome::Skipped);
        };

        let message = self.build_message(config, record, history)?;
        let mailer = Self::transport(config)?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            recipients = config.recipients.len(),
            "sending report mail"
        );
        mailer.send(message).await?;

        Ok(NotifyOutcome::Sent {
            recipients: config.recipients.len(),
        })
    }
}
