use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::{AppConfig, Recipient};
use crate::error::RunError;
use crate::forecast::evaluator::evaluate_all;
use crate::forecast::window::{filter_to_window, WindowSelector};
use crate::forecast::ForecastProvider;
use crate::mail::{EmailMessage, MailTransport};
use crate::report::ReportFormatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Hand reports with suitable hours to the mail transport
    Send,
    /// Admin only, print every report, never touch the transport
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent { recipient: String },
    Printed { recipient: String, message: EmailMessage },
    Suppressed { recipient: String },
}

impl DispatchOutcome {
    pub fn recipient(&self) -> &str {
        match self {
            Self::Sent { recipient }
            | Self::Printed { recipient, .. }
            | Self::Suppressed { recipient } => recipient,
        }
    }
}

/// Runs the forecast pipeline for each configured recipient in order
pub struct Dispatcher {
    config: Arc<AppConfig>,
    provider: Arc<dyn ForecastProvider>,
    transport: Arc<dyn MailTransport>,
    selector: WindowSelector,
    formatter: ReportFormatter,
    mode: DispatchMode,
}

impl Dispatcher {
    pub fn new(
        config: Arc<AppConfig>,
        provider: Arc<dyn ForecastProvider>,
        transport: Arc<dyn MailTransport>,
        mode: DispatchMode,
    ) -> Self {
        let selector = WindowSelector::with_default_bounds(config.timezone);
        let formatter = ReportFormatter::new(config.admin_email.clone(), config.timezone);

        Self {
            config,
            provider,
            transport,
            selector,
            formatter,
            mode,
        }
    }

    /// Recipients for this run; debug mode keeps only the admin
    fn recipients(&self) -> Vec<&Recipient> {
        self.config
            .recipients
            .iter()
            .filter(|r| self.mode == DispatchMode::Send || r.email == self.config.admin_email)
            .collect()
    }

    /// Process every recipient, stopping at the first error
    pub async fn run(&self, today: NaiveDate) -> Result<Vec<DispatchOutcome>, RunError> {
        let recipients = self.recipients();
        tracing::info!(
            count = recipients.len(),
            mode = ?self.mode,
            date = %today,
            "Starting forecast run"
        );

        let mut outcomes = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            match self.dispatch(recipient, today).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::debug!(recipient = %recipient.email, error = %e, "Aborting run");
                    return Err(e);
                }
            }
        }

        Ok(outcomes)
    }

    async fn dispatch(
        &self,
        recipient: &Recipient,
        today: NaiveDate,
    ) -> Result<DispatchOutcome, RunError> {
        let location = self
            .config
            .location(&recipient.location)
            .ok_or_else(|| RunError::UnknownLocation(recipient.location.clone()))?;

        let forecast = self.provider.fetch(location.coordinate(), today).await?;

        let samples = evaluate_all(&forecast.data.hourly.data)?;
        let window = self.selector.select_window(today, &forecast.data.daily.data)?;
        let todays = filter_to_window(samples, &window);
        let suitable = todays.iter().filter(|s| s.is_suitable).count();

        tracing::info!(
            recipient = %recipient.email,
            location = %location.name,
            hours = todays.len(),
            suitable = suitable,
            "Evaluated forecast"
        );

        let recipient_email = recipient.email.clone();

        if suitable == 0 && self.mode == DispatchMode::Send {
            tracing::info!(recipient = %recipient_email, "No suitable hours, mail suppressed");
            return Ok(DispatchOutcome::Suppressed {
                recipient: recipient_email,
            });
        }

        let report = self
            .formatter
            .format_report(location, recipient, &window, &todays);
        tracing::debug!(
            lines = report.lines.len(),
            subject = %report.message.subject,
            "Report rendered"
        );

        match self.mode {
            DispatchMode::Debug => {
                println!("{}", report.message.to_rfc822());
                Ok(DispatchOutcome::Printed {
                    recipient: recipient_email,
                    message: report.message,
                })
            }
            DispatchMode::Send => {
                self.transport.send(&report.message).await?;
                Ok(DispatchOutcome::Sent {
                    recipient: recipient_email,
                })
            }
        }
    }
}
