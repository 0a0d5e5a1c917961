mod sendmail;

pub use sendmail::{SendmailTransport, DEFAULT_SENDMAIL_PATH};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to start mail transport `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed to hand message to mail transport: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mail transport exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
}

/// A complete plaintext email ready for `sendmail -i -t`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub from_name: String,
    pub from_address: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    /// Render headers, a blank line and the body
    pub fn to_rfc822(&self) -> String {
        let headers = [
            format!("To: {}", self.to),
            format!("From: \"{}\" <{}>", self.from_name, self.from_address),
            format!("Subject: {}", self.subject),
            "Auto-Submitted: auto-generated".to_string(),
            "Content-Type: text/plain; charset=\"utf-8\"".to_string(),
            "MIME-Version: 1.0".to_string(),
        ];

        format!("{}\n\n{}", headers.join("\n"), self.body)
    }
}

/// Outbound mail boundary
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "pilot@example.com".to_string(),
            from_name: "Groundhandling Forecast".to_string(),
            from_address: "admin@example.com".to_string(),
            subject: "Groundhandling am 01.06.2024?".to_string(),
            body: "Hallo Anna,\n".to_string(),
        }
    }

    #[test]
    fn test_rfc822_headers_in_order() {
        let rendered = message().to_rfc822();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "To: pilot@example.com");
        assert_eq!(lines[1], "From: \"Groundhandling Forecast\" <admin@example.com>");
        assert_eq!(lines[2], "Subject: Groundhandling am 01.06.2024?");
        assert_eq!(lines[3], "Auto-Submitted: auto-generated");
        assert_eq!(lines[4], "Content-Type: text/plain; charset=\"utf-8\"");
        assert_eq!(lines[5], "MIME-Version: 1.0");
        assert_eq!(lines[6], "");
        assert_eq!(lines[7], "Hallo Anna,");
    }
}
