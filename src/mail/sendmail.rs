use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{EmailMessage, MailTransport, TransportError};

pub const DEFAULT_SENDMAIL_PATH: &str = "/usr/sbin/sendmail";

/// `-t` reads recipients from the headers; `-i` keeps a lone `.` line in the
/// body from ending the message early.
const SENDMAIL_ARGS: [&str; 2] = ["-i", "-t"];

/// Pipes messages into the local `sendmail -i -t`.
#[derive(Debug, Clone)]
pub struct SendmailTransport {
    program: String,
}

impl SendmailTransport {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SendmailTransport {
    fn default() -> Self {
        Self::new(DEFAULT_SENDMAIL_PATH)
    }
}

#[async_trait]
impl MailTransport for SendmailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError> {
        tracing::debug!(program = %self.program, to = %message.to, "Invoking sendmail");

        let mut child = Command::new(&self.program)
            .args(SENDMAIL_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // A child that exits early breaks the pipe; its exit status is the
        // more useful error, so the write result is checked last.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(message.to_rfc822().as_bytes()).await,
            None => Ok(()),
        };

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(TransportError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;

        tracing::info!(to = %message.to, "Sent forecast mail via sendmail");
        Ok(())
    }
}
