use duct::cmd;
use log::{info, warn};
use mockall::automock;
use std::fmt;
use thiserror::Error;

/// The sender address used when none is configured.
pub const DEFAULT_SENDER: &str = "error@localhost";

/// The default location of the sendmail binary.
pub const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";

/// A custom error describing why a notification could not be delivered.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The mail transport could not be started.
    #[error("the mail transport cannot run: {0}")]
    TransportFailure(#[from] std::io::Error),
    /// The mail transport refused the message.
    #[error("the mail transport returned non-zero exit code {0} with message: {1}")]
    Rejected(i32, String),
}

/// A plain text email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Header values cannot span lines, otherwise they could inject other headers.
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

impl fmt::Display for Message {
    /// Format as an RFC 822 message, that can be piped into sendmail.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "From: {}", header_value(&self.sender))?;
        writeln!(f, "To: {}", header_value(&self.recipient))?;
        writeln!(f, "Subject: {}", header_value(&self.subject))?;
        writeln!(f, "MIME-Version: 1.0")?;
        writeln!(f, "Content-Type: text/plain; charset=\"utf-8\"")?;
        writeln!(f)?;
        writeln!(f, "{}", self.body)
    }
}

/// A way to deliver an email.
#[automock]
pub trait Transport {
    fn send(&self, message: &Message) -> Result<(), NotifyError>;
}

/// Deliver emails through the local sendmail binary.
///
/// The recipients are read from the headers (`-t`), a single dot does not end the message (`-oi`).
pub struct SendmailTransport {
    program: String,
}

impl SendmailTransport {
    pub fn new(program: String) -> Self {
        SendmailTransport { program }
    }
}

impl Default for SendmailTransport {
    fn default() -> Self {
        Self::new(String::from(DEFAULT_SENDMAIL))
    }
}

impl Transport for SendmailTransport {
    fn send(&self, message: &Message) -> Result<(), NotifyError> {
        let output = cmd!(self.program.as_str(), "-t", "-oi")
            .stdin_bytes(message.to_string())
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked()
            .run()?;

        if output.status.success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected(
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            ))
        }
    }
}

/// What happened to a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyStatus {
    Sent,
    /// There is no recipient, so nothing was sent.
    Disabled,
}

/// Sends failure alerts to the operator.
///
/// Without a recipient every notification is skipped silently, the warning is
/// only logged once on creation.
pub struct Notifier {
    recipient: Option<String>,
    sender: String,
    transport: Box<dyn Transport>,
}

impl Notifier {
    pub fn new(
        recipient: Option<String>,
        sender: Option<String>,
        transport: Box<dyn Transport>,
    ) -> Self {
        let recipient = recipient.filter(|r| !r.trim().is_empty());
        if recipient.is_none() {
            warn!("There is no error email recipient, emails won't be sent.");
        }
        let sender = sender
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| String::from(DEFAULT_SENDER));

        Notifier {
            recipient,
            sender,
            transport,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.recipient.is_some()
    }

    /// Try to send the alert. The caller decides what to do with a failure.
    pub fn notify(&self, subject: &str, body: &str) -> Result<NotifyStatus, NotifyError> {
        let Some(recipient) = &self.recipient else {
            return Ok(NotifyStatus::Disabled);
        };

        let message = Message {
            sender: self.sender.clone(),
            recipient: recipient.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        self.transport.send(&message)?;
        info!("Email has been sent to {recipient}.");

        Ok(NotifyStatus::Sent)
    }
}
