//! SMTP confirmation notifier using Lettre.

use crate::config::SmtpConfig;
use crate::error::{BookingError, Result};
use crate::notifier::{Confirmation, ConfirmationNotifier};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// SMTP notifier.
///
/// Sends real confirmation emails via SMTP, suitable for production use.
#[derive(Clone)]
pub struct SmtpNotifier {
    /// SMTP server address.
    smtp_server: String,

    /// SMTP server port.
    smtp_port: u16,

    /// SMTP credentials.
    credentials: Credentials,

    /// Sender email address.
    from_email: String,

    /// Sender display name.
    from_name: String,
}

impl SmtpNotifier {
    /// Create an SMTP notifier from configuration.
    #[must_use]
    pub fn new(config: &SmtpConfig) -> Self {
        Self {
            smtp_server: config.server.clone(),
            smtp_port: config.port,
            credentials: Credentials::new(config.username.clone(), config.password.clone()),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        }
    }

    /// Build SMTP transport for sending emails.
    ///
    /// Creates a new transport for each email to avoid connection pooling
    /// issues.
    fn build_transport(&self) -> Result<SmtpTransport> {
        Ok(SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| BookingError::Notification(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }

    /// Build the "From" header.
    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    fn render_body(confirmation: &Confirmation) -> String {
        let receipt_line = confirmation
            .provider_payment_id
            .as_deref()
            .map(|id| format!("Payment reference: {id}<br>"))
            .unwrap_or_default();

        format!(
            r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Your tickets are confirmed</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">You're in, {name}!</h2>
        <p>Your registration for <strong>{event}</strong> is confirmed.</p>
        <p>
            Tickets: {tickets}<br>
            Amount paid: {amount} {currency} (minor units)<br>
            {receipt_line}
            Registration reference: {registration_id}
        </p>
        <p style="color: #666; font-size: 14px;">
            Keep this email; the registration reference is your entry pass.
        </p>
    </div>
</body>
</html>
            "#,
            name = confirmation.recipient_name,
            event = confirmation.event_title,
            tickets = confirmation.tickets,
            amount = confirmation.amount,
            currency = confirmation.currency,
            registration_id = confirmation.registration_id,
        )
    }
}

impl ConfirmationNotifier for SmtpNotifier {
    async fn send_confirmation(&self, confirmation: &Confirmation) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| BookingError::Notification(format!("Invalid from address: {e}")))?,
            )
            .to(confirmation
                .recipient
                .parse()
                .map_err(|e| BookingError::Notification(format!("Invalid to address: {e}")))?)
            .subject(format!(
                "Tickets confirmed: {}",
                confirmation.event_title
            ))
            .header(ContentType::TEXT_HTML)
            .body(Self::render_body(confirmation))
            .map_err(|e| BookingError::Notification(format!("Failed to build email: {e}")))?;

        let mailer = self.build_transport()?;

        // lettre's SmtpTransport is blocking; keep it off the runtime.
        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| BookingError::Notification(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| BookingError::Notification(format!("Email task failed: {e}")))?
        .map(|_| ())
    }
}
