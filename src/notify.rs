//! Account mail: welcome on registration, goodbye on account removal.
//!
//! Delivery is fire-and-forget. A failed send is logged and never affects the
//! request that triggered it.

use serde_json::json;

use crate::models::User;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// A plain-text mail to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl Notification {
    pub fn welcome(user: &User) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Thanks for signing in!".to_string(),
            text: format!(
                "Welcome to the app, {}. Let me know how you get along with the app.",
                user.name
            ),
        }
    }

    pub fn cancellation(user: &User) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Thanks for joining us till now!".to_string(),
            text: format!("Goodbye, {}. I hope to see you back soon.", user.name),
        }
    }
}

/// Outbound notification port.
///
/// `send` must return immediately; implementations do their I/O in the background.
pub trait Notifier: Send + Sync {
    fn send(&self, notification: Notification);
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, notification: Notification) {
        log::info!(
            "mail to {} ({}): {}",
            notification.to,
            notification.subject,
            notification.text
        );
    }
}

/// Delivers through the SendGrid v3 mail API.
#[derive(Clone)]
pub struct SendGridNotifier {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl SendGridNotifier {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }

    fn payload(&self, notification: &Notification) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": notification.to }] }],
            "from": { "email": self.from },
            "subject": notification.subject,
            "content": [{ "type": "text/plain", "value": notification.text }]
        })
    }
}

impl Notifier for SendGridNotifier {
    fn send(&self, notification: Notification) {
        let request = self
            .client
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&self.payload(&notification));

        actix_web::rt::spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    log::debug!("mail \"{}\" sent to {}", notification.subject, notification.to);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    log::warn!("SendGrid rejected mail to {}: {} {}", notification.to, status, body);
                }
                Err(e) => log::warn!("SendGrid request for {} failed: {}", notification.to, e),
            }
        });
    }
}
