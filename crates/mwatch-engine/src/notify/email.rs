//! Alert email rendering and the HTTP and no-op senders.

use std::fmt::Write as _;

use async_trait::async_trait;
use mwatch_core::{Alert, Mention};
use serde::Serialize;

/// Mentions listed in an alert email.
pub const EMAIL_MENTION_LIMIT: usize = 5;

const SNIPPET_CHARS: usize = 80;

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Returns `true` only if the relay accepted the message.
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool;
}

/// Used when the email channel is not configured. Never delivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmailSender;

#[async_trait]
impl EmailSender for NoopEmailSender {
    async fn send(&self, to: &str, _subject: &str, _body: &str) -> bool {
        tracing::debug!(to, "email channel not configured, skipping");
        false
    }
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// JSON mail relay: `POST {url}` with a bearer key.
pub struct HttpEmailSender {
    client: reqwest::Client,
    url: String,
    api_key: String,
    from: String,
}

impl HttpEmailSender {
    #[must_use]
    pub fn new(client: reqwest::Client, url: String, api_key: String, from: String) -> Self {
        Self {
            client,
            url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&RelayMessage {
                from: &self.from,
                to,
                subject,
                text: body,
            })
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                tracing::warn!(%status, body = %body, "mail relay returned non-success");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "mail relay request failed");
                false
            }
        }
    }
}

fn mention_line(mention: &Mention) -> String {
    let head = if mention.title.trim().is_empty() {
        mention.text.chars().take(SNIPPET_CHARS).collect()
    } else {
        mention.title.clone()
    };
    format!("- {head}... ({})", mention.source)
}

/// Subject and plain-text body for an alert notification.
#[must_use]
pub fn alert_email(
    recipient_name: &str,
    project_name: &str,
    alert: &Alert,
    mentions: &[Mention],
    dashboard_url: &str,
) -> (String, String) {
    let label = alert.alert_type.label();
    let subject = format!("mwatch alert: {project_name} - {label}");

    let greeting = if recipient_name.trim().is_empty() {
        "there"
    } else {
        recipient_name
    };

    let mut body = format!(
        "Hello {greeting},\n\n{}\n\nAlert type: {label}\nProject: {project_name}\n",
        alert.message
    );
    if !mentions.is_empty() {
        body.push_str("\nRecent mentions:\n");
        for mention in mentions.iter().take(EMAIL_MENTION_LIMIT) {
            let _ = writeln!(body, "{}", mention_line(mention));
        }
    }
    let _ = write!(body, "\nView all mentions on your dashboard: {dashboard_url}");

    (subject, body)
}
