use anyhow::{bail, Context};
use serde::Serialize;

/// Transactional email through the MailerLite campaigns API.
///
/// Sending never fails a request: callers fire and forget through
/// [`Mailer::send_in_background`] and failures only show up in the log.
#[derive(Clone)]
pub struct Mailer {
    http_client: reqwest::Client,
    api_key: Option<String>,
    url: String,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    subject: &'a str,
    content: &'a str,
    recipients: Vec<Recipient<'a>>,
}

impl Mailer {
    pub fn new(api_key: Option<String>, url: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            url,
        }
    }

    /// A mailer that drops everything.
    pub fn disabled() -> Self {
        Self::new(None, String::new())
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn send(&self, subject: &str, content: &str, to: &[String]) -> anyhow::Result<()> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!("email disabled, not sending {subject:?} to {to:?}");
            return Ok(());
        };

        let body = SendRequest {
            subject,
            content,
            recipients: to.iter().map(|email| Recipient { email: email.as_str() }).collect(),
        };

        let response = self.http_client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("email provider unreachable")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            bail!("email provider answered {status}: {text}");
        }

        tracing::info!("email sent to {to:?}");
        Ok(())
    }

    pub fn send_in_background(&self, subject: String, content: String, to: Vec<String>) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&subject, &content, &to).await {
                tracing::warn!("failed to send email to {to:?}: {e:#}");
            }
        });
    }
}
