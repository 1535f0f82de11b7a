use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::queue_job::{DirectMail, JobPayload, OtpMail, QueueJob, WelcomeMail};
use crate::services::queue_service::{EnqueueOptions, JobHandle, JobQueue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Posts mails to an HTTP relay.
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(client: Client, endpoint: String, api_key: String, from: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(30))
            .json(&RelayRequest {
                from: &self.from,
                to: &mail.to,
                subject: &mail.subject,
                html: &mail.html,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Mail(format!("relay answered {}: {}", status, body)));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct MailService {
    queue: Arc<dyn JobQueue>,
    mailer: Arc<dyn Mailer>,
    client_url: String,
    operator_email: Option<String>,
}

impl MailService {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        mailer: Arc<dyn Mailer>,
        client_url: String,
        operator_email: Option<String>,
    ) -> Self {
        Self {
            queue,
            mailer,
            client_url,
            operator_email,
        }
    }

    pub async fn send_otp(&self, email: &str, otp: &str) -> Result<JobHandle> {
        tracing::info!(email, "Queueing sign-in code");
        self.queue
            .enqueue(
                JobPayload::SendOtp(OtpMail {
                    email: email.to_string(),
                    otp: otp.to_string(),
                }),
                EnqueueOptions::default(),
            )
            .await
    }

    pub async fn welcome(&self, name: &str, email: &str, password: &str) -> Result<JobHandle> {
        tracing::info!(email, "Queueing welcome mail");
        self.queue
            .enqueue(
                JobPayload::Welcome(WelcomeMail {
                    name: name.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                    app_url: self.client_url.clone(),
                }),
                EnqueueOptions::default(),
            )
            .await
    }

    /// Queues a direct send for `scheduled_at`. With an `event_id` the worker
    /// marks that calendar event completed after sending.
    pub async fn send_now(
        &self,
        mail: DirectMail,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<JobHandle> {
        tracing::info!(email = %mail.email, author = %mail.author, "Queueing direct mail");
        self.queue
            .enqueue(
                JobPayload::SendNow(mail),
                EnqueueOptions {
                    scheduled_at,
                    max_attempts: None,
                },
            )
            .await
    }

    pub async fn send_queued(&self, mail: DirectMail) -> Result<JobHandle> {
        tracing::debug!(email = %mail.email, author = %mail.author, "Queueing audience mail");
        self.queue
            .enqueue(JobPayload::SendQueued(mail), EnqueueOptions::default())
            .await
    }

    /// Queues one SEND_QUEUED job per mail in a single all-or-nothing batch.
    pub async fn send_queued_batch(&self, mails: Vec<DirectMail>) -> Result<Vec<JobHandle>> {
        if mails.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(count = mails.len(), "Queueing audience mail batch");
        self.queue
            .enqueue_batch(
                mails
                    .into_iter()
                    .map(|mail| (JobPayload::SendQueued(mail), EnqueueOptions::default()))
                    .collect(),
            )
            .await
    }

    /// Renders and sends a mail job. Non-mail payloads are rejected.
    pub async fn deliver(&self, payload: &JobPayload) -> Result<()> {
        let mail = match payload {
            JobPayload::SendOtp(otp) => render_otp(otp),
            JobPayload::Welcome(welcome) => render_welcome(welcome),
            JobPayload::SendNow(direct) | JobPayload::SendQueued(direct) => render_direct(direct),
            other => {
                return Err(Error::Internal(format!(
                    "{} is not a mail job",
                    other.kind()
                )))
            }
        };
        tracing::info!(to = %mail.to, kind = %payload.kind(), "Sending mail");
        self.mailer.send(&mail).await
    }

    /// Tells the operator that a job ran out of attempts. Never fails.
    pub async fn alert_operator(&self, job: &QueueJob, error: &str) {
        let Some(operator) = self.operator_email.as_deref() else {
            tracing::warn!(job_id = %job.id, kind = %job.kind, "No operator address configured; dropping failure alert");
            return;
        };
        let mail = render_failure_alert(operator, job.id, &job.kind.to_string(), job.attempts, error);
        if let Err(e) = self.mailer.send(&mail).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to send failure alert to operator");
        }
    }
}

fn render_otp(mail: &OtpMail) -> OutgoingMail {
    OutgoingMail {
        to: mail.email.clone(),
        subject: "Your sign-in code".to_string(),
        html: format!(
            "<p>Hello {},</p><p>Your one-time sign-in code is <strong>{}</strong>.</p>",
            escape_html(&mail.email),
            escape_html(&mail.otp)
        ),
    }
}

fn render_welcome(mail: &WelcomeMail) -> OutgoingMail {
    OutgoingMail {
        to: mail.email.clone(),
        subject: "Welcome aboard".to_string(),
        html: format!(
            "<p>Hello {},</p><p>Your account is ready. Sign in at <a href=\"{url}\">{url}</a> with \
             <strong>{}</strong> and the temporary password <strong>{}</strong>.</p>",
            escape_html(&mail.name),
            escape_html(&mail.email),
            escape_html(&mail.password),
            url = escape_html(&mail.app_url),
        ),
    }
}

fn render_direct(mail: &DirectMail) -> OutgoingMail {
    OutgoingMail {
        to: mail.email.clone(),
        subject: mail.subject.clone(),
        html: format!(
            "{}<hr/><p>Sent by {} to {}</p>",
            mail.body,
            escape_html(&mail.author),
            escape_html(&mail.email)
        ),
    }
}

fn render_failure_alert(
    operator: &str,
    job_id: Uuid,
    kind: &str,
    attempts: i32,
    error: &str,
) -> OutgoingMail {
    OutgoingMail {
        to: operator.to_string(),
        subject: "Something went wrong with the server".to_string(),
        html: format!(
            "<p>Job <code>{}</code> of type <strong>{}</strong> failed after {} attempt(s).</p><pre>{}</pre>",
            job_id,
            escape_html(kind),
            attempts,
            escape_html(error)
        ),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
