//! Email notifications for new contact messages.

use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::{Message, Settings};
use crate::db::Document;
use crate::AppState;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// SMTP login taken from the stored settings.
#[derive(Debug, Clone)]
pub struct SmtpCredentials {
    pub user: String,
    pub pass: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new_message(settings: &Settings, message: &Message) -> Self {
        let phone = message.phone.as_deref().unwrap_or("-");
        Self {
            to: settings.notification_email.clone(),
            reply_to: message.email.clone(),
            subject: format!("New contact message: {}", message.subject),
            body: format!(
                "Name: {}\nEmail: {}\nPhone: {}\nSubject: {}\n\n{}",
                message.name, message.email, phone, message.subject, message.message
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        credentials: &SmtpCredentials,
        notification: &Notification,
    ) -> Result<(), MailError>;
}

/// Writes the would-be email to the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        credentials: &SmtpCredentials,
        notification: &Notification,
    ) -> Result<(), MailError> {
        tracing::info!(
            from = %credentials.user,
            to = %notification.to,
            reply_to = %notification.reply_to,
            subject = %notification.subject,
            "notification email queued"
        );
        Ok(())
    }
}

/// Tell the site owner about a new contact message. Failures are logged and
/// never reach the sender of the message.
pub async fn notify_new_message(state: AppState, message: Document<Message>) {
    let settings = match state.repo::<Settings>().first().await {
        Ok(Some(doc)) => doc.data,
        Ok(None) => {
            tracing::debug!("no settings stored, skipping notification");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load settings for notification");
            return;
        }
    };

    if !settings.notifications_enabled() {
        tracing::debug!("notification settings incomplete, skipping notification");
        return;
    }

    let credentials = SmtpCredentials {
        user: settings.email_user.clone(),
        pass: settings.email_pass.clone(),
    };
    let notification = Notification::new_message(&settings, &message.data);

    match state.mailer.send(&credentials, &notification).await {
        Ok(()) => tracing::info!(message_id = %message.id, "new message notification sent"),
        Err(e) => {
            tracing::error!(message_id = %message.id, error = %e, "failed to send notification")
        }
    }
}
