//! Transactional email: templates, the durable outbox and its delivery worker.
//!
//! Services never talk to SMTP directly. They render a template, call
//! [`enqueue`] on the same connection or transaction as the state change the
//! email reports, and wake the worker through `AppState::outbox_signal`.

pub mod mailer;
pub mod templates;
pub mod worker;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ConnectionTrait, Set};
use uuid::Uuid;

use crate::{entity::email_outbox, error::AppResult};

pub use mailer::{EmailError, LogMailer, Mailer, SmtpMailer};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_SENT: &str = "sent";
pub const STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

pub async fn enqueue<C: ConnectionTrait>(conn: &C, email: OutgoingEmail) -> AppResult<Uuid> {
    let row = email_outbox::ActiveModel {
        id: Set(Uuid::new_v4()),
        recipient: Set(email.to),
        subject: Set(email.subject),
        html_body: Set(email.html_body),
        status: Set(STATUS_PENDING.to_string()),
        attempts: Set(0),
        last_error: Set(None),
        next_attempt_at: Set(Utc::now().into()),
        sent_at: Set(None),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    tracing::debug!(outbox_id = %row.id, subject = %row.subject, "email queued");
    Ok(row.id)
}
