use std::{sync::Arc, time::Duration};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
    sea_query::{Expr, LockBehavior, LockType},
};
use tokio::sync::Notify;

use super::{Mailer, OutgoingEmail, STATUS_FAILED, STATUS_PENDING, STATUS_SENT};
use crate::{
    db::OrmConn,
    entity::email_outbox::{
        ActiveModel as OutboxActive, Column as OutboxCol, Entity as EmailOutbox,
        Model as OutboxModel,
    },
    error::AppResult,
};

const BATCH_SIZE: u64 = 20;
const BASE_RETRY_SECS: i64 = 30;
const MAX_RETRY_SECS: i64 = 6 * 60 * 60;
const LEASE_SECS: i64 = 5 * 60;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.sent + self.retried + self.failed
    }
}

/// Runs until the process exits; wakes on `signal` or every `poll_interval`.
pub async fn run<M: Mailer>(
    orm: OrmConn,
    mailer: M,
    signal: Arc<Notify>,
    poll_interval: Duration,
    max_attempts: i32,
) {
    tracing::info!(poll_secs = poll_interval.as_secs(), "email outbox worker started");
    loop {
        match process_batch(&orm, &mailer, max_attempts).await {
            Ok(report) if report.total() as u64 >= BATCH_SIZE => continue,
            Ok(report) if report.total() > 0 => {
                tracing::debug!(
                    sent = report.sent,
                    retried = report.retried,
                    failed = report.failed,
                    "outbox batch processed"
                );
            }
            Ok(_) => {}
            Err(err) => tracing::error!(error = %err, "outbox batch failed"),
        }

        tokio::select! {
            _ = signal.notified() => {}
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}

/// Leases due rows, then delivers them with no transaction held open.
///
/// Each row's outcome is written by its own statement, so one failed write
/// never un-marks mail that already went out.
pub async fn process_batch<M: Mailer>(
    orm: &OrmConn,
    mailer: &M,
    max_attempts: i32,
) -> AppResult<BatchReport> {
    let due = claim_due(orm, BATCH_SIZE).await?;

    let mut report = BatchReport::default();
    for row in due {
        let email = OutgoingEmail {
            to: row.recipient.clone(),
            subject: row.subject.clone(),
            html_body: row.html_body.clone(),
        };
        let attempts = row.attempts + 1;
        let mut active: OutboxActive = row.into();
        active.attempts = Set(attempts);

        match mailer.send(&email).await {
            Ok(()) => {
                active.status = Set(STATUS_SENT.to_string());
                active.sent_at = Set(Some(Utc::now().into()));
                active.last_error = Set(None);
                report.sent += 1;
            }
            Err(err) => {
                tracing::warn!(to = %email.to, attempts, error = %err, "email delivery failed");
                active.last_error = Set(Some(err.to_string()));
                if attempts >= max_attempts {
                    active.status = Set(STATUS_FAILED.to_string());
                    report.failed += 1;
                } else {
                    active.next_attempt_at = Set((Utc::now() + retry_delay(attempts)).into());
                    report.retried += 1;
                }
            }
        }

        if let Err(err) = active.update(orm).await {
            tracing::error!(to = %email.to, error = %err, "failed to record outbox delivery");
        }
    }

    Ok(report)
}

/// Picks due rows with `FOR UPDATE SKIP LOCKED` and pushes their
/// `next_attempt_at` past the lease, so no other worker claims them while
/// they are being delivered. Rows of a crashed worker come back after the
/// lease expires.
pub async fn claim_due(orm: &OrmConn, limit: u64) -> AppResult<Vec<OutboxModel>> {
    let txn = orm.begin().await?;
    let due = EmailOutbox::find()
        .filter(OutboxCol::Status.eq(STATUS_PENDING))
        .filter(OutboxCol::NextAttemptAt.lte(Utc::now()))
        .order_by_asc(OutboxCol::NextAttemptAt)
        .limit(limit)
        .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
        .all(&txn)
        .await?;

    if !due.is_empty() {
        let leased_until = Utc::now() + chrono::Duration::seconds(LEASE_SECS);
        EmailOutbox::update_many()
            .col_expr(OutboxCol::NextAttemptAt, Expr::value(leased_until))
            .filter(OutboxCol::Id.is_in(due.iter().map(|row| row.id)))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;
    Ok(due)
}

/// 30s after the first failure, doubling per attempt, capped at six hours.
pub fn retry_delay(attempts: i32) -> chrono::Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 20) as u32;
    let secs = BASE_RETRY_SECS.saturating_mul(1_i64 << exponent);
    chrono::Duration::seconds(secs.min(MAX_RETRY_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay(1), chrono::Duration::seconds(30));
        assert_eq!(retry_delay(2), chrono::Duration::seconds(60));
        assert_eq!(retry_delay(3), chrono::Duration::seconds(120));
        assert_eq!(retry_delay(30), chrono::Duration::seconds(MAX_RETRY_SECS));
        assert_eq!(retry_delay(0), chrono::Duration::seconds(30));
    }
}
