mod common;

use std::sync::{Arc, Mutex};

use petcare_api::{
    db::OrmConn,
    notifications::{self, EmailError, Mailer, OutgoingEmail, worker},
};

#[derive(Clone, Default)]
struct RecordingMailer {
    sent: Arc<Mutex<Vec<String>>>,
}

impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        self.sent
            .lock()
            .expect("mailer lock")
            .push(email.to.clone());
        Ok(())
    }
}

struct RejectingMailer;

impl Mailer for RejectingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        Err(EmailError::InvalidAddress(email.to.clone()))
    }
}

async fn drain<M: Mailer>(orm: &OrmConn, mailer: &M) -> anyhow::Result<()> {
    for _ in 0..100 {
        let report = worker::process_batch(orm, mailer, 5).await?;
        if report.total() == 0 {
            break;
        }
    }
    Ok(())
}

#[tokio::test]
async fn failed_delivery_is_retried_later_then_sent() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let recipient = format!("{}@petcare.test", common::unique("outbox"));
    let id = notifications::enqueue(
        &state.orm,
        OutgoingEmail {
            to: recipient.clone(),
            subject: "Kiểm tra".into(),
            html_body: "<p>xin chào</p>".into(),
        },
    )
    .await?;

    drain(&state.orm, &RejectingMailer).await?;

    let (status, attempts, last_error, due_later): (String, i32, Option<String>, bool) =
        sqlx::query_as(
            "SELECT status, attempts, last_error, next_attempt_at > now() FROM email_outbox WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(status, notifications::STATUS_PENDING);
    assert_eq!(attempts, 1);
    assert!(last_error.is_some());
    assert!(due_later);

    sqlx::query("UPDATE email_outbox SET next_attempt_at = now() - interval '1 second' WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    let mailer = RecordingMailer::default();
    drain(&state.orm, &mailer).await?;

    let (status, attempts): (String, i32) =
        sqlx::query_as("SELECT status, attempts FROM email_outbox WHERE id = $1")
            .bind(id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(status, notifications::STATUS_SENT);
    assert_eq!(attempts, 2);
    assert!(mailer.sent.lock().expect("mailer lock").contains(&recipient));
    Ok(())
}
