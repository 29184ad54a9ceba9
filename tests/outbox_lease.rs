mod common;

use petcare_api::notifications::{self, OutgoingEmail, worker};

#[tokio::test]
async fn claimed_rows_are_leased_without_holding_locks() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let id = notifications::enqueue(
        &state.orm,
        OutgoingEmail {
            to: format!("{}@petcare.test", common::unique("lease")),
            subject: "Kiểm tra".into(),
            html_body: "<p>xin chào</p>".into(),
        },
    )
    .await?;

    // Oldest due row, so a batch of one picks it.
    sqlx::query("UPDATE email_outbox SET next_attempt_at = '2000-01-01T00:00:00Z' WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    let claimed = worker::claim_due(&state.orm, 1).await?;
    assert_eq!(claimed.iter().map(|row| row.id).collect::<Vec<_>>(), vec![id]);

    let (status, leased): (String, bool) = sqlx::query_as(
        "SELECT status, next_attempt_at > now() FROM email_outbox WHERE id = $1",
    )
    .bind(id)
    .fetch_one(&state.pool)
    .await?;
    assert_eq!(status, notifications::STATUS_PENDING);
    assert!(leased);

    // The claim committed, so the row is free to lock while mail is in flight.
    let locked: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT id FROM email_outbox WHERE id = $1 FOR UPDATE NOWAIT")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;
    assert!(locked.is_some());

    sqlx::query("UPDATE email_outbox SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(notifications::STATUS_SENT)
        .execute(&state.pool)
        .await?;
    Ok(())
}
