use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::sync::Notify;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, create_orm_conn},
};

/// Upper bound for one call to Google or Facebook during social login.
pub const OAUTH_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
    /// Wakes the outbox worker after new mail has been committed.
    pub outbox_signal: Arc<Notify>,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> anyhow::Result<Self> {
        let orm = create_orm_conn(&pool);
        Ok(Self {
            pool,
            orm,
            config: Arc::new(config),
            http: http_client()?,
            outbox_signal: Arc::new(Notify::new()),
        })
    }
}

pub fn http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(OAUTH_HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_client_builds_with_a_bounded_timeout() {
        assert!(http_client().is_ok());
        assert!(OAUTH_HTTP_TIMEOUT <= Duration::from_secs(10));
    }
}
