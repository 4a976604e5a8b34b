use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Answers whether a student currently holds access to a test. Backed by billing;
/// the session engine never sees payment state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn has_active_access(&self, student_id: Uuid, test_id: Uuid) -> Result<bool>;
}

pub type SharedAccessGate = Arc<dyn AccessGate>;

/// Reads the grants table maintained by the billing service.
#[derive(Clone)]
pub struct SubscriptionAccessGate {
    pool: PgPool,
}

impl SubscriptionAccessGate {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessGate for SubscriptionAccessGate {
    async fn has_active_access(&self, student_id: Uuid, test_id: Uuid) -> Result<bool> {
        let granted: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (
                SELECT 1 FROM test_access_grants
                WHERE student_id = $1 AND test_id = $2
                  AND (expires_at IS NULL OR expires_at > NOW())
            )"#,
        )
        .bind(student_id)
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(granted)
    }
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    has_access: bool,
}

/// Asks a remote billing service over HTTP.
#[derive(Clone)]
pub struct HttpAccessGate {
    base_url: String,
    http_client: Client,
}

impl HttpAccessGate {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;
        Ok(Self { base_url, http_client })
    }
}

#[async_trait]
impl AccessGate for HttpAccessGate {
    async fn has_active_access(&self, student_id: Uuid, test_id: Uuid) -> Result<bool> {
        let url = format!("{}/access", self.base_url);
        let resp = self
            .http_client
            .get(&url)
            .query(&[
                ("student_id", student_id.to_string()),
                ("test_id", test_id.to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            tracing::error!(%status, body = %text, "Access gate returned an error");
            return Err(Error::Internal(format!(
                "Access gate responded with status {}",
                status
            )));
        }

        let body: AccessResponse = resp.json().await?;
        Ok(body.has_access)
    }
}

pub async fn ensure_access(gate: &dyn AccessGate, student_id: Uuid, test_id: Uuid) -> Result<()> {
    if gate.has_active_access(student_id, test_id).await? {
        return Ok(());
    }
    tracing::info!(%student_id, %test_id, "Access gate denied test start");
    Err(Error::AccessDenied(
        "an active subscription covering this test is required".to_string(),
    ))
}

/// Picks the HTTP gate when a billing URL is configured, otherwise the grants table.
pub fn from_config(
    pool: PgPool,
    access_gate_url: Option<&str>,
    timeout_secs: u64,
) -> Result<SharedAccessGate> {
    match access_gate_url {
        Some(url) => {
            tracing::info!(url, "Using HTTP access gate");
            Ok(Arc::new(HttpAccessGate::new(url.to_string(), timeout_secs)?))
        }
        None => Ok(Arc::new(SubscriptionAccessGate::new(pool))),
    }
}
