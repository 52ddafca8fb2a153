//! Talking to the Hasura GraphQL engine: the CLI for migrations and
//! metadata, the HTTP API for seed SQL.

pub mod cli;
pub mod seed;


use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::json;

/// Executes raw SQL against a database.
pub trait SeedApplier: Send + Sync {
    fn apply_sql(&self, sql: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Minimal client for the Hasura `v2/query` endpoint.
#[derive(Clone)]
pub struct HasuraClient {
    client: reqwest::Client,
    endpoint: String,
    admin_secret: String,
    database: String,
}

impl HasuraClient {
    pub fn new(endpoint: &str, admin_secret: &str, database: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            admin_secret: admin_secret.to_string(),
            database: database.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one SQL string through `run_sql`.
    pub async fn run_sql(&self, sql: &str) -> Result<serde_json::Value> {
        let body = json!({
            "type": "run_sql",
            "args": {
                "source": self.database,
                "sql": sql,
            }
        });

        let response = self
            .client
            .post(format!("{}/v2/query", self.endpoint))
            .header("x-hasura-admin-secret", &self.admin_secret)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("sending query to {}", self.endpoint))?;

        let status = response.status();
        let text = response.text().await.context("reading query response")?;
        if !status.is_success() {
            bail!("hasura returned {}: {}", status, text.trim());
        }
        serde_json::from_str(&text).context("parsing query response")
    }
}

impl SeedApplier for HasuraClient {
    async fn apply_sql(&self, sql: &str) -> Result<()> {
        self.run_sql(sql).await.map(|_| ())
    }
}
