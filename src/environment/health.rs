use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use backon::{ConstantBuilder, Retryable};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::environment::Service;
use crate::error::EnvError;

/// One health request against a URL. Success means the service is up.
pub trait HealthChecker: Send + Sync + 'static {
    fn check(&self, url: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Plain HTTP GET; only status 200 counts as healthy.
#[derive(Clone)]
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

impl HealthChecker for HttpChecker {
    async fn check(&self, url: &str) -> Result<()> {
        let response = self.client.get(url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            bail!("returned status {}", response.status());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    pub attempts: usize,
    pub interval: Duration,
    pub request_timeout: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HealthOutcome {
    Healthy { attempts: usize },
    Unhealthy { attempts: usize, last_error: String },
    Cancelled,
}

#[derive(Debug, Default)]
pub struct HealthReport {
    pub outcomes: BTreeMap<String, HealthOutcome>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.outcomes
            .values()
            .all(|o| matches!(o, HealthOutcome::Healthy { .. }))
    }

    pub fn failures(&self) -> Vec<EnvError> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                HealthOutcome::Unhealthy { attempts, .. } => Some(EnvError::HealthCheck {
                    service: name.clone(),
                    attempts: *attempts,
                }),
                _ => None,
            })
            .collect()
    }

    pub fn cancelled(&self) -> bool {
        self.outcomes
            .values()
            .any(|o| matches!(o, HealthOutcome::Cancelled))
    }
}

/// Poll every service that declares a health endpoint, all concurrently,
/// and wait for each to settle. A failing service never cuts the others
/// short; a cancelled token unwinds all of them. An endpoint that cannot
/// be resolved to a URL is reported unhealthy without being polled.
pub async fn wait_healthy<P: HealthChecker>(
    services: &BTreeMap<String, Service>,
    checker: Arc<P>,
    policy: HealthPolicy,
    cancel: &CancellationToken,
) -> HealthReport {
    let mut set = JoinSet::new();
    let mut report = HealthReport::default();

    for service in services.values() {
        if service.health_endpoint.as_deref().is_none_or(str::is_empty) {
            continue;
        }
        let Some(url) = service.health_url() else {
            warn!(service = %service.name, "health endpoint has no address to check");
            report.outcomes.insert(
                service.name.clone(),
                HealthOutcome::Unhealthy {
                    attempts: 0,
                    last_error: "no port known for health endpoint".to_string(),
                },
            );
            continue;
        };
        let name = service.name.clone();
        let checker = Arc::clone(&checker);
        let cancel = cancel.clone();

        set.spawn(async move {
            debug!(service = %name, url = %url, "waiting for health");
            let attempts = AtomicUsize::new(0);
            let poll = (|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                checker.check(&url).await
            })
            .retry(
                ConstantBuilder::default()
                    .with_delay(policy.interval)
                    .with_max_times(policy.attempts.saturating_sub(1)),
            )
            .notify(|err: &anyhow::Error, dur: Duration| {
                debug!(service = %name, "health check failed: {}, retrying in {:?}", err, dur);
            });

            let outcome = tokio::select! {
                _ = cancel.cancelled() => HealthOutcome::Cancelled,
                result = poll => {
                    let attempts = attempts.load(Ordering::SeqCst);
                    match result {
                        Ok(()) => HealthOutcome::Healthy { attempts },
                        Err(e) => HealthOutcome::Unhealthy {
                            attempts,
                            last_error: format!("{e:#}"),
                        },
                    }
                }
            };
            (name, outcome)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((name, outcome)) => {
                match &outcome {
                    HealthOutcome::Healthy { .. } => info!(service = %name, "healthy"),
                    HealthOutcome::Unhealthy { attempts, last_error } => {
                        warn!(service = %name, attempts, error = %last_error, "health check failed")
                    }
                    HealthOutcome::Cancelled => debug!(service = %name, "health check cancelled"),
                }
                report.outcomes.insert(name, outcome);
            }
            Err(e) => warn!(error = %e, "health check task panicked"),
        }
    }
    report
}
