//! # Expiry Sweeper
//!
//! Background task that deletes long-expired pending introduction requests
//! to limit stale-row accumulation. Expiry semantics never depend on this
//! task: every workflow guard evaluates `expires_at` lazily, and a sweep
//! merely removes rows those guards would reject anyway.

use std::sync::Arc;

use chrono::{Duration, Utc};
use metrics::counter;
use rand::Rng;
use sea_orm::DatabaseConnection;
use tokio::time::{Duration as TokioDuration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::error::GraphError;
use crate::repositories::IntroductionRepository;

/// Background sweeper service.
pub struct ExpirySweeper {
    config: Arc<AppConfig>,
    introductions: IntroductionRepository,
}

impl ExpirySweeper {
    pub fn new(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> Self {
        Self {
            config,
            introductions: IntroductionRepository::new(db),
        }
    }

    /// Run the sweep loop until the provided shutdown token fires.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            tick_interval_seconds = self.config.sweeper.tick_interval_seconds,
            retention_days = self.config.sweeper.retention_days,
            "Starting expiry sweeper"
        );

        loop {
            let interval = self.jittered_interval();
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Expiry sweeper shutdown requested");
                    break;
                }
                _ = sleep(interval) => {
                    if let Err(err) = self.tick().await {
                        error!(error = ?err, "Expiry sweep failed");
                    }
                }
            }
        }

        info!("Expiry sweeper stopped");
    }

    /// One sweep pass; also callable directly for tests and one-shot runs.
    pub async fn tick(&self) -> Result<u64, GraphError> {
        let cutoff = Utc::now() - Duration::days(self.config.sweeper.retention_days);
        let deleted = self
            .introductions
            .delete_expired_pending_before(cutoff)
            .await?;

        if deleted > 0 {
            counter!("graph_expired_introductions_swept_total").increment(deleted);
            info!(deleted, "Swept long-expired introduction requests");
        } else {
            debug!("Expiry sweep found nothing to remove");
        }

        Ok(deleted)
    }

    /// Tick interval with a random jitter fraction so multiple instances
    /// don't sweep in lockstep.
    fn jittered_interval(&self) -> TokioDuration {
        let base = self.config.sweeper.tick_interval_seconds as f64;
        let jitter = self.config.sweeper.jitter_factor;
        let factor = if jitter > 0.0 {
            rand::thread_rng().gen_range(1.0 - jitter..=1.0 + jitter)
        } else {
            1.0
        };
        TokioDuration::from_secs_f64((base * factor).max(1.0))
    }
}
