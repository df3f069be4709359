//! Periodic cleanup of revoked sessions and expired reset tokens

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::{AppState, reset::ResetTokenLedger, revocation::RevocationRegistry};

/// Counts removed by one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub revocations_evicted: usize,
    pub reset_tokens_purged: u64,
}

#[derive(Clone)]
pub struct Sweeper {
    registry: RevocationRegistry,
    resets: ResetTokenLedger,
}

impl Sweeper {
    pub fn new(registry: RevocationRegistry, resets: ResetTokenLedger) -> Self {
        Self { registry, resets }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.sessions.registry().clone(), state.resets.clone())
    }

    /// Run both sweeps once
    ///
    /// A failed purge is logged and counted as zero; the next tick tries again.
    pub async fn run_once(&self) -> SweepReport {
        let revocations_evicted = self.registry.evict_expired().await;

        let reset_tokens_purged = match self.resets.purge_expired().await {
            Ok(count) => count,
            Err(e) => {
                error!("Failed to purge expired reset tokens: {}", e);
                0
            }
        };

        info!(
            "Sweep finished: {} revocations evicted, {} reset tokens purged",
            revocations_evicted, reset_tokens_purged
        );

        SweepReport {
            revocations_evicted,
            reset_tokens_purged,
        }
    }

    /// Schedule `run_once` on a six-field cron expression
    pub async fn start(&self, schedule: &str) -> Result<JobScheduler> {
        let sweeper = self.clone();

        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_, _| {
            let sweeper = sweeper.clone();
            Box::pin(async move {
                sweeper.run_once().await;
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started sweep scheduler with schedule: {}", schedule);
        Ok(scheduler)
    }
}
