//! Quota Worker
//!
//! Runs the reconciler on a fixed interval until shutdown. A failed pass is
//! logged and the next tick tries again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument, warn};

use super::enforcer::QuotaReconciler;
use super::report::EnforcementReport;
use crate::error::BrokerResult;

/// Shortest period between scheduled passes.
pub const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Scheduled quota enforcement.
pub struct QuotaWorker {
    reconciler: QuotaReconciler,
    period: Duration,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl QuotaWorker {
    /// Create a new worker. Periods below [`MIN_PERIOD`] are raised to it.
    pub fn new(reconciler: QuotaReconciler, period: Duration) -> Self {
        if period < MIN_PERIOD {
            warn!(requested = ?period, "Quota worker period too short, using minimum");
        }
        Self {
            reconciler,
            period: period.max(MIN_PERIOD),
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start the worker. The first pass runs immediately.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        info!(period_secs = self.period.as_secs(), "Starting quota worker");

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.is_shutdown() {
                        break;
                    }
                    // Errors are already logged.
                    let _ = self.run_once().await;
                }
                () = self.wake.notified() => {}
            }

            if self.is_shutdown() {
                info!("Worker shutdown requested, stopping enforcement loop");
                break;
            }
        }

        info!("Quota worker stopped");
    }

    /// Run one pass now.
    pub async fn run_once(&self) -> BrokerResult<EnforcementReport> {
        match self.reconciler.enforce().await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(error = %e, code = e.error_code(), "Quota enforcement pass failed");
                Err(e)
            }
        }
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
        self.wake.notify_one();
    }

    /// Check if shutdown was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
