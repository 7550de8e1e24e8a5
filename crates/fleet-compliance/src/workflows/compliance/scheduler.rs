use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use super::clock::Clock;
use super::monitor::{ExpiryMonitor, MonitorError, ScanReport};
use super::repository::{NotificationStore, Notifier, UserDirectory, VehicleStore};

/// Anything the scheduler can fire; implemented by [`ExpiryMonitor`].
pub trait ExpiryScan: Send + Sync {
    fn scan(&self, now: DateTime<Utc>) -> Result<ScanReport, MonitorError>;
}

impl<V, N, U, S> ExpiryScan for ExpiryMonitor<V, N, U, S>
where
    V: VehicleStore + 'static,
    N: NotificationStore + 'static,
    U: UserDirectory + 'static,
    S: Notifier + 'static,
{
    fn scan(&self, now: DateTime<Utc>) -> Result<ScanReport, MonitorError> {
        ExpiryMonitor::scan(self, now)
    }
}

/// Fires the expiry scan on a fixed interval, one scan at a time.
pub struct ExpiryScheduler {
    scanner: Arc<dyn ExpiryScan>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    run_on_startup: bool,
}

impl ExpiryScheduler {
    pub fn new(scanner: Arc<dyn ExpiryScan>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            scanner,
            clock,
            interval,
            run_on_startup: false,
        }
    }

    /// Fire immediately instead of waiting one full interval for the first scan.
    pub fn run_on_startup(mut self, enabled: bool) -> Self {
        self.run_on_startup = enabled;
        self
    }

    /// Run a single scan on the blocking pool. Failures and panics are logged, never
    /// propagated, so the caller's loop keeps going.
    pub async fn run_once(&self) -> Option<ScanReport> {
        let scanner = Arc::clone(&self.scanner);
        let now = self.clock.now();

        match tokio::task::spawn_blocking(move || scanner.scan(now)).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(err)) => {
                error!(%now, error = %err, "expiry scan aborted; retrying on next interval");
                None
            }
            Err(err) => {
                error!(%now, error = %err, "expiry scan panicked; retrying on next interval");
                None
            }
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let first = if self.run_on_startup {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };
        let mut ticker = tokio::time::interval_at(first, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "expiry scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.run_once() => {}
                        _ = shutdown_requested(&mut shutdown) => break,
                    }
                }
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        info!("expiry scheduler stopped");
    }
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
