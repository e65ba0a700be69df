use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use super::cycle::{CycleContext, CycleDriver, CycleReport};
use super::gateway::MarketGateway;
use crate::notify::Notifier;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_secs: u64,

    /// Start ticks on wall-clock multiples of the interval
    pub align_to_interval: bool,

    /// Delay after the boundary so the exchange has closed the candle
    pub settle_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            align_to_interval: true,
            settle_secs: 2,
        }
    }
}

/// Time until the next wall-clock multiple of `interval`
fn until_next_boundary(now_ms: i64, interval: Duration) -> Duration {
    let interval_ms = interval.as_millis().max(1) as i64;
    let remainder = now_ms.rem_euclid(interval_ms);
    Duration::from_millis((interval_ms - remainder) as u64)
}

/// Fires the cycle driver on a fixed interval
///
/// A tick that arrives while the previous cycle still holds the run-lock is
/// skipped.
pub struct Scheduler {
    driver: Arc<CycleDriver>,
    config: SchedulerConfig,
    run_lock: Arc<Mutex<()>>,
}

impl Scheduler {
    pub fn new(driver: CycleDriver, config: SchedulerConfig) -> Self {
        Self {
            driver: Arc::new(driver),
            config,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.config.interval_secs)
    }

    fn first_tick(&self) -> Instant {
        if !self.config.align_to_interval {
            return Instant::now();
        }
        let now_ms = chrono::Utc::now().timestamp_millis();
        Instant::now() + until_next_boundary(now_ms, self.interval()) + Duration::from_secs(self.config.settle_secs)
    }

    /// Run one cycle now unless another one is in flight
    pub async fn try_tick(&self, ctx: &CycleContext) -> Option<CycleReport> {
        let _guard = match self.run_lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("Previous cycle still running, skipping tick");
                return None;
            }
        };
        Some(self.driver.run_cycle(ctx).await)
    }

    /// Tick until `shutdown` turns true
    ///
    /// Shutdown is only observed between ticks. A cycle already running is
    /// awaited before this returns, so an order sequence is never cut off.
    pub async fn run(
        &self,
        gateway: Arc<dyn MarketGateway>,
        notifier: Arc<dyn Notifier>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let start = self.first_tick();
        tracing::info!(
            interval_secs = self.config.interval_secs,
            starts_in = ?start.saturating_duration_since(Instant::now()),
            "🔄 Scheduler starting"
        );

        let mut ticker = interval_at(start, self.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if *shutdown.borrow() {
                break;
            }

            let guard = match self.run_lock.clone().try_lock_owned() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::warn!("Previous cycle still running, skipping tick");
                    continue;
                }
            };

            let driver = self.driver.clone();
            let ctx = CycleContext::new(gateway.clone(), notifier.clone());
            tokio::spawn(async move {
                let _guard = guard;
                driver.run_cycle(&ctx).await;
            });
        }

        tracing::info!("Shutdown requested, waiting for in-flight cycle");
        let _ = self.run_lock.lock().await;
        tracing::info!("👋 Scheduler stopped");
    }
}
