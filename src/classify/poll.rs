// src/classify/poll.rs
// Bounded poll loop with exponential backoff

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::assistant::JobStatus;
use crate::config::PoliceConfig;
use crate::error::Result;

/// Limits and pacing for watching one job
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    /// Multiplier applied to the interval after every tick (values below 1 are treated as 1)
    pub backoff: f64,
    pub max_interval: Duration,
    pub max_ticks: u32,
    pub max_duration: Duration,
    /// Fraction of random spread applied to every sleep, 0 disables it
    pub jitter: f64,
}

impl PollPolicy {
    pub fn from_config(config: &PoliceConfig) -> Self {
        Self {
            initial_interval: config.poll_interval,
            backoff: config.poll_backoff,
            max_interval: config.poll_max_interval,
            max_ticks: config.poll_max_ticks,
            max_duration: config.poll_timeout,
            jitter: config.poll_jitter,
        }
    }

    /// Un-jittered sleep before tick number `tick` (0-based)
    pub fn interval_for_tick(&self, tick: u32) -> Duration {
        let factor = self.backoff.max(1.0).powi(tick.min(i32::MAX as u32) as i32);
        Duration::try_from_secs_f64(self.initial_interval.as_secs_f64() * factor)
            .map(|d| d.min(self.max_interval))
            .unwrap_or(self.max_interval)
    }

    fn jittered(&self, interval: Duration) -> Duration {
        if self.jitter <= 0.0 || !self.jitter.is_finite() {
            return interval;
        }
        let spread = self.jitter.min(1.0);
        let factor = rand::rng().random_range((1.0 - spread)..=(1.0 + spread));
        Duration::try_from_secs_f64(interval.as_secs_f64() * factor).unwrap_or(interval)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&PoliceConfig::default())
    }
}

/// How watching a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { ticks: u32 },
    Failed { status: String, ticks: u32 },
    TimedOut { ticks: u32, elapsed: Duration },
}

/// Call `check` on the policy's schedule until it reports a terminal status
/// or a limit is hit. Errors from `check` are logged and count as a tick.
pub async fn poll_until_terminal<F, Fut>(policy: &PollPolicy, job_id: &str, mut check: F) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobStatus>>,
{
    let start = Instant::now();
    let mut ticks: u32 = 0;

    loop {
        if ticks >= policy.max_ticks {
            return PollOutcome::TimedOut {
                ticks,
                elapsed: start.elapsed(),
            };
        }

        let wait = policy.jittered(policy.interval_for_tick(ticks));
        if start.elapsed().saturating_add(wait) > policy.max_duration {
            return PollOutcome::TimedOut {
                ticks,
                elapsed: start.elapsed(),
            };
        }

        tokio::time::sleep(wait).await;
        ticks += 1;

        match check().await {
            Ok(JobStatus::Completed) => {
                debug!(job_id, ticks, "Run completed");
                return PollOutcome::Completed { ticks };
            }
            Ok(JobStatus::Failed(status)) => {
                return PollOutcome::Failed { status, ticks };
            }
            Ok(JobStatus::Pending) => {
                debug!(job_id, ticks, "Run pending completion");
            }
            Err(e) => {
                warn!(job_id, ticks, error = %e, "Run status check failed, will retry");
            }
        }
    }
}
