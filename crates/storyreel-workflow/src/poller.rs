//! Cancellable repeating probe with an overall ceiling.

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq)]
pub enum PollProbe<T> {
    Ready(T),
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Succeeded(T),
    TimedOut { attempts: u32 },
    Cancelled,
}

/// Probes every `interval` until a probe is ready, the ceiling elapses or the
/// token is cancelled. The first probe runs one interval after start. The
/// ceiling is measured from start and also interrupts an in-flight probe.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
    ceiling: Duration,
}

impl Poller {
    pub fn new(interval: Duration, ceiling: Duration) -> Self {
        Self { interval, ceiling }
    }

    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut probe: F) -> PollOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = PollProbe<T>>,
    {
        let start = Instant::now();
        let deadline = sleep_until(start + self.ceiling);
        tokio::pin!(deadline);

        let mut ticks = interval_at(start + self.interval, self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempts = 0u32;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = &mut deadline => return PollOutcome::TimedOut { attempts },
                _ = ticks.tick() => {}
            }

            attempts += 1;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = &mut deadline => return PollOutcome::TimedOut { attempts },
                probed = probe(attempts) => {
                    if let PollProbe::Ready(value) = probed {
                        return PollOutcome::Succeeded(value);
                    }
                }
            }
        }
    }
}
