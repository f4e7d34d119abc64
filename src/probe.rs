//! Concurrency probe for a shared limiter.
//!
//! Spawns many tokio tasks against one [`SlidingWindowLimiter`] and tallies
//! the admission decisions. Used by the `slidewin-probe` binary.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ProbeConfig;
use crate::ratelimit::{Clock, SlidingWindowLimiter};

/// Outcome of a probe run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Events admitted
    pub accepted: u64,
    /// Events turned away by tasks that ran to completion
    pub rejected: u64,
    /// Tasks that panicked; their decisions are not tallied
    pub failed_tasks: usize,
    /// Recorded events at the end of the run, after a purge
    pub final_len: usize,
    /// Limit in effect during the run
    pub limit: usize,
    /// Limiter capacity
    pub capacity: usize,
    /// Wall time of the run in milliseconds
    pub elapsed_ms: u64,
}

/// Run the probe described by `config` against `limiter`.
pub async fn run<C: Clock + 'static>(
    limiter: Arc<SlidingWindowLimiter<C>>,
    config: &ProbeConfig,
) -> ProbeReport {
    info!(
        tasks = config.tasks,
        attempts = config.attempts,
        jitter_ms = config.jitter_ms,
        limit = limiter.limit(),
        window = ?limiter.window(),
        "Starting probe"
    );

    let started = Instant::now();
    let handles = (0..config.tasks).map(|task| {
        let limiter = Arc::clone(&limiter);
        let attempts = config.attempts;
        let jitter_ms = config.jitter_ms;
        tokio::spawn(async move {
            let mut accepted = 0u64;
            let mut rejected = 0u64;
            for _ in 0..attempts {
                if limiter.try_accept() {
                    accepted += 1;
                } else {
                    rejected += 1;
                }
                if jitter_ms > 0 {
                    let pause = rand::thread_rng().gen_range(0..=jitter_ms);
                    tokio::time::sleep(Duration::from_millis(pause)).await;
                }
            }
            debug!(task, accepted, rejected, "Probe task finished");
            (accepted, rejected)
        })
    });

    let mut accepted = 0u64;
    let mut rejected = 0u64;
    let mut failed_tasks = 0usize;
    for result in futures::future::join_all(handles).await {
        match result {
            Ok((task_accepted, task_rejected)) => {
                accepted += task_accepted;
                rejected += task_rejected;
            }
            Err(e) => {
                warn!(error = %e, "Probe task failed");
                failed_tasks += 1;
            }
        }
    }

    limiter.purge();
    let report = ProbeReport {
        accepted,
        rejected,
        failed_tasks,
        final_len: limiter.len(),
        limit: limiter.limit(),
        capacity: limiter.capacity(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        accepted = report.accepted,
        rejected = report.rejected,
        failed_tasks = report.failed_tasks,
        elapsed_ms = report.elapsed_ms,
        "Probe finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Clock that panics on one specific reading.
    struct FailingClock {
        reads: AtomicUsize,
        fail_on: usize,
    }

    impl Clock for FailingClock {
        fn now_nanos(&self) -> i64 {
            let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            if read == self.fail_on {
                panic!("clock failed on read {}", read);
            }
            0
        }
    }

    fn probe_config(tasks: usize, attempts: usize) -> ProbeConfig {
        ProbeConfig {
            tasks,
            attempts,
            jitter_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_probe_caps_admissions_at_limit() {
        let limiter = Arc::new(SlidingWindowLimiter::with_clock(
            40,
            Duration::from_secs(60),
            ManualClock::new(0),
        ));
        limiter.set_limit(25);

        let report = run(Arc::clone(&limiter), &probe_config(4, 50)).await;

        assert_eq!(report.accepted, 25);
        assert_eq!(report.rejected, 175);
        assert_eq!(report.final_len, 25);
        assert_eq!(report.limit, 25);
        assert_eq!(report.capacity, 40);
    }

    #[tokio::test]
    async fn test_panicked_task_is_reported_not_counted_as_rejections() {
        let limiter = Arc::new(SlidingWindowLimiter::with_clock(
            100,
            Duration::from_secs(60),
            FailingClock {
                reads: AtomicUsize::new(0),
                fail_on: 4,
            },
        ));

        let report = run(Arc::clone(&limiter), &probe_config(2, 5)).await;

        // The first task records three events before its clock read panics.
        assert_eq!(report.failed_tasks, 1);
        assert_eq!(report.accepted, 5);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.final_len, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_probe_on_multi_thread_runtime() {
        let limiter = Arc::new(SlidingWindowLimiter::new(100, Duration::from_secs(60)));

        let report = run(limiter, &probe_config(16, 20)).await;

        assert_eq!(report.accepted + report.rejected, 320);
        assert_eq!(report.accepted, 100);
    }

    #[test]
    fn test_probe_with_jitter() {
        let limiter = Arc::new(SlidingWindowLimiter::new(1000, Duration::from_secs(60)));
        let config = ProbeConfig {
            tasks: 2,
            attempts: 3,
            jitter_ms: 2,
        };

        let report = tokio_test::block_on(run(limiter, &config));

        assert_eq!(report.accepted, 6);
        assert_eq!(report.rejected, 0);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = ProbeReport {
            accepted: 3,
            rejected: 1,
            failed_tasks: 0,
            final_len: 3,
            limit: 3,
            capacity: 5,
            elapsed_ms: 12,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["accepted"], 3);
        assert_eq!(json["capacity"], 5);

        let back: ProbeReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
