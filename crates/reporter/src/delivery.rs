// Copyright 2025 Inference Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Batched delivery with retries, run on a background task.
//!
//! One attempt submits every batch in order. An attempt passes when at least
//! one batch went through; batches that failed within a passing attempt are
//! not resent. A failed attempt is retried after an exponential backoff.

use crate::config::DeliveryPolicy;
use crate::datadog::MetricsSink;
use crate::error::{ReporterError, Result};
use chrono::Utc;
use inference_bench_core::{MetricBatch, MetricMap, MetricPoint, Tags};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Turn a metric mapping into gauge points named `{prefix}.{name}`.
///
/// Every point shares one timestamp. Non-finite values are dropped.
pub fn build_points(metrics: &MetricMap, prefix: &str, tags: &Tags) -> MetricBatch {
    let timestamp = Utc::now().timestamp();
    metrics
        .iter()
        .filter_map(|(name, value)| {
            MetricPoint::gauge(format!("{prefix}.{name}"), *value, timestamp, tags.clone())
        })
        .collect()
}

/// Run `op` up to `policy.max_attempts` times, sleeping `policy.backoff(k)`
/// after each failed attempt except the last.
pub(crate) async fn with_retries<F, Fut>(policy: &DeliveryPolicy, what: &str, mut op: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let max_attempts = policy.max_attempts;
    for attempt in 0..max_attempts {
        match op().await {
            Ok(()) => return true,
            Err(e) if attempt + 1 < max_attempts => {
                let wait = policy.backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    retry_in = ?wait,
                    error = %e,
                    "{} failed, retrying", what
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) => {
                error!(max_attempts, error = %e, "{} failed after all attempts", what);
            }
        }
    }
    false
}

/// Sends metric points to a [`MetricsSink`].
#[derive(Clone)]
pub struct MetricReporter {
    sink: Arc<dyn MetricsSink>,
    policy: DeliveryPolicy,
}

impl MetricReporter {
    /// Create a reporter over `sink`.
    pub fn new(sink: Arc<dyn MetricsSink>, policy: DeliveryPolicy) -> Self {
        Self { sink, policy }
    }

    /// Deliver `points`, returning whether anything was accepted.
    ///
    /// An empty point set is reported as a failure.
    pub async fn send(&self, points: &[MetricPoint]) -> bool {
        if points.is_empty() {
            warn!("No metrics to send");
            return false;
        }
        with_retries(&self.policy, "Metric delivery", || self.attempt(points)).await
    }

    async fn attempt(&self, points: &[MetricPoint]) -> Result<()> {
        let batch_size = self.policy.batch_size.max(1);
        let total_batches = points.len().div_ceil(batch_size);
        let mut sent = 0;

        for (i, batch) in points.chunks(batch_size).enumerate() {
            match self.sink.submit(batch).await {
                Ok(()) => sent += batch.len(),
                Err(e) => warn!(
                    batch = i + 1,
                    total_batches,
                    error = %e,
                    "Batch failed"
                ),
            }
        }

        if sent == points.len() {
            info!(count = sent, "Sent metrics to Datadog");
            Ok(())
        } else if sent > 0 {
            warn!(sent, total = points.len(), "Partially sent metrics to Datadog");
            Ok(())
        } else {
            Err(ReporterError::AllBatchesFailed(total_batches))
        }
    }

    /// Start delivery on a background task.
    pub fn dispatch(&self, points: MetricBatch) -> DeliveryHandle {
        let reporter = self.clone();
        DeliveryHandle::spawn(async move { reporter.send(&points).await })
    }
}

/// How background delivery ended from the waiter's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The task finished; `true` if anything was delivered.
    Completed(bool),
    /// Still running when the wait expired; left in flight.
    TimedOut,
    /// The task panicked or was cancelled.
    Aborted,
}

impl DeliveryOutcome {
    /// Whether delivery finished and succeeded.
    pub fn delivered(&self) -> bool {
        matches!(self, Self::Completed(true))
    }
}

/// Handle to a delivery task.
#[derive(Debug)]
pub struct DeliveryHandle {
    task: JoinHandle<bool>,
}

impl DeliveryHandle {
    /// Spawn `delivery` on the current runtime.
    pub fn spawn<F>(delivery: F) -> Self
    where
        F: Future<Output = bool> + Send + 'static,
    {
        Self {
            task: tokio::spawn(delivery),
        }
    }

    /// Wait up to `timeout` for the task to finish.
    ///
    /// On timeout the task keeps running detached.
    pub async fn wait(self, timeout: Duration) -> DeliveryOutcome {
        match tokio::time::timeout(timeout, self.task).await {
            Ok(Ok(sent)) => DeliveryOutcome::Completed(sent),
            Ok(Err(e)) => {
                error!(error = %e, "Delivery task failed");
                DeliveryOutcome::Aborted
            }
            Err(_) => {
                warn!(timeout = ?timeout, "Delivery still running after timeout, continuing");
                DeliveryOutcome::TimedOut
            }
        }
    }
}
