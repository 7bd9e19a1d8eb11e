// Performance metrics for the money engines
//
// Tracks execution counts and times of totals computations, refund
// allocations and return submissions, and flags slow operations.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use utoipa::ToSchema;

/// Default threshold for slow operations (100ms)
pub const DEFAULT_SLOW_OPERATION_THRESHOLD_MS: u64 = 100;

/// Performance metrics shared across handlers
#[derive(Debug, Clone)]
pub struct EngineMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    slow_threshold_ms: u64,
    totals: OperationStats,
    allocations: OperationStats,
    submissions: OperationStats,
}

#[derive(Debug, Default)]
struct OperationStats {
    count: AtomicU64,
    total_time_us: AtomicU64,
    slow: AtomicU64,
}

impl OperationStats {
    fn record(&self, duration: Duration) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    fn avg_time_ms(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        let total_us = self.total_time_us.load(Ordering::Relaxed);

        if count == 0 {
            0.0
        } else {
            (total_us as f64 / count as f64) / 1000.0
        }
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::with_slow_threshold(DEFAULT_SLOW_OPERATION_THRESHOLD_MS)
    }

    pub fn with_slow_threshold(slow_threshold_ms: u64) -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                slow_threshold_ms,
                totals: OperationStats::default(),
                allocations: OperationStats::default(),
                submissions: OperationStats::default(),
            }),
        }
    }

    /// Start timing an order totals computation
    pub fn start_totals_computation(&self) -> OperationTimer {
        OperationTimer::new(OperationType::Totals, self.clone())
    }

    /// Start timing a refund allocation
    pub fn start_refund_allocation(&self) -> OperationTimer {
        OperationTimer::new(OperationType::Allocation, self.clone())
    }

    /// Start timing a return submission
    pub fn start_return_submission(&self) -> OperationTimer {
        OperationTimer::new(OperationType::Submission, self.clone())
    }

    fn stats(&self, operation_type: OperationType) -> &OperationStats {
        match operation_type {
            OperationType::Totals => &self.inner.totals,
            OperationType::Allocation => &self.inner.allocations,
            OperationType::Submission => &self.inner.submissions,
        }
    }

    fn record(&self, operation_type: OperationType, duration: Duration) {
        let stats = self.stats(operation_type);
        stats.record(duration);

        if duration.as_millis() as u64 > self.inner.slow_threshold_ms {
            stats.slow.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                "Slow {}: {}ms",
                operation_type.as_str(),
                duration.as_millis()
            );
        }
    }

    /// Get metrics summary
    pub fn summary(&self) -> MetricsSummary {
        let inner = &self.inner;
        MetricsSummary {
            slow_threshold_ms: inner.slow_threshold_ms,
            totals_computations: inner.totals.count.load(Ordering::Relaxed),
            avg_totals_time_ms: inner.totals.avg_time_ms(),
            slow_totals_computations: inner.totals.slow.load(Ordering::Relaxed),
            refund_allocations: inner.allocations.count.load(Ordering::Relaxed),
            avg_allocation_time_ms: inner.allocations.avg_time_ms(),
            slow_refund_allocations: inner.allocations.slow.load(Ordering::Relaxed),
            return_submissions: inner.submissions.count.load(Ordering::Relaxed),
            avg_submission_time_ms: inner.submissions.avg_time_ms(),
            slow_return_submissions: inner.submissions.slow.load(Ordering::Relaxed),
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        let summary = self.summary();
        tracing::info!(
            "Engine Performance Metrics:\n\
             Totals: {} computations, avg {:.2}ms, {} slow\n\
             Allocations: {} refunds, avg {:.2}ms, {} slow\n\
             Submissions: {} returns, avg {:.2}ms, {} slow",
            summary.totals_computations,
            summary.avg_totals_time_ms,
            summary.slow_totals_computations,
            summary.refund_allocations,
            summary.avg_allocation_time_ms,
            summary.slow_refund_allocations,
            summary.return_submissions,
            summary.avg_submission_time_ms,
            summary.slow_return_submissions,
        );
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Type of operation being timed
#[derive(Debug, Clone, Copy)]
enum OperationType {
    Totals,
    Allocation,
    Submission,
}

impl OperationType {
    fn as_str(&self) -> &'static str {
        match self {
            OperationType::Totals => "totals computation",
            OperationType::Allocation => "refund allocation",
            OperationType::Submission => "return submission",
        }
    }
}

/// Timer for tracking operation duration; records once, when dropped
pub struct OperationTimer {
    start: Instant,
    operation_type: OperationType,
    metrics: EngineMetrics,
}

impl OperationTimer {
    fn new(operation_type: OperationType, metrics: EngineMetrics) -> Self {
        Self {
            start: Instant::now(),
            operation_type,
            metrics,
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        self.metrics
            .record(self.operation_type, self.start.elapsed());
    }
}

/// Summary of performance metrics
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub slow_threshold_ms: u64,
    pub totals_computations: u64,
    pub avg_totals_time_ms: f64,
    pub slow_totals_computations: u64,
    pub refund_allocations: u64,
    pub avg_allocation_time_ms: f64,
    pub slow_refund_allocations: u64,
    pub return_submissions: u64,
    pub avg_submission_time_ms: f64,
    pub slow_return_submissions: u64,
}
