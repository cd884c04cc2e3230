//! Duration distribution summaries backed by HDR histograms

use std::time::Duration;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

/// Compact description of a duration sample: count, mean and the quantiles
/// that matter for queueing analysis. Values are accurate to three
/// significant figures (the histogram's precision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationSummary {
    pub count: u64,
    pub mean: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub max: Duration,
}

impl DurationSummary {
    pub fn empty() -> Self {
        Self {
            count: 0,
            mean: Duration::ZERO,
            p50: Duration::ZERO,
            p95: Duration::ZERO,
            p99: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Summarize a slice of durations. Nanosecond resolution, saturating at
    /// `u64::MAX` nanoseconds per sample.
    pub fn from_durations(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::empty();
        }
        let mut histogram =
            Histogram::<u64>::new(3).expect("three significant digits is a valid precision");
        for sample in samples {
            histogram.saturating_record(sample.as_nanos().min(u128::from(u64::MAX)) as u64);
        }
        Self {
            count: histogram.len(),
            mean: Duration::from_nanos(histogram.mean() as u64),
            p50: Duration::from_nanos(histogram.value_at_quantile(0.50)),
            p95: Duration::from_nanos(histogram.value_at_quantile(0.95)),
            p99: Duration::from_nanos(histogram.value_at_quantile(0.99)),
            max: Duration::from_nanos(histogram.max()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for DurationSummary {
    fn default() -> Self {
        Self::empty()
    }
}
