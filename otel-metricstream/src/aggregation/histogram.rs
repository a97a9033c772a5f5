use std::collections::HashMap;

use opentelemetry::Context;

use super::Aggregation;
use crate::attributes::AttributeSet;
use crate::data::{self, HistogramDataPoint, MetricData};
use crate::error::{MetricError, MetricResult};
use crate::exemplar::Exemplar;
use crate::Temporality;

/// Accumulated state of an [`ExplicitBucketHistogramAggregation`] for one
/// attribute set.
#[derive(Clone, Debug, PartialEq)]
pub struct ExplicitBucketHistogramSummary {
    /// The number of recorded values.
    pub count: u64,
    /// The sum of the recorded values.
    pub sum: f64,
    /// The smallest recorded value, `+Inf` until the first write.
    pub min: f64,
    /// The largest recorded value, `-Inf` until the first write.
    pub max: f64,
    /// Per-bucket counts; one more entry than the aggregation has boundaries.
    pub buckets: Vec<u64>,
}

/// Summarizes a set of measurements as a histogram with explicitly defined
/// buckets.
pub struct ExplicitBucketHistogramAggregation {
    boundaries: Vec<f64>,
}

impl ExplicitBucketHistogramAggregation {
    /// Boundaries define bucket upper bounds and must be strictly ascending.
    ///
    /// A value equal to a boundary is counted in that boundary's own bucket;
    /// values beyond the last boundary fall into the implicit overflow bucket.
    pub fn new(boundaries: Vec<f64>) -> MetricResult<Self> {
        for window in boundaries.windows(2) {
            if window[0] >= window[1] {
                return Err(MetricError::Config(format!(
                    "explicit bucket histogram: non-ascending boundaries: {boundaries:?}",
                )));
            }
        }

        Ok(ExplicitBucketHistogramAggregation { boundaries })
    }

    /// The configured bucket boundaries.
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }
}

impl Aggregation for ExplicitBucketHistogramAggregation {
    type Summary = ExplicitBucketHistogramSummary;

    fn initialize(&self) -> ExplicitBucketHistogramSummary {
        ExplicitBucketHistogramSummary {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            buckets: vec![0; self.boundaries.len() + 1],
        }
    }

    fn record(
        &self,
        summary: &mut ExplicitBucketHistogramSummary,
        value: f64,
        _attributes: &AttributeSet,
        _context: &Context,
        _timestamp: u64,
    ) {
        // bucket index = number of boundaries below the value
        let index = self.boundaries.partition_point(|&boundary| boundary < value);
        summary.count += 1;
        summary.sum += value;
        summary.min = min(value, summary.min);
        summary.max = max(value, summary.max);
        summary.buckets[index] += 1;
    }

    fn merge(
        &self,
        left: &ExplicitBucketHistogramSummary,
        right: &ExplicitBucketHistogramSummary,
    ) -> ExplicitBucketHistogramSummary {
        let mut buckets = right.buckets.clone();
        for (bucket, count) in buckets.iter_mut().zip(&left.buckets) {
            *bucket += count;
        }

        ExplicitBucketHistogramSummary {
            count: left.count + right.count,
            sum: left.sum + right.sum,
            min: min(left.min, right.min),
            max: max(left.max, right.max),
            buckets,
        }
    }

    /// Subtraction does not invert a min/max reduction, so those fields become
    /// `NaN` unless the newer window strictly dominates.
    fn diff(
        &self,
        left: &ExplicitBucketHistogramSummary,
        right: &ExplicitBucketHistogramSummary,
    ) -> ExplicitBucketHistogramSummary {
        let mut buckets = right.buckets.clone();
        for (bucket, count) in buckets.iter_mut().zip(&left.buckets) {
            *bucket -= count;
        }

        ExplicitBucketHistogramSummary {
            count: right.count - left.count,
            sum: right.sum - left.sum,
            min: if left.min > right.min {
                right.min
            } else {
                f64::NAN
            },
            max: if left.max < right.max {
                right.max
            } else {
                f64::NAN
            },
            buckets,
        }
    }

    fn to_data(
        &self,
        summaries: &HashMap<AttributeSet, ExplicitBucketHistogramSummary>,
        mut exemplars: HashMap<AttributeSet, Vec<Exemplar>>,
        start_timestamp: u64,
        timestamp: u64,
        temporality: Temporality,
    ) -> MetricData {
        let data_points = summaries
            .iter()
            .filter(|(_, summary)| summary.count != 0)
            .map(|(attributes, summary)| HistogramDataPoint {
                attributes: attributes.to_vec(),
                start_time: start_timestamp,
                time: timestamp,
                count: summary.count,
                sum: summary.sum,
                min: summary.min,
                max: summary.max,
                bounds: self.boundaries.clone(),
                bucket_counts: summary.buckets.clone(),
                exemplars: exemplars.remove(attributes).unwrap_or_default(),
            })
            .collect();

        data::Histogram {
            data_points,
            temporality,
        }
        .into()
    }
}

fn min(left: f64, right: f64) -> f64 {
    if left <= right {
        left
    } else if right <= left {
        right
    } else {
        f64::NAN
    }
}

fn max(left: f64, right: f64) -> f64 {
    if left >= right {
        left
    } else if right >= left {
        right
    } else {
        f64::NAN
    }
}
