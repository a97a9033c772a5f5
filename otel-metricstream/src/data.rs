//! Types for delivery of pre-aggregated metric time series data.

use opentelemetry::KeyValue;

use crate::exemplar::Exemplar;
use crate::Temporality;

/// Rendered output of one collection, tagged by aggregation shape.
///
/// Consumed by exporter collaborators; nothing in this crate holds on to it.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricData {
    /// Data of a [`SumAggregation`](crate::aggregation::SumAggregation).
    Sum(Sum),
    /// Data of a [`LastValueAggregation`](crate::aggregation::LastValueAggregation).
    Gauge(Gauge),
    /// Data of an [`ExplicitBucketHistogramAggregation`](crate::aggregation::ExplicitBucketHistogramAggregation).
    Histogram(Histogram),
}

impl From<Sum> for MetricData {
    fn from(value: Sum) -> Self {
        MetricData::Sum(value)
    }
}

impl From<Gauge> for MetricData {
    fn from(value: Gauge) -> Self {
        MetricData::Gauge(value)
    }
}

impl From<Histogram> for MetricData {
    fn from(value: Histogram) -> Self {
        MetricData::Histogram(value)
    }
}

/// A single data point in a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberDataPoint {
    /// Attributes is the set of key value pairs that uniquely identify the
    /// time series.
    pub attributes: Vec<KeyValue>,
    /// The time when the time series was started.
    pub start_time: u64,
    /// The time when the time series was recorded.
    pub time: u64,
    /// The value of this data point.
    pub value: f64,
    /// The sampled [Exemplar]s collected during the time series.
    pub exemplars: Vec<Exemplar>,
}

/// Represents the sum of all measurements of values from an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Sum {
    /// Represents individual aggregated measurements with unique attributes.
    pub data_points: Vec<NumberDataPoint>,
    /// Describes if the aggregation is reported as the change from the last report
    /// time, or the cumulative changes since a fixed start time.
    pub temporality: Temporality,
    /// Whether this aggregation only increases or decreases.
    pub is_monotonic: bool,
}

/// A measurement of the current value of an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    /// Represents individual aggregated measurements with unique attributes.
    pub data_points: Vec<NumberDataPoint>,
}

/// Represents the histogram of all measurements of values from an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Individual aggregated measurements with unique attributes.
    pub data_points: Vec<HistogramDataPoint>,
    /// Describes if the aggregation is reported as the change from the last report
    /// time, or the cumulative changes since a fixed start time.
    pub temporality: Temporality,
}

/// A single histogram data point in a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramDataPoint {
    /// The set of key value pairs that uniquely identify the time series.
    pub attributes: Vec<KeyValue>,
    /// The time when the time series was started.
    pub start_time: u64,
    /// The time when the time series was recorded.
    pub time: u64,
    /// The number of updates this histogram has been calculated with.
    pub count: u64,
    /// The sum of the values recorded.
    pub sum: f64,
    /// The minimum value recorded.
    ///
    /// `NaN` when not derivable, which includes every delta window computed by
    /// subtracting cumulative snapshots.
    pub min: f64,
    /// The maximum value recorded.
    ///
    /// `NaN` when not derivable, see [`min`](Self::min).
    pub max: f64,
    /// The upper bounds of the buckets of the histogram.
    ///
    /// Because the last boundary is +infinity this one is implied.
    pub bounds: Vec<f64>,
    /// The count of each of the buckets.
    pub bucket_counts: Vec<u64>,
    /// The sampled [Exemplar]s collected during the time series.
    pub exemplars: Vec<Exemplar>,
}
