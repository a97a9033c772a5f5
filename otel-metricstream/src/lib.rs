//! Temporality-aware metric aggregation and streaming.
//!
//! This crate implements the collection core of an OpenTelemetry metrics SDK:
//! raw instrument measurements are folded into per-attribute-set summaries,
//! reconciled across any number of independently paced readers, and rendered
//! into exportable data points with the temporality each reader asked for.
//!
//! Measurements enter through a [`StreamWriter`] (synchronous instruments) or
//! an observable callback (asynchronous instruments); readers register with a
//! stream and poll it at their own cadence:
//!
//! ```
//! use opentelemetry::KeyValue;
//! use otel_metricstream::aggregation::SumAggregation;
//! use otel_metricstream::data::MetricData;
//! use otel_metricstream::stream::{MetricStream, StreamWriter, SynchronousMetricStream};
//! use otel_metricstream::Temporality;
//!
//! let mut stream = SynchronousMetricStream::new(SumAggregation::new(true), 0);
//! let writer = StreamWriter::new(stream.writable());
//! let reader = stream.register(Temporality::Cumulative);
//!
//! writer.record(10.0, &[KeyValue::new("rate", "standard")], None, 1);
//!
//! let data = stream.collect(reader, 2);
//! assert!(matches!(data, MetricData::Sum(_)));
//! ```
//!
//! Exporters, periodic reader drivers and context propagation are external
//! collaborators; this crate only hands them already-aggregated data.
//!
//! [`StreamWriter`]: stream::StreamWriter

pub mod aggregation;
mod attribute_processor;
mod attributes;
pub mod data;
mod error;
mod exemplar;
pub mod stream;

pub use attribute_processor::{AttributeProcessor, FilteredAttributeProcessor};
pub use attributes::AttributeSet;
pub use error::{MetricError, MetricResult};
pub use exemplar::{Exemplar, ExemplarReservoir, FixedSizeReservoir};

/// Defines the window that an aggregation was calculated over.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Temporality {
    /// A measurement interval that continues to expand forward in time from a
    /// starting point.
    ///
    /// New measurements are added to all previous measurements since a start time.
    #[default]
    Cumulative,

    /// A measurement interval that resets each cycle.
    ///
    /// Measurements from one cycle are recorded independently, measurements
    /// from other cycles do not affect them.
    Delta,
}
