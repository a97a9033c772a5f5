//! Metric streams tie aggregation, temporality conversion and reader
//! registration together.
//!
//! A stream has two surfaces: the instrument-facing write path
//! ([`WritableMetricStream`], usually reached through a [`StreamWriter`]) and
//! the reader-facing collection path ([`MetricStream`]). Readers register with
//! a temporality preference and poll at their own cadence; each reader's view
//! is causally consistent with its own collection history, independent of the
//! other readers.

mod aggregator;
mod asynchronous;
mod delta;
mod reader_set;
mod synchronous;
mod writer;

pub use aggregator::MetricAggregator;
pub use asynchronous::{AsynchronousMetricStream, MetricObserver};
pub use synchronous::SynchronousMetricStream;
pub use writer::{MultiStreamWriter, StreamWriter};

use std::collections::HashMap;

use opentelemetry::{Context, KeyValue};

use crate::attributes::AttributeSet;
use crate::data::MetricData;
use crate::Temporality;

/// Identifies a reader registered with a [`MetricStream`].
pub type ReaderId = usize;

/// A point-in-time snapshot of accumulated summaries, keyed by canonical
/// attribute set.
#[derive(Clone, Debug)]
pub struct Metric<S> {
    /// Accumulated summaries by attribute set.
    pub summaries: HashMap<AttributeSet, S>,
    /// When this window was opened.
    pub timestamp: u64,
}

impl<S> Metric<S> {
    pub(crate) fn empty(timestamp: u64) -> Self {
        Metric {
            summaries: HashMap::new(),
            timestamp,
        }
    }
}

/// The reader-facing collection surface of one instrument stream.
///
/// Streams do not serialize access internally; callers are expected to guard
/// each stream with its own lock when sharing it across threads.
pub trait MetricStream: Send {
    /// The stream's native accumulation temporality.
    fn temporality(&self) -> Temporality;

    /// Timestamp of the most recent collection, or of the stream start before
    /// the first one.
    fn timestamp(&self) -> u64;

    /// Registers a reader with the given temporality preference and returns
    /// its id. Ids of unregistered readers are reused.
    fn register(&mut self, temporality: Temporality) -> ReaderId;

    /// Removes a reader, discarding whatever it has not yet consumed. Unknown
    /// ids are ignored.
    fn unregister(&mut self, reader: ReaderId);

    /// Collects the data pending for `reader`, closing the current window at
    /// `timestamp`.
    fn collect(&mut self, reader: ReaderId, timestamp: u64) -> MetricData;
}

/// The instrument-facing write surface of a stream.
pub trait WritableMetricStream: Send + Sync {
    /// Folds one measurement into the active aggregation window.
    fn record(&self, value: f64, attributes: &[KeyValue], context: &Context, timestamp: u64);
}
