use std::sync::Arc;

use opentelemetry::{Context, KeyValue};

use super::aggregator::MetricAggregator;
use super::{Metric, MetricStream, ReaderId, WritableMetricStream};
use crate::aggregation::Aggregation;
use crate::attribute_processor::AttributeProcessor;
use crate::data::MetricData;
use crate::exemplar::ExemplarReservoir;
use crate::Temporality;

/// Receives the values reported by an observable callback.
pub trait MetricObserver {
    /// Records the currently observed value for the given attribute set.
    fn observe(&mut self, value: f64, attributes: &[KeyValue]);
}

/// A stream for observable instruments: nothing is written between
/// collections, instead every collection re-invokes the user callback and
/// snapshots what it reported.
///
/// The callback reports absolute values, so the raw snapshot already is the
/// cumulative state. Delta readers each keep their own baseline snapshot and
/// receive the difference against it, which stays correct regardless of how
/// the cadences of other readers interleave.
pub struct AsynchronousMetricStream<A: Aggregation> {
    aggregator: MetricAggregator<A>,
    aggregation: Arc<A>,
    callback: Box<dyn Fn(&mut dyn MetricObserver) + Send + Sync>,
    start_timestamp: u64,
    metric: Metric<A::Summary>,
    readers: Vec<Option<ReaderState<A::Summary>>>,
}

enum ReaderState<S> {
    Cumulative,
    Delta { last_read: Metric<S> },
}

struct StreamObserver<'a, A: Aggregation> {
    aggregator: &'a MetricAggregator<A>,
    context: &'a Context,
    timestamp: u64,
}

impl<A: Aggregation> MetricObserver for StreamObserver<'_, A> {
    fn observe(&mut self, value: f64, attributes: &[KeyValue]) {
        self.aggregator
            .record(value, attributes, self.context, self.timestamp);
    }
}

impl<A: Aggregation> AsynchronousMetricStream<A> {
    pub fn new(
        aggregation: A,
        callback: impl Fn(&mut dyn MetricObserver) + Send + Sync + 'static,
        start_timestamp: u64,
    ) -> Self {
        let aggregation = Arc::new(aggregation);
        AsynchronousMetricStream {
            aggregator: MetricAggregator::new(aggregation.clone()),
            aggregation,
            callback: Box::new(callback),
            start_timestamp,
            metric: Metric::empty(start_timestamp),
            readers: Vec::new(),
        }
    }

    /// Applies `processor` to the attributes of every observed value.
    pub fn with_attribute_processor(self, processor: impl AttributeProcessor + 'static) -> Self {
        self.aggregator.set_attribute_processor(Box::new(processor));
        self
    }

    /// Retains exemplars for the values observed by this stream.
    pub fn with_exemplar_reservoir(self, reservoir: impl ExemplarReservoir + 'static) -> Self {
        self.aggregator.set_exemplar_reservoir(Box::new(reservoir));
        self
    }
}

impl<A: Aggregation> MetricStream for AsynchronousMetricStream<A> {
    fn temporality(&self) -> Temporality {
        Temporality::Cumulative
    }

    fn timestamp(&self) -> u64 {
        self.metric.timestamp
    }

    fn register(&mut self, temporality: Temporality) -> ReaderId {
        let state = match temporality {
            Temporality::Cumulative => ReaderState::Cumulative,
            Temporality::Delta => ReaderState::Delta {
                last_read: self.metric.clone(),
            },
        };

        match self.readers.iter().position(Option::is_none) {
            Some(reader) => {
                self.readers[reader] = Some(state);
                reader
            }
            None => {
                self.readers.push(Some(state));
                self.readers.len() - 1
            }
        }
    }

    fn unregister(&mut self, reader: ReaderId) {
        if let Some(slot) = self.readers.get_mut(reader) {
            *slot = None;
        }
    }

    fn collect(&mut self, reader: ReaderId, timestamp: u64) -> MetricData {
        let context = Context::current();
        {
            let mut observer = StreamObserver {
                aggregator: &self.aggregator,
                context: &context,
                timestamp,
            };
            (self.callback)(&mut observer);
        }
        self.metric = self.aggregator.collect(timestamp);

        let (metric, start_timestamp, temporality) =
            match self.readers.get_mut(reader).and_then(Option::as_mut) {
                Some(ReaderState::Delta { last_read }) => {
                    let start = last_read.timestamp;
                    let baseline = std::mem::replace(last_read, self.metric.clone());
                    (
                        diff_metric(self.aggregation.as_ref(), &baseline, &self.metric),
                        start,
                        Temporality::Delta,
                    )
                }
                // unknown readers render the raw cumulative state
                _ => (
                    self.metric.clone(),
                    self.start_timestamp,
                    Temporality::Cumulative,
                ),
            };

        let exemplars = self.aggregator.exemplars(&metric);
        self.aggregation.to_data(
            &metric.summaries,
            exemplars,
            start_timestamp,
            metric.timestamp,
            temporality,
        )
    }
}

/// Turns two cumulative snapshots into a delta; attribute sets absent from the
/// baseline pass through unchanged (their cumulative value is the delta).
fn diff_metric<A: Aggregation>(
    aggregation: &A,
    last_read: &Metric<A::Summary>,
    metric: &Metric<A::Summary>,
) -> Metric<A::Summary> {
    let mut diff = metric.clone();
    for (attributes, summary) in diff.summaries.iter_mut() {
        if let Some(baseline) = last_read.summaries.get(attributes) {
            let updated = aggregation.diff(baseline, summary);
            *summary = updated;
        }
    }
    diff
}
