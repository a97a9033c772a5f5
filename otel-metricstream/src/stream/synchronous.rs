use std::sync::Arc;

use opentelemetry::otel_debug;

use super::aggregator::MetricAggregator;
use super::delta::DeltaStorage;
use super::reader_set::ReaderSet;
use super::{Metric, MetricStream, ReaderId, WritableMetricStream};
use crate::aggregation::Aggregation;
use crate::attribute_processor::AttributeProcessor;
use crate::data::MetricData;
use crate::exemplar::ExemplarReservoir;
use crate::Temporality;

/// A stream for push instruments: measurements are folded into the active
/// window as they happen, and every collection closes that window.
///
/// Closed windows are parked in the stream's delta storage tagged with the
/// full reader set, so readers polling at different cadences each see the writes
/// since their own previous collection. Cumulative readers retain their bits
/// and therefore accumulate the stream's full history.
pub struct SynchronousMetricStream<A: Aggregation> {
    aggregator: Arc<MetricAggregator<A>>,
    aggregation: Arc<A>,
    delta: DeltaStorage<A>,
    readers: ReaderSet,
    cumulative: ReaderSet,
    timestamp: u64,
}

impl<A: Aggregation> SynchronousMetricStream<A> {
    pub fn new(aggregation: A, start_timestamp: u64) -> Self {
        let aggregation = Arc::new(aggregation);
        SynchronousMetricStream {
            aggregator: Arc::new(MetricAggregator::new(aggregation.clone())),
            delta: DeltaStorage::new(aggregation.clone()),
            aggregation,
            readers: ReaderSet::default(),
            cumulative: ReaderSet::default(),
            timestamp: start_timestamp,
        }
    }

    /// Applies `processor` to the attributes of every future measurement.
    pub fn with_attribute_processor(self, processor: impl AttributeProcessor + 'static) -> Self {
        self.aggregator.set_attribute_processor(Box::new(processor));
        self
    }

    /// Retains exemplars for the measurements written to this stream.
    pub fn with_exemplar_reservoir(self, reservoir: impl ExemplarReservoir + 'static) -> Self {
        self.aggregator.set_exemplar_reservoir(Box::new(reservoir));
        self
    }

    /// The shared write surface for instruments backed by this stream.
    pub fn writable(&self) -> Arc<dyn WritableMetricStream> {
        self.aggregator.clone()
    }
}

impl<A: Aggregation> MetricStream for SynchronousMetricStream<A> {
    fn temporality(&self) -> Temporality {
        Temporality::Delta
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn register(&mut self, temporality: Temporality) -> ReaderId {
        let reader = self.readers.first_clear();
        self.readers.insert(reader);
        if temporality == Temporality::Cumulative {
            self.cumulative.insert(reader);
        }
        reader
    }

    fn unregister(&mut self, reader: ReaderId) {
        if !self.readers.contains(reader) {
            otel_debug!(name: "MetricStreamUnknownReader", reader = reader);
            return;
        }

        // flush whatever this reader left pending
        let _ = self.delta.collect(reader, false);

        self.readers.remove(reader);
        self.cumulative.remove(reader);
    }

    fn collect(&mut self, reader: ReaderId, timestamp: u64) -> MetricData {
        // the just-closed window becomes available to every registered reader
        self.delta
            .add(self.aggregator.collect(self.timestamp), &self.readers);
        self.timestamp = timestamp;

        let cumulative = self.cumulative.contains(reader);
        let metric = self
            .delta
            .collect(reader, cumulative)
            .unwrap_or_else(|| Metric::empty(self.timestamp));

        let temporality = if cumulative {
            Temporality::Cumulative
        } else {
            Temporality::Delta
        };
        let exemplars = self.aggregator.exemplars(&metric);

        self.aggregation.to_data(
            &metric.summaries,
            exemplars,
            metric.timestamp,
            self.timestamp,
            temporality,
        )
    }
}
