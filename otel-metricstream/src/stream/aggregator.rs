use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use opentelemetry::{Context, KeyValue};

use super::{Metric, WritableMetricStream};
use crate::aggregation::Aggregation;
use crate::attribute_processor::AttributeProcessor;
use crate::attributes::AttributeSet;
use crate::exemplar::{Exemplar, ExemplarReservoir};

/// Accumulates raw measurements into per-attribute-set summaries.
///
/// This is the writable facet of a stream: synchronous instruments write
/// through it continuously, asynchronous ones once per collection cycle.
/// [`collect`](MetricAggregator::collect) is a destructive read; the caller
/// owns the returned snapshot and the aggregator starts a fresh window.
pub struct MetricAggregator<A: Aggregation> {
    aggregation: Arc<A>,
    inner: Mutex<Inner<A::Summary>>,
}

struct Inner<S> {
    attribute_processor: Option<Box<dyn AttributeProcessor>>,
    exemplar_reservoir: Option<Box<dyn ExemplarReservoir>>,
    summaries: HashMap<AttributeSet, S>,
}

impl<A: Aggregation> MetricAggregator<A> {
    pub fn new(aggregation: Arc<A>) -> Self {
        MetricAggregator {
            aggregation,
            inner: Mutex::new(Inner {
                attribute_processor: None,
                exemplar_reservoir: None,
                summaries: HashMap::new(),
            }),
        }
    }

    pub(crate) fn set_attribute_processor(&self, processor: Box<dyn AttributeProcessor>) {
        self.lock().attribute_processor = Some(processor);
    }

    pub(crate) fn set_exemplar_reservoir(&self, reservoir: Box<dyn ExemplarReservoir>) {
        self.lock().exemplar_reservoir = Some(reservoir);
    }

    /// Snapshots the accumulated summaries stamped with `timestamp` and resets
    /// the aggregator.
    pub fn collect(&self, timestamp: u64) -> Metric<A::Summary> {
        Metric {
            summaries: std::mem::take(&mut self.lock().summaries),
            timestamp,
        }
    }

    /// Drains the exemplars retained for the attribute sets present in
    /// `metric`.
    pub fn exemplars(&self, metric: &Metric<A::Summary>) -> HashMap<AttributeSet, Vec<Exemplar>> {
        match self.lock().exemplar_reservoir.as_mut() {
            Some(reservoir) => {
                let mut exemplars = reservoir.collect();
                exemplars.retain(|attributes, _| metric.summaries.contains_key(attributes));
                exemplars
            }
            None => HashMap::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<A::Summary>> {
        // a poisoned window only loses measurements, it cannot corrupt state
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: Aggregation> WritableMetricStream for MetricAggregator<A> {
    fn record(&self, value: f64, attributes: &[KeyValue], context: &Context, timestamp: u64) {
        let attributes = AttributeSet::from(attributes);

        let mut inner = self.lock();
        let inner = &mut *inner;

        let attributes = match &inner.attribute_processor {
            Some(processor) => processor.process(attributes, context),
            None => attributes,
        };

        let summary = inner
            .summaries
            .entry(attributes.clone())
            .or_insert_with(|| self.aggregation.initialize());
        self.aggregation
            .record(summary, value, &attributes, context, timestamp);

        if let Some(reservoir) = inner.exemplar_reservoir.as_mut() {
            reservoir.offer(&attributes, value, context, timestamp);
        }
    }
}
