use std::collections::HashMap;

use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;

use crate::attributes::AttributeSet;

/// A measurement sampled from a time series providing a typical example.
#[derive(Debug, Clone, PartialEq)]
pub struct Exemplar {
    /// The measured value.
    pub value: f64,
    /// The time when the measurement was recorded.
    pub time: u64,
    /// The ID of the span that was active during the measurement.
    ///
    /// If no span was active or the span was not sampled this will be all zeroes.
    pub span_id: [u8; 8],
    /// The ID of the trace the active span belonged to during the measurement.
    ///
    /// If no span was active or the span was not sampled this will be all zeroes.
    pub trace_id: [u8; 16],
}

/// Decides which raw measurements are retained alongside the aggregate.
///
/// Reservoirs are stream-local; `collect` is a destructive read performed once
/// per collection cycle.
pub trait ExemplarReservoir: Send {
    /// Offers one measurement to the reservoir.
    fn offer(&mut self, attributes: &AttributeSet, value: f64, context: &Context, timestamp: u64);

    /// Drains the exemplars retained since the last collection, keyed by
    /// attribute set.
    fn collect(&mut self) -> HashMap<AttributeSet, Vec<Exemplar>>;
}

/// Retains up to a fixed number of exemplars per attribute set, overwriting
/// the oldest once full.
pub struct FixedSizeReservoir {
    size: usize,
    buckets: HashMap<AttributeSet, Bucket>,
}

struct Bucket {
    exemplars: Vec<Exemplar>,
    offered: usize,
}

impl FixedSizeReservoir {
    /// Creates a reservoir retaining at most `size` exemplars per attribute set.
    pub fn new(size: usize) -> Self {
        FixedSizeReservoir {
            size: size.max(1),
            buckets: HashMap::new(),
        }
    }
}

impl ExemplarReservoir for FixedSizeReservoir {
    fn offer(&mut self, attributes: &AttributeSet, value: f64, context: &Context, timestamp: u64) {
        let (span_id, trace_id) = if context.has_active_span() {
            let span = context.span();
            let span_context = span.span_context();
            (
                span_context.span_id().to_bytes(),
                span_context.trace_id().to_bytes(),
            )
        } else {
            ([0; 8], [0; 16])
        };

        let exemplar = Exemplar {
            value,
            time: timestamp,
            span_id,
            trace_id,
        };

        let bucket = self
            .buckets
            .entry(attributes.clone())
            .or_insert_with(|| Bucket {
                exemplars: Vec::new(),
                offered: 0,
            });
        if bucket.exemplars.len() < self.size {
            bucket.exemplars.push(exemplar);
        } else {
            bucket.exemplars[bucket.offered % self.size] = exemplar;
        }
        bucket.offered += 1;
    }

    fn collect(&mut self) -> HashMap<AttributeSet, Vec<Exemplar>> {
        self.buckets
            .drain()
            .map(|(attributes, bucket)| (attributes, bucket.exemplars))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(reservoir: &mut FixedSizeReservoir, value: f64, timestamp: u64) {
        reservoir.offer(
            &AttributeSet::default(),
            value,
            &Context::new(),
            timestamp,
        );
    }

    #[test]
    fn retains_up_to_size_exemplars() {
        let mut reservoir = FixedSizeReservoir::new(2);
        offer(&mut reservoir, 1.0, 1);
        offer(&mut reservoir, 2.0, 2);

        let exemplars = reservoir.collect();
        assert_eq!(exemplars[&AttributeSet::default()].len(), 2);
    }

    #[test]
    fn overwrites_oldest_when_full() {
        let mut reservoir = FixedSizeReservoir::new(2);
        offer(&mut reservoir, 1.0, 1);
        offer(&mut reservoir, 2.0, 2);
        offer(&mut reservoir, 3.0, 3);

        let exemplars = reservoir.collect();
        let values: Vec<f64> = exemplars[&AttributeSet::default()]
            .iter()
            .map(|e| e.value)
            .collect();
        assert_eq!(values, vec![3.0, 2.0]);
    }

    #[test]
    fn collect_resets_the_reservoir() {
        let mut reservoir = FixedSizeReservoir::new(1);
        offer(&mut reservoir, 1.0, 1);

        assert_eq!(reservoir.collect().len(), 1);
        assert!(reservoir.collect().is_empty());
    }
}
