use std::collections::HashMap;

use opentelemetry::Context;

use super::Aggregation;
use crate::attributes::AttributeSet;
use crate::data::{self, MetricData, NumberDataPoint};
use crate::exemplar::Exemplar;
use crate::Temporality;

/// Accumulated state of a [`LastValueAggregation`] for one attribute set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LastValueSummary {
    /// The most recently recorded value, `None` until the first write.
    pub value: Option<f64>,
    /// When that value was recorded.
    pub timestamp: u64,
}

/// Summarizes a set of measurements as the last one made.
///
/// Under equal timestamps the newer write wins, which is the expected outcome
/// for concurrent asynchronous observers.
#[derive(Default)]
pub struct LastValueAggregation;

impl Aggregation for LastValueAggregation {
    type Summary = LastValueSummary;

    fn initialize(&self) -> LastValueSummary {
        LastValueSummary {
            value: None,
            timestamp: 0,
        }
    }

    fn record(
        &self,
        summary: &mut LastValueSummary,
        value: f64,
        _attributes: &AttributeSet,
        _context: &Context,
        timestamp: u64,
    ) {
        if summary.value.is_none() || timestamp >= summary.timestamp {
            summary.value = Some(value);
            summary.timestamp = timestamp;
        }
    }

    fn merge(&self, left: &LastValueSummary, right: &LastValueSummary) -> LastValueSummary {
        if right.timestamp >= left.timestamp {
            right.clone()
        } else {
            left.clone()
        }
    }

    /// Gauges have no subtraction semantics; the newer value simply wins.
    fn diff(&self, left: &LastValueSummary, right: &LastValueSummary) -> LastValueSummary {
        self.merge(left, right)
    }

    fn to_data(
        &self,
        summaries: &HashMap<AttributeSet, LastValueSummary>,
        mut exemplars: HashMap<AttributeSet, Vec<Exemplar>>,
        start_timestamp: u64,
        timestamp: u64,
        _temporality: Temporality,
    ) -> MetricData {
        let data_points = summaries
            .iter()
            .filter_map(|(attributes, summary)| {
                summary.value.map(|value| NumberDataPoint {
                    attributes: attributes.to_vec(),
                    start_time: start_timestamp,
                    time: timestamp,
                    value,
                    exemplars: exemplars.remove(attributes).unwrap_or_default(),
                })
            })
            .collect();

        data::Gauge { data_points }.into()
    }
}
