use std::collections::HashMap;

use opentelemetry::Context;

use super::Aggregation;
use crate::attributes::AttributeSet;
use crate::data::{self, MetricData, NumberDataPoint};
use crate::exemplar::Exemplar;
use crate::Temporality;

/// Accumulated state of a [`SumAggregation`] for one attribute set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SumSummary {
    /// Arithmetic sum of all recorded values.
    pub value: f64,
}

/// Summarizes a set of measurements as their arithmetic sum.
pub struct SumAggregation {
    monotonic: bool,
}

impl SumAggregation {
    /// `monotonic` marks sums that only ever increase (counters); it is
    /// carried into the rendered data untouched.
    pub fn new(monotonic: bool) -> Self {
        SumAggregation { monotonic }
    }
}

impl Aggregation for SumAggregation {
    type Summary = SumSummary;

    fn initialize(&self) -> SumSummary {
        SumSummary::default()
    }

    fn record(
        &self,
        summary: &mut SumSummary,
        value: f64,
        _attributes: &AttributeSet,
        _context: &Context,
        _timestamp: u64,
    ) {
        summary.value += value;
    }

    fn merge(&self, left: &SumSummary, right: &SumSummary) -> SumSummary {
        SumSummary {
            value: left.value + right.value,
        }
    }

    fn diff(&self, left: &SumSummary, right: &SumSummary) -> SumSummary {
        SumSummary {
            value: right.value - left.value,
        }
    }

    fn to_data(
        &self,
        summaries: &HashMap<AttributeSet, SumSummary>,
        mut exemplars: HashMap<AttributeSet, Vec<Exemplar>>,
        start_timestamp: u64,
        timestamp: u64,
        temporality: Temporality,
    ) -> MetricData {
        // a sum of zero is meaningful output, so nothing is skipped here
        let data_points = summaries
            .iter()
            .map(|(attributes, summary)| NumberDataPoint {
                attributes: attributes.to_vec(),
                start_time: start_timestamp,
                time: timestamp,
                value: summary.value,
                exemplars: exemplars.remove(attributes).unwrap_or_default(),
            })
            .collect();

        data::Sum {
            data_points,
            temporality,
            is_monotonic: self.monotonic,
        }
        .into()
    }
}
