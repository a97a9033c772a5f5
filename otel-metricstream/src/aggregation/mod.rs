//! Aggregation strategies for folding raw measurements into summaries.
//!
//! Each strategy owns a summary type: the per-attribute-set accumulation state
//! of one collection window. Summaries are pure data; all arithmetic lives on
//! the aggregation so that configuration such as histogram bucket boundaries
//! is shared by every summary it produces.

mod histogram;
mod last_value;
mod sum;

pub use histogram::{ExplicitBucketHistogramAggregation, ExplicitBucketHistogramSummary};
pub use last_value::{LastValueAggregation, LastValueSummary};
pub use sum::{SumAggregation, SumSummary};

use std::collections::HashMap;

use opentelemetry::Context;

use crate::attributes::AttributeSet;
use crate::data::MetricData;
use crate::exemplar::Exemplar;
use crate::Temporality;

/// How raw measurements fold into summaries and how summaries combine across
/// collection windows.
///
/// Summaries must only ever be combined with summaries produced by the same
/// aggregation instance; pairing summaries across instances is a caller
/// contract violation.
pub trait Aggregation: Send + Sync + 'static {
    /// Accumulated state for one attribute set.
    type Summary: Clone + Send + Sync + 'static;

    /// The zero value a summary starts from.
    fn initialize(&self) -> Self::Summary;

    /// Folds one measurement into `summary`.
    fn record(
        &self,
        summary: &mut Self::Summary,
        value: f64,
        attributes: &AttributeSet,
        context: &Context,
        timestamp: u64,
    );

    /// Combines the summaries of two windows, `left` being the older one.
    fn merge(&self, left: &Self::Summary, right: &Self::Summary) -> Self::Summary;

    /// Computes `right` minus `left`, turning two cumulative snapshots into a
    /// delta window.
    fn diff(&self, left: &Self::Summary, right: &Self::Summary) -> Self::Summary;

    /// Renders accumulated summaries into exportable data points.
    ///
    /// Summaries still in their initialized state are skipped when emitting
    /// them would be meaningless (an unset gauge, an empty histogram); a sum
    /// of zero is meaningful and is emitted.
    fn to_data(
        &self,
        summaries: &HashMap<AttributeSet, Self::Summary>,
        exemplars: HashMap<AttributeSet, Vec<Exemplar>>,
        start_timestamp: u64,
        timestamp: u64,
        temporality: Temporality,
    ) -> MetricData;
}
