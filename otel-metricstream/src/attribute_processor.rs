use opentelemetry::{Context, Key, KeyValue};

use crate::attributes::AttributeSet;

/// Transforms the attribute set of a measurement before it is aggregated.
///
/// The ambient context of the measurement is available so processors can make
/// per-request decisions, e.g. multi-tenant suppression.
pub trait AttributeProcessor: Send {
    /// Returns the effective attribute set for one measurement.
    fn process(&self, attributes: AttributeSet, context: &Context) -> AttributeSet;
}

/// Retains only the attributes whose key is part of an allow-list.
pub struct FilteredAttributeProcessor {
    keys: Vec<Key>,
}

impl FilteredAttributeProcessor {
    /// Creates a processor retaining only the given attribute keys.
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        FilteredAttributeProcessor {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl AttributeProcessor for FilteredAttributeProcessor {
    fn process(&self, attributes: AttributeSet, _context: &Context) -> AttributeSet {
        let filtered: Vec<KeyValue> = attributes
            .iter()
            .filter(|(key, _)| self.keys.contains(key))
            .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
            .collect();
        AttributeSet::from(filtered.as_slice())
    }
}
