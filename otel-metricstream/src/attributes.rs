use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use opentelemetry::{Array, Key, KeyValue, Value};

/// A unique, order-canonical set of attributes usable as a hash-map key.
///
/// Attributes are sorted by key and de-duplicated (the last value written for
/// a key wins), so two sets built from the same pairs in any insertion order
/// compare and hash identically. The structural hash is computed once at
/// construction; float values participate by bit pattern so that equal sets
/// stay equal even when they contain `NaN`.
#[derive(Clone, Debug)]
pub struct AttributeSet {
    attributes: Vec<KeyValue>,
    hash: u64,
}

impl Default for AttributeSet {
    fn default() -> Self {
        AttributeSet::from(&[][..])
    }
}

impl From<&[KeyValue]> for AttributeSet {
    fn from(values: &[KeyValue]) -> Self {
        let mut attributes: Vec<KeyValue> = values.to_vec();
        attributes.sort_by(|a, b| a.key.cmp(&b.key));

        // we cannot use dedup_by because it keeps the first duplicate, not the last
        let mut i = attributes.len();
        while i > 1 {
            i -= 1;
            if attributes[i - 1].key == attributes[i].key {
                attributes.remove(i - 1);
            }
        }

        let hash = calculate_hash(&attributes);
        AttributeSet { attributes, hash }
    }
}

impl AttributeSet {
    /// Iterate over the key value pairs in the set, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.attributes.iter().map(|kv| (&kv.key, &kv.value))
    }

    /// Number of attributes in the set.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the set contains no attributes. The empty set is a valid,
    /// distinct key.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The attributes as an owned list, in canonical order.
    pub fn to_vec(&self) -> Vec<KeyValue> {
        self.attributes.clone()
    }
}

impl Hash for AttributeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash)
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .zip(&other.attributes)
                .all(|(a, b)| a.key == b.key && value_eq(&a.value, &b.value))
    }
}

impl Eq for AttributeSet {}

fn calculate_hash(values: &[KeyValue]) -> u64 {
    let mut hasher = DefaultHasher::default();
    for kv in values {
        kv.key.as_str().hash(&mut hasher);
        hash_value(&mut hasher, &kv.value);
    }
    hasher.finish()
}

fn hash_value<H: Hasher>(state: &mut H, value: &Value) {
    match value {
        Value::Bool(v) => {
            state.write_u8(1);
            v.hash(state);
        }
        Value::I64(v) => {
            state.write_u8(2);
            v.hash(state);
        }
        Value::F64(v) => {
            state.write_u8(3);
            state.write_u64(v.to_bits());
        }
        Value::String(v) => {
            state.write_u8(4);
            v.as_str().hash(state);
        }
        Value::Array(array) => {
            state.write_u8(5);
            match array {
                Array::Bool(vs) => vs.hash(state),
                Array::I64(vs) => vs.hash(state),
                Array::F64(vs) => {
                    for v in vs {
                        state.write_u64(v.to_bits());
                    }
                }
                Array::String(vs) => {
                    for v in vs {
                        v.as_str().hash(state);
                    }
                }
                _ => {}
            }
        }
        _ => {}
    }
}

// `Value` is only `PartialEq`; compare floats by bit pattern so the key type
// upholds the `Eq` contract for `NaN`.
fn value_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::F64(l), Value::F64(r)) => l.to_bits() == r.to_bits(),
        (Value::Array(Array::F64(l)), Value::Array(Array::F64(r))) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| a.to_bits() == b.to_bits())
        }
        _ => left == right,
    }
}
