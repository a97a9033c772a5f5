use std::sync::Arc;

use opentelemetry::{Context, KeyValue};

use super::WritableMetricStream;

/// The write path of an instrument bound to a single stream.
///
/// Resolves the ambient [`Context`] when the caller does not supply one, then
/// delegates to the stream.
pub struct StreamWriter {
    stream: Arc<dyn WritableMetricStream>,
}

impl StreamWriter {
    pub fn new(stream: Arc<dyn WritableMetricStream>) -> Self {
        StreamWriter { stream }
    }

    /// Records one measurement.
    pub fn record(
        &self,
        value: f64,
        attributes: &[KeyValue],
        context: Option<&Context>,
        timestamp: u64,
    ) {
        match context {
            Some(context) => self.stream.record(value, attributes, context, timestamp),
            None => self
                .stream
                .record(value, attributes, &Context::current(), timestamp),
        }
    }
}

/// The write path of an instrument bound to several streams; the context is
/// resolved once and the measurement fanned out to each of them.
pub struct MultiStreamWriter {
    streams: Vec<Arc<dyn WritableMetricStream>>,
}

impl MultiStreamWriter {
    pub fn new(streams: Vec<Arc<dyn WritableMetricStream>>) -> Self {
        MultiStreamWriter { streams }
    }

    /// Records one measurement to every bound stream.
    pub fn record(
        &self,
        value: f64,
        attributes: &[KeyValue],
        context: Option<&Context>,
        timestamp: u64,
    ) {
        let resolved;
        let context = match context {
            Some(context) => context,
            None => {
                resolved = Context::current();
                &resolved
            }
        };

        for stream in &self.streams {
            stream.record(value, attributes, context, timestamp);
        }
    }
}
