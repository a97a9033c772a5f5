use std::sync::{Arc, Mutex};

use opentelemetry::{Context, KeyValue};
use otel_metricstream::aggregation::{ExplicitBucketHistogramAggregation, SumAggregation};
use otel_metricstream::data::{MetricData, NumberDataPoint, Sum};
use otel_metricstream::stream::{
    AsynchronousMetricStream, MetricStream, StreamWriter, SynchronousMetricStream,
};
use otel_metricstream::{AttributeSet, FixedSizeReservoir, Temporality};

fn sum_stream(start_timestamp: u64) -> SynchronousMetricStream<SumAggregation> {
    SynchronousMetricStream::new(SumAggregation::new(false), start_timestamp)
}

fn as_sum(data: MetricData) -> Sum {
    match data {
        MetricData::Sum(sum) => sum,
        other => panic!("expected sum data, got {other:?}"),
    }
}

fn point<'a>(sum: &'a Sum, attributes: &[KeyValue]) -> &'a NumberDataPoint {
    let wanted = AttributeSet::from(attributes);
    sum.data_points
        .iter()
        .find(|point| AttributeSet::from(point.attributes.as_slice()) == wanted)
        .expect("data point for attribute set")
}

#[test]
fn synchronous_single_data_point() {
    let mut stream = sum_stream(3);
    let writer = StreamWriter::new(stream.writable());

    let delta = stream.register(Temporality::Delta);
    let cumulative = stream.register(Temporality::Cumulative);

    writer.record(5.0, &[], None, 4);
    assert_eq!(
        as_sum(stream.collect(delta, 5)),
        Sum {
            data_points: vec![NumberDataPoint {
                attributes: vec![],
                start_time: 3,
                time: 5,
                value: 5.0,
                exemplars: vec![],
            }],
            temporality: Temporality::Delta,
            is_monotonic: false,
        }
    );
    assert_eq!(
        as_sum(stream.collect(cumulative, 5)),
        Sum {
            data_points: vec![NumberDataPoint {
                attributes: vec![],
                start_time: 3,
                time: 5,
                value: 5.0,
                exemplars: vec![],
            }],
            temporality: Temporality::Cumulative,
            is_monotonic: false,
        }
    );

    writer.record(2.0, &[], None, 6);
    let collected = as_sum(stream.collect(delta, 8));
    assert_eq!(collected.temporality, Temporality::Delta);
    assert_eq!(point(&collected, &[]).value, 2.0);
    assert_eq!(point(&collected, &[]).start_time, 5);
    assert_eq!(point(&collected, &[]).time, 8);

    let collected = as_sum(stream.collect(cumulative, 8));
    assert_eq!(collected.temporality, Temporality::Cumulative);
    assert_eq!(point(&collected, &[]).value, 7.0);
    assert_eq!(point(&collected, &[]).start_time, 3);
    assert_eq!(point(&collected, &[]).time, 8);

    writer.record(-4.0, &[], None, 9);
    let collected = as_sum(stream.collect(delta, 12));
    assert_eq!(point(&collected, &[]).value, -4.0);
    assert_eq!(point(&collected, &[]).start_time, 8);
    assert_eq!(point(&collected, &[]).time, 12);

    let collected = as_sum(stream.collect(cumulative, 12));
    assert_eq!(point(&collected, &[]).value, 3.0);
    assert_eq!(point(&collected, &[]).start_time, 3);
    assert_eq!(point(&collected, &[]).time, 12);
}

#[test]
fn synchronous_multiple_data_points() {
    let mut stream = sum_stream(3);
    let writer = StreamWriter::new(stream.writable());

    let delta = stream.register(Temporality::Delta);
    let cumulative = stream.register(Temporality::Cumulative);

    writer.record(5.0, &[KeyValue::new("status", 300)], None, 4);
    writer.record(2.0, &[KeyValue::new("status", 400)], None, 4);
    let collected = as_sum(stream.collect(delta, 5));
    assert_eq!(point(&collected, &[KeyValue::new("status", 300)]).value, 5.0);
    assert_eq!(point(&collected, &[KeyValue::new("status", 400)]).value, 2.0);
    let collected = as_sum(stream.collect(cumulative, 5));
    assert_eq!(point(&collected, &[KeyValue::new("status", 300)]).value, 5.0);
    assert_eq!(point(&collected, &[KeyValue::new("status", 400)]).value, 2.0);

    writer.record(-3.0, &[KeyValue::new("status", 300)], None, 6);
    writer.record(5.0, &[KeyValue::new("status", 400)], None, 7);
    let collected = as_sum(stream.collect(delta, 8));
    assert_eq!(point(&collected, &[KeyValue::new("status", 300)]).value, -3.0);
    assert_eq!(point(&collected, &[KeyValue::new("status", 400)]).value, 5.0);
    assert_eq!(point(&collected, &[KeyValue::new("status", 300)]).start_time, 5);

    let collected = as_sum(stream.collect(cumulative, 8));
    assert_eq!(point(&collected, &[KeyValue::new("status", 300)]).value, 2.0);
    assert_eq!(point(&collected, &[KeyValue::new("status", 400)]).value, 7.0);
    assert_eq!(point(&collected, &[KeyValue::new("status", 300)]).start_time, 3);
}

#[test]
fn synchronous_temporality_and_timestamp() {
    let mut stream = sum_stream(3);
    assert_eq!(stream.temporality(), Temporality::Delta);
    assert_eq!(stream.timestamp(), 3);

    let reader = stream.register(Temporality::Delta);
    stream.collect(reader, 5);
    assert_eq!(stream.timestamp(), 5);
}

#[test]
fn synchronous_unregister_removes_reader() {
    let mut stream = sum_stream(3);
    let writer = StreamWriter::new(stream.writable());

    let cumulative = stream.register(Temporality::Cumulative);
    writer.record(5.0, &[], None, 4);
    stream.collect(cumulative, 5);
    stream.unregister(cumulative);

    writer.record(-5.0, &[], None, 6);
    let collected = as_sum(stream.collect(cumulative, 7));
    assert_eq!(collected.temporality, Temporality::Delta);
    assert!(collected.data_points.is_empty());
}

#[test]
fn synchronous_unregister_invalid_does_not_affect_reader() {
    let mut stream = sum_stream(3);
    let writer = StreamWriter::new(stream.writable());

    let cumulative = stream.register(Temporality::Cumulative);
    writer.record(5.0, &[], None, 4);
    stream.collect(cumulative, 5);
    stream.unregister(cumulative + 1);

    writer.record(-5.0, &[], None, 6);
    let collected = as_sum(stream.collect(cumulative, 7));
    assert_eq!(collected.temporality, Temporality::Cumulative);
    assert_eq!(point(&collected, &[]).value, 0.0);
    assert_eq!(point(&collected, &[]).start_time, 3);
    assert_eq!(point(&collected, &[]).time, 7);
}

#[test]
fn synchronous_reader_ids_are_reused() {
    let mut stream = sum_stream(0);

    let first = stream.register(Temporality::Delta);
    let second = stream.register(Temporality::Delta);
    assert_eq!((first, second), (0, 1));

    stream.unregister(first);
    assert_eq!(stream.register(Temporality::Delta), 0);
}

#[test]
fn synchronous_supports_more_readers_than_a_machine_word() {
    let mut stream = sum_stream(0);
    let writer = StreamWriter::new(stream.writable());

    let readers: Vec<_> = (0..70).map(|_| stream.register(Temporality::Delta)).collect();
    assert_eq!(readers[69], 69);

    writer.record(5.0, &[], None, 1);
    let collected = as_sum(stream.collect(readers[69], 2));
    assert_eq!(point(&collected, &[]).value, 5.0);

    // the other readers still have the window pending
    let collected = as_sum(stream.collect(readers[0], 3));
    assert_eq!(point(&collected, &[]).value, 5.0);
}

#[test]
fn delta_readers_at_different_cadences_observe_the_same_total() {
    let mut stream = sum_stream(0);
    let writer = StreamWriter::new(stream.writable());

    let fast = stream.register(Temporality::Delta);
    let slow = stream.register(Temporality::Delta);

    let mut fast_total = 0.0;
    let mut slow_total = 0.0;
    for tick in 1..=9u64 {
        writer.record(tick as f64, &[], None, tick);
        let collected = as_sum(stream.collect(fast, tick));
        fast_total += collected.data_points.iter().map(|p| p.value).sum::<f64>();
        if tick % 3 == 0 {
            let collected = as_sum(stream.collect(slow, tick));
            slow_total += collected.data_points.iter().map(|p| p.value).sum::<f64>();
        }
    }

    assert_eq!(fast_total, 45.0);
    assert_eq!(slow_total, 45.0);
}

#[test]
fn attribute_order_does_not_split_series() {
    let mut stream = sum_stream(0);
    let writer = StreamWriter::new(stream.writable());
    let reader = stream.register(Temporality::Delta);

    writer.record(
        5.0,
        &[KeyValue::new("a", 1), KeyValue::new("b", 2)],
        None,
        1,
    );
    writer.record(
        3.0,
        &[KeyValue::new("b", 2), KeyValue::new("a", 1)],
        None,
        1,
    );

    let collected = as_sum(stream.collect(reader, 2));
    assert_eq!(collected.data_points.len(), 1);
    assert_eq!(
        point(&collected, &[KeyValue::new("a", 1), KeyValue::new("b", 2)]).value,
        8.0
    );
}

#[test]
fn histogram_stream_buckets_boundary_values() {
    let aggregation =
        ExplicitBucketHistogramAggregation::new(vec![10.0, 20.0, 30.0]).expect("ascending");
    let mut stream = SynchronousMetricStream::new(aggregation, 0);
    let writer = StreamWriter::new(stream.writable());
    let reader = stream.register(Temporality::Cumulative);

    for value in [5.0, 20.0, 30.0, 35.0] {
        writer.record(value, &[], None, 1);
    }

    let collected = match stream.collect(reader, 2) {
        MetricData::Histogram(histogram) => histogram,
        other => panic!("expected histogram data, got {other:?}"),
    };
    assert_eq!(collected.temporality, Temporality::Cumulative);
    assert_eq!(collected.data_points.len(), 1);

    let point = &collected.data_points[0];
    assert_eq!(point.bucket_counts, vec![1, 1, 1, 1]);
    assert_eq!(point.count, 4);
    assert_eq!(point.sum, 90.0);
    assert_eq!(point.min, 5.0);
    assert_eq!(point.max, 35.0);
    assert_eq!(point.bounds, vec![10.0, 20.0, 30.0]);
}

#[test]
fn exemplars_are_attached_to_data_points() {
    let mut stream = SynchronousMetricStream::new(SumAggregation::new(false), 0)
        .with_exemplar_reservoir(FixedSizeReservoir::new(2));
    let writer = StreamWriter::new(stream.writable());
    let reader = stream.register(Temporality::Delta);

    writer.record(5.0, &[], Some(&Context::new()), 1);

    let collected = as_sum(stream.collect(reader, 2));
    let exemplars = &point(&collected, &[]).exemplars;
    assert_eq!(exemplars.len(), 1);
    assert_eq!(exemplars[0].value, 5.0);
    assert_eq!(exemplars[0].time, 1);
}

fn observable_stream(
    start_timestamp: u64,
) -> (
    AsynchronousMetricStream<SumAggregation>,
    Arc<Mutex<Vec<(Vec<KeyValue>, f64)>>>,
) {
    let observations: Arc<Mutex<Vec<(Vec<KeyValue>, f64)>>> = Arc::new(Mutex::new(Vec::new()));
    let reported = observations.clone();
    let stream = AsynchronousMetricStream::new(
        SumAggregation::new(false),
        move |observer| {
            for (attributes, value) in reported.lock().expect("lock is never poisoned").iter() {
                observer.observe(*value, attributes);
            }
        },
        start_timestamp,
    );
    (stream, observations)
}

fn observe(observations: &Arc<Mutex<Vec<(Vec<KeyValue>, f64)>>>, values: &[(&[KeyValue], f64)]) {
    let mut observations = observations.lock().expect("lock is never poisoned");
    observations.clear();
    observations.extend(
        values
            .iter()
            .map(|(attributes, value)| (attributes.to_vec(), *value)),
    );
}

#[test]
fn asynchronous_single_data_point() {
    let (mut stream, observations) = observable_stream(3);

    let delta = stream.register(Temporality::Delta);
    let cumulative = stream.register(Temporality::Cumulative);

    observe(&observations, &[(&[], 5.0)]);
    let collected = as_sum(stream.collect(delta, 5));
    assert_eq!(collected.temporality, Temporality::Delta);
    assert_eq!(
        *point(&collected, &[]),
        NumberDataPoint {
            attributes: vec![],
            start_time: 3,
            time: 5,
            value: 5.0,
            exemplars: vec![],
        }
    );
    let collected = as_sum(stream.collect(cumulative, 5));
    assert_eq!(collected.temporality, Temporality::Cumulative);
    assert_eq!(point(&collected, &[]).value, 5.0);
    assert_eq!(point(&collected, &[]).start_time, 3);

    observe(&observations, &[(&[], 7.0)]);
    let collected = as_sum(stream.collect(delta, 8));
    assert_eq!(point(&collected, &[]).value, 2.0);
    assert_eq!(point(&collected, &[]).start_time, 5);
    assert_eq!(point(&collected, &[]).time, 8);
    let collected = as_sum(stream.collect(cumulative, 8));
    assert_eq!(point(&collected, &[]).value, 7.0);
    assert_eq!(point(&collected, &[]).start_time, 3);

    observe(&observations, &[(&[], 3.0)]);
    let collected = as_sum(stream.collect(delta, 12));
    assert_eq!(point(&collected, &[]).value, -4.0);
    assert_eq!(point(&collected, &[]).start_time, 8);
    let collected = as_sum(stream.collect(cumulative, 12));
    assert_eq!(point(&collected, &[]).value, 3.0);
    assert_eq!(point(&collected, &[]).start_time, 3);
}

#[test]
fn asynchronous_multiple_data_points() {
    let (mut stream, observations) = observable_stream(3);

    let delta = stream.register(Temporality::Delta);
    let cumulative = stream.register(Temporality::Cumulative);

    let ok = [KeyValue::new("status", 300)];
    let err = [KeyValue::new("status", 400)];

    observe(&observations, &[(&ok, 5.0), (&err, 2.0)]);
    let collected = as_sum(stream.collect(delta, 5));
    assert_eq!(point(&collected, &ok).value, 5.0);
    assert_eq!(point(&collected, &err).value, 2.0);
    let collected = as_sum(stream.collect(cumulative, 5));
    assert_eq!(point(&collected, &ok).value, 5.0);
    assert_eq!(point(&collected, &err).value, 2.0);

    observe(&observations, &[(&ok, 2.0), (&err, 7.0)]);
    let collected = as_sum(stream.collect(delta, 8));
    assert_eq!(point(&collected, &ok).value, -3.0);
    assert_eq!(point(&collected, &err).value, 5.0);
    assert_eq!(point(&collected, &ok).start_time, 5);
    let collected = as_sum(stream.collect(cumulative, 8));
    assert_eq!(point(&collected, &ok).value, 2.0);
    assert_eq!(point(&collected, &err).value, 7.0);
    assert_eq!(point(&collected, &ok).start_time, 3);
}

#[test]
fn asynchronous_omitted_data_point_restarts_the_series() {
    let (mut stream, observations) = observable_stream(3);

    let delta = stream.register(Temporality::Delta);
    let cumulative = stream.register(Temporality::Cumulative);

    observe(&observations, &[(&[], 5.0)]);
    stream.collect(delta, 5);
    stream.collect(cumulative, 5);

    observe(&observations, &[]);
    assert!(as_sum(stream.collect(delta, 7)).data_points.is_empty());
    assert!(as_sum(stream.collect(cumulative, 7)).data_points.is_empty());

    observe(&observations, &[(&[], 3.0)]);
    let collected = as_sum(stream.collect(delta, 12));
    assert_eq!(point(&collected, &[]).value, 3.0);
    assert_eq!(point(&collected, &[]).start_time, 7);
    assert_eq!(point(&collected, &[]).time, 12);
    let collected = as_sum(stream.collect(cumulative, 12));
    assert_eq!(point(&collected, &[]).value, 3.0);
    assert_eq!(point(&collected, &[]).start_time, 3);
}

#[test]
fn asynchronous_temporality_and_timestamp() {
    let (mut stream, observations) = observable_stream(3);
    assert_eq!(stream.temporality(), Temporality::Cumulative);
    assert_eq!(stream.timestamp(), 3);

    observe(&observations, &[(&[], 5.0)]);
    let reader = stream.register(Temporality::Delta);
    stream.collect(reader, 5);
    assert_eq!(stream.timestamp(), 5);
}

#[test]
fn asynchronous_unregistered_reader_renders_cumulative() {
    let (mut stream, observations) = observable_stream(3);

    observe(&observations, &[(&[], 5.0)]);
    let delta = stream.register(Temporality::Delta);
    stream.collect(delta, 5);
    stream.unregister(delta);

    let collected = as_sum(stream.collect(delta, 7));
    assert_eq!(collected.temporality, Temporality::Cumulative);
    assert_eq!(point(&collected, &[]).value, 5.0);
    assert_eq!(point(&collected, &[]).start_time, 3);
}

#[test]
fn asynchronous_unregister_invalid_does_not_affect_reader() {
    let (mut stream, observations) = observable_stream(3);

    let delta = stream.register(Temporality::Delta);
    observe(&observations, &[(&[], 5.0)]);
    stream.collect(delta, 5);
    stream.unregister(delta + 1);

    let collected = as_sum(stream.collect(delta, 7));
    assert_eq!(collected.temporality, Temporality::Delta);
    assert_eq!(point(&collected, &[]).value, 0.0);
    assert_eq!(point(&collected, &[]).start_time, 5);
    assert_eq!(point(&collected, &[]).time, 7);
}

#[test]
fn streams_are_usable_as_trait_objects() {
    let (asynchronous, observations) = observable_stream(0);
    observe(&observations, &[(&[], 1.0)]);

    let mut streams: Vec<Box<dyn MetricStream>> = vec![
        Box::new(sum_stream(0)),
        Box::new(asynchronous),
    ];

    for stream in &mut streams {
        let reader = stream.register(Temporality::Cumulative);
        let data = stream.collect(reader, 1);
        assert!(matches!(data, MetricData::Sum(_)));
    }
}
