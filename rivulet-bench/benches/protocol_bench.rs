//! Protocol encoding/decoding benchmarks.

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rivulet_protocol::request::SendMessages;
use rivulet_protocol::{
    CompressionAlgorithm, Identifier, MaxTopicSize, Message, MessageExpiry, Partitioning,
    PolledMessages, RequestFrame, ResponseFrame, Stream, Topic, WireDecode, WireEncode,
};

fn create_send_request(batch: usize, payload_size: usize) -> SendMessages {
    SendMessages {
        stream_id: Identifier::numeric(1),
        topic_id: Identifier::named("bench-topic").unwrap(),
        partitioning: Partitioning::partition_id(1),
        messages: (0..batch)
            .map(|i| Message::with_id(i as u128, Bytes::from("x".repeat(payload_size))))
            .collect(),
    }
}

fn create_polled(batch: usize, payload_size: usize) -> PolledMessages {
    PolledMessages {
        partition_id: 1,
        current_offset: batch as u64,
        messages: (0..batch)
            .map(|i| Message::with_id(i as u128, Bytes::from("x".repeat(payload_size))))
            .collect(),
    }
}

fn bench_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");

    for size in [100, 1000, 10000] {
        let payload = Bytes::from("x".repeat(size));
        let frame = RequestFrame::new(rivulet_protocol::Command::SendMessages, payload);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| black_box(frame.encode().unwrap()));
        });
    }

    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_frame_decode");

    for size in [100, 1000, 10000] {
        let frame = ResponseFrame::ok(Bytes::from("x".repeat(size)));
        let encoded = frame.encode().unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| {
                let mut buf = BytesMut::from(&encoded[..]);
                black_box(ResponseFrame::decode(&mut buf).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_send_messages_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_messages_encode");

    for batch in [1, 10, 100] {
        let request = create_send_request(batch, 256);

        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &request, |b, request| {
            b.iter(|| black_box(request.to_bytes().unwrap()));
        });
    }

    group.finish();
}

fn bench_polled_messages_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("polled_messages_decode");

    for batch in [1, 10, 100] {
        let encoded = create_polled(batch, 256).to_bytes().unwrap();

        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &encoded, |b, encoded| {
            b.iter(|| black_box(PolledMessages::from_bytes(encoded).unwrap()));
        });
    }

    group.finish();
}

fn bench_stream_list_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_list_decode");

    for count in [10, 100, 1000] {
        let mut buf = BytesMut::new();
        for id in 0..count {
            Stream {
                id,
                created_at: 1_700_000_000_000_000,
                topics_count: 1,
                size: 1024,
                messages_count: 10,
                name: format!("stream-{}", id),
            }
            .encode(&mut buf)
            .unwrap();
        }
        let encoded = buf.freeze();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &encoded, |b, encoded| {
            b.iter(|| black_box(rivulet_protocol::models::decode_streams(encoded).unwrap()));
        });
    }

    group.finish();
}

fn bench_topic_decode(c: &mut Criterion) {
    let topic = Topic {
        id: 1,
        created_at: 1_700_000_000_000_000,
        partitions_count: 12,
        message_expiry: MessageExpiry::NeverExpire,
        compression: CompressionAlgorithm::Gzip,
        max_topic_size: MaxTopicSize::Unlimited,
        replication_factor: 3,
        size: 4096,
        messages_count: 64,
        name: "bench-topic".to_string(),
    };
    let encoded = topic.to_bytes().unwrap();

    c.bench_function("topic_decode", |b| {
        b.iter(|| black_box(Topic::from_bytes(&encoded).unwrap()));
    });
}

fn bench_identifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("identifier");
    let numeric = Identifier::numeric(42);
    let named = Identifier::named("a-reasonably-long-stream-name").unwrap();

    group.bench_function("encode_numeric", |b| {
        b.iter(|| black_box(numeric.to_bytes().unwrap()));
    });
    group.bench_function("encode_name", |b| {
        b.iter(|| black_box(named.to_bytes().unwrap()));
    });

    let encoded = named.to_bytes().unwrap();
    group.bench_function("decode_name", |b| {
        b.iter(|| black_box(Identifier::from_bytes(&encoded).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_encode,
    bench_frame_decode,
    bench_send_messages_encode,
    bench_polled_messages_decode,
    bench_stream_list_decode,
    bench_topic_decode,
    bench_identifier,
);

criterion_main!(benches);
