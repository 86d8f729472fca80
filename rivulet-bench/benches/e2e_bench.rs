//! Client round-trip benchmarks against an in-process server.
//!
//! The server acknowledges every request with an empty success frame, so
//! these measure framing plus the session's exchange path.

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rivulet_client::{Client, ConnectionConfig};
use rivulet_protocol::{Identifier, Message, Partitioning, RequestFrame, ResponseFrame};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::runtime::Runtime;

fn setup_client(rt: &Runtime) -> Arc<Client> {
    let (transport, mut server) = tokio::io::duplex(1024 * 1024);

    rt.spawn(async move {
        let ack = ResponseFrame::empty().encode().unwrap();
        let mut buf = BytesMut::with_capacity(64 * 1024);
        loop {
            while let Ok(Some(_)) = RequestFrame::decode(&mut buf) {
                if server.write_all(&ack).await.is_err() {
                    return;
                }
            }
            match server.read_buf(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    });

    Arc::new(Client::with_transport(ConnectionConfig::default(), transport))
}

fn bench_ping_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let client = setup_client(&rt);

    let mut group = c.benchmark_group("e2e_ping");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ping", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(client.ping().await.unwrap()) });
    });

    group.finish();
}

fn bench_send_messages(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let client = setup_client(&rt);
    let stream_id = Identifier::numeric(1);
    let topic_id = Identifier::numeric(1);
    let partitioning = Partitioning::partition_id(1);

    let mut group = c.benchmark_group("e2e_send_messages");

    for batch in [1, 10, 100] {
        let messages: Vec<Message> = (0..batch)
            .map(|n| Message::new(Bytes::from(format!("{{\"msg\": {}}}", n))))
            .collect();

        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch),
            &messages,
            |b, messages| {
                b.to_async(&rt).iter(|| async {
                    client
                        .send_messages(&stream_id, &topic_id, &partitioning, messages)
                        .await
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_concurrent_requests(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let client = setup_client(&rt);

    let mut group = c.benchmark_group("e2e_concurrent");

    for concurrency in [1, 10, 50] {
        group.throughput(Throughput::Elements(concurrency as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, &concurrency| {
                b.to_async(&rt).iter(|| {
                    let client = client.clone();
                    async move {
                        let handles: Vec<_> = (0..concurrency)
                            .map(|_| {
                                let client = client.clone();
                                tokio::spawn(async move { client.ping().await })
                            })
                            .collect();
                        for handle in handles {
                            black_box(handle.await.unwrap().unwrap());
                        }
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_ping_latency,
    bench_send_messages,
    bench_concurrent_requests,
);

criterion_main!(benches);
