use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::BytesMut;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use papo_proto::{Frame, JsonCodec, Message};
use tokio_util::codec::{Decoder, Encoder};

fn encode_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("chat", |b| {
        let mut codec = JsonCodec::new();
        let msg = Message::Chat {
            from: Some("alice".to_string()),
            msg: Some("the quick brown fox jumps over the lazy dog".to_string()),
        };
        let mut buf = BytesMut::with_capacity(4096);
        b.iter(|| {
            buf.clear();
            codec.encode(&msg, &mut buf).unwrap();
        })
    });

    group.bench_function("file_chunk", |b| {
        let mut codec = JsonCodec::new();
        let msg = Message::FileData {
            name: Some("image.png".to_string()),
            data: Some(STANDARD.encode(vec![0u8; 32 * 1024])),
            from: Some("alice".to_string()),
            to: None,
            group: None,
        };
        let mut buf = BytesMut::with_capacity(64 * 1024);
        b.iter(|| {
            buf.clear();
            codec.encode(&msg, &mut buf).unwrap();
        })
    });

    group.finish();
}

fn decode_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let chat_line = "{\"type\":\"chat\",\"from\":\"alice\",\"msg\":\"the quick brown fox jumps over the lazy dog\"}\n";
    group.throughput(Throughput::Bytes(chat_line.len() as u64));
    group.bench_function("chat_line", |b| {
        let mut codec = JsonCodec::new();
        b.iter(|| {
            let mut buf = BytesMut::from(chat_line);
            match codec.decode(&mut buf).unwrap() {
                Some(Frame::Message(msg)) => msg,
                other => panic!("unexpected frame: {other:?}"),
            }
        })
    });

    let chunk_line = format!(
        "{{\"type\":\"file_data\",\"name\":\"image.png\",\"data\":\"{}\",\"from\":\"alice\"}}\n",
        STANDARD.encode(vec![0u8; 32 * 1024]),
    );
    group.throughput(Throughput::Bytes(chunk_line.len() as u64));
    group.bench_function("file_chunk_line", |b| {
        let mut codec = JsonCodec::new();
        b.iter(|| {
            let mut buf = BytesMut::from(chunk_line.as_str());
            match codec.decode(&mut buf).unwrap() {
                Some(Frame::Message(msg)) => msg,
                other => panic!("unexpected frame: {other:?}"),
            }
        })
    });

    group.finish();
}

criterion_group!(benches, encode_benchmark, decode_benchmark);
criterion_main!(benches);
