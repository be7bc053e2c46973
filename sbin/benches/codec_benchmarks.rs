use std::io::{Read, Write};

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use sbin::{Binary, ByteOrder, CustomCodec, Decoder, Encoder, from_bytes, shape_of, to_bytes};

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

#[derive(Default, Binary)]
struct Request {
    message_size: u32,
    header: Header,
    custom: Price,
}

#[derive(Default, Binary)]
struct Header {
    version: u8,
    correlation_id: i32,
    client_id: SizedString,
    #[sbin(len_of = "blob")]
    blob_size: u64,
    blob: Vec<u8>,
    array: [u8; 4],
}

#[derive(Default, Binary)]
struct SizedString {
    #[sbin(len_of = "data")]
    len: i32,
    data: String,
}

#[derive(Default, Binary)]
#[sbin(custom)]
struct Price {
    price: f64,
    active: bool,
}

impl CustomCodec for Price {
    fn encode(&self, writer: &mut dyn Write, order: ByteOrder) -> sbin::Result<()> {
        order.write(writer, self.price)?;
        order.write(writer, u8::from(self.active))
    }

    fn decode(&mut self, reader: &mut dyn Read, order: ByteOrder) -> sbin::Result<()> {
        self.price = order.read(reader)?;
        self.active = order.read::<u8>(reader)? != 0;
        Ok(())
    }
}

#[derive(Default, Binary)]
struct Sample {
    timestamp: u64,
    channel: u16,
    values: [f32; 8],
}

#[derive(Default, Binary)]
struct Batch {
    #[sbin(len_of = "samples")]
    count: u32,
    samples: Vec<Sample>,
}

fn request() -> Request {
    Request {
        message_size: 1,
        header: Header {
            version: 3,
            correlation_id: 2,
            client_id: SizedString {
                len: 5,
                data: "hello".to_string(),
            },
            blob_size: 10,
            blob: b"1234567890".to_vec(),
            array: [12, 42, 1, 0],
        },
        custom: Price {
            price: 124.5,
            active: true,
        },
    }
}

fn batch(count: usize) -> Batch {
    Batch {
        count: count as u32,
        samples: (0..count)
            .map(|i| Sample {
                timestamp: i as u64,
                channel: (i % 16) as u16,
                values: [i as f32; 8],
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_request_encode_decode(c: &mut Criterion) {
    let request = request();
    c.bench_function("request_encode_decode", |b| {
        b.iter(|| {
            let mut encoder = Encoder::new(Vec::with_capacity(64));
            encoder.encode(black_box(&request), ByteOrder::Big).unwrap();
            let bytes = encoder.into_inner();

            let mut decoded = Request::default();
            Decoder::new(&bytes[..])
                .decode(&mut decoded, ByteOrder::Big)
                .unwrap();
            black_box(decoded);
        });
    });
}

fn bench_request_decode_into(c: &mut Criterion) {
    let bytes = to_bytes(&request(), ByteOrder::Little).unwrap();
    c.bench_function("request_decode_into_reused", |b| {
        let mut decoded = Request::default();
        b.iter(|| {
            Decoder::new(black_box(&bytes[..]))
                .decode(&mut decoded, ByteOrder::Little)
                .unwrap();
        });
    });
}

fn bench_batch_encode_1k(c: &mut Criterion) {
    let batch = batch(1_000);
    c.bench_function("batch_encode_1k", |b| {
        b.iter(|| black_box(to_bytes(black_box(&batch), ByteOrder::Big).unwrap()));
    });
}

fn bench_batch_decode_1k(c: &mut Criterion) {
    let bytes = to_bytes(&batch(1_000), ByteOrder::Big).unwrap();
    c.bench_function("batch_decode_1k", |b| {
        b.iter(|| black_box(from_bytes::<Batch>(black_box(&bytes), ByteOrder::Big).unwrap()));
    });
}

fn bench_shape_lookup(c: &mut Criterion) {
    c.bench_function("shape_of_cached", |b| {
        b.iter_batched(
            || (),
            |()| black_box(shape_of::<Request>().unwrap()),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_request_encode_decode,
    bench_request_decode_into,
    bench_batch_encode_1k,
    bench_batch_decode_1k,
    bench_shape_lookup,
);
criterion_main!(benches);
