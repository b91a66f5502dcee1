use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use protodyn::leb128::LebCodec;

fn encoded(values: &[u64]) -> Vec<Vec<u8>> {
    values
        .iter()
        .map(|value| {
            let mut buffer = Vec::with_capacity(10);
            value.encode_leb128(&mut buffer);
            buffer
        })
        .collect()
}

fn leb128_decoding(c: &mut Criterion) {
    let values = encoded(&[
        1,
        0x0000_0000_0000_0080,
        0x0000_0000_0000_8000,
        0x0000_0000_0080_0000,
        0x0000_0000_8000_0000,
        0x0000_8000_0000_0000,
        0x8000_0000_0000_0000,
    ]);

    let mut group = c.benchmark_group("leb128_decoding");
    for data in &values {
        group.bench_with_input(BenchmarkId::new("protodyn", data.len()), data, |b, data| {
            b.iter(|| std::hint::black_box(u64::decode_leb128(data)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("leb128", data.len()), data, |b, data| {
            b.iter(|| {
                let value = leb128::read::unsigned(&mut &data[..]);
                std::hint::black_box(value).unwrap()
            })
        });
        group.bench_with_input(BenchmarkId::new("prost", data.len()), data, |b, data| {
            b.iter(|| {
                let value = prost::encoding::decode_varint(&mut &data[..]);
                std::hint::black_box(value).unwrap()
            })
        });
    }
}

fn leb128_encoding(c: &mut Criterion) {
    let values: Vec<u64> = vec![1, 300, 0x0000_0000_8000_0000, u64::MAX];

    let mut group = c.benchmark_group("leb128_encoding");
    group.bench_with_input(BenchmarkId::new("protodyn", values.len()), &values, |b, values| {
        let mut buffer = Vec::with_capacity(64);
        b.iter(|| {
            buffer.clear();
            for value in values {
                value.encode_leb128(&mut buffer);
            }
            std::hint::black_box(&buffer);
        })
    });
    group.bench_with_input(BenchmarkId::new("prost", values.len()), &values, |b, values| {
        let mut buffer = Vec::with_capacity(64);
        b.iter(|| {
            buffer.clear();
            for value in values {
                prost::encoding::encode_varint(*value, &mut buffer);
            }
            std::hint::black_box(&buffer);
        })
    });
}

criterion_group!(varints, leb128_decoding, leb128_encoding);

criterion_main!(varints);
