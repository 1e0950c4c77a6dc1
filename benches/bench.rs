use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use lazy_static::lazy_static;

use base252::{
    escape, escape_vec, max_encode_len, max_escape_len, unescape, Decoder,
    Encoder,
};

lazy_static! {
    static ref TEXT: Vec<u8> = {
        let base: &[u8] = b"THE SOFTWARE IS PROVIDED \"AS IS\" AND THE AUTHOR \
            DISCLAIMS ALL WARRANTIES WITH REGARD TO THIS SOFTWARE INCLUDING \
            ALL IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS. C:\\path\\";
        base.iter().cycle().take(64 * 1024).cloned().collect()
    };
    static ref NOISE: Vec<u8> = {
        let mut x: u32 = 0x9E37_79B9;
        (0..64 * 1024)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x as u8
            })
            .collect()
    };
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for &(name, src) in &[("text", &*TEXT), ("noise", &*NOISE)] {
        let mut dst = vec![0; max_encode_len(src.len())];
        let mut enc = Encoder::new();
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| enc.encode(black_box(src), &mut dst).unwrap())
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for &(name, src) in &[("text", &*TEXT), ("noise", &*NOISE)] {
        let text = Encoder::new().encode_vec(src).unwrap();
        let mut dst = vec![0; src.len() + 1];
        let mut dec = Decoder::new();
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| dec.decode(black_box(&text), &mut dst).unwrap())
        });
    }
    group.finish();
}

fn bench_escape(c: &mut Criterion) {
    let mut group = c.benchmark_group("escape");
    let src = &*NOISE;
    let text = escape_vec(src);
    let mut escaped = vec![0; max_escape_len(src.len())];
    let mut unescaped = vec![0; src.len()];
    group.throughput(Throughput::Bytes(src.len() as u64));
    group.bench_function("escape", |b| {
        b.iter(|| escape(black_box(src), &mut escaped))
    });
    group.bench_function("unescape", |b| {
        b.iter(|| unescape(black_box(&text), &mut unescaped).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_escape);
criterion_main!(benches);
