use capio::checksum::{checksum, ChecksumKind};
use capio::util::{copy_all, read_to_end};
use capio::{
    BasicOutput, BufferOptions, BufferedReader, BufferedWriter, ChecksumSlot, Close, CrcCapture,
    MemoryStream, PartialReader, ReverseBytes,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_checksums(c: &mut Criterion) {
    let data = vec![0x5Au8; 1024 * 1024];

    c.bench_function("crc32_1mb", |b| b.iter(|| checksum(ChecksumKind::Crc32, black_box(&data))));
    c.bench_function("crc24_1mb", |b| b.iter(|| checksum(ChecksumKind::Crc24, black_box(&data))));
}

fn bench_buffered(c: &mut Criterion) {
    let data = vec![42u8; 1024 * 1024];

    c.bench_function("buffered_write_1mb_small_writes", |b| {
        b.iter(|| {
            let mut w: BufferedWriter<_> = BufferedWriter::new(MemoryStream::<u64>::empty());
            for chunk in data.chunks(100) {
                w.write_all(black_box(chunk)).unwrap();
            }
            w.close().unwrap();
        })
    });

    c.bench_function("buffered_read_1mb_capped_transfers", |b| {
        b.iter(|| {
            let inner = MemoryStream::<u64>::new(data.clone()).with_max_transfer(4096);
            let mut r: BufferedReader<_> = BufferedReader::with_options(inner, BufferOptions::with_capacity(256 * 1024));
            black_box(read_to_end(&mut r).unwrap());
        })
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let data = vec![7u8; 1024 * 1024];

    c.bench_function("window_crc_copy_512kb", |b| {
        b.iter(|| {
            let window = PartialReader::with_start(MemoryStream::<u64>::new(data.clone()), 1024, Some(512 * 1024), false).unwrap();
            let mut capture = CrcCapture::new(window, ChecksumKind::Crc32, ChecksumSlot::<u64>::new(), false);
            let mut sink = MemoryStream::<u64>::empty();
            copy_all(&mut capture, &mut sink, None).unwrap();
            capture.close().unwrap();
        })
    });

    c.bench_function("reverse_1mb", |b| {
        b.iter(|| {
            let rev = ReverseBytes::new(MemoryStream::<u64>::new(data.clone()), 0, data.len() as u64, false).unwrap();
            black_box(rev.filter_map(|b| b.ok()).fold(0u64, |acc, b| acc + b as u64));
        })
    });
}

criterion_group!(benches, bench_checksums, bench_buffered, bench_pipeline);
criterion_main!(benches);
