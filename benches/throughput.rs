//! Throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use nimo_modem::core::codec::{decode_payload, encode_payload};
use nimo_modem::{CrcXmodem, DataFormat, NmeaLocationDecoder};

fn codec_benchmark(c: &mut Criterion) {
    let data: Vec<u8> = (0..1024).map(|i| (i % 256) as u8).collect();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for format in [DataFormat::Text, DataFormat::Hex, DataFormat::Base64] {
        let encoded = encode_payload(format, &data);
        group.bench_function(format!("{format:?}_decode"), |b| {
            b.iter(|| {
                let decoded = decode_payload(format, black_box(&encoded)).unwrap();
                black_box(decoded)
            })
        });
    }

    group.finish();
}

fn crc_benchmark(c: &mut Criterion) {
    let command = "AT%MGRT=\"bench\",4,128.1,3,SGVsbG8gV29ybGQhIEhlbGxvIFdvcmxkIQ==";
    let crc = CrcXmodem::new();

    let mut group = c.benchmark_group("crc");
    group.throughput(Throughput::Bytes(command.len() as u64));

    group.bench_function("apply", |b| {
        b.iter(|| black_box(crc.apply(black_box(command))))
    });

    group.bench_function("validate", |b| {
        let framed = crc.apply(command);
        b.iter(|| black_box(crc.validate(black_box(&framed))))
    });

    group.finish();
}

fn nmea_benchmark(c: &mut Criterion) {
    let batch = "$GPRMC,005249.000,A,4517.1082,N,07550.9113,W,0.24,0.00,231123,,,A,V*0B\n\
                 $GPGGA,005249.000,4517.1082,N,07550.9113,W,1,06,1.7,128.5,M,-34.3,M,,0000*62\n\
                 $GPGSA,A,3,02,07,21,14,08,27,,,,,,,2.8,1.7,2.2,1*2D\n";
    let decoder = NmeaLocationDecoder::new();

    let mut group = c.benchmark_group("nmea");
    group.throughput(Throughput::Bytes(batch.len() as u64));

    group.bench_function("decode_batch", |b| {
        b.iter(|| black_box(decoder.decode_text(black_box(batch))))
    });

    group.finish();
}

criterion_group!(benches, codec_benchmark, crc_benchmark, nmea_benchmark);
criterion_main!(benches);
