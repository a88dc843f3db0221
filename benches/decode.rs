//! Benchmark payload decompression and parsing.

use std::io::Write;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use chitra_map::config::DecompressSection;
use chitra_map::decompress::{MapDecoder, PayloadDecoder};
use chitra_map::{DecompressionManager, FormatTag, JsonMapExtractor};
use serde_json::{Value, json};

fn create_map(rows: u32) -> Value {
    let pixels: Vec<u32> = (0..rows).flat_map(|y| [y % 50, y, 40 + y % 30]).collect();
    let segments: Vec<Value> = (0..8)
        .map(|i| {
            json!({
                "__class": "MapLayer",
                "type": "segment",
                "compressedPixels": [i * 10, i * 10, 8, i * 10, i * 10 + 1, 8],
                "metaData": { "segmentId": (i + 16).to_string(), "name": format!("Room {i}") }
            })
        })
        .collect();
    let path: Vec<i32> = (0..1000).flat_map(|i| [i % 400, i / 3]).collect();
    json!({
        "size": { "x": 2000, "y": 2000 },
        "pixelSize": 5,
        "layers": [{ "__class": "MapLayer", "type": "floor", "compressedPixels": pixels }],
        "entities": [
            { "__class": "PathMapEntity", "type": "path", "points": path },
            { "__class": "PointMapEntity", "type": "robot_position",
              "points": [400, 300], "metaData": { "angle": 90 } }
        ],
        "children": segments
    })
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_hypfer");

    for rows in [100u32, 1000, 5000].iter() {
        let payload = zlib(create_map(*rows).to_string().as_bytes());
        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, _| {
            b.iter(|| black_box(MapDecoder.decode(black_box(&payload), FormatTag::Hypfer)))
        });
    }

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_hypfer");

    for rows in [1000u32, 5000].iter() {
        let map = create_map(*rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, _| {
            b.iter(|| black_box(JsonMapExtractor::extract(black_box(&map))))
        });
    }

    group.finish();
}

fn bench_cached_decompress(c: &mut Criterion) {
    let config = DecompressSection {
        cache_min_size: 0,
        ..Default::default()
    };
    let manager = DecompressionManager::new(config);
    let payload = zlib(create_map(5000).to_string().as_bytes());
    let topic = "valetudo/bench/MapData/map-data";
    let _ = manager.decompress(topic, &payload, FormatTag::Hypfer);

    c.bench_function("decompress_cache_hit", |b| {
        b.iter(|| black_box(manager.decompress(topic, black_box(&payload), FormatTag::Hypfer)))
    });
}

criterion_group!(benches, bench_decode, bench_extract, bench_cached_decompress);
criterion_main!(benches);
