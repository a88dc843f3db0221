//! Benchmark base-layer drawing, icons and cropping.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use chitra_map::config::ColorSection;
use chitra_map::core::{CompressedRun, LayerKind, MapLayer, RobotPosition};
use chitra_map::draw::{self, RasterBuffer};
use chitra_map::render::{BaseLayerCache, draw_base, draw_dynamic};
use chitra_map::{FormatTag, ImageSize, MapDocument, Point, RenderContext};

/// Square map with a room grid and a wall border, `cells` grid cells wide.
fn create_document(cells: u32) -> MapDocument {
    let mut doc = MapDocument::new(FormatTag::Hypfer, ImageSize::new(cells * 5, cells * 5), 5);
    let floor = (1..cells - 1)
        .map(|y| CompressedRun::new(1, y, cells - 2))
        .collect();
    doc.push_layer(MapLayer::new(LayerKind::Floor, floor));

    let rooms = 4;
    let side = cells / rooms;
    for i in 0..rooms {
        let runs = (i * side + 2..(i + 1) * side - 2)
            .map(|y| CompressedRun::new(2, y, side - 4))
            .collect();
        let mut layer = MapLayer::new(LayerKind::Segment, runs);
        layer.segment_id = Some(i + 16);
        layer.room_slot = Some(i as usize);
        doc.push_layer(layer);
    }

    let mut walls = vec![
        CompressedRun::new(0, 0, cells),
        CompressedRun::new(0, cells - 1, cells),
    ];
    walls.extend((1..cells - 1).flat_map(|y| {
        [CompressedRun::new(0, y, 1), CompressedRun::new(cells - 1, y, 1)]
    }));
    doc.push_layer(MapLayer::new(LayerKind::Wall, walls));

    let c = (cells * 5 / 2) as i32;
    doc.robot_position = Some(RobotPosition {
        x: c,
        y: c,
        angle: 30.0,
    });
    doc.paths.push(
        (0..200)
            .map(|i| Point::new(c - 200 + 2 * i, c + ((i % 40) - 20) * 3))
            .collect(),
    );
    doc
}

fn bench_draw_base(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_base");
    let colors = ColorSection::default();

    for cells in [128u32, 512, 1024].iter() {
        let doc = create_document(*cells);
        group.bench_with_input(BenchmarkId::from_parameter(cells), cells, |b, _| {
            b.iter(|| black_box(draw_base(black_box(&doc), &colors)))
        });
    }

    group.finish();
}

fn bench_cached_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_frame");
    let ctx = RenderContext::default();

    for cells in [128u32, 512].iter() {
        let doc = create_document(*cells);
        let mut cache = BaseLayerCache::new();
        group.bench_with_input(BenchmarkId::from_parameter(cells), cells, |b, _| {
            b.iter(|| {
                let (mut image, n) = cache.frame(&doc, &ctx.colors);
                draw_dynamic(&mut image, &doc, &ctx);
                black_box((image, n))
            })
        });
    }

    group.finish();
}

fn bench_robot_icon(c: &mut Criterion) {
    let mut buf = RasterBuffer::new(400, 400, [0, 125, 255, 255]);
    c.bench_function("robot_icon", |b| {
        b.iter(|| draw::robot(&mut buf, black_box(200), black_box(200), 45.0, [255, 255, 204, 255]))
    });
}

fn bench_content_bounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_bounds");
    let colors = ColorSection::default();

    for cells in [512u32, 1024].iter() {
        let image = draw_base(&create_document(*cells), &colors);
        group.bench_with_input(BenchmarkId::from_parameter(cells), cells, |b, _| {
            b.iter(|| black_box(image.content_bounds(colors.background)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_draw_base,
    bench_cached_frame,
    bench_robot_icon,
    bench_content_bounds
);
criterion_main!(benches);
