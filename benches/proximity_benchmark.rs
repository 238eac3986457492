use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use geo::Point;
use radar_tracker::models::LocationRecord;
use radar_tracker::services::proximity::{latitude_band, rank_within};

const CANDIDATES: i64 = 10_000;

/// Deterministic spread of records over Europe (lat 35..70, lon -10..40).
fn synthetic_records() -> Vec<LocationRecord> {
    let now = Utc::now();
    (0..CANDIDATES)
        .map(|i| LocationRecord {
            id: i,
            user_id: i,
            latitude: 35.0 + (i * 7919 % 3500) as f64 / 100.0,
            longitude: -10.0 + (i * 104_729 % 5000) as f64 / 100.0,
            is_active: i % 10 != 0,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

fn benchmark_rank_within(c: &mut Criterion) {
    let records = synthetic_records();
    let berlin = Point::new(13.405, 52.52);

    let mut group = c.benchmark_group("proximity");

    group.bench_function("rank_all_300km", |b| {
        b.iter(|| rank_within(black_box(berlin), 300.0, records.iter().cloned()))
    });

    group.bench_function("band_then_rank_300km", |b| {
        b.iter(|| {
            let (min_lat, max_lat) = latitude_band(black_box(berlin), 300.0);
            let band = records
                .iter()
                .filter(|r| r.latitude >= min_lat && r.latitude <= max_lat)
                .cloned();
            rank_within(berlin, 300.0, band)
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_rank_within);
criterion_main!(benches);
