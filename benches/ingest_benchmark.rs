use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use datamonitor::core::{Event, Reading};
use datamonitor::storage::Db;

fn sample_event(i: usize) -> Event {
    let mut event = Event::new(&format!("evt-{}", i), "Thermostat", "HVAC", i as i64, i as i64)
        .with_tag("site", "north");
    for r in 0..3 {
        event = event.with_reading(Reading::simple(
            &format!("rd-{}-{}", i, r),
            "Thermostat",
            "Temperature",
            "HVAC",
            "Float64",
            "21.5",
        ));
    }
    event
}

/// Steady-state ingest into a full store, with and without an active filter
fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");

    for buffer_size in [100usize, 1_000, 10_000] {
        for filter in ["", "evt-1"] {
            let db = Db::new(buffer_size);
            db.update_filter(filter);
            for i in 0..buffer_size {
                db.ingest(&sample_event(i));
            }

            let label = if filter.is_empty() { "unfiltered" } else { "filtered" };
            let mut i = buffer_size;
            group.bench_with_input(BenchmarkId::new(label, buffer_size), &db, |b, db| {
                b.iter(|| {
                    i += 1;
                    db.ingest(black_box(&sample_event(i)));
                });
            });
        }
    }

    group.finish();
}

fn bench_update_filter(c: &mut Criterion) {
    let db = Db::new(10_000);
    for i in 0..10_000 {
        db.ingest(&sample_event(i));
    }

    c.bench_function("update_filter_10k", |b| {
        b.iter(|| db.update_filter(black_box("evt-99")));
    });
}

criterion_group!(benches, bench_ingest, bench_update_filter);
criterion_main!(benches);
