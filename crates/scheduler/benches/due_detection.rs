use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use fleetmx_fleet::{Asset, Fleet, PolicyCatalog};
use fleetmx_scheduler::Scheduler;

fn build_fleet(size: usize) -> Fleet {
    let catalog = PolicyCatalog::standard();
    let today = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap().date_naive();
    let mut fleet = Fleet::new();
    for i in 0..size {
        let asset = fleet
            .add(Asset::new(format!("TR-{i:05}"), "Tracto").unwrap())
            .unwrap();
        for policy in catalog.iter() {
            asset
                .register_component(policy.clone(), today, None, None, None)
                .unwrap();
        }
        // Every other asset crosses the hours interval.
        asset.update_horometro(if i % 2 == 0 { 600.0 } else { 100.0 }).unwrap();
        asset.update_odometro(1_000.0).unwrap();
    }
    fleet
}

fn bench_check_due(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_due_maintenance");
    let now = Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap();

    for size in [10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("fresh_scan", size), &size, |b, &size| {
            let fleet = build_fleet(size);
            b.iter(|| {
                let mut fleet = fleet.clone();
                let mut orders = Vec::new();
                let created = Scheduler::new(&mut fleet, &mut orders).check_due_maintenance(now);
                black_box(created.len())
            });
        });

        let rescan = BenchmarkId::new("rescan_with_open_orders", size);
        group.bench_with_input(rescan, &size, |b, &size| {
            let mut fleet = build_fleet(size);
            let mut orders = Vec::new();
            Scheduler::new(&mut fleet, &mut orders).check_due_maintenance(now);
            b.iter(|| {
                let created = Scheduler::new(&mut fleet, &mut orders).check_due_maintenance(now);
                black_box(created.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_check_due);
criterion_main!(benches);
