use chrono::{Duration, NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use studytrack_core::activity::{compute_activity, current_streak, longest_streak};

fn timestamps(count: usize, today: NaiveDate) -> Vec<chrono::DateTime<Utc>> {
    (0..count)
        .map(|i| {
            let day = today - Duration::days((i * 7 % 400) as i64);
            day.and_hms_opt((i % 24) as u32, 0, 0)
                .unwrap_or_default()
                .and_utc()
        })
        .collect()
}

fn bench_compute_activity(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_activity");
    let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

    for count in [0usize, 100, 10_000] {
        let input = timestamps(count, today);
        group.bench_function(format!("records={count}"), |b| {
            b.iter(|| compute_activity(black_box(input.iter().copied()), today, &Utc))
        });
    }

    group.finish();
}

fn bench_streaks(c: &mut Criterion) {
    let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
    let buckets = compute_activity(timestamps(1_000, today), today, &Utc);

    c.bench_function("streaks", |b| {
        b.iter(|| {
            (
                current_streak(black_box(&buckets)),
                longest_streak(black_box(&buckets)),
            )
        })
    });
}

criterion_group!(benches, bench_compute_activity, bench_streaks);
criterion_main!(benches);
