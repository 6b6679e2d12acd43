use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use homestay_search::persistence::bookings_key;
use homestay_search::{
    apply_patch, to_filter_request, CriteriaPatch, ManualClock, MemoryStore, ResultCache,
    SearchCriteria, StayDates,
};
use rand::{seq::SliceRandom, thread_rng, Rng};
use std::sync::Arc;

fn random_patches(count: usize) -> Vec<CriteriaPatch> {
    let mut rng = thread_rng();
    let locations = ["Hà Nội", "Đà Lạt", "Huế", "Hội An", "Sa Pa"];
    let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

    (0..count)
        .map(|_| match rng.gen_range(0..5) {
            0 => CriteriaPatch::new().location(*locations.choose(&mut rng).unwrap()),
            1 => {
                let check_in = start + Duration::days(rng.gen_range(0..60));
                check_in_patch(check_in, rng.gen_range(1..=30))
            }
            2 => CriteriaPatch::new()
                .adults(rng.gen_range(0..12))
                .children(rng.gen_range(0..7)),
            3 => CriteriaPatch::new().price_from(rng.gen_range(0.0..2_000_000.0)),
            _ => CriteriaPatch::new()
                .price_to(rng.gen_range(0.0..2_000_000.0))
                .rating_stars(rng.gen_range(1..=5)),
        })
        .collect()
}

fn check_in_patch(check_in: NaiveDate, nights: i64) -> CriteriaPatch {
    CriteriaPatch::new().stay(check_in, check_in + Duration::days(nights))
}

pub fn composer_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("criteria_composer");
    let stay = StayDates::new(
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
    )
    .unwrap();
    let initial = SearchCriteria::new("Hà Nội", stay);

    for count in [10, 100, 1000].iter() {
        let patches = random_patches(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &patches, |b, patches| {
            b.iter(|| {
                let mut criteria = initial.clone();
                for patch in patches {
                    if let Ok(next) = apply_patch(&criteria, patch) {
                        criteria = next;
                    }
                }
                black_box(to_filter_request(&criteria))
            });
        });
    }

    group.finish();
}

pub fn result_cache_benchmark(c: &mut Criterion) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()));
    let cache: ResultCache<Vec<u32>> = ResultCache::new(store, clock, Duration::minutes(5));
    let keys: Vec<String> = (0..100).map(|i| bookings_key(&i.to_string())).collect();

    tokio_test::block_on(async {
        for key in &keys {
            cache.set(key, (0..50).collect()).await;
        }
    });

    c.bench_function("result_cache_hit", |b| {
        let mut rng = thread_rng();
        b.iter(|| {
            let key = keys.choose(&mut rng).unwrap();
            black_box(tokio_test::block_on(cache.get(key)))
        });
    });
}

criterion_group!(benches, composer_benchmark, result_cache_benchmark);
criterion_main!(benches);
