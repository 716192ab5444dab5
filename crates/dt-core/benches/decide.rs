//! Decision benchmarks
//!
//! Run with: cargo bench -p dt-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use dt_core::matcher::match_first;
use dt_core::url::parse_url;
use dt_core::{Engine, Moment, NavigationEvent, Settings};

const NOW: Moment = Moment {
    epoch_ms: 1_791_972_000_000,
    weekday: 3,
    minute_of_day: 600,
};

fn generate_settings(triggers: usize) -> Settings {
    Settings {
        trigger_sites: (0..triggers).map(|i| format!("site{}.example.com/path{}", i, i % 7)).collect(),
        destinations: (0..16).map(|i| format!("dest{}.org", i)).collect(),
        whitelist: (0..triggers / 10).map(|i| format!("site{}.example.com/ok", i)).collect(),
        ..Default::default()
    }
}

fn matching_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("trigger_matching");

    for size in [10usize, 100, 1000] {
        let settings = generate_settings(size);
        // Worst case: nothing matches, full scan
        let miss = parse_url("https://unrelated.net/some/long/path?q=1").unwrap();
        group.bench_with_input(BenchmarkId::new("miss", size), &settings, |b, s| {
            b.iter(|| match_first(black_box(&miss), &s.trigger_sites))
        });

        let last = parse_url(&format!("https://site{}.example.com/path{}", size - 1, (size - 1) % 7)).unwrap();
        group.bench_with_input(BenchmarkId::new("last", size), &settings, |b, s| {
            b.iter(|| match_first(black_box(&last), &s.trigger_sites))
        });
    }

    group.finish();
}

fn decision_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");
    let settings = generate_settings(100);
    let mut rng = SmallRng::seed_from_u64(1);
    let engine = Engine::new();

    let hit = NavigationEvent::main_frame(1, "https://site42.example.com/path0/article");
    group.bench_function("redirect", |b| {
        b.iter(|| {
            let outcome = engine.decide(black_box(&hit), &settings, &NOW, &mut rng);
            engine.guard().clear();
            outcome
        })
    });

    let miss = NavigationEvent::main_frame(1, "https://unrelated.net/");
    group.bench_function("allow", |b| {
        b.iter(|| engine.decide(black_box(&miss), &settings, &NOW, &mut rng))
    });

    group.finish();
}

criterion_group!(benches, matching_benchmarks, decision_benchmarks);
criterion_main!(benches);
