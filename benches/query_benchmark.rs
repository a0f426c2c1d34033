use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use std::sync::Arc;
use travelbase::api::params::{parse_filter, FilterKeys};
use travelbase::core::config::ReferenceTime;
use travelbase::core::types::{Gender, Location, User, Visit};
use travelbase::query::engine::QueryEngine;
use travelbase::query::filter::Filter;
use travelbase::storage::store::Store;

const NOW: i64 = 1_501_545_600;
const COUNTRIES: [&str; 5] = ["Russia", "Spain", "France", "Italy", "Japan"];

/// Helper to build a store with random users, locations and visits
fn create_store(users: u32, locations: u32, visits: u32) -> Arc<Store> {
    let mut rng = rand::thread_rng();
    let store = Store::new();

    for id in 1..=users {
        store
            .load_user(&User {
                id,
                email: format!("user{}@mail.ru", id),
                first_name: "Ivan".to_string(),
                last_name: "Ivanov".to_string(),
                gender: if rng.gen_bool(0.5) { Gender::Male } else { Gender::Female },
                birth_date: rng.gen_range(-600_000_000..900_000_000),
            })
            .unwrap();
    }

    for id in 1..=locations {
        store
            .load_location(&Location {
                id,
                place: format!("Place {}", id),
                country: COUNTRIES[rng.gen_range(0..COUNTRIES.len())].to_string(),
                city: format!("City {}", id % 100),
                distance: rng.gen_range(1..1000),
            })
            .unwrap();
    }

    for id in 1..=visits {
        store
            .load_visit(&Visit {
                id,
                location: rng.gen_range(1..=locations),
                user: rng.gen_range(1..=users),
                visited_at: rng.gen_range(946_684_800..1_420_070_400),
                mark: rng.gen_range(0..=5),
            })
            .unwrap();
    }

    Arc::new(store)
}

/// Benchmark AverageMark with and without user-side predicates
fn bench_average_mark(c: &mut Criterion) {
    let store = create_store(10_000, 1_000, 100_000);
    let engine = QueryEngine::new(store, ReferenceTime::new(NOW));

    let filters = [
        ("none", Filter::new()),
        ("dates", Filter { from_date: Some(1_000_000_000), to_date: Some(1_300_000_000), ..Filter::new() }),
        ("age_gender", Filter { from_age: Some(20), to_age: Some(50), gender: Some(Gender::Female), ..Filter::new() }),
    ];

    let mut group = c.benchmark_group("average_mark");
    for (name, filter) in filters.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), filter, |b, filter| {
            let mut location = 1;
            b.iter(|| {
                let result = engine.average_mark(black_box(location), filter).unwrap();
                location = location % 1_000 + 1;
                result
            });
        });
    }
    group.finish();
}

/// Benchmark VisitedPlaces including the sort
fn bench_visited_places(c: &mut Criterion) {
    let store = create_store(10_000, 1_000, 100_000);
    let engine = QueryEngine::new(store, ReferenceTime::new(NOW));

    let mut group = c.benchmark_group("visited_places");
    for (name, filter) in [
        ("none", Filter::new()),
        ("country_distance", Filter { to_distance: Some(500), ..Filter::new().with_country("spain") }),
    ] {
        group.bench_function(name, |b| {
            let mut user = 1;
            b.iter(|| {
                let result = engine.visited_places(black_box(user), &filter).unwrap();
                user = user % 10_000 + 1;
                result
            });
        });
    }
    group.finish();
}

/// Benchmark query string parsing
fn bench_parse_filter(c: &mut Criterion) {
    c.bench_function("parse_filter", |b| {
        b.iter(|| {
            parse_filter(black_box("fromDate=915148800&toAge=40&country=%D0%A0%D0%BE%D1%81%D1%81%D0%B8%D1%8F&gender=f"), FilterKeys::AverageMark)
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_average_mark, bench_visited_places, bench_parse_filter);
criterion_main!(benches);
