use std::sync::Arc;

use travelbase::core::config::ReferenceTime;
use travelbase::core::error::ErrorKind;
use travelbase::core::types::{Gender, Location, User, Visit};
use travelbase::query::engine::{round_to_5, QueryEngine};
use travelbase::query::filter::Filter;
use travelbase::storage::patch::VisitPatch;
use travelbase::storage::store::Store;

// 2017-08-01 00:00:00 UTC
const NOW: i64 = 1_501_545_600;
// 1987-08-01 00:00:00 UTC, exactly 30 years before NOW
const THIRTY_YEARS_AGO: i64 = 554_774_400;

fn user(id: u32, gender: Gender, birth_date: i64) -> User {
    User {
        id,
        email: format!("user{}@mail.ru", id),
        first_name: "Ivan".to_string(),
        last_name: "Ivanov".to_string(),
        gender,
        birth_date,
    }
}

fn location(id: u32, place: &str, country: &str, distance: u32) -> Location {
    Location {
        id,
        place: place.to_string(),
        country: country.to_string(),
        city: "City".to_string(),
        distance,
    }
}

fn visit(id: u32, user: u32, location: u32, visited_at: i64, mark: u8) -> Visit {
    Visit { id, location, user, visited_at, mark }
}

fn engine(store: Store) -> QueryEngine {
    QueryEngine::new(Arc::new(store), ReferenceTime::new(NOW))
}

fn fixture() -> QueryEngine {
    let store = Store::new();
    store.load_user(&user(1, Gender::Male, THIRTY_YEARS_AGO - 1)).unwrap();
    store.load_user(&user(2, Gender::Female, THIRTY_YEARS_AGO + 86_400)).unwrap();
    store.load_location(&location(10, "Tower", "Russia", 5)).unwrap();
    store.load_location(&location(11, "Beach", "Spain", 50)).unwrap();
    store.load_location(&location(12, "Empty", "Spain", 1)).unwrap();

    store.load_visit(&visit(100, 1, 10, 300, 5)).unwrap();
    store.load_visit(&visit(101, 1, 11, 100, 2)).unwrap();
    store.load_visit(&visit(102, 1, 10, 200, 4)).unwrap();
    store.load_visit(&visit(103, 2, 10, 250, 1)).unwrap();
    engine(store)
}

#[test]
fn test_visited_places_sorted_by_visit_time() {
    let engine = fixture();

    let places = engine.visited_places(1, &Filter::new()).unwrap();
    let times: Vec<i64> = places.visits.iter().map(|p| p.visited_at).collect();
    assert_eq!(times, vec![100, 200, 300]);
    assert_eq!(places.visits[0].place, "Beach");
    assert_eq!(places.visits[0].mark, 2);
}

#[test]
fn test_visited_places_filters_are_exclusive() {
    let engine = fixture();

    let filter = Filter { from_date: Some(100), to_date: Some(300), ..Filter::new() };
    let places = engine.visited_places(1, &filter).unwrap();
    assert_eq!(places.visits.len(), 1);
    assert_eq!(places.visits[0].visited_at, 200);

    let filter = Filter { to_distance: Some(50), ..Filter::new() };
    let places = engine.visited_places(1, &filter).unwrap();
    assert!(places.visits.iter().all(|p| p.place == "Tower"));
    assert_eq!(places.visits.len(), 2);
}

#[test]
fn test_visited_places_country_ignores_case() {
    let engine = fixture();

    let places = engine.visited_places(1, &Filter::new().with_country("SPAIN")).unwrap();
    assert_eq!(places.visits.len(), 1);
    assert_eq!(places.visits[0].place, "Beach");
}

#[test]
fn test_visited_places_empty_and_missing_user() {
    let engine = fixture();

    let filter = Filter::new().with_country("Atlantis");
    assert!(engine.visited_places(1, &filter).unwrap().visits.is_empty());

    let err = engine.visited_places(99, &Filter::new()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn test_average_mark_rounds_to_five_digits() {
    let engine = fixture();

    // (5 + 4 + 1) / 3
    let average = engine.average_mark(10, &Filter::new()).unwrap();
    assert_eq!(average.avg, 3.33333);
}

#[test]
fn test_average_mark_zero_without_matches() {
    let engine = fixture();

    assert_eq!(engine.average_mark(12, &Filter::new()).unwrap().avg, 0.0);

    let filter = Filter { from_date: Some(10_000), ..Filter::new() };
    assert_eq!(engine.average_mark(10, &filter).unwrap().avg, 0.0);

    let err = engine.average_mark(99, &Filter::new()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn test_average_mark_by_gender() {
    let engine = fixture();

    let filter = Filter { gender: Some(Gender::Male), ..Filter::new() };
    assert_eq!(engine.average_mark(10, &filter).unwrap().avg, 4.5);

    let filter = Filter { gender: Some(Gender::Female), ..Filter::new() };
    assert_eq!(engine.average_mark(10, &filter).unwrap().avg, 1.0);
}

#[test]
fn test_average_mark_age_boundaries() {
    let engine = fixture();

    // User 1 was born one second before the 30-year cutoff, user 2 after it
    let filter = Filter { from_age: Some(30), ..Filter::new() };
    assert_eq!(engine.average_mark(10, &filter).unwrap().avg, 4.5);

    let filter = Filter { to_age: Some(30), ..Filter::new() };
    assert_eq!(engine.average_mark(10, &filter).unwrap().avg, 1.0);

    let filter = Filter { from_age: Some(30), to_age: Some(30), ..Filter::new() };
    assert_eq!(engine.average_mark(10, &filter).unwrap().avg, 0.0);
}

#[test]
fn test_reference_years_before_is_calendar_aware() {
    let reference = ReferenceTime::new(NOW);
    assert_eq!(reference.years_before(30), THIRTY_YEARS_AGO);
    assert_eq!(reference.years_before(0), NOW);
}

#[test]
fn test_years_before_leap_day_clamps_to_feb_28() {
    // 2020-02-29 00:00:00 UTC
    let reference = ReferenceTime::new(1_582_934_400);
    // 2019-02-28 00:00:00 UTC
    assert_eq!(reference.years_before(1), 1_551_312_000);
    // 2016-02-29 00:00:00 UTC
    assert_eq!(reference.years_before(4), 1_456_704_000);
}

#[test]
fn test_rehomed_visit_counts_at_new_location() {
    let store = Store::new();
    store.load_user(&user(1, Gender::Male, 0)).unwrap();
    store.load_location(&location(10, "Tower", "Russia", 5)).unwrap();
    store.load_location(&location(11, "Beach", "Spain", 50)).unwrap();
    store.load_visit(&visit(100, 1, 10, 300, 4)).unwrap();
    let store = Arc::new(store);
    let engine = QueryEngine::new(store.clone(), ReferenceTime::new(NOW));

    let patch = VisitPatch { location: Some(11), ..Default::default() };
    store.update_visit(100, &patch).unwrap();

    assert_eq!(engine.average_mark(10, &Filter::new()).unwrap().avg, 0.0);
    assert_eq!(engine.average_mark(11, &Filter::new()).unwrap().avg, 4.0);

    let places = engine.visited_places(1, &Filter::new()).unwrap();
    assert_eq!(places.visits[0].place, "Beach");
}

#[test]
fn test_round_to_5() {
    assert_eq!(round_to_5(2.0 / 3.0), 0.66667);
    assert_eq!(round_to_5(1.0), 1.0);
    assert_eq!(round_to_5(0.000004), 0.0);
}

#[test]
fn test_user_born_exactly_at_cutoff_matches_neither_bound() {
    let store = Store::new();
    store.load_user(&user(1, Gender::Male, THIRTY_YEARS_AGO)).unwrap();
    store.load_location(&location(10, "Tower", "Russia", 5)).unwrap();
    store.load_visit(&visit(100, 1, 10, 300, 5)).unwrap();
    let engine = engine(store);

    // Both comparisons against the cutoff are strict
    let filter = Filter { from_age: Some(30), ..Filter::new() };
    assert_eq!(engine.average_mark(10, &filter).unwrap().avg, 0.0);

    let filter = Filter { to_age: Some(30), ..Filter::new() };
    assert_eq!(engine.average_mark(10, &filter).unwrap().avg, 0.0);

    let filter = Filter { from_age: Some(29), ..Filter::new() };
    assert_eq!(engine.average_mark(10, &filter).unwrap().avg, 5.0);
}
