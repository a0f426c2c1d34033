use std::sync::Arc;
use std::thread;

use travelbase::core::error::ErrorKind;
use travelbase::core::types::{Gender, Location, User, Visit};
use travelbase::index::membership::MembershipIndex;
use travelbase::storage::patch::{LocationPatch, UserPatch, VisitPatch};
use travelbase::storage::store::Store;

fn user(id: u32, email: &str) -> User {
    User {
        id,
        email: email.to_string(),
        first_name: "Anna".to_string(),
        last_name: "Petrova".to_string(),
        gender: Gender::Female,
        birth_date: 315_532_800,
    }
}

fn location(id: u32, country: &str) -> Location {
    Location {
        id,
        place: format!("Place {}", id),
        country: country.to_string(),
        city: "Moscow".to_string(),
        distance: 10,
    }
}

fn visit(id: u32, user: u32, location: u32) -> Visit {
    Visit { id, location, user, visited_at: 1_000_000_000, mark: 3 }
}

fn seeded() -> Store {
    let store = Store::new();
    store.load_user(&user(1, "a@mail.ru")).unwrap();
    store.load_user(&user(2, "b@mail.ru")).unwrap();
    store.load_location(&location(10, "Russia")).unwrap();
    store.load_location(&location(11, "Spain")).unwrap();
    store.load_visit(&visit(100, 1, 10)).unwrap();
    store
}

#[test]
fn test_bulk_load_populates_every_index() {
    let store = seeded();

    let stats = store.stats();
    assert_eq!((stats.users, stats.locations, stats.visits), (2, 2, 1));
    assert!(store.emails.exists("a@mail.ru"));
    assert_eq!(store.visits_by_user.get(1).unwrap().as_slice(), &[100]);
    assert_eq!(store.visits_by_location.get(10).unwrap().as_slice(), &[100]);
    assert!(store.visits_by_user.get(2).is_none());
}

#[test]
fn test_snapshot_is_canonical_json() {
    let store = seeded();

    let bytes = store.users.get(1).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["id"], 1);
    assert_eq!(value["gender"], "f");
    assert_eq!(value["birth_date"], 315_532_800);
    assert_eq!(store.user(1).unwrap(), Some(user(1, "a@mail.ru")));
}

#[test]
fn test_create_rejects_duplicate_id_and_email() {
    let store = seeded();

    let err = store.create_user(user(1, "new@mail.ru")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let err = store.create_user(user(3, "a@mail.ru")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert!(!store.users.contains(3));

    store.create_user(user(3, "c@mail.ru")).unwrap();
    assert!(store.emails.exists("c@mail.ru"));

    let err = store.create_location(location(10, "France")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

#[test]
fn test_update_user_moves_email() {
    let store = seeded();

    let patch = UserPatch { email: Some("z@mail.ru".to_string()), ..Default::default() };
    store.update_user(1, &patch).unwrap();

    assert!(!store.emails.exists("a@mail.ru"));
    assert!(store.emails.exists("z@mail.ru"));
    assert_eq!(store.user(1).unwrap().unwrap().email, "z@mail.ru");

    // Taken by user 2
    let patch = UserPatch { email: Some("b@mail.ru".to_string()), ..Default::default() };
    assert_eq!(store.update_user(1, &patch).unwrap_err().kind, ErrorKind::InvalidInput);

    // Keeping the own address is fine
    let patch = UserPatch { email: Some("z@mail.ru".to_string()), ..Default::default() };
    store.update_user(1, &patch).unwrap();
}

#[test]
fn test_update_missing_entity_is_not_found() {
    let store = seeded();

    let err = store.update_user(99, &UserPatch::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = store.update_location(99, &LocationPatch::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = store.update_visit(99, &VisitPatch::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn test_update_location_keeps_unpatched_fields() {
    let store = seeded();

    let patch = LocationPatch { distance: Some(42), ..Default::default() };
    store.update_location(10, &patch).unwrap();

    let updated = store.location(10).unwrap().unwrap();
    assert_eq!(updated.distance, 42);
    assert_eq!(updated.country, "Russia");
    assert_eq!(updated.place, "Place 10");
}

#[test]
fn test_create_visit_requires_existing_references() {
    let store = seeded();

    let err = store.create_visit(visit(101, 99, 10)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    let err = store.create_visit(visit(101, 1, 99)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert!(!store.visits.contains(101));

    store.create_visit(visit(101, 2, 11)).unwrap();
    assert_eq!(store.visits_by_user.get(2).unwrap().as_slice(), &[101]);
    assert_eq!(store.visits_by_location.get(11).unwrap().as_slice(), &[101]);
}

#[test]
fn test_update_visit_rehomes_membership() {
    let store = seeded();

    let patch = VisitPatch { user: Some(2), location: Some(11), ..Default::default() };
    store.update_visit(100, &patch).unwrap();

    assert!(store.visits_by_user.get(1).unwrap().is_empty());
    assert_eq!(store.visits_by_user.get(2).unwrap().as_slice(), &[100]);
    assert!(store.visits_by_location.get(10).unwrap().is_empty());
    assert_eq!(store.visits_by_location.get(11).unwrap().as_slice(), &[100]);

    let moved = store.visit(100).unwrap().unwrap();
    assert_eq!((moved.user, moved.location), (2, 11));
}

#[test]
fn test_failed_visit_update_changes_nothing() {
    let store = seeded();

    let patch = VisitPatch { user: Some(99), mark: Some(5), ..Default::default() };
    assert_eq!(store.update_visit(100, &patch).unwrap_err().kind, ErrorKind::InvalidInput);

    assert_eq!(store.visit(100).unwrap(), Some(visit(100, 1, 10)));
    assert_eq!(store.visits_by_user.get(1).unwrap().as_slice(), &[100]);
}

#[test]
fn test_concurrent_readers_never_see_torn_snapshots() {
    let store = Arc::new(seeded());
    let writers = 4;
    let rounds = 500;

    let mut handles = Vec::new();
    for w in 0..writers {
        let store = store.clone();
        handles.push(thread::spawn(move || {
            for round in 0..rounds {
                let place = format!("writer-{}-round-{}", w, round);
                let patch = LocationPatch { place: Some(place), ..Default::default() };
                store.update_location(10, &patch).unwrap();
            }
        }));
    }
    for _ in 0..writers {
        let store = store.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..rounds {
                let location = store.location(10).unwrap().unwrap();
                assert_eq!(location.id, 10);
                assert_eq!(location.country, "Russia");
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_creates_keep_emails_unique() {
    let store = Arc::new(seeded());

    let handles: Vec<_> = (0..8u32)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || store.create_user(user(1_000 + i, "same@mail.ru")).is_ok())
        })
        .collect();

    let created = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
    assert_eq!(created, 1);
}

#[test]
fn test_membership_remove_first_occurrence() {
    let index = MembershipIndex::new();
    for member in [1, 2, 3, 2] {
        index.put(7, member);
    }

    index.remove(7, 2);
    assert_eq!(index.get(7).unwrap().as_slice(), &[1, 3, 2]);

    index.remove(7, 9);
    assert_eq!(index.get(7).unwrap().as_slice(), &[1, 3, 2]);

    index.remove(8, 1);
    assert!(index.get(8).is_none());
    assert_eq!(index.get(7).unwrap().as_slice(), &[1, 3, 2]);
}

#[test]
fn test_membership_snapshot_survives_later_writes() {
    let index = MembershipIndex::new();
    index.put(7, 1);
    index.put(7, 2);

    let before = index.get(7).unwrap();
    index.remove(7, 1);

    assert_eq!(before.as_slice(), &[1, 2]);
    assert_eq!(index.get(7).unwrap().as_slice(), &[2]);
}
