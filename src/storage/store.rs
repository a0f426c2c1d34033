use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Id, Location, User, Visit};
use crate::index::email_set::EmailSet;
use crate::index::membership::MembershipIndex;
use crate::index::snapshot_index::SnapshotIndex;
use crate::storage::patch::{LocationPatch, UserPatch, VisitPatch};

/// The six indexes plus one writer lock per entity kind.
///
/// Reads go straight to the indexes. Create/Update take the writer lock of
/// their entity kind for the whole check-then-write sequence, so duplicate
/// checks and visit re-homing cannot interleave with another writer.
pub struct Store {
    pub users: SnapshotIndex,
    pub locations: SnapshotIndex,
    pub visits: SnapshotIndex,
    pub visits_by_user: MembershipIndex,
    pub visits_by_location: MembershipIndex,
    pub emails: EmailSet,

    user_writer: Mutex<()>,
    location_writer: Mutex<()>,
    visit_writer: Mutex<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub users: usize,
    pub locations: usize,
    pub visits: usize,
}

impl Store {
    pub fn new() -> Self {
        Store {
            users: SnapshotIndex::new(),
            locations: SnapshotIndex::new(),
            visits: SnapshotIndex::new(),
            visits_by_user: MembershipIndex::new(),
            visits_by_location: MembershipIndex::new(),
            emails: EmailSet::new(),
            user_writer: Mutex::new(()),
            location_writer: Mutex::new(()),
            visit_writer: Mutex::new(()),
        }
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            users: self.users.len(),
            locations: self.locations.len(),
            visits: self.visits.len(),
        }
    }

    // Bulk load: trusted data, no validation, writers only

    pub fn load_user(&self, user: &User) -> Result<()> {
        self.users.put(user.id, encode(user)?);
        self.emails.put(&user.email);
        Ok(())
    }

    pub fn load_location(&self, location: &Location) -> Result<()> {
        self.locations.put(location.id, encode(location)?);
        Ok(())
    }

    pub fn load_visit(&self, visit: &Visit) -> Result<()> {
        self.visits.put(visit.id, encode(visit)?);
        self.visits_by_user.put(visit.user, visit.id);
        self.visits_by_location.put(visit.location, visit.id);
        Ok(())
    }

    // Point reads

    pub fn user(&self, id: Id) -> Result<Option<User>> {
        self.users.get(id).map(|bytes| decode("user", id, &bytes)).transpose()
    }

    pub fn location(&self, id: Id) -> Result<Option<Location>> {
        self.locations.get(id).map(|bytes| decode("location", id, &bytes)).transpose()
    }

    pub fn visit(&self, id: Id) -> Result<Option<Visit>> {
        self.visits.get(id).map(|bytes| decode("visit", id, &bytes)).transpose()
    }

    // Users

    pub fn create_user(&self, user: User) -> Result<()> {
        let _writer = self.user_writer.lock();

        if self.users.contains(user.id) {
            return Err(Error::invalid(format!("User {} already exists", user.id)));
        }
        if self.emails.exists(&user.email) {
            return Err(Error::invalid(format!("Email {} is taken", user.email)));
        }

        let snapshot = encode(&user)?;
        self.users.put(user.id, snapshot);
        self.emails.put(&user.email);
        Ok(())
    }

    pub fn update_user(&self, id: Id, patch: &UserPatch) -> Result<()> {
        let _writer = self.user_writer.lock();

        let mut user = self.user(id)?
            .ok_or_else(|| Error::not_found(format!("User {}", id)))?;
        let previous_email = user.email.clone();

        if let Some(email) = &patch.email {
            if *email != previous_email && self.emails.exists(email) {
                return Err(Error::invalid(format!("Email {} is taken", email)));
            }
        }

        patch.apply(&mut user);
        let snapshot = encode(&user)?;

        self.users.put(id, snapshot);
        if user.email != previous_email {
            self.emails.remove(&previous_email);
            self.emails.put(&user.email);
        }
        Ok(())
    }

    // Locations

    pub fn create_location(&self, location: Location) -> Result<()> {
        let _writer = self.location_writer.lock();

        if self.locations.contains(location.id) {
            return Err(Error::invalid(format!("Location {} already exists", location.id)));
        }

        let snapshot = encode(&location)?;
        self.locations.put(location.id, snapshot);
        Ok(())
    }

    pub fn update_location(&self, id: Id, patch: &LocationPatch) -> Result<()> {
        let _writer = self.location_writer.lock();

        let mut location = self.location(id)?
            .ok_or_else(|| Error::not_found(format!("Location {}", id)))?;

        patch.apply(&mut location);
        let snapshot = encode(&location)?;
        self.locations.put(id, snapshot);
        Ok(())
    }

    // Visits

    pub fn create_visit(&self, visit: Visit) -> Result<()> {
        let _writer = self.visit_writer.lock();

        if self.visits.contains(visit.id) {
            return Err(Error::invalid(format!("Visit {} already exists", visit.id)));
        }
        self.check_references(visit.user, visit.location)?;

        let snapshot = encode(&visit)?;
        self.visits.put(visit.id, snapshot);
        self.visits_by_user.put(visit.user, visit.id);
        self.visits_by_location.put(visit.location, visit.id);
        Ok(())
    }

    /// Apply `patch` to a visit. A changed user or location moves the visit
    /// between membership lists while the visit writer lock is held.
    pub fn update_visit(&self, id: Id, patch: &VisitPatch) -> Result<()> {
        let _writer = self.visit_writer.lock();

        let mut visit = self.visit(id)?
            .ok_or_else(|| Error::not_found(format!("Visit {}", id)))?;
        let (old_user, old_location) = (visit.user, visit.location);

        patch.apply(&mut visit);
        self.check_references(visit.user, visit.location)?;
        let snapshot = encode(&visit)?;

        if visit.user != old_user {
            self.visits_by_user.remove(old_user, id);
            self.visits_by_user.put(visit.user, id);
        }
        if visit.location != old_location {
            self.visits_by_location.remove(old_location, id);
            self.visits_by_location.put(visit.location, id);
        }
        self.visits.put(id, snapshot);
        Ok(())
    }

    fn check_references(&self, user: Id, location: Id) -> Result<()> {
        if !self.users.contains(user) {
            return Err(Error::invalid(format!("Visit references unknown user {}", user)));
        }
        if !self.locations.contains(location) {
            return Err(Error::invalid(format!("Visit references unknown location {}", location)));
        }
        Ok(())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| Error::new(ErrorKind::Internal, format!("Cannot encode snapshot: {}", e)))
}

fn decode<T: DeserializeOwned>(entity: &str, id: Id, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::corrupt(format!("Stored {} {} is unreadable: {}", entity, id, e)))
}
