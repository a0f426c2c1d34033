use std::sync::Arc;
use bytes::Bytes;
use serde::Serialize;
use crate::api::params::{self, FilterKeys};
use crate::api::payload;
use crate::core::config::ReferenceTime;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Id;
use crate::query::engine::QueryEngine;
use crate::storage::store::Store;

/// Endpoint bodies. Each call touches the store or the query engine once and
/// returns the response body; errors carry the status through their kind.
pub struct Api {
    pub store: Arc<Store>,
    pub queries: QueryEngine,
}

const EMPTY_OBJECT: &[u8] = b"{}";

impl Api {
    pub fn new(store: Arc<Store>, reference: ReferenceTime) -> Self {
        Api {
            queries: QueryEngine::new(store.clone(), reference),
            store,
        }
    }

    pub fn get_user(&self, id: Id) -> Result<Bytes> {
        self.store.users.get(id).ok_or_else(|| Error::not_found(format!("User {}", id)))
    }

    pub fn get_location(&self, id: Id) -> Result<Bytes> {
        self.store.locations.get(id).ok_or_else(|| Error::not_found(format!("Location {}", id)))
    }

    pub fn get_visit(&self, id: Id) -> Result<Bytes> {
        self.store.visits.get(id).ok_or_else(|| Error::not_found(format!("Visit {}", id)))
    }

    pub fn visited_places(&self, user_id: Id, query: &str) -> Result<Bytes> {
        let filter = params::parse_filter(query, FilterKeys::VisitedPlaces)?;
        let places = self.queries.visited_places(user_id, &filter)?;
        to_json(&places)
    }

    pub fn average_mark(&self, location_id: Id, query: &str) -> Result<Bytes> {
        let filter = params::parse_filter(query, FilterKeys::AverageMark)?;
        let average = self.queries.average_mark(location_id, &filter)?;
        to_json(&average)
    }

    pub fn create_user(&self, body: &[u8]) -> Result<Bytes> {
        self.store.create_user(payload::new_user(body)?)?;
        Ok(Bytes::from_static(EMPTY_OBJECT))
    }

    pub fn create_location(&self, body: &[u8]) -> Result<Bytes> {
        self.store.create_location(payload::new_location(body)?)?;
        Ok(Bytes::from_static(EMPTY_OBJECT))
    }

    pub fn create_visit(&self, body: &[u8]) -> Result<Bytes> {
        self.store.create_visit(payload::new_visit(body)?)?;
        Ok(Bytes::from_static(EMPTY_OBJECT))
    }

    // Updates answer 404 for an unknown id before looking at the body

    pub fn update_user(&self, id: Id, body: &[u8]) -> Result<Bytes> {
        if !self.store.users.contains(id) {
            return Err(Error::not_found(format!("User {}", id)));
        }
        self.store.update_user(id, &payload::user_patch(body)?)?;
        Ok(Bytes::from_static(EMPTY_OBJECT))
    }

    pub fn update_location(&self, id: Id, body: &[u8]) -> Result<Bytes> {
        if !self.store.locations.contains(id) {
            return Err(Error::not_found(format!("Location {}", id)));
        }
        self.store.update_location(id, &payload::location_patch(body)?)?;
        Ok(Bytes::from_static(EMPTY_OBJECT))
    }

    pub fn update_visit(&self, id: Id, body: &[u8]) -> Result<Bytes> {
        if !self.store.visits.contains(id) {
            return Err(Error::not_found(format!("Visit {}", id)));
        }
        self.store.update_visit(id, &payload::visit_patch(body)?)?;
        Ok(Bytes::from_static(EMPTY_OBJECT))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| Error::new(ErrorKind::Internal, format!("Cannot encode response: {}", e)))
}
