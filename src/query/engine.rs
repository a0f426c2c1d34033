use std::sync::Arc;
use crate::core::config::ReferenceTime;
use crate::core::error::{Error, Result};
use crate::core::types::{AverageMark, Id, VisitedPlace, VisitedPlaces};
use crate::query::filter::Filter;
use crate::storage::store::Store;

/// Stateless read-side joins over the store.
pub struct QueryEngine {
    pub store: Arc<Store>,
    pub reference: ReferenceTime,
}

impl QueryEngine {
    pub fn new(store: Arc<Store>, reference: ReferenceTime) -> Self {
        QueryEngine { store, reference }
    }

    /// Mean mark of the visits to `location_id` that pass the date, age and
    /// gender predicates, rounded to five decimals. Zero when nothing passes.
    pub fn average_mark(&self, location_id: Id, filter: &Filter) -> Result<AverageMark> {
        if !self.store.locations.contains(location_id) {
            return Err(Error::not_found(format!("Location {}", location_id)));
        }

        let Some(visit_ids) = self.store.visits_by_location.get(location_id) else {
            return Ok(AverageMark { avg: 0.0 });
        };

        let ages = filter.age_window(self.reference);
        let needs_user = filter.needs_user();
        let mut sum: u64 = 0;
        let mut count: u64 = 0;

        for &visit_id in visit_ids.iter() {
            // The list snapshot may lag a concurrent re-homing; trust the visit
            let Some(visit) = self.store.visit(visit_id)? else { continue };
            if visit.location != location_id || !filter.check_visited_at(visit.visited_at) {
                continue;
            }

            if needs_user {
                let Some(user) = self.store.user(visit.user)? else { continue };
                if !ages.contains(user.birth_date) || !filter.check_gender(user.gender) {
                    continue;
                }
            }

            sum += u64::from(visit.mark);
            count += 1;
        }

        let avg = if count == 0 {
            0.0
        } else {
            round_to_5(sum as f64 / count as f64)
        };

        Ok(AverageMark { avg })
    }

    /// Places visited by `user_id` that pass the date, country and distance
    /// predicates, ordered by `visited_at`.
    pub fn visited_places(&self, user_id: Id, filter: &Filter) -> Result<VisitedPlaces> {
        if !self.store.users.contains(user_id) {
            return Err(Error::not_found(format!("User {}", user_id)));
        }

        let Some(visit_ids) = self.store.visits_by_user.get(user_id) else {
            return Ok(VisitedPlaces { visits: Vec::new() });
        };

        let mut visits = Vec::with_capacity(visit_ids.len());

        for &visit_id in visit_ids.iter() {
            let Some(visit) = self.store.visit(visit_id)? else { continue };
            if visit.user != user_id || !filter.check_visited_at(visit.visited_at) {
                continue;
            }

            let Some(location) = self.store.location(visit.location)? else { continue };
            if !filter.check_country(&location.country) || !filter.check_distance(location.distance) {
                continue;
            }

            visits.push(VisitedPlace {
                mark: visit.mark,
                visited_at: visit.visited_at,
                place: location.place,
            });
        }

        visits.sort_by_key(|place| place.visited_at);

        Ok(VisitedPlaces { visits })
    }
}

/// Round half away from zero to five decimal digits.
pub fn round_to_5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}
