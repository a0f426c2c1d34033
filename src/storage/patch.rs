use crate::core::types::{Gender, Id, Location, User, Visit};

/// Field subset of a User update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<i64>,
}

impl UserPatch {
    pub fn apply(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(gender) = self.gender {
            user.gender = gender;
        }
        if let Some(birth_date) = self.birth_date {
            user.birth_date = birth_date;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationPatch {
    pub place: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub distance: Option<u32>,
}

impl LocationPatch {
    pub fn apply(&self, location: &mut Location) {
        if let Some(place) = &self.place {
            location.place = place.clone();
        }
        if let Some(country) = &self.country {
            location.country = country.clone();
        }
        if let Some(city) = &self.city {
            location.city = city.clone();
        }
        if let Some(distance) = self.distance {
            location.distance = distance;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitPatch {
    pub location: Option<Id>,
    pub user: Option<Id>,
    pub visited_at: Option<i64>,
    pub mark: Option<u8>,
}

impl VisitPatch {
    pub fn apply(&self, visit: &mut Visit) {
        if let Some(location) = self.location {
            visit.location = location;
        }
        if let Some(user) = self.user {
            visit.user = user;
        }
        if let Some(visited_at) = self.visited_at {
            visit.visited_at = visited_at;
        }
        if let Some(mark) = self.mark {
            visit.mark = mark;
        }
    }
}
