use serde::{Serialize, Deserialize};

/// Entity identifier. Ids are non-negative and fit in 32 bits.
pub type Id = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
}

impl Gender {
    pub fn parse(value: &str) -> Option<Gender> {
        match value {
            "m" => Some(Gender::Male),
            "f" => Some(Gender::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_date: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: Id,
    pub place: String,
    pub country: String,
    pub city: String,
    pub distance: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: Id,
    pub location: Id,
    pub user: Id,
    pub visited_at: i64,
    pub mark: u8,
}

/// One visit seen from its user's side, joined with the location's place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedPlace {
    pub mark: u8,
    pub visited_at: i64,
    pub place: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedPlaces {
    pub visits: Vec<VisitedPlace>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageMark {
    pub avg: f64,
}

// Dataset member shapes: `{"users": [...]}`, `{"locations": [...]}`, `{"visits": [...]}`

#[derive(Debug, Deserialize)]
pub struct UserBatch {
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub struct LocationBatch {
    pub locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
pub struct VisitBatch {
    pub visits: Vec<Visit>,
}
