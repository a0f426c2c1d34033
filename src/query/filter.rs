use crate::core::config::ReferenceTime;
use crate::core::types::Gender;

/// Optional predicates for the two aggregate queries.
///
/// Every bound is exclusive and an unset bound always passes. `country` is
/// kept lowercased so comparisons are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub from_date: Option<i64>,
    pub to_date: Option<i64>,
    pub from_age: Option<i64>,
    pub to_age: Option<i64>,
    pub gender: Option<Gender>,
    pub country: Option<String>,
    pub to_distance: Option<i64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_lowercase());
        self
    }

    pub fn check_visited_at(&self, visited_at: i64) -> bool {
        self.from_date.is_none_or(|from| visited_at > from)
            && self.to_date.is_none_or(|to| visited_at < to)
    }

    pub fn check_distance(&self, distance: u32) -> bool {
        self.to_distance.is_none_or(|to| i64::from(distance) < to)
    }

    pub fn check_country(&self, country: &str) -> bool {
        match &self.country {
            None => true,
            Some(wanted) => country.to_lowercase() == *wanted,
        }
    }

    pub fn check_gender(&self, gender: Gender) -> bool {
        self.gender.is_none_or(|wanted| gender == wanted)
    }

    /// True when a user record has to be loaded to evaluate this filter.
    pub fn needs_user(&self) -> bool {
        self.from_age.is_some() || self.to_age.is_some() || self.gender.is_some()
    }

    /// Resolve the relative age bounds against the reference time.
    pub fn age_window(&self, reference: ReferenceTime) -> AgeWindow {
        AgeWindow {
            born_before: self.from_age.map(|years| reference.years_before(years)),
            born_after: self.to_age.map(|years| reference.years_before(years)),
        }
    }
}

/// Birth-date cutoffs derived from `fromAge`/`toAge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgeWindow {
    /// `fromAge`: the user must be born strictly before this instant.
    pub born_before: Option<i64>,
    /// `toAge`: the user must be born strictly after this instant.
    pub born_after: Option<i64>,
}

impl AgeWindow {
    pub fn contains(&self, birth_date: i64) -> bool {
        self.born_before.is_none_or(|cutoff| cutoff > birth_date)
            && self.born_after.is_none_or(|cutoff| cutoff < birth_date)
    }
}
