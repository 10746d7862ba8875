use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DEFAULT_AGE_END, DEFAULT_AGE_START, GLOBAL_DISTANCE_SENTINEL};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Profile document at `users/{userId}`. Only the fields discovery reads
/// are modelled; everything else on the document is ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    #[serde(skip_deserializing)]
    pub id: String,
    pub username: String,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub location: Option<Location>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

impl Profile {
    /// Decodes a `users` child. Malformed documents are skipped.
    pub fn from_entry(id: &str, value: Value) -> Option<Self> {
        match serde_json::from_value::<Profile>(value) {
            Ok(mut profile) => {
                profile.id = id.to_string();
                Some(profile)
            }
            Err(e) => {
                tracing::debug!("Skipping malformed profile {}: {}", id, e);
                None
            }
        }
    }

    /// Age in whole years on `today`, if a birth date is known.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        let mut years = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}

/// Standing discovery preferences at `datingFilters/{userId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatingFilters {
    pub age_start: u32,
    pub age_end: u32,
    /// Maximum distance in km; negative means global.
    pub distance: i32,
    /// Comma-joined set of accepted genders; empty accepts everyone.
    pub gender: String,
}

impl Default for DatingFilters {
    fn default() -> Self {
        Self {
            age_start: DEFAULT_AGE_START,
            age_end: DEFAULT_AGE_END,
            distance: GLOBAL_DISTANCE_SENTINEL,
            gender: String::new(),
        }
    }
}

impl DatingFilters {
    pub fn is_global(&self) -> bool {
        self.distance < 0
    }

    pub fn max_distance_km(&self) -> Option<f64> {
        if self.is_global() { None } else { Some(f64::from(self.distance)) }
    }

    pub fn genders(&self) -> Vec<String> {
        self.gender
            .split(',')
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect()
    }

    pub fn set_genders<I, S>(&mut self, genders: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.gender = genders
            .into_iter()
            .map(|g| g.as_ref().trim().to_string())
            .filter(|g| !g.is_empty())
            .collect::<Vec<_>>()
            .join(",");
    }

    pub fn accepts_age(&self, age: u32) -> bool {
        age >= self.age_start && age <= self.age_end
    }

    pub fn accepts_gender(&self, gender: Option<&str>) -> bool {
        let accepted = self.genders();
        if accepted.is_empty() {
            return true;
        }
        gender.is_some_and(|g| accepted.contains(&g.trim().to_lowercase()))
    }
}
