//! Text, distance and ordering filter applied to the loaded persons

use crate::model::{LatLon, Person};

/// Filter and sort options for the persons list
///
/// Applied in order: text match, distance, then sorting. Sorting by name
/// wins over sorting by gender; without either the input order is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonsFilter {
    /// Case-insensitive match on name, surname or email
    pub text: Option<String>,
    /// Keep persons closer than this, needs `current_location`
    pub distance_km: Option<f32>,
    pub current_location: Option<LatLon>,
    pub sort_by_gender: bool,
    pub sort_by_name: bool,
}

impl PersonsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn within_km(mut self, distance_km: f32, from: LatLon) -> Self {
        self.distance_km = Some(distance_km);
        self.current_location = Some(from);
        self
    }

    pub fn sorted_by_name(mut self) -> Self {
        self.sort_by_name = true;
        self
    }

    pub fn sorted_by_gender(mut self) -> Self {
        self.sort_by_gender = true;
        self
    }

    /// Filtered and sorted copy of `persons`
    pub fn apply(&self, persons: &[Person]) -> Vec<Person> {
        let needle = self.text.as_ref().map(|t| t.to_lowercase());

        let mut out: Vec<Person> = persons
            .iter()
            .filter(|p| match &needle {
                Some(needle) => [&p.name, &p.surname, &p.email]
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .filter(|p| match (self.distance_km, &self.current_location) {
                (Some(max), Some(from)) => p.location.lat_lon.distance_to(from) < max,
                _ => true,
            })
            .cloned()
            .collect();

        // TODO: sort by gender and then by name inside each gender group
        if self.sort_by_name {
            out.sort_by(|a, b| a.name.cmp(&b.name));
        } else if self.sort_by_gender {
            out.sort_by_key(|p| p.gender);
        }
        out
    }
}
