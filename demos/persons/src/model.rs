//! Person model

use serde::Serialize;

/// Earth radius used by [`LatLon::distance_to`]
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub picture: Picture,
    pub phone: String,
    pub gender: Gender,
    pub favorite: bool,
    pub location: Location,
}

impl Person {
    /// Identity key. Emails are assumed unique.
    pub fn id(&self) -> &str {
        &self.email
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

/// Declaration order is the sort order used by the gender filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Parse the labels used by person sources; unknown labels map to `Other`
    pub fn from_label(label: &str) -> Self {
        match label {
            "male" => Gender::Male,
            "female" => Gender::Female,
            _ => Gender::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub street: String,
    pub city: String,
    pub state: String,
    pub lat_lon: LatLon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Picture {
    pub thumb: String,
    pub big: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub latitude: f32,
    pub longitude: f32,
}

impl LatLon {
    pub const MADRID: LatLon = LatLon::new(40.474_267, -3.6875);

    pub const fn new(latitude: f32, longitude: f32) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in kilometres (haversine)
    pub fn distance_to(&self, other: &LatLon) -> f32 {
        let lat1 = f64::from(self.latitude).to_radians();
        let lat2 = f64::from(other.latitude).to_radians();
        let d_lat = f64::from(other.latitude - self.latitude).to_radians();
        let d_lon = f64::from(other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        (EARTH_RADIUS_KM * c) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 30%, accuracy is not critical
    fn assert_close(target: f32, actual: f32) {
        assert!(
            (target - actual).abs() < target * 0.3,
            "target {target}km, actual {actual}km"
        );
    }

    #[test]
    fn test_distances_within_error_margin() {
        let a = LatLon::new(40.474_267, -3.6875);
        let b = LatLon::new(40.474_102, -3.68681);
        assert_close(0.06, a.distance_to(&b));

        let c = LatLon::new(40.432_31, -3.717_562);
        let d = LatLon::new(40.429_527, -3.715_498);
        let e = LatLon::new(40.427_932, -3.696_077);
        assert_close(0.35, c.distance_to(&d));
        assert_close(2.0, c.distance_to(&e));
    }

    #[test]
    fn test_distance_is_symmetric_and_zero_to_self() {
        let far = LatLon::new(48.8566, 2.3522);
        assert_eq!(LatLon::MADRID.distance_to(&LatLon::MADRID), 0.0);
        assert!((LatLon::MADRID.distance_to(&far) - far.distance_to(&LatLon::MADRID)).abs() < 0.01);
    }

    #[test]
    fn test_gender_labels() {
        assert_eq!(Gender::from_label("male"), Gender::Male);
        assert_eq!(Gender::from_label("female"), Gender::Female);
        assert_eq!(Gender::from_label("attack helicopter"), Gender::Other);
    }
}
