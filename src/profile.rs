//! User profile data shapes
//!
//! The profile is collected and persisted by the surrounding UI layer; the
//! core only consumes its shape when a session starts.

use serde::{Deserialize, Serialize};

/// The person Mochi is talking to
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserProfile {
    /// Display name, used to address the user
    pub name: String,

    /// Self-described gender, used for pronoun choice in Vietnamese
    pub gender: Gender,

    /// Last known location, if the user granted geolocation
    pub location: Option<GeoPoint>,
}

/// User gender for form of address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

/// A geographic coordinate
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_deserializes_without_location() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"name": "Lan", "gender": "female"}"#).unwrap();
        assert_eq!(profile.name, "Lan");
        assert_eq!(profile.gender, Gender::Female);
        assert!(profile.location.is_none());
    }
}
