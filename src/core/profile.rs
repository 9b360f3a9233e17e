//! Travel profiles understood by openrouteservice

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::core::error::{Error, Result};

/// Routing profile, serialized as the backend identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    #[default]
    DrivingCar,
    DrivingHgv,
    CyclingRegular,
    CyclingRoad,
    CyclingMountain,
    CyclingElectric,
    FootWalking,
    FootHiking,
    Wheelchair,
}

impl Profile {
    pub const ALL: [Profile; 9] = [
        Profile::DrivingCar,
        Profile::DrivingHgv,
        Profile::CyclingRegular,
        Profile::CyclingRoad,
        Profile::CyclingMountain,
        Profile::CyclingElectric,
        Profile::FootWalking,
        Profile::FootHiking,
        Profile::Wheelchair,
    ];

    /// Identifier used in backend URL paths
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::DrivingCar => "driving-car",
            Profile::DrivingHgv => "driving-hgv",
            Profile::CyclingRegular => "cycling-regular",
            Profile::CyclingRoad => "cycling-road",
            Profile::CyclingMountain => "cycling-mountain",
            Profile::CyclingElectric => "cycling-electric",
            Profile::FootWalking => "foot-walking",
            Profile::FootHiking => "foot-hiking",
            Profile::Wheelchair => "wheelchair",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        if let Some(profile) = Profile::ALL
            .iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
        {
            return Ok(*profile);
        }

        let message = match suggest_profile(wanted) {
            Some(suggestion) => format!("Unknown profile '{wanted}'. Did you mean '{suggestion}'?"),
            None => format!(
                "Unknown profile '{wanted}'. Try one of: {}",
                Profile::ALL.map(|p| p.as_str()).join(", ")
            ),
        };
        Err(Error::InvalidInput(message))
    }
}

/// Closest known profile for a misspelled identifier
pub fn suggest_profile(input: &str) -> Option<Profile> {
    let input_lower = input.to_lowercase();
    let mut best: Option<(Profile, f64)> = None;

    for profile in Profile::ALL {
        let candidate = profile.as_str();
        // Prefix-sensitive Jaro-Winkler blended with edit distance
        let score = 0.6 * jaro_winkler(&input_lower, candidate)
            + 0.4 * normalized_levenshtein(&input_lower, candidate);

        if score >= 0.75 && best.map_or(true, |(_, s)| score > s) {
            best = Some((profile, score));
        }
    }

    best.map(|(profile, _)| profile)
}
