//! Weather observation model and the supported condition vocabulary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SkyframeError;

/// Weather conditions the prompt tables know about.
///
/// The textual forms match the descriptions reported by `OpenWeatherMap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherCondition {
    ClearSky,
    FewClouds,
    ScatteredClouds,
    BrokenClouds,
    ShowerRain,
    Rain,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
    Haze,
}

impl WeatherCondition {
    pub const ALL: [WeatherCondition; 11] = [
        WeatherCondition::ClearSky,
        WeatherCondition::FewClouds,
        WeatherCondition::ScatteredClouds,
        WeatherCondition::BrokenClouds,
        WeatherCondition::ShowerRain,
        WeatherCondition::Rain,
        WeatherCondition::Thunderstorm,
        WeatherCondition::Snow,
        WeatherCondition::Mist,
        WeatherCondition::Fog,
        WeatherCondition::Haze,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::ClearSky => "clear sky",
            WeatherCondition::FewClouds => "few clouds",
            WeatherCondition::ScatteredClouds => "scattered clouds",
            WeatherCondition::BrokenClouds => "broken clouds",
            WeatherCondition::ShowerRain => "shower rain",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Thunderstorm => "thunderstorm",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Mist => "mist",
            WeatherCondition::Fog => "fog",
            WeatherCondition::Haze => "haze",
        }
    }

    /// Whether the sky is clear enough to show stars at night
    #[must_use]
    pub fn is_clear(&self) -> bool {
        matches!(self, WeatherCondition::ClearSky)
    }
}

impl FromStr for WeatherCondition {
    type Err = SkyframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|condition| condition.as_str() == normalized)
            .ok_or_else(|| SkyframeError::unrecognized_condition(s))
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current weather at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub condition: WeatherCondition,
    /// Temperature in Kelvin
    pub temperature_kelvin: f64,
}

impl WeatherObservation {
    #[must_use]
    pub fn new(condition: WeatherCondition, temperature_kelvin: f64) -> Self {
        Self {
            condition,
            temperature_kelvin,
        }
    }

    /// Convert temperature from Kelvin to Celsius
    #[must_use]
    pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
        kelvin - 273.15
    }

    #[must_use]
    pub fn temperature_celsius(&self) -> f64 {
        Self::kelvin_to_celsius(self.temperature_kelvin)
    }
}
