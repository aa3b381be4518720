//! Location model for geographic coordinates and metadata

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tzf_rs::DefaultFinder;

use crate::{Result, SkyframeError};

/// A place on earth together with its IANA timezone
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Location name (city, "User Location", etc.)
    pub name: String,
    /// Region or state
    pub region: String,
    /// IANA timezone the local clock follows
    pub timezone: Tz,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(name: String, region: String, timezone: Tz, latitude: f64, longitude: f64) -> Self {
        Self {
            name,
            region,
            timezone,
            latitude,
            longitude,
        }
    }

    /// Create a location from a timezone name such as `America/Los_Angeles`
    pub fn with_timezone_name(
        name: String,
        region: String,
        timezone: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self> {
        let timezone: Tz = timezone.parse().map_err(|_| {
            SkyframeError::configuration(format!("Unknown IANA timezone '{timezone}'"))
        })?;
        check_coordinates(latitude, longitude)?;

        Ok(Self::new(name, region, timezone, latitude, longitude))
    }

    /// Create a location whose timezone is looked up from its coordinates
    pub fn from_coordinates(
        name: String,
        region: String,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self> {
        let timezone = timezone_at(latitude, longitude)?;
        Ok(Self::new(name, region, timezone, latitude, longitude))
    }

    /// UTC instant of local midnight starting `date`.
    ///
    /// On days where midnight is skipped by a DST change the first valid
    /// local instant is used.
    #[must_use]
    pub fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        match self.timezone.from_local_datetime(&naive) {
            chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
                dt.with_timezone(&Utc)
            }
            chrono::LocalResult::None => {
                let shifted = naive + chrono::Duration::hours(1);
                self.timezone
                    .from_local_datetime(&shifted)
                    .earliest()
                    .map_or_else(|| shifted.and_utc(), |dt| dt.with_timezone(&Utc))
            }
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

static TIMEZONE_FINDER: LazyLock<DefaultFinder> = LazyLock::new(DefaultFinder::new);

fn check_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(SkyframeError::configuration(format!(
            "Invalid coordinates: lat={latitude}, lng={longitude}"
        )));
    }
    Ok(())
}

/// IANA timezone at the given coordinates.
///
/// The boundary data is loaded on first use.
pub fn timezone_at(latitude: f64, longitude: f64) -> Result<Tz> {
    check_coordinates(latitude, longitude)?;

    let name = TIMEZONE_FINDER.get_tz_name(longitude, latitude);
    name.parse().map_err(|_| {
        SkyframeError::configuration(format!(
            "No timezone found at lat={latitude}, lng={longitude} (got '{name}')"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn oakland() -> Location {
        Location::with_timezone_name(
            "Oakland".to_string(),
            "California".to_string(),
            "America/Los_Angeles",
            37.804363,
            -122.271111,
        )
        .unwrap()
    }

    #[test]
    fn test_timezone_name_is_parsed() {
        let location = oakland();
        assert_eq!(location.timezone, chrono_tz::America::Los_Angeles);
        assert_eq!(location.format_coordinates(), "37.8044, -122.2711");
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let result = Location::with_timezone_name(
            "Nowhere".to_string(),
            String::new(),
            "Mars/Olympus_Mons",
            0.0,
            0.0,
        );
        assert!(matches!(result, Err(SkyframeError::Configuration { .. })));
    }

    #[test]
    fn test_out_of_range_coordinates_are_rejected() {
        let result =
            Location::with_timezone_name("Bad".to_string(), String::new(), "UTC", 91.0, 0.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_timezone_from_coordinates() {
        let location = Location::from_coordinates(
            "Oakland".to_string(),
            String::new(),
            37.804363,
            -122.271111,
        )
        .unwrap();
        assert_eq!(location.timezone, chrono_tz::America::Los_Angeles);

        assert_eq!(timezone_at(52.52, 13.405).unwrap(), chrono_tz::Europe::Berlin);
        assert!(timezone_at(37.8, -200.0).is_err());
    }

    #[test]
    fn test_local_midnight_in_utc() {
        let location = oakland();
        let date = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();
        // PDT is UTC-7
        let midnight = location.local_midnight(date);
        assert_eq!(midnight.hour(), 7);
        assert_eq!(midnight.date_naive(), date);
    }
}
