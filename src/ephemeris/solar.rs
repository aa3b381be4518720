use chrono::{Datelike, NaiveDate};
use sunrise::{Coordinates, DawnType, SolarDay, SolarEvent};

use super::{Daylight, SolarEvents};
use crate::models::Location;
use crate::{Result, SkyframeError};

/// Solar events for `date` at `location`.
///
/// Dawn and dusk are civil twilight. Where the sun rises but never gets 6°
/// below the horizon (white nights) they fall back to sunrise and sunset.
/// Noon is the midpoint between sunrise and sunset.
pub fn daylight(location: &Location, date: NaiveDate) -> Result<Daylight> {
    let coordinates =
        Coordinates::new(location.latitude, location.longitude).ok_or_else(|| {
            SkyframeError::configuration(format!(
                "Invalid coordinates: lat={}, lng={}",
                location.latitude, location.longitude
            ))
        })?;

    let solar_day = SolarDay::new(coordinates, date);

    let (Some(sunrise), Some(sunset)) = (
        solar_day.event_time(SolarEvent::Sunrise),
        solar_day.event_time(SolarEvent::Sunset),
    ) else {
        return Ok(if noon_elevation(location.latitude, date) > 0.0 {
            Daylight::AlwaysUp
        } else {
            Daylight::AlwaysDown
        });
    };

    let dawn = solar_day
        .event_time(SolarEvent::Dawn(DawnType::Civil))
        .unwrap_or(sunrise);
    let dusk = solar_day
        .event_time(SolarEvent::Dusk(DawnType::Civil))
        .unwrap_or(sunset);
    let noon = sunrise + (sunset - sunrise) / 2;

    Ok(Daylight::Regular(SolarEvents {
        dawn,
        sunrise,
        noon,
        sunset,
        dusk,
    }))
}

/// Approximate solar elevation at noon in degrees, used only to tell polar
/// day from polar night
fn noon_elevation(latitude: f64, date: NaiveDate) -> f64 {
    let day_of_year = f64::from(date.ordinal());
    let declination =
        -23.44 * (2.0 * std::f64::consts::PI / 365.0 * (day_of_year + 10.0)).cos();
    90.0 - (latitude - declination).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn location(latitude: f64, longitude: f64, timezone: &str) -> Location {
        Location::with_timezone_name(
            "Test".to_string(),
            String::new(),
            timezone,
            latitude,
            longitude,
        )
        .unwrap()
    }

    #[test]
    fn test_events_are_ordered() {
        let oakland = location(37.804363, -122.271111, "America/Los_Angeles");
        let date = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();

        let Daylight::Regular(events) = daylight(&oakland, date).unwrap() else {
            panic!("Oakland should have a regular day");
        };

        assert!(events.dawn < events.sunrise);
        assert!(events.sunrise < events.noon);
        assert!(events.noon < events.sunset);
        assert!(events.sunset < events.dusk);

        // Solar noon in Oakland is around 13:10 PDT, i.e. 20:10 UTC
        let noon_local = events.noon.with_timezone(&oakland.timezone);
        assert!((12..=14).contains(&noon_local.hour()));
        assert_eq!(noon_local.date_naive(), date);
    }

    #[test]
    fn test_polar_night_and_midnight_sun() {
        let svalbard = location(78.22, 15.65, "Arctic/Longyearbyen");

        let winter = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();
        assert_eq!(daylight(&svalbard, winter).unwrap(), Daylight::AlwaysDown);

        let summer = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        assert_eq!(daylight(&svalbard, summer).unwrap(), Daylight::AlwaysUp);
    }

    #[test]
    fn test_noon_elevation_sign() {
        let june = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        assert!(noon_elevation(80.0, june) > 0.0);
        assert!(noon_elevation(-80.0, june) < 0.0);
    }
}
