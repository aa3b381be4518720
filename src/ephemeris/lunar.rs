//! Low-precision lunar model: phase, altitude and rise/set times.
//!
//! Accurate to a few minutes for rise and set, which is plenty for picking
//! prompt tags. Position and the hourly rise/set search follow Agafonkin's
//! suncalc; the phase uses the mean elongation terms from Meeus,
//! *Astronomical Algorithms*, ch. 47-48.

use std::f64::consts::PI;

use chrono::{DateTime, Duration, NaiveDate, Utc};

const RAD: f64 = PI / 180.0;
const J2000: f64 = 2_451_545.0;
const OBLIQUITY: f64 = 23.4397 * RAD;
/// Horizon altitude for the moon's upper limb, corrected for parallax
const MOON_HORIZON: f64 = 0.133 * RAD;

fn julian_day(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64 / 86_400_000.0 + 2_440_587.5
}

fn normalize_degrees(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

/// Lunar phase for a calendar date on a 0.0..28.0 scale.
///
/// | value        | phase         |
/// |--------------|---------------|
/// | 0 .. 6.99    | new moon      |
/// | 7 .. 13.99   | first quarter |
/// | 14 .. 20.99  | full moon     |
/// | 21 .. 27.99  | last quarter  |
#[must_use]
pub fn phase(date: NaiveDate) -> f64 {
    let jd = julian_day(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
    let dt = (jd - 2_382_148.0).powi(2) / (41_048_480.0 * 86_400.0);
    let t = (jd + dt - J2000) / 36_525.0;
    let t2 = t * t;
    let t3 = t2 * t;

    let d = normalize_degrees(297.85 + 445_267.111_5 * t - 0.001_63 * t2 + t3 / 545_868.0);
    let m = normalize_degrees(357.53 + 35_999.050_3 * t);
    let m1 = normalize_degrees(134.96 + 477_198.867_6 * t + 0.008_997 * t2 + t3 / 69_699.0);

    let elongation = normalize_degrees(
        d + 6.29 * (m1 * RAD).sin() - 2.10 * (m * RAD).sin()
            + 1.27 * ((2.0 * d - m1) * RAD).sin()
            + 0.66 * (2.0 * d * RAD).sin(),
    );

    let moon = (elongation + 6.43) / 360.0 * 28.0;
    if moon >= 28.0 { moon - 28.0 } else { moon }
}

struct Equatorial {
    right_ascension: f64,
    declination: f64,
}

fn moon_coordinates(days: f64) -> Equatorial {
    let mean_longitude = RAD * (218.316 + 13.176_396 * days);
    let mean_anomaly = RAD * (134.963 + 13.064_993 * days);
    let mean_distance = RAD * (93.272 + 13.229_350 * days);

    let longitude = mean_longitude + RAD * 6.289 * mean_anomaly.sin();
    let latitude = RAD * 5.128 * mean_distance.sin();

    Equatorial {
        right_ascension: (longitude.sin() * OBLIQUITY.cos() - latitude.tan() * OBLIQUITY.sin())
            .atan2(longitude.cos()),
        declination: (latitude.sin() * OBLIQUITY.cos()
            + latitude.cos() * OBLIQUITY.sin() * longitude.sin())
        .asin(),
    }
}

fn refraction(altitude: f64) -> f64 {
    let altitude = altitude.max(0.0);
    0.000_296_7 / (altitude + 0.003_125_36 / (altitude + 0.089_011_79)).tan()
}

/// Apparent altitude of the moon's centre in radians
#[must_use]
pub fn moon_altitude(instant: DateTime<Utc>, latitude: f64, longitude: f64) -> f64 {
    let days = julian_day(instant) - J2000;
    let phi = RAD * latitude;
    let coordinates = moon_coordinates(days);

    let sidereal = RAD * (280.16 + 360.985_623_5 * days) + RAD * longitude;
    let hour_angle = sidereal - coordinates.right_ascension;
    let altitude = (phi.sin() * coordinates.declination.sin()
        + phi.cos() * coordinates.declination.cos() * hour_angle.cos())
    .asin();

    altitude + refraction(altitude)
}

/// Moonrise and moonset within the 24 hours following `start`.
///
/// Altitude is sampled hourly and each two-hour window is fitted with a
/// parabola to locate horizon crossings.
#[must_use]
pub fn moon_times(
    start: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let at = |hours: f64| start + Duration::milliseconds((hours * 3_600_000.0) as i64);
    let altitude = |hours: f64| moon_altitude(at(hours), latitude, longitude) - MOON_HORIZON;

    let mut rise = None;
    let mut set = None;
    let mut h0 = altitude(0.0);
    let mut hour = 1.0;

    while hour <= 24.0 {
        let h1 = altitude(hour);
        let h2 = altitude(hour + 1.0);

        let a = (h0 + h2) / 2.0 - h1;
        let b = (h2 - h0) / 2.0;
        let xe = -b / (2.0 * a);
        let ye = (a * xe + b) * xe + h1;
        let discriminant = b * b - 4.0 * a * h1;

        let mut roots = 0;
        let mut x1 = 0.0;
        let mut x2 = 0.0;
        if discriminant >= 0.0 {
            let dx = discriminant.sqrt() / (a.abs() * 2.0);
            x1 = xe - dx;
            x2 = xe + dx;
            if x1.abs() <= 1.0 {
                roots += 1;
            }
            if x2.abs() <= 1.0 {
                roots += 1;
            }
            if x1 < -1.0 {
                x1 = x2;
            }
        }

        match roots {
            1 if h0 < 0.0 => rise = Some(hour + x1),
            1 => set = Some(hour + x1),
            2 => {
                rise = Some(hour + if ye < 0.0 { x2 } else { x1 });
                set = Some(hour + if ye < 0.0 { x1 } else { x2 });
            }
            _ => {}
        }

        if rise.is_some() && set.is_some() {
            break;
        }
        h0 = h2;
        hour += 2.0;
    }

    (rise.map(at), set.map(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_phase_stays_in_range() {
        let mut day = date(2024, 1, 1);
        for _ in 0..400 {
            let value = phase(day);
            assert!((0.0..28.0).contains(&value), "{day}: {value}");
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_phase_tracks_known_lunations() {
        // New moon 2024-04-08, full moon 2024-04-23, last quarter 2024-05-01
        assert!((0.0..7.0).contains(&phase(date(2024, 4, 10))));
        assert!((14.0..21.0).contains(&phase(date(2024, 4, 25))));
        assert!((21.0..28.0).contains(&phase(date(2024, 5, 2))));
    }

    #[test]
    fn test_rise_and_set_are_horizon_crossings() {
        let start = Utc.with_ymd_and_hms(2024, 4, 15, 7, 0, 0).unwrap();
        let (latitude, longitude) = (37.804363, -122.271111);
        let (rise, set) = moon_times(start, latitude, longitude);

        assert!(rise.is_some() || set.is_some());
        for event in [rise, set].into_iter().flatten() {
            assert!(event >= start && event <= start + Duration::hours(25));
            let altitude = moon_altitude(event, latitude, longitude) - MOON_HORIZON;
            assert!(altitude.abs() < 0.5 * RAD, "altitude {altitude} at {event}");
        }
    }

    #[test]
    fn test_moon_is_up_between_rise_and_set() {
        let start = Utc.with_ymd_and_hms(2024, 4, 15, 7, 0, 0).unwrap();
        let (latitude, longitude) = (37.804363, -122.271111);
        if let (Some(rise), Some(set)) = moon_times(start, latitude, longitude) {
            let (first, second) = if rise < set { (rise, set) } else { (set, rise) };
            let middle = first + (second - first) / 2;
            let up = moon_altitude(middle, latitude, longitude) > MOON_HORIZON;
            assert_eq!(up, rise < set);
        }
    }
}
