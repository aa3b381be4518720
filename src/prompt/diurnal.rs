use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

use crate::Result;
use crate::ephemeris::{Daylight, Ephemeris, LunarEvents};
use crate::models::{Location, Tag};

/// Bucket of the solar day a timestamp falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeOfDay {
    Dawn,
    Sunrise,
    Day,
    Sunset,
    Night,
}

impl TimeOfDay {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "dawn",
            TimeOfDay::Sunrise => "sunrise",
            TimeOfDay::Day => "day",
            TimeOfDay::Sunset => "sunset",
            TimeOfDay::Night => "night",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moon tag chosen for a night sky
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoonTag {
    Crescent,
    Full,
}

impl MoonTag {
    /// Map a 0..28 phase value to the tag shown in the sky.
    ///
    /// New moon and last quarter both render as a crescent.
    #[must_use]
    pub fn for_phase(phase: f64) -> Self {
        if (7.0..14.0).contains(&phase) {
            MoonTag::Crescent
        } else if (14.0..21.0).contains(&phase) {
            MoonTag::Full
        } else {
            MoonTag::Crescent
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MoonTag::Crescent => "crescent moon",
            MoonTag::Full => "full moon",
        }
    }
}

/// Facts about the time of day that later classification stages read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeContext {
    pub is_daytime: bool,
    pub is_full_moon: bool,
}

/// Result of the diurnal/lunar classification
#[derive(Debug, Clone, PartialEq)]
pub struct TimeReading {
    pub time_of_day: TimeOfDay,
    /// Moon shown in the sky, night only
    pub moon: Option<MoonTag>,
    pub tags: Vec<Tag>,
    pub context: TimeContext,
}

/// Place `timestamp` into a bucket of the solar day.
///
/// Buckets are half-open: the dawn instant is "dawn", the sunrise instant is
/// "sunrise", and so on.
#[must_use]
pub fn time_of_day(daylight: &Daylight, timestamp: DateTime<Utc>) -> TimeOfDay {
    let events = match daylight {
        Daylight::Regular(events) => events,
        Daylight::AlwaysUp => return TimeOfDay::Day,
        Daylight::AlwaysDown => return TimeOfDay::Night,
    };

    if timestamp < events.dawn {
        TimeOfDay::Night
    } else if timestamp < events.sunrise {
        TimeOfDay::Dawn
    } else if timestamp < events.noon {
        TimeOfDay::Sunrise
    } else if timestamp < events.sunset {
        TimeOfDay::Day
    } else if timestamp < events.dusk {
        TimeOfDay::Sunset
    } else {
        TimeOfDay::Night
    }
}

/// Night sky tags.
///
/// The moon counts as visible when the time is after moonrise or before
/// moonset. This is a loose test that can report the moon on days where it
/// set before rising, which is acceptable for picking scenery.
#[must_use]
pub fn night_sky(
    lunar: &LunarEvents,
    timestamp: DateTime<Utc>,
    clear_sky: bool,
) -> (Vec<Tag>, Option<MoonTag>) {
    let mut tags = vec![Tag::new("night"), Tag::new("darkness")];

    let after_rise = lunar.moonrise.is_some_and(|rise| timestamp > rise);
    let before_set = lunar.moonset.is_some_and(|set| timestamp < set);

    let moon = (after_rise || before_set).then(|| MoonTag::for_phase(lunar.phase));
    if let Some(moon) = moon {
        tags.push(Tag::emphasized(moon.as_str(), 2));
    }

    if clear_sky {
        tags.push(Tag::emphasized("starry sky", 1));
    }

    (tags, moon)
}

/// Classify a local timestamp into time-of-day tags.
///
/// Lunar events are only looked up for night.
pub fn classify_time<Tz: TimeZone>(
    ephemeris: &dyn Ephemeris,
    location: &Location,
    timestamp: &DateTime<Tz>,
    clear_sky: bool,
) -> Result<TimeReading> {
    let date = timestamp.with_timezone(&location.timezone).date_naive();
    let instant = timestamp.with_timezone(&Utc);

    let daylight = ephemeris.daylight(location, date)?;
    let time_of_day = time_of_day(&daylight, instant);

    let (tags, moon) = match time_of_day {
        TimeOfDay::Night => {
            let lunar = ephemeris.lunar_events(location, date)?;
            night_sky(&lunar, instant, clear_sky)
        }
        other => (vec![Tag::new(other.as_str())], None),
    };

    Ok(TimeReading {
        time_of_day,
        moon,
        tags,
        context: TimeContext {
            is_daytime: time_of_day == TimeOfDay::Day,
            is_full_moon: moon == Some(MoonTag::Full),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::SolarEvents;
    use crate::prompt::testing::{FixedEphemeris, oakland, utc};
    use chrono::Duration;
    use rstest::rstest;

    fn events() -> SolarEvents {
        SolarEvents {
            dawn: utc(2024, 4, 15, 13, 0),
            sunrise: utc(2024, 4, 15, 13, 30),
            noon: utc(2024, 4, 15, 20, 0),
            sunset: utc(2024, 4, 16, 2, 30),
            dusk: utc(2024, 4, 16, 3, 0),
        }
    }

    #[rstest]
    #[case(utc(2024, 4, 15, 12, 59), TimeOfDay::Night)]
    #[case(utc(2024, 4, 15, 13, 0), TimeOfDay::Dawn)]
    #[case(utc(2024, 4, 15, 13, 29), TimeOfDay::Dawn)]
    #[case(utc(2024, 4, 15, 13, 30), TimeOfDay::Sunrise)]
    #[case(utc(2024, 4, 15, 20, 0), TimeOfDay::Day)]
    #[case(utc(2024, 4, 16, 2, 30), TimeOfDay::Sunset)]
    #[case(utc(2024, 4, 16, 3, 0), TimeOfDay::Night)]
    fn test_half_open_boundaries(#[case] timestamp: DateTime<Utc>, #[case] expected: TimeOfDay) {
        let daylight = Daylight::Regular(events());
        assert_eq!(time_of_day(&daylight, timestamp), expected);
    }

    #[test]
    fn test_every_minute_gets_one_bucket() {
        let daylight = Daylight::Regular(events());
        let start = utc(2024, 4, 15, 7, 0);
        let mut previous = time_of_day(&daylight, start);
        let mut transitions = 0;
        for minute in 1..(24 * 60) {
            let current = time_of_day(&daylight, start + Duration::minutes(minute));
            if current != previous {
                transitions += 1;
            }
            previous = current;
        }
        // night -> dawn -> sunrise -> day -> sunset -> night
        assert_eq!(transitions, 5);
    }

    #[test]
    fn test_polar_days() {
        let instant = utc(2024, 6, 21, 0, 0);
        assert_eq!(time_of_day(&Daylight::AlwaysUp, instant), TimeOfDay::Day);
        assert_eq!(time_of_day(&Daylight::AlwaysDown, instant), TimeOfDay::Night);
    }

    #[rstest]
    #[case(0.0, MoonTag::Crescent)]
    #[case(6.99, MoonTag::Crescent)]
    #[case(7.0, MoonTag::Crescent)]
    #[case(10.0, MoonTag::Crescent)]
    #[case(13.99, MoonTag::Crescent)]
    #[case(14.0, MoonTag::Full)]
    #[case(17.0, MoonTag::Full)]
    #[case(20.99, MoonTag::Full)]
    #[case(21.0, MoonTag::Crescent)]
    #[case(25.0, MoonTag::Crescent)]
    fn test_moon_phase_tags(#[case] phase: f64, #[case] expected: MoonTag) {
        assert_eq!(MoonTag::for_phase(phase), expected);
    }

    /// New moon and last quarter both show a crescent rather than a dark sky
    /// or a half moon. Pinned so a change here is deliberate.
    #[test]
    fn test_new_and_last_quarter_collapse_to_crescent() {
        assert_eq!(MoonTag::for_phase(1.0), MoonTag::Crescent);
        assert_eq!(MoonTag::for_phase(24.0), MoonTag::Crescent);
        assert_eq!(MoonTag::for_phase(1.0), MoonTag::for_phase(10.0));
    }

    #[test]
    fn test_night_sky_with_visible_moon() {
        let lunar = LunarEvents {
            moonrise: Some(utc(2024, 4, 16, 1, 0)),
            moonset: None,
            phase: 17.0,
        };
        let (tags, moon) = night_sky(&lunar, utc(2024, 4, 16, 5, 0), true);
        assert_eq!(moon, Some(MoonTag::Full));
        let rendered: Vec<String> = tags.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["night", "darkness", "((full moon))", "(starry sky)"]);
    }

    #[test]
    fn test_night_sky_without_moon_or_stars() {
        let lunar = LunarEvents {
            moonrise: Some(utc(2024, 4, 16, 6, 0)),
            moonset: Some(utc(2024, 4, 15, 20, 0)),
            phase: 17.0,
        };
        let (tags, moon) = night_sky(&lunar, utc(2024, 4, 16, 5, 0), false);
        assert_eq!(moon, None);
        assert_eq!(tags, vec![Tag::new("night"), Tag::new("darkness")]);
    }

    #[test]
    fn test_moon_before_set_counts_as_visible() {
        let lunar = LunarEvents {
            moonrise: None,
            moonset: Some(utc(2024, 4, 16, 9, 0)),
            phase: 10.0,
        };
        let (_, moon) = night_sky(&lunar, utc(2024, 4, 16, 5, 0), false);
        assert_eq!(moon, Some(MoonTag::Crescent));
    }

    #[test]
    fn test_classify_time_sets_context() {
        let ephemeris = FixedEphemeris::new(Daylight::Regular(events()), 17.0);
        let location = oakland();

        let noon = utc(2024, 4, 15, 21, 0).with_timezone(&location.timezone);
        let reading = classify_time(&ephemeris, &location, &noon, true).unwrap();
        assert_eq!(reading.time_of_day, TimeOfDay::Day);
        assert_eq!(reading.tags, vec![Tag::new("day")]);
        assert!(reading.context.is_daytime);
        assert!(!reading.context.is_full_moon);

        let late = utc(2024, 4, 16, 5, 0).with_timezone(&location.timezone);
        let reading = classify_time(&ephemeris, &location, &late, false).unwrap();
        assert_eq!(reading.time_of_day, TimeOfDay::Night);
        assert!(reading.context.is_full_moon);
        assert!(!reading.context.is_daytime);
    }
}
