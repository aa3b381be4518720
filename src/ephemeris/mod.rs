//! Solar and lunar event times for a location and date
//!
//! The prompt rules only need a handful of instants (twilight, sunrise, noon,
//! sunset, moonrise, moonset) and the lunar phase. They are reached through
//! the [`Ephemeris`] trait so classification can be tested against fixed
//! event tables.

pub mod lunar;
pub mod solar;

use chrono::{DateTime, NaiveDate, Utc};

use crate::Result;
use crate::models::Location;

/// Solar event instants for one local day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolarEvents {
    /// Start of civil twilight
    pub dawn: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    /// Solar noon
    pub noon: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    /// End of civil twilight
    pub dusk: DateTime<Utc>,
}

/// Shape of a local day at a location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Daylight {
    /// The sun rises and sets
    Regular(SolarEvents),
    /// Midnight sun: the sun stays above the horizon
    AlwaysUp,
    /// Polar night: the sun stays below the horizon
    AlwaysDown,
}

/// Moon events for one local day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LunarEvents {
    /// Absent on days the moon does not rise
    pub moonrise: Option<DateTime<Utc>>,
    /// Absent on days the moon does not set
    pub moonset: Option<DateTime<Utc>>,
    /// Phase on a 0.0..28.0 scale: 0 new, 7 first quarter, 14 full,
    /// 21 last quarter
    pub phase: f64,
}

/// Source of solar and lunar event times
pub trait Ephemeris: Send + Sync {
    /// Solar events for the local calendar day `date` at `location`
    fn daylight(&self, location: &Location, date: NaiveDate) -> Result<Daylight>;

    /// Moonrise, moonset and phase for the local calendar day `date`
    fn lunar_events(&self, location: &Location, date: NaiveDate) -> Result<LunarEvents>;
}

/// Ephemeris backed by the `sunrise` crate for the sun and a low-precision
/// lunar model for the moon
#[derive(Debug, Clone, Copy, Default)]
pub struct AstronomicalEphemeris;

impl Ephemeris for AstronomicalEphemeris {
    fn daylight(&self, location: &Location, date: NaiveDate) -> Result<Daylight> {
        solar::daylight(location, date)
    }

    fn lunar_events(&self, location: &Location, date: NaiveDate) -> Result<LunarEvents> {
        let start = location.local_midnight(date);
        let (moonrise, moonset) = lunar::moon_times(start, location.latitude, location.longitude);
        Ok(LunarEvents {
            moonrise,
            moonset,
            phase: lunar::phase(date),
        })
    }
}
