use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::Tag;
use crate::{Result, SkyframeError};

/// Leap year so that Feb 29 inputs have a reference date
const REFERENCE_YEAR: i32 = 2000;

/// Seasons feel like they arrive before their astronomical start
const SEASON_SHIFT_DAYS: i64 = 15;

/// (season, (month, day) start, (month, day) end) before the shift
const SEASON_RANGES: [(Season, (u32, u32), (u32, u32)); 5] = [
    (Season::Winter, (1, 1), (3, 20)),
    (Season::Spring, (3, 21), (6, 20)),
    (Season::Summer, (6, 21), (9, 22)),
    (Season::Autumn, (9, 23), (12, 20)),
    (Season::Winter, (12, 21), (12, 31)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        }
    }

    #[must_use]
    pub fn tags(&self) -> Vec<Tag> {
        vec![Tag::new(self.as_str())]
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn reference_date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        SkyframeError::classification(format!("Invalid reference date {year}-{month}-{day}"))
    })
}

/// Season for a calendar date, ignoring the year.
///
/// Ranges are shifted 15 days later than the astronomical seasons. The
/// shifted late-December ranges spill into the next January, so the date is
/// compared both in the reference year and in the year after.
pub fn season_for(date: NaiveDate) -> Result<Season> {
    let shift = Duration::days(SEASON_SHIFT_DAYS);

    let candidates = [REFERENCE_YEAR, REFERENCE_YEAR + 1]
        .into_iter()
        .filter_map(|year| NaiveDate::from_ymd_opt(year, date.month(), date.day()));

    for candidate in candidates {
        for (season, (start_month, start_day), (end_month, end_day)) in SEASON_RANGES {
            let start = reference_date(REFERENCE_YEAR, start_month, start_day)? + shift;
            let end = reference_date(REFERENCE_YEAR, end_month, end_day)? + shift;
            if start <= candidate && candidate <= end {
                return Ok(season);
            }
        }
    }

    Err(SkyframeError::classification(format!(
        "No season matches {}",
        date.format("%m-%d")
    )))
}
