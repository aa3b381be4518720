//! Prompt derivation
//!
//! Turns where and when an image is being made into an ordered set of
//! diffusion prompt tags. Each concern lives in its own classifier:
//!
//! - [`diurnal`]: time of day, moon and stars
//! - [`weather`]: sky, precipitation and clothing
//! - [`season`]: season of the year
//! - [`sampler`]: seeded character looks and scenic addons
//!
//! [`derive_tags`] runs them in a fixed order. Derivation is synchronous and
//! only touches the network-free [`Ephemeris`].

pub mod diurnal;
pub mod sampler;
pub mod season;
pub mod weather;

use chrono::{DateTime, TimeZone};
use tracing::debug;

use crate::Result;
use crate::config::GenerationProfile;
use crate::ephemeris::Ephemeris;
use crate::models::{Location, TagSet, WeatherObservation};

pub use diurnal::{MoonTag, TimeContext, TimeOfDay, TimeReading, classify_time};
pub use sampler::{ADDONS, addon_tags, character_tags};
pub use season::{Season, season_for};
pub use weather::{WeatherTags, classify_weather};

/// Everything the prompt depends on for one image
#[derive(Debug, Clone)]
pub struct PromptContext<'a, Tz: TimeZone> {
    pub location: &'a Location,
    pub timestamp: DateTime<Tz>,
    pub observation: &'a WeatherObservation,
    pub seed: u64,
    pub profile: &'a GenerationProfile,
}

/// Build the tag set for one image.
///
/// Order: base tags, characters, time of day, weather, season, addons. Any
/// classification error aborts the whole derivation.
pub fn derive_tags<Tz: TimeZone>(
    ephemeris: &dyn Ephemeris,
    context: &PromptContext<'_, Tz>,
) -> Result<TagSet> {
    let mut tags = TagSet::new();

    tags.extend_positive(context.profile.base.prompt.iter().map(String::as_str));
    tags.extend_negative(context.profile.base.negative_prompt.iter().map(String::as_str));

    tags.extend_positive(character_tags(context.seed, &context.profile.characters)?);

    let time = classify_time(
        ephemeris,
        context.location,
        &context.timestamp,
        context.observation.condition.is_clear(),
    )?;
    debug!(
        "Time of day at {}: {} (moon: {:?})",
        context.location.name, time.time_of_day, time.moon
    );
    tags.extend_positive(time.tags);

    let weather = classify_weather(context.observation, &time.context);
    tags.extend_positive(weather.positive);
    tags.extend_negative(weather.negative);

    let local_date = context
        .timestamp
        .with_timezone(&context.location.timezone)
        .date_naive();
    let season = season_for(local_date)?;
    tags.extend_positive(season.tags());

    tags.extend_positive(addon_tags(context.seed));

    Ok(tags)
}


#[cfg(test)]
mod tests {
    use super::testing::{FixedEphemeris, oakland, utc};
    use super::*;
    use crate::ephemeris::{Daylight, SolarEvents};
    use crate::models::WeatherCondition;

    fn regular_day() -> Daylight {
        Daylight::Regular(SolarEvents {
            dawn: utc(2024, 4, 15, 13, 0),
            sunrise: utc(2024, 4, 15, 13, 30),
            noon: utc(2024, 4, 15, 20, 0),
            sunset: utc(2024, 4, 16, 2, 30),
            dusk: utc(2024, 4, 16, 3, 0),
        })
    }

    #[test]
    fn test_tag_order() {
        let location = oakland();
        let profile = GenerationProfile::scenery();
        let observation = WeatherObservation::new(WeatherCondition::BrokenClouds, 280.0);
        let ephemeris = FixedEphemeris::new(regular_day(), 17.0);

        let context = PromptContext {
            location: &location,
            timestamp: utc(2024, 4, 15, 21, 0).with_timezone(&location.timezone),
            observation: &observation,
            seed: 5,
            profile: &profile,
        };
        let tags = derive_tags(&ephemeris, &context).unwrap();

        let positive: Vec<&str> = tags.positive().iter().map(|tag| tag.text()).collect();
        let characters = character_tags(5, &profile.characters).unwrap();
        let addons = addon_tags(5);

        let mut expected: Vec<&str> = profile.base.prompt.iter().map(String::as_str).collect();
        expected.extend(characters.iter().map(|tag| tag.text()));
        expected.extend([
            "day",
            "cloudy sky",
            "dappled sunlight",
            "sunbeam",
            "winter clothes",
            "cold",
            "spring",
        ]);
        expected.extend(addons.iter().map(|tag| tag.text()));
        assert_eq!(positive, expected);

        let negative: Vec<&str> = tags.negative().iter().map(|tag| tag.text()).collect();
        assert_eq!(negative.last(), Some(&"snow"));
        assert_eq!(negative.len(), profile.base.negative_prompt.len() + 1);
    }

    #[test]
    fn test_clear_night_shows_stars() {
        let location = oakland();
        let profile = GenerationProfile::default();
        let observation = WeatherObservation::new(WeatherCondition::ClearSky, 290.0);
        let ephemeris = FixedEphemeris::new(Daylight::AlwaysDown, 17.0);

        let context = PromptContext {
            location: &location,
            timestamp: utc(2024, 12, 21, 8, 0),
            observation: &observation,
            seed: 1,
            profile: &profile,
        };
        let prompt = derive_tags(&ephemeris, &context).unwrap().render();
        assert!(prompt
            .positive
            .starts_with("night, darkness, ((full moon)), (starry sky), clear sky, autumn, "));
        assert_eq!(prompt.negative, "cloudy sky, cloud, snow");
    }

    #[test]
    fn test_same_inputs_same_prompt() {
        let location = oakland();
        let profile = GenerationProfile::scenery();
        let observation = WeatherObservation::new(WeatherCondition::Rain, 290.0);
        let ephemeris = FixedEphemeris::new(regular_day(), 3.0);
        let context = PromptContext {
            location: &location,
            timestamp: utc(2024, 4, 15, 14, 0),
            observation: &observation,
            seed: 9,
            profile: &profile,
        };

        let first = derive_tags(&ephemeris, &context).unwrap().render();
        let second = derive_tags(&ephemeris, &context).unwrap().render();
        assert_eq!(first, second);
        assert!(first.positive.contains("sunrise"));
    }
}
