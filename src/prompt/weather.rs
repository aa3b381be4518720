use crate::models::{Tag, WeatherCondition, WeatherObservation};

use super::diurnal::TimeContext;

/// Positive and negative tags produced from the current weather
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeatherTags {
    pub positive: Vec<Tag>,
    pub negative: Vec<Tag>,
}

fn tags(texts: &[&str]) -> Vec<Tag> {
    texts.iter().copied().map(Tag::new).collect()
}

/// Sky tags and the tags that would contradict them
fn condition_tags(condition: WeatherCondition) -> (Vec<Tag>, Vec<Tag>) {
    match condition {
        WeatherCondition::ClearSky => (tags(&["clear sky"]), tags(&["cloudy sky", "cloud"])),
        WeatherCondition::FewClouds
        | WeatherCondition::ScatteredClouds
        | WeatherCondition::BrokenClouds => (tags(&["cloudy sky"]), Vec::new()),
        WeatherCondition::ShowerRain => (tags(&["rain"]), Vec::new()),
        WeatherCondition::Rain => (tags(&["rain"]), tags(&["clear sky"])),
        WeatherCondition::Thunderstorm => (
            tags(&["lightning", "storm", "storm cloud"]),
            tags(&["clear sky"]),
        ),
        WeatherCondition::Snow => (tags(&["snow"]), tags(&["clear sky"])),
        WeatherCondition::Mist | WeatherCondition::Fog => (tags(&["fog"]), tags(&["clear sky"])),
        WeatherCondition::Haze => (tags(&["fog", "haze", "smoke"]), tags(&["clear sky"])),
    }
}

/// Clothing for the temperature in Celsius
fn clothing_tags(celsius: f64, condition: WeatherCondition) -> Vec<Tag> {
    if celsius < 15.0 {
        let mut clothing = tags(&["winter clothes", "cold"]);
        if celsius < 5.0 {
            clothing.extend(tags(&["scarf", "jacket"]));
        }
        clothing
    } else if celsius > 100.0 {
        tags(&["swimsuit"])
    } else if celsius > 85.0 && condition.is_clear() {
        tags(&["sun_hat"])
    } else {
        Vec::new()
    }
}

/// Classify a weather observation into prompt tags
#[must_use]
pub fn classify_weather(observation: &WeatherObservation, time: &TimeContext) -> WeatherTags {
    let condition = observation.condition;
    let (mut positive, mut negative) = condition_tags(condition);

    if condition == WeatherCondition::BrokenClouds {
        if time.is_daytime {
            positive.extend(tags(&["dappled sunlight", "sunbeam"]));
        } else if time.is_full_moon {
            positive.push(Tag::new("dappled moonlight"));
        }
    }

    if condition != WeatherCondition::Snow {
        negative.push(Tag::new("snow"));
    }

    positive.extend(clothing_tags(observation.temperature_celsius(), condition));

    WeatherTags { positive, negative }
}
