//! `Skyframe` - Context-aware generative wallpapers and photo-frame images
//!
//! This library turns the current place, time and weather into prompt tags
//! for a text-to-image model, then generates, upscales and publishes the
//! image to the desktop or a Skylight photo frame.

pub mod config;
pub mod ephemeris;
pub mod error;
pub mod generation;
pub mod images;
pub mod location_resolver;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod publish;
pub mod weather;

// Re-export core types for public API
pub use config::{Credentials, GenerationProfile, SkyframeConfig, TargetConfig};
pub use ephemeris::{AstronomicalEphemeris, Daylight, Ephemeris, LunarEvents, SolarEvents};
pub use error::SkyframeError;
pub use generation::{GenerationRequest, ImageGenerator, ReplicateClient};
pub use images::ImageStore;
pub use location_resolver::{Geolocator, IpInfoLocator, LocationResolver};
pub use models::{Location, Prompt, Tag, TagSet, WeatherCondition, WeatherObservation};
pub use pipeline::{PromptPreview, PromptService, UpdateService};
pub use prompt::{PromptContext, Season, TimeContext, TimeOfDay, derive_tags};
pub use publish::{DesktopWallpaper, Publisher, SkylightFrame};
pub use weather::{OpenWeatherMapClient, WeatherProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SkyframeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
