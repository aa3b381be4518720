//! Configuration management for the `Skyframe` application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Timelike};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::SkyframeError;
use crate::models::Location;

/// Root configuration structure for the `Skyframe` application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyframeConfig {
    /// Image generation backend settings
    pub image: ImageConfig,
    /// Scheduling and seeding
    pub schedule: ScheduleConfig,
    /// Where downloaded images are kept
    pub images: ImageStoreConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Named generation profiles (base tags and character pools)
    pub profiles: BTreeMap<String, GenerationProfile>,
    /// Display surfaces to update on every run
    pub targets: Vec<TargetConfig>,
}

/// Image generation settings for the Replicate backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Base URL of the prediction API
    #[serde(default = "default_replicate_base_url")]
    pub base_url: String,
    /// Text-to-image model as `owner/name`
    #[serde(default = "default_model")]
    pub model: String,
    /// Pinned model version; the model's latest version is used when absent
    #[serde(default)]
    pub model_version: Option<String>,
    /// Upscaling model as `owner/name`
    #[serde(default = "default_upscale_model")]
    pub upscale_model: String,
    #[serde(default)]
    pub upscale_model_version: Option<String>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Number of denoising steps
    #[serde(default = "default_steps")]
    pub steps: u32,
    /// Sampler / scheduler name understood by the model
    #[serde(default = "default_scheduler")]
    pub scheduler: String,
    /// Seconds between prediction status polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Give up on a prediction after this many seconds
    #[serde(default = "default_prediction_timeout")]
    pub prediction_timeout_seconds: u64,
    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

/// How often to run and how to seed sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minutes between scheduled runs
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    /// Which clock field seeds character and addon sampling
    #[serde(default)]
    pub seed_source: SeedSource,
}

/// Clock field used as the sampling seed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    /// Same characters and scenery for a whole day
    #[default]
    DayOfMonth,
    /// Changes every second
    SecondOfMinute,
}

impl SeedSource {
    /// Seed derived from the given wall-clock time
    #[must_use]
    pub fn seed_at<T: Datelike + Timelike>(&self, time: &T) -> u64 {
        match self {
            SeedSource::DayOfMonth => u64::from(time.day()),
            SeedSource::SecondOfMinute => u64::from(time.second()),
        }
    }
}

/// Local image storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageStoreConfig {
    /// Directory for downloaded images
    #[serde(default = "default_image_directory")]
    pub directory: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Tags and character pools for one style of image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationProfile {
    #[serde(default)]
    pub base: BaseTags,
    #[serde(default)]
    pub characters: Vec<CharacterProfile>,
}

/// Tags placed at the start of every prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseTags {
    #[serde(default)]
    pub prompt: Vec<String>,
    #[serde(default)]
    pub negative_prompt: Vec<String>,
}

/// Option pools for one character's appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub hair_len: Vec<String>,
    pub hair_color: Vec<String>,
    pub position: Vec<String>,
    pub accessory: Vec<String>,
}

impl CharacterProfile {
    /// The four pools in sampling order
    #[must_use]
    pub fn pools(&self) -> [(&'static str, &[String]); 4] {
        [
            ("hair_len", &self.hair_len),
            ("hair_color", &self.hair_color),
            ("position", &self.position),
            ("accessory", &self.accessory),
        ]
    }
}

/// A display surface and the profile used to fill it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    pub kind: TargetKind,
    /// Name of the generation profile
    #[serde(default = "default_profile_name")]
    pub profile: String,
    #[serde(default)]
    pub location: LocationConfig,
    /// Skylight frame to publish to; the first frame on the account otherwise
    #[serde(default)]
    pub frame_name: Option<String>,
    /// Seconds to wait after an upload before deleting older frame assets
    #[serde(default = "default_settle_seconds")]
    pub settle_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Wallpaper,
    Skylight,
}

/// Where a target's location comes from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum LocationConfig {
    /// Look up the machine's public IP
    #[default]
    Ip,
    /// A fixed place, e.g. where a photo frame hangs
    Fixed {
        #[serde(default = "default_location_name")]
        name: String,
        #[serde(default)]
        region: String,
        latitude: f64,
        longitude: f64,
        /// IANA name; looked up from the coordinates when absent
        #[serde(default)]
        timezone: Option<String>,
    },
}

impl LocationConfig {
    /// Build the fixed location, `None` when the location comes from IP lookup
    pub fn fixed_location(&self) -> crate::Result<Option<Location>> {
        match self {
            LocationConfig::Ip => Ok(None),
            LocationConfig::Fixed {
                name,
                region,
                latitude,
                longitude,
                timezone,
            } => match timezone {
                Some(timezone) => Location::with_timezone_name(
                    name.clone(),
                    region.clone(),
                    timezone,
                    *latitude,
                    *longitude,
                ),
                None => Location::from_coordinates(
                    name.clone(),
                    region.clone(),
                    *latitude,
                    *longitude,
                ),
            }
            .map(Some),
        }
    }
}

/// API credentials, read from the environment
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub owm_api_key: Option<String>,
    pub replicate_api_token: Option<String>,
    pub skylight_api_token: Option<String>,
}

impl Credentials {
    /// Read credentials from `OWM_API_KEY`, `REPLICATE_API_TOKEN` and
    /// `SKYLIGHT_API_TOKEN`
    #[must_use]
    pub fn from_env() -> Self {
        let read = |key: &str| env::var(key).ok().filter(|value| !value.trim().is_empty());
        Self {
            owm_api_key: read("OWM_API_KEY"),
            replicate_api_token: read("REPLICATE_API_TOKEN"),
            skylight_api_token: read("SKYLIGHT_API_TOKEN"),
        }
    }

    pub fn owm_api_key(&self) -> crate::Result<&str> {
        Self::require(self.owm_api_key.as_deref(), "OWM_API_KEY")
    }

    pub fn replicate_api_token(&self) -> crate::Result<&str> {
        Self::require(self.replicate_api_token.as_deref(), "REPLICATE_API_TOKEN")
    }

    pub fn skylight_api_token(&self) -> crate::Result<&str> {
        Self::require(self.skylight_api_token.as_deref(), "SKYLIGHT_API_TOKEN")
    }

    fn require<'a>(value: Option<&'a str>, name: &str) -> crate::Result<&'a str> {
        value.ok_or_else(|| {
            SkyframeError::configuration(format!("Missing {name} environment variable"))
        })
    }
}

// Default value functions
fn default_replicate_base_url() -> String {
    "https://api.replicate.com/v1".to_string()
}

fn default_model() -> String {
    "tstramer/waifu-diffusion".to_string()
}

fn default_upscale_model() -> String {
    "nightmareai/real-esrgan".to_string()
}

fn default_width() -> u32 {
    1024
}

fn default_height() -> u32 {
    640
}

fn default_steps() -> u32 {
    50
}

fn default_scheduler() -> String {
    "K_EULER_ANCESTRAL".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_prediction_timeout() -> u64 {
    600
}

fn default_request_timeout() -> u64 {
    30
}

fn default_interval_minutes() -> u32 {
    60
}

fn default_image_directory() -> String {
    "images".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_profile_name() -> String {
    "default".to_string()
}

fn default_location_name() -> String {
    "User Location".to_string()
}

fn default_settle_seconds() -> u64 {
    15
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: default_replicate_base_url(),
            model: default_model(),
            model_version: None,
            upscale_model: default_upscale_model(),
            upscale_model_version: None,
            width: default_width(),
            height: default_height(),
            steps: default_steps(),
            scheduler: default_scheduler(),
            poll_interval_seconds: default_poll_interval(),
            prediction_timeout_seconds: default_prediction_timeout(),
            timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            seed_source: SeedSource::default(),
        }
    }
}

impl Default for ImageStoreConfig {
    fn default() -> Self {
        Self {
            directory: default_image_directory(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl GenerationProfile {
    /// Landscape scenery with one character seen from behind
    #[must_use]
    pub fn scenery() -> Self {
        Self {
            base: BaseTags {
                prompt: strings(&[
                    "outdoors",
                    "scenery",
                    "4k",
                    "from behind",
                    "1girl",
                    "masterpiece",
                    "best quality",
                    "landscape",
                    "ivan shishkin",
                ]),
                negative_prompt: strings(&[
                    "lowres",
                    "bad anatomy",
                    "text",
                    "error",
                    "worst quality",
                    "low quality",
                    "jpeg artifacts",
                    "signature",
                    "watermark",
                    "blurry",
                ]),
            },
            characters: vec![CharacterProfile {
                hair_len: strings(&["long hair", "very long hair", "short hair"]),
                hair_color: strings(&[
                    "white hair",
                    "brown hair",
                    "purple hair",
                    "blonde hair",
                    "black hair",
                    "red hair",
                    "blue hair",
                    "green hair",
                ]),
                position: strings(&["standing", "sitting"]),
                accessory: strings(&["hat", "witch hat", "ribbon", "cat ears", "", ""]),
            }],
        }
    }
}

impl Default for SkyframeConfig {
    fn default() -> Self {
        Self {
            image: ImageConfig::default(),
            schedule: ScheduleConfig::default(),
            images: ImageStoreConfig::default(),
            logging: LoggingConfig::default(),
            profiles: BTreeMap::from([(default_profile_name(), GenerationProfile::scenery())]),
            targets: vec![TargetConfig {
                name: "wallpaper".to_string(),
                kind: TargetKind::Wallpaper,
                profile: default_profile_name(),
                location: LocationConfig::Ip,
                frame_name: None,
                settle_seconds: default_settle_seconds(),
            }],
        }
    }
}

impl SkyframeConfig {
    /// Load configuration from the given file, or the default locations when
    /// `None`, with `SKYFRAME_` environment overrides
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // An explicit path must exist; the default locations are optional
        match config_path {
            Some(config_file) => {
                if !config_file.is_file() {
                    return Err(SkyframeError::configuration(format!(
                        "Configuration file not found: {}",
                        config_file.display()
                    ))
                    .into());
                }
                builder = builder.add_source(
                    File::from(config_file).format(config::FileFormat::Toml),
                );
            }
            None => {
                let config_file = Self::get_config_path()
                    .filter(|path| path.exists())
                    .unwrap_or_else(|| PathBuf::from("config.toml"));
                if config_file.exists() {
                    builder = builder.add_source(
                        File::from(config_file)
                            .required(false)
                            .format(config::FileFormat::Toml),
                    );
                }
            }
        }

        // Add environment variable overrides with SKYFRAME_ prefix
        builder = builder.add_source(
            Environment::with_prefix("SKYFRAME")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SkyframeConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("skyframe").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.image.base_url.is_empty() {
            self.image.base_url = default_replicate_base_url();
        }
        if self.image.scheduler.is_empty() {
            self.image.scheduler = default_scheduler();
        }
        if self.image.poll_interval_seconds == 0 {
            self.image.poll_interval_seconds = default_poll_interval();
        }
        if self.image.timeout_seconds == 0 {
            self.image.timeout_seconds = default_request_timeout();
        }
        if self.schedule.interval_minutes == 0 {
            self.schedule.interval_minutes = default_interval_minutes();
        }
        if self.images.directory.is_empty() {
            self.images.directory = default_image_directory();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.profiles.is_empty() {
            self.profiles
                .insert(default_profile_name(), GenerationProfile::scenery());
        }
    }

    /// Look up a generation profile by name.
    ///
    /// Configuration keys are case-insensitive, so a lowercase match is
    /// accepted as well.
    pub fn profile(&self, name: &str) -> crate::Result<&GenerationProfile> {
        self.profiles
            .get(name)
            .or_else(|| self.profiles.get(&name.to_lowercase()))
            .ok_or_else(|| {
                SkyframeError::configuration(format!(
                    "Unknown generation profile '{name}'. Available: {}",
                    self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
                ))
            })
    }

    /// Find a target by name
    pub fn target(&self, name: &str) -> crate::Result<&TargetConfig> {
        self.targets
            .iter()
            .find(|target| target.name == name)
            .ok_or_else(|| SkyframeError::configuration(format!("Unknown target '{name}'")))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_profiles()?;
        self.validate_targets()?;
        Ok(())
    }

    /// Check that every credential the configured targets need is present
    pub fn validate_credentials(&self, credentials: &Credentials) -> crate::Result<()> {
        credentials.owm_api_key()?;
        credentials.replicate_api_token()?;
        if self
            .targets
            .iter()
            .any(|target| target.kind == TargetKind::Skylight)
        {
            credentials.skylight_api_token()?;
        }
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        for (name, value) in [("width", self.image.width), ("height", self.image.height)] {
            if value == 0 || value > 2048 || value % 8 != 0 {
                return Err(SkyframeError::configuration(format!(
                    "Image {name} must be a multiple of 8 between 8 and 2048, got {value}"
                ))
                .into());
            }
        }

        if self.image.steps == 0 || self.image.steps > 500 {
            return Err(
                SkyframeError::configuration("Image steps must be between 1 and 500").into(),
            );
        }

        if self.image.timeout_seconds > 300 {
            return Err(SkyframeError::configuration(
                "Image API timeout cannot exceed 300 seconds",
            )
            .into());
        }

        if self.schedule.interval_minutes > 24 * 60 {
            return Err(SkyframeError::configuration(
                "Schedule interval cannot exceed 1440 minutes (1 day)",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(SkyframeError::configuration(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(SkyframeError::configuration(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.image.base_url.starts_with("http://")
            && !self.image.base_url.starts_with("https://")
        {
            return Err(SkyframeError::configuration(
                "Image API base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        for model in [&self.image.model, &self.image.upscale_model] {
            if model.split('/').filter(|part| !part.is_empty()).count() != 2 {
                return Err(SkyframeError::configuration(format!(
                    "Model '{model}' must be written as owner/name"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Every character pool must offer at least one option
    fn validate_profiles(&self) -> Result<()> {
        for (profile_name, profile) in &self.profiles {
            for (index, character) in profile.characters.iter().enumerate() {
                for (pool, options) in character.pools() {
                    if options.is_empty() {
                        return Err(SkyframeError::configuration(format!(
                            "Profile '{profile_name}' character {index} has an empty {pool} list"
                        ))
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_targets(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(SkyframeError::configuration(format!(
                    "Duplicate target name '{}'",
                    target.name
                ))
                .into());
            }

            self.profile(&target.profile)?;
            target
                .location
                .fixed_location()
                .with_context(|| format!("Invalid location for target '{}'", target.name))?;

            if target.settle_seconds > 300 {
                return Err(SkyframeError::configuration(format!(
                    "Target '{}' settle time cannot exceed 300 seconds",
                    target.name
                ))
                .into());
            }
        }
        Ok(())
    }
}
