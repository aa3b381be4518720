//! Update pipeline: location and weather in, published image out
//!
//! Each target runs its steps strictly one after another. A failing target is
//! logged and skipped; the next scheduled run tries again from scratch.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::config::{Credentials, SkyframeConfig, TargetConfig, TargetKind};
use crate::ephemeris::{AstronomicalEphemeris, Ephemeris};
use crate::generation::{GenerationRequest, ImageGenerator, ReplicateClient};
use crate::images::ImageStore;
use crate::location_resolver::{Geolocator, IpInfoLocator, LocationResolver};
use crate::models::{Location, Prompt, WeatherObservation};
use crate::prompt::{PromptContext, derive_tags};
use crate::publish::{DesktopWallpaper, Publisher, SkylightFrame};
use crate::weather::{OpenWeatherMapClient, WeatherProvider};

/// A derived prompt together with what it was derived from
#[derive(Debug, Clone)]
pub struct PromptPreview {
    pub target: String,
    pub location: Location,
    pub local_time: DateTime<Tz>,
    pub observation: WeatherObservation,
    pub seed: u64,
    pub prompt: Prompt,
}

/// Derives prompts from live location and weather
pub struct PromptService {
    config: SkyframeConfig,
    ephemeris: Box<dyn Ephemeris>,
    geolocator: Box<dyn Geolocator>,
    weather: Box<dyn WeatherProvider>,
}

impl PromptService {
    pub fn new(
        config: SkyframeConfig,
        ephemeris: Box<dyn Ephemeris>,
        geolocator: Box<dyn Geolocator>,
        weather: Box<dyn WeatherProvider>,
    ) -> Self {
        Self {
            config,
            ephemeris,
            geolocator,
            weather,
        }
    }

    /// Production collaborators: ipinfo.io, `OpenWeatherMap` and the
    /// built-in ephemeris
    pub fn from_config(config: SkyframeConfig, credentials: &Credentials) -> Result<Self> {
        let timeout = Duration::from_secs(config.image.timeout_seconds);
        let weather = OpenWeatherMapClient::new(credentials.owm_api_key()?, timeout)?;
        let geolocator = IpInfoLocator::new(timeout)?;
        Ok(Self::new(
            config,
            Box::new(AstronomicalEphemeris),
            Box::new(geolocator),
            Box::new(weather),
        ))
    }

    #[must_use]
    pub fn config(&self) -> &SkyframeConfig {
        &self.config
    }

    /// Resolve the target's location, fetch the weather and derive the
    /// prompt for `now`. `seed` overrides the configured seed source.
    pub async fn preview(
        &self,
        target: &TargetConfig,
        now: DateTime<Utc>,
        seed: Option<u64>,
    ) -> Result<PromptPreview> {
        let profile = self.config.profile(&target.profile)?;

        let location =
            LocationResolver::resolve_location(self.geolocator.as_ref(), &target.location)
                .await
                .with_context(|| format!("Failed to resolve location for '{}'", target.name))?;

        let local_time = now.with_timezone(&location.timezone);
        let seed = seed.unwrap_or_else(|| self.config.schedule.seed_source.seed_at(&local_time));

        let observation = self
            .weather
            .current_weather(&location)
            .await
            .with_context(|| format!("Failed to fetch weather for {}", location.name))?;

        let context = PromptContext {
            location: &location,
            timestamp: local_time,
            observation: &observation,
            seed,
            profile,
        };
        let tags = derive_tags(self.ephemeris.as_ref(), &context)
            .with_context(|| format!("Failed to derive prompt for '{}'", target.name))?;
        let prompt = tags.render();
        debug!("Positive prompt: {}", prompt.positive);
        debug!("Negative prompt: {}", prompt.negative);

        Ok(PromptPreview {
            target: target.name.clone(),
            location,
            local_time,
            observation,
            seed,
            prompt,
        })
    }
}

/// Generates, stores and publishes images for every configured target
pub struct UpdateService {
    prompts: PromptService,
    generator: Box<dyn ImageGenerator>,
    store: ImageStore,
    publishers: HashMap<String, Box<dyn Publisher>>,
}

impl UpdateService {
    pub fn new(
        prompts: PromptService,
        generator: Box<dyn ImageGenerator>,
        store: ImageStore,
        publishers: HashMap<String, Box<dyn Publisher>>,
    ) -> Self {
        Self {
            prompts,
            generator,
            store,
            publishers,
        }
    }

    pub fn from_config(config: SkyframeConfig, credentials: &Credentials) -> Result<Self> {
        config.validate_credentials(credentials)?;

        let timeout = Duration::from_secs(config.image.timeout_seconds);
        let generator = ReplicateClient::new(&config.image, credentials.replicate_api_token()?)?;
        let store = ImageStore::new(&config.images.directory);

        let mut publishers: HashMap<String, Box<dyn Publisher>> = HashMap::new();
        for target in &config.targets {
            let publisher: Box<dyn Publisher> = match target.kind {
                TargetKind::Wallpaper => Box::new(DesktopWallpaper::new()),
                TargetKind::Skylight => Box::new(SkylightFrame::new(
                    credentials.skylight_api_token()?,
                    target.frame_name.clone(),
                    Duration::from_secs(target.settle_seconds),
                    timeout,
                )?),
            };
            publishers.insert(target.name.clone(), publisher);
        }

        let prompts = PromptService::from_config(config, credentials)?;
        Ok(Self::new(prompts, Box::new(generator), store, publishers))
    }

    #[must_use]
    pub fn config(&self) -> &SkyframeConfig {
        self.prompts.config()
    }

    /// Run the whole pipeline for one target and return the published image
    pub async fn update_target(&self, target: &TargetConfig, now: DateTime<Utc>) -> Result<PathBuf> {
        let start_time = Instant::now();
        info!("Updating target '{}'", target.name);

        let publisher = self
            .publishers
            .get(&target.name)
            .with_context(|| format!("No publisher for target '{}'", target.name))?;

        let preview = self.prompts.preview(target, now, None).await?;
        info!(
            "Derived prompt for {} at {} (seed {})",
            preview.location.name,
            preview.local_time.format("%Y-%m-%d %H:%M %Z"),
            preview.seed
        );

        let request = GenerationRequest::new(&preview.prompt, preview.seed, &self.config().image);
        let image_url = self
            .generator
            .generate(&request)
            .await
            .context("Image generation failed")?;
        let original = self.save_image(&image_url).await?;

        let upscaled_url = self
            .generator
            .upscale(&image_url)
            .await
            .context("Upscaling failed")?;
        let upscaled = self.save_image(&upscaled_url).await?;
        self.store
            .remove(&original)
            .await
            .context("Failed to remove the intermediate image")?;

        publisher
            .publish(&upscaled)
            .await
            .with_context(|| format!("Failed to publish to '{}'", target.name))?;

        let elapsed = start_time.elapsed();
        info!(
            "Target '{}' updated with {} in {:.1}s",
            target.name,
            upscaled.display(),
            elapsed.as_secs_f64()
        );
        if elapsed.as_secs() > 15 * 60 {
            warn!("Slow update for '{}': {:.0}s", target.name, elapsed.as_secs_f64());
        }

        Ok(upscaled)
    }

    async fn save_image(&self, url: &str) -> Result<PathBuf> {
        let bytes = self
            .generator
            .download(url)
            .await
            .context("Image download failed")?;
        let path = self
            .store
            .save(&bytes)
            .await
            .context("Failed to save the image")?;
        Ok(path)
    }

    /// Update every target once. A failure aborts only that target.
    /// Returns the number of targets updated.
    pub async fn update_all(&self, now: DateTime<Utc>) -> usize {
        let mut updated = 0;
        for target in &self.config().targets {
            match self.update_target(target, now).await {
                Ok(_) => updated += 1,
                Err(err) => error!("Update of target '{}' failed: {:#}", target.name, err),
            }
        }
        updated
    }

    /// Update immediately, then every `schedule.interval_minutes`. Ticks
    /// missed while a run is in progress are skipped.
    pub async fn run_scheduled(&self) -> Result<()> {
        let minutes = u64::from(self.config().schedule.interval_minutes);
        let mut ticker = interval(Duration::from_secs(minutes * 60));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Updating every {} minutes", minutes);
        loop {
            ticker.tick().await;
            let updated = self.update_all(Utc::now()).await;
            let total = self.config().targets.len();
            if updated < total {
                warn!("{} of {} targets updated", updated, total);
            } else {
                info!("All {} targets updated", total);
            }
        }
    }
}
