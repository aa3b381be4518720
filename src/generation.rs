//! Image generation and upscaling through the Replicate predictions API

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::config::ImageConfig;
use crate::models::Prompt;
use crate::{Result, SkyframeError};

const SERVICE: &str = "Replicate";

/// Parameters for one text-to-image generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "num_inference_steps")]
    pub steps: u32,
    pub seed: u64,
    pub scheduler: String,
}

impl GenerationRequest {
    /// Request for `prompt` with the configured image settings
    #[must_use]
    pub fn new(prompt: &Prompt, seed: u64, config: &ImageConfig) -> Self {
        Self {
            prompt: prompt.positive.clone(),
            negative_prompt: prompt.negative.clone(),
            width: config.width,
            height: config.height,
            steps: config.steps,
            seed,
            scheduler: config.scheduler.clone(),
        }
    }
}

/// Remote image generation backend
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image and return its URL
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Upscale the image at `image_url` and return the upscaled image's URL
    async fn upscale(&self, image_url: &str) -> Result<String>;

    /// Fetch the bytes of a finished image
    async fn download(&self, image_url: &str) -> Result<Vec<u8>>;
}

/// Which model a prediction runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRef {
    /// Latest version of an `owner/name` model
    Latest(String),
    /// A pinned version id
    Version(String),
}

impl ModelRef {
    #[must_use]
    pub fn new(model: &str, version: Option<&str>) -> Self {
        match version {
            Some(version) if !version.trim().is_empty() => ModelRef::Version(version.to_string()),
            _ => ModelRef::Latest(model.to_string()),
        }
    }

    fn endpoint(&self, base_url: &str) -> String {
        match self {
            ModelRef::Latest(model) => format!("{base_url}/models/{model}/predictions"),
            ModelRef::Version(_) => format!("{base_url}/predictions"),
        }
    }

    fn body(&self, input: Value) -> Value {
        match self {
            ModelRef::Latest(_) => json!({ "input": input }),
            ModelRef::Version(version) => json!({ "version": version, "input": input }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: PredictionStatus,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl Prediction {
    /// Image URL from a finished prediction. Models return either a single
    /// URL or a list of URLs; the first one is used.
    fn output_url(&self) -> Result<String> {
        let url = match &self.output {
            Some(Value::String(url)) => Some(url.clone()),
            Some(Value::Array(items)) => items
                .iter()
                .find_map(|item| item.as_str().map(str::to_string)),
            _ => None,
        };
        url.ok_or_else(|| {
            SkyframeError::collaborator(
                SERVICE,
                format!("Prediction {} finished without an image URL", self.id),
            )
        })
    }
}

/// Replicate API client
pub struct ReplicateClient {
    client: Client,
    api_token: String,
    base_url: String,
    model: ModelRef,
    upscale_model: ModelRef,
    poll_interval: Duration,
    prediction_timeout: Duration,
}

impl ReplicateClient {
    pub fn new(config: &ImageConfig, api_token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("Skyframe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SkyframeError::configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_token: api_token.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: ModelRef::new(&config.model, config.model_version.as_deref()),
            upscale_model: ModelRef::new(
                &config.upscale_model,
                config.upscale_model_version.as_deref(),
            ),
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
            prediction_timeout: Duration::from_secs(config.prediction_timeout_seconds),
        })
    }

    async fn read_prediction(response: reqwest::Response) -> Result<Prediction> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => SkyframeError::collaborator(SERVICE, "Invalid API token (HTTP 401)"),
                422 => SkyframeError::collaborator(SERVICE, format!("Invalid input: {body}")),
                429 => SkyframeError::collaborator(SERVICE, "Rate limit exceeded (HTTP 429)"),
                _ => SkyframeError::collaborator(SERVICE, format!("HTTP {status}: {body}")),
            });
        }

        response.json().await.map_err(|e| {
            SkyframeError::collaborator(SERVICE, format!("Failed to parse prediction: {e}"))
        })
    }

    /// Create a prediction and poll it until it finishes
    async fn run(&self, model: &ModelRef, input: Value) -> Result<String> {
        let start_time = Instant::now();
        let response = self
            .client
            .post(model.endpoint(&self.base_url))
            .bearer_auth(&self.api_token)
            .json(&model.body(input))
            .send()
            .await?;
        let mut prediction = Self::read_prediction(response).await?;
        debug!("Created prediction {} ({:?})", prediction.id, model);

        loop {
            match prediction.status {
                PredictionStatus::Succeeded => {
                    let elapsed = start_time.elapsed();
                    info!(
                        "Prediction {} succeeded in {:.1}s",
                        prediction.id,
                        elapsed.as_secs_f64()
                    );
                    return prediction.output_url();
                }
                PredictionStatus::Failed | PredictionStatus::Canceled => {
                    let reason = prediction
                        .error
                        .as_ref()
                        .map_or_else(|| "no error message".to_string(), Value::to_string);
                    return Err(SkyframeError::collaborator(
                        SERVICE,
                        format!(
                            "Prediction {} ended as {:?}: {reason}",
                            prediction.id, prediction.status
                        ),
                    ));
                }
                PredictionStatus::Starting
                | PredictionStatus::Processing
                | PredictionStatus::Unknown => {}
            }

            if start_time.elapsed() > self.prediction_timeout {
                warn!("Prediction {} timed out", prediction.id);
                return Err(SkyframeError::collaborator(
                    SERVICE,
                    format!(
                        "Prediction {} did not finish within {}s",
                        prediction.id,
                        self.prediction_timeout.as_secs()
                    ),
                ));
            }

            tokio::time::sleep(self.poll_interval).await;

            let response = self
                .client
                .get(format!("{}/predictions/{}", self.base_url, prediction.id))
                .bearer_auth(&self.api_token)
                .send()
                .await?;
            prediction = Self::read_prediction(response).await?;
        }
    }
}

#[async_trait]
impl ImageGenerator for ReplicateClient {
    #[instrument(skip(self, request), fields(seed = request.seed))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        info!(
            "Generating {}x{} image ({} steps)",
            request.width, request.height, request.steps
        );
        let input = serde_json::to_value(request).map_err(|e| {
            SkyframeError::collaborator(SERVICE, format!("Failed to encode request: {e}"))
        })?;
        self.run(&self.model, input).await
    }

    #[instrument(skip(self))]
    async fn upscale(&self, image_url: &str) -> Result<String> {
        info!("Upscaling generated image");
        self.run(&self.upscale_model, json!({ "image": image_url }))
            .await
    }

    #[instrument(skip(self))]
    async fn download(&self, image_url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(image_url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}
