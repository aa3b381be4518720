//! Skylight photo frame publishing.
//!
//! A frame shows every photo sent to it, so publishing uploads the new image,
//! waits for the frame to pick it up, then deletes everything that was on the
//! frame before.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, instrument};

use super::Publisher;
use crate::{Result, SkyframeError};

const SERVICE: &str = "Skylight";
const DEFAULT_BASE_URL: &str = "https://app.ourskylight.com/api";

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct Frame {
    id: String,
    #[serde(default)]
    attributes: FrameAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FrameAttributes {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UploadUrl {
    url: String,
}

/// Publishes to a Skylight frame
pub struct SkylightFrame {
    client: Client,
    api_token: String,
    base_url: String,
    frame_name: Option<String>,
    settle: Duration,
}

impl SkylightFrame {
    pub fn new(
        api_token: impl Into<String>,
        frame_name: Option<String>,
        settle: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Skyframe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SkyframeError::configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            frame_name,
            settle,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("accept", "application/json, text/plain, */*")
            .header("authorization", format!("Basic {}", self.api_token))
    }

    fn check(response: Response, action: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        Err(SkyframeError::collaborator(
            SERVICE,
            format!("Failed to {action}: HTTP {status}"),
        ))
    }

    async fn get_data<T: DeserializeOwned>(&self, url: String, action: &str) -> Result<Vec<T>> {
        let response = self.authorized(self.client.get(url)).send().await?;
        let payload: DataResponse<T> = Self::check(response, action)?
            .json()
            .await
            .map_err(|e| {
                SkyframeError::collaborator(SERVICE, format!("Failed to {action}: {e}"))
            })?;
        Ok(payload.data)
    }

    async fn frames(&self) -> Result<Vec<Frame>> {
        self.get_data(format!("{}/frames", self.base_url), "list frames")
            .await
    }

    async fn assets(&self, frame_id: &str) -> Result<Vec<Asset>> {
        self.get_data(
            format!("{}/frames/{frame_id}/messages", self.base_url),
            "list frame assets",
        )
        .await
    }

    async fn upload(&self, frame_id: &str, image_path: &Path) -> Result<()> {
        let ext = image_extension(image_path);
        let response = self
            .authorized(self.client.post(format!("{}/upload_urls", self.base_url)))
            .json(&json!({ "ext": ext, "frame_ids": [frame_id] }))
            .send()
            .await?;
        let payload: DataResponse<UploadUrl> = Self::check(response, "request an upload URL")?
            .json()
            .await
            .map_err(|e| {
                SkyframeError::collaborator(SERVICE, format!("Failed to read upload URL: {e}"))
            })?;
        let upload_url = payload
            .data
            .into_iter()
            .next()
            .map(|upload| upload.url)
            .ok_or_else(|| SkyframeError::collaborator(SERVICE, "No upload URL returned"))?;

        let bytes = tokio::fs::read(image_path).await?;
        debug!("Uploading {} bytes", bytes.len());
        let response = self.client.put(upload_url).body(bytes).send().await?;
        Self::check(response, "upload the image")?;
        Ok(())
    }

    async fn delete_assets(&self, frame_id: &str, asset_ids: &[String]) -> Result<()> {
        let response = self
            .authorized(self.client.delete(format!(
                "{}/frames/{frame_id}/messages/destroy_multiple",
                self.base_url
            )))
            .json(&json!({ "message_ids": asset_ids }))
            .send()
            .await?;
        Self::check(response, "delete old assets")?;
        Ok(())
    }
}

/// The frame with the configured name, or the first frame on the account
fn select_frame<'a>(frames: &'a [Frame], name: Option<&str>) -> Result<&'a Frame> {
    match name {
        Some(name) => frames
            .iter()
            .find(|frame| frame.attributes.name.as_deref() == Some(name))
            .ok_or_else(|| {
                SkyframeError::collaborator(SERVICE, format!("No frame named '{name}'"))
            }),
        None => frames
            .first()
            .ok_or_else(|| SkyframeError::collaborator(SERVICE, "Account has no frames")),
    }
}

fn image_extension(path: &Path) -> &str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("png")
}

#[async_trait]
impl Publisher for SkylightFrame {
    #[instrument(skip(self), fields(frame = ?self.frame_name))]
    async fn publish(&self, image_path: &Path) -> Result<()> {
        let frames = self.frames().await?;
        let frame = select_frame(&frames, self.frame_name.as_deref())?;

        let old_assets: Vec<String> = self
            .assets(&frame.id)
            .await?
            .into_iter()
            .map(|asset| asset.id)
            .collect();

        self.upload(&frame.id, image_path).await?;
        info!("Uploaded {} to frame {}", image_path.display(), frame.id);

        tokio::time::sleep(self.settle).await;

        if !old_assets.is_empty() {
            self.delete_assets(&frame.id, &old_assets).await?;
            info!("Removed {} old assets from frame {}", old_assets.len(), frame.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> Vec<Frame> {
        let payload: DataResponse<Frame> = serde_json::from_str(
            r#"{"data": [
                {"id": "1369742", "type": "frame", "attributes": {"name": "penki", "timezone": "America/Los_Angeles"}},
                {"id": "1400001", "type": "frame", "attributes": {"name": "kitchen"}}
            ]}"#,
        )
        .unwrap();
        payload.data
    }

    #[test]
    fn test_first_frame_by_default() {
        let frames = frames();
        assert_eq!(select_frame(&frames, None).unwrap().id, "1369742");
    }

    #[test]
    fn test_frame_by_name() {
        let frames = frames();
        assert_eq!(select_frame(&frames, Some("kitchen")).unwrap().id, "1400001");
        assert!(select_frame(&frames, Some("attic")).is_err());
    }

    #[test]
    fn test_no_frames_is_an_error() {
        let err = select_frame(&[], None).unwrap_err();
        assert!(err.is_collaborator());
    }

    #[test]
    fn test_asset_ids_parse() {
        let payload: DataResponse<Asset> = serde_json::from_str(
            r#"{"data": [{"id": "363683779", "type": "message_asset", "attributes": {"asset_type": "photo"}}],
                "meta": {"current_page": 1, "num_pages": 1}}"#,
        )
        .unwrap();
        assert_eq!(payload.data[0].id, "363683779");
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(Path::new("images/1700000000000.png")), "png");
        assert_eq!(image_extension(Path::new("images/photo.jpg")), "jpg");
        assert_eq!(image_extension(Path::new("images/noext")), "png");
    }
}
