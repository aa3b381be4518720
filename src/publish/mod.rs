//! Display surfaces a finished image is pushed to

pub mod skylight;
pub mod wallpaper;

use std::path::Path;

use async_trait::async_trait;

use crate::Result;

pub use skylight::SkylightFrame;
pub use wallpaper::DesktopWallpaper;

/// Shows an image on some display
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, image_path: &Path) -> Result<()>;
}
