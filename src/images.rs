//! Local storage for downloaded images

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::Result;

/// Directory of images named by download time
#[derive(Debug, Clone)]
pub struct ImageStore {
    directory: PathBuf,
}

impl ImageStore {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write `bytes` to `<directory>/<unix-millis>.png`, creating the
    /// directory if needed. Never overwrites an existing file.
    pub async fn save(&self, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory).await?;

        let mut millis = Utc::now().timestamp_millis();

        loop {
            let path = self.directory.join(format!("{millis}.png"));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    debug!("Saved {} bytes to {}", bytes.len(), path.display());
                    return Ok(path);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => millis += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Delete an image; a file that is already gone is not an error
    pub async fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
