use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use super::Publisher;
use crate::{Result, SkyframeError};

/// How the desktop picture gets changed on this OS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopBackend {
    /// Finder via `osascript`
    MacOs,
    /// GNOME via `gsettings`
    Gnome,
}

impl DesktopBackend {
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            DesktopBackend::MacOs
        } else {
            DesktopBackend::Gnome
        }
    }

    /// Program and argument lists to run, in order
    fn commands(self, image: &Path) -> Vec<(&'static str, Vec<String>)> {
        let image = image.display().to_string();
        match self {
            DesktopBackend::MacOs => vec![(
                "osascript",
                vec![
                    "-e".to_string(),
                    format!(
                        "tell application \"Finder\" to set desktop picture to POSIX file \"{}\"",
                        image.replace('"', "\\\"")
                    ),
                ],
            )],
            DesktopBackend::Gnome => {
                let uri = format!("file://{image}");
                ["picture-uri", "picture-uri-dark"]
                    .into_iter()
                    .map(|key| {
                        (
                            "gsettings",
                            vec![
                                "set".to_string(),
                                "org.gnome.desktop.background".to_string(),
                                key.to_string(),
                                uri.clone(),
                            ],
                        )
                    })
                    .collect()
            }
        }
    }
}

/// Sets the local desktop wallpaper
pub struct DesktopWallpaper {
    backend: DesktopBackend,
}

impl DesktopWallpaper {
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(DesktopBackend::current())
    }

    #[must_use]
    pub fn with_backend(backend: DesktopBackend) -> Self {
        Self { backend }
    }
}

impl Default for DesktopWallpaper {
    fn default() -> Self {
        Self::new()
    }
}

async fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(tokio::fs::canonicalize(path).await?)
}

#[async_trait]
impl Publisher for DesktopWallpaper {
    #[instrument(skip(self))]
    async fn publish(&self, image_path: &Path) -> Result<()> {
        let image = absolute(image_path).await?;

        for (program, args) in self.backend.commands(&image) {
            debug!("Running {} {:?}", program, args);
            let output = Command::new(program).args(&args).output().await?;
            if !output.status.success() {
                return Err(SkyframeError::collaborator(
                    program,
                    format!(
                        "exited with {}: {}",
                        output.status,
                        String::from_utf8_lossy(&output.stderr).trim()
                    ),
                ));
            }
        }

        info!("Desktop wallpaper set to {}", image.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macos_command() {
        let commands = DesktopBackend::MacOs.commands(Path::new("/tmp/images/1.png"));
        assert_eq!(commands.len(), 1);
        let (program, args) = &commands[0];
        assert_eq!(*program, "osascript");
        assert_eq!(
            args[1],
            "tell application \"Finder\" to set desktop picture to POSIX file \"/tmp/images/1.png\""
        );
    }

    #[test]
    fn test_gnome_sets_light_and_dark_pictures() {
        let commands = DesktopBackend::Gnome.commands(Path::new("/tmp/images/1.png"));
        let keys: Vec<&str> = commands.iter().map(|(_, args)| args[2].as_str()).collect();
        assert_eq!(keys, vec!["picture-uri", "picture-uri-dark"]);
        assert!(commands
            .iter()
            .all(|(program, args)| *program == "gsettings" && args[3] == "file:///tmp/images/1.png"));
    }

    #[tokio::test]
    async fn test_missing_image_fails_before_running_anything() {
        let wallpaper = DesktopWallpaper::with_backend(DesktopBackend::Gnome);
        let result = wallpaper
            .publish(Path::new("/definitely/not/here.png"))
            .await;
        assert!(matches!(result, Err(SkyframeError::Io { .. })));
    }
}
