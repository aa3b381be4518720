//! Error types and handling for the `Skyframe` application

use thiserror::Error;

/// Main error type for the `Skyframe` application
#[derive(Error, Debug)]
pub enum SkyframeError {
    /// Missing or invalid configuration, including absent credentials
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Weather description outside the supported vocabulary
    #[error("Unrecognized weather condition: '{condition}'")]
    UnrecognizedCondition { condition: String },

    /// A date or time fell outside every classification bucket
    #[error("Classification error: {message}")]
    Classification { message: String },

    /// An external service call failed or returned a non-success status
    #[error("{service} error: {message}")]
    Collaborator { service: String, message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl SkyframeError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new unrecognized weather condition error
    pub fn unrecognized_condition<S: Into<String>>(condition: S) -> Self {
        Self::UnrecognizedCondition {
            condition: condition.into(),
        }
    }

    /// Create a new classification error
    pub fn classification<S: Into<String>>(message: S) -> Self {
        Self::Classification {
            message: message.into(),
        }
    }

    /// Create a new collaborator error for the named service
    pub fn collaborator<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::Collaborator {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether this error comes from an external service rather than from the
    /// derivation itself
    #[must_use]
    pub fn is_collaborator(&self) -> bool {
        matches!(self, SkyframeError::Collaborator { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SkyframeError::Configuration { message } => {
                format!("Configuration error: {message}. Please check your config file and environment.")
            }
            SkyframeError::UnrecognizedCondition { condition } => {
                format!("The weather service reported '{condition}', which has no prompt mapping.")
            }
            SkyframeError::Classification { .. } => {
                "Unable to classify the current date or time. This is a bug.".to_string()
            }
            SkyframeError::Collaborator { service, .. } => {
                format!("Unable to reach {service}. The next scheduled run will try again.")
            }
            SkyframeError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for SkyframeError {
    fn from(err: reqwest::Error) -> Self {
        let service = err
            .url()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| "HTTP".to_string());
        SkyframeError::collaborator(service, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = SkyframeError::configuration("missing OWM_API_KEY");
        assert!(matches!(config_err, SkyframeError::Configuration { .. }));

        let condition_err = SkyframeError::unrecognized_condition("volcanic ash");
        assert!(matches!(
            condition_err,
            SkyframeError::UnrecognizedCondition { .. }
        ));

        let api_err = SkyframeError::collaborator("OpenWeatherMap", "HTTP 401");
        assert!(api_err.is_collaborator());
        assert!(!config_err.is_collaborator());
    }

    #[test]
    fn test_display_includes_details() {
        let err = SkyframeError::unrecognized_condition("volcanic ash");
        assert_eq!(err.to_string(), "Unrecognized weather condition: 'volcanic ash'");

        let err = SkyframeError::collaborator("Replicate", "prediction failed");
        assert_eq!(err.to_string(), "Replicate error: prediction failed");
    }

    #[test]
    fn test_user_messages() {
        let config_err = SkyframeError::configuration("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let api_err = SkyframeError::collaborator("Skylight", "test");
        assert!(api_err.user_message().contains("Unable to reach Skylight"));

        let classification_err = SkyframeError::classification("no season");
        assert!(classification_err.user_message().contains("bug"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SkyframeError = io_err.into();
        assert!(matches!(err, SkyframeError::Io { .. }));
    }
}
