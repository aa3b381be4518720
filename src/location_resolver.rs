//! Location Resolution Module
//!
//! Resolves a target's configured location into a structured `Location`,
//! either from fixed coordinates or from the machine's public IP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::LocationConfig;
use crate::models::Location;
use crate::{Result, SkyframeError};

const SERVICE: &str = "ipinfo";
const DEFAULT_URL: &str = "https://ipinfo.io/json";

/// Looks up where this machine is
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<Location>;
}

/// IP geolocation through ipinfo.io
pub struct IpInfoLocator {
    client: Client,
    url: String,
}

impl IpInfoLocator {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Skyframe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SkyframeError::configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            url: DEFAULT_URL.to_string(),
        })
    }
}

#[async_trait]
impl Geolocator for IpInfoLocator {
    #[instrument(skip(self))]
    async fn locate(&self) -> Result<Location> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(SkyframeError::collaborator(
                SERVICE,
                format!("IP lookup failed with HTTP {status}"),
            ));
        }

        let payload: IpInfoResponse = response.json().await.map_err(|e| {
            SkyframeError::collaborator(SERVICE, format!("Failed to parse response: {e}"))
        })?;
        payload.into_location()
    }
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    /// "lat,lon"
    loc: String,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

impl IpInfoResponse {
    fn into_location(self) -> Result<Location> {
        let (latitude, longitude) = self
            .loc
            .split_once(',')
            .and_then(|(lat, lon)| {
                Some((
                    lat.trim().parse::<f64>().ok()?,
                    lon.trim().parse::<f64>().ok()?,
                ))
            })
            .ok_or_else(|| {
                SkyframeError::collaborator(SERVICE, format!("Malformed location '{}'", self.loc))
            })?;

        let name = self.city.unwrap_or_else(|| "User Location".to_string());
        let region = self.region.unwrap_or_default();
        match self.timezone.as_deref() {
            Some(timezone) => {
                Location::with_timezone_name(name, region, timezone, latitude, longitude)
            }
            None => Location::from_coordinates(name, region, latitude, longitude),
        }
    }
}

/// Service for resolving configured locations
pub struct LocationResolver;

impl LocationResolver {
    /// Resolve a target's location, asking the geolocator only when the
    /// location is not fixed
    pub async fn resolve_location(
        geolocator: &dyn Geolocator,
        location_config: &LocationConfig,
    ) -> Result<Location> {
        debug!("Resolving location: {:?}", location_config);

        let location = match location_config.fixed_location()? {
            Some(location) => location,
            None => geolocator.locate().await?,
        };

        debug!(
            "Resolved location: {} at ({}) in {}",
            location.name,
            location.format_coordinates(),
            location.timezone
        );

        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLocator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geolocator for CountingLocator {
        async fn locate(&self) -> Result<Location> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Location::with_timezone_name(
                "Berlin".to_string(),
                String::new(),
                "Europe/Berlin",
                52.52,
                13.405,
            )
        }
    }

    #[test]
    fn test_parse_ipinfo_response() {
        let response: IpInfoResponse = serde_json::from_str(
            r#"{
                "ip": "203.0.113.7",
                "city": "Oakland",
                "region": "California",
                "country": "US",
                "loc": "37.8044,-122.2712",
                "timezone": "America/Los_Angeles"
            }"#,
        )
        .unwrap();

        let location = response.into_location().unwrap();
        assert_eq!(location.name, "Oakland");
        assert_eq!(location.region, "California");
        assert_eq!(location.timezone, chrono_tz::America::Los_Angeles);
        assert!((location.latitude - 37.8044).abs() < 1e-9);
        assert!((location.longitude + 122.2712).abs() < 1e-9);
    }

    #[test]
    fn test_missing_timezone_is_looked_up() {
        let response: IpInfoResponse =
            serde_json::from_str(r#"{"loc": "52.5200,13.4050", "city": "Berlin"}"#).unwrap();

        let location = response.into_location().unwrap();
        assert_eq!(location.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(location.region, "");
    }

    #[test]
    fn test_malformed_loc_is_a_collaborator_error() {
        let response = IpInfoResponse {
            loc: "somewhere".to_string(),
            timezone: Some("UTC".to_string()),
            city: None,
            region: None,
        };
        assert!(response.into_location().unwrap_err().is_collaborator());
    }

    #[tokio::test]
    async fn test_fixed_location_skips_lookup() {
        let locator = CountingLocator {
            calls: AtomicUsize::new(0),
        };
        let config = LocationConfig::Fixed {
            name: "Oakland".to_string(),
            region: String::new(),
            latitude: 37.804363,
            longitude: -122.271111,
            timezone: None,
        };

        let location = LocationResolver::resolve_location(&locator, &config)
            .await
            .unwrap();
        assert_eq!(location.name, "Oakland");
        assert_eq!(location.timezone, chrono_tz::America::Los_Angeles);
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);

        let location = LocationResolver::resolve_location(&locator, &LocationConfig::Ip)
            .await
            .unwrap();
        assert_eq!(location.name, "Berlin");
        assert_eq!(locator.calls.load(Ordering::SeqCst), 1);
    }
}
