//! Data models for the Skyframe application
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates, region and timezone
//! - Weather: Current weather condition and temperature
//! - Tags: Prompt tags and the ordered tag set

pub mod location;
pub mod tags;
pub mod weather;

// Re-export all public types for convenient access
pub use location::{Location, timezone_at};
pub use tags::{Prompt, Tag, TagSet};
pub use weather::{WeatherCondition, WeatherObservation};
