//! Planetary positions used as prompt context.
//!
//! Sources return the ecliptic longitude of each body in degrees, rounded to
//! two decimals. Callers treat any failure as "no context".

mod circular;
mod remote;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EphemerisConfig;
use crate::error::Result;

pub use circular::CircularOrbitEphemeris;
pub use remote::RemoteEphemeris;

/// Bodies reported by every source, in prompt order.
pub const BODIES: [&str; 10] = [
    "Sol", "Luna", "Mercurio", "Venus", "Marte", "Júpiter", "Saturno", "Urano", "Neptuno",
    "Plutón",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPosition {
    pub name: String,
    /// Ecliptic longitude in `[0, 360)`.
    pub degrees: f64,
}

impl BodyPosition {
    pub fn new(name: impl Into<String>, degrees: f64) -> Self {
        Self {
            name: name.into(),
            degrees: round_degrees(degrees),
        }
    }
}

pub type Transits = Vec<BodyPosition>;

#[async_trait]
pub trait EphemerisSource: Send + Sync {
    async fn positions(&self, at: DateTime<Utc>) -> Result<Transits>;

    fn name(&self) -> &'static str;
}

/// Build the configured source: remote when a URL is set, built-in otherwise.
pub fn from_config(config: &EphemerisConfig) -> Result<std::sync::Arc<dyn EphemerisSource>> {
    match &config.url {
        Some(url) => Ok(std::sync::Arc::new(RemoteEphemeris::new(
            url,
            config.timeout_secs,
        )?)),
        None => Ok(std::sync::Arc::new(CircularOrbitEphemeris)),
    }
}

/// Normalize into `[0, 360)` and round to two decimals.
pub(crate) fn round_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    let rounded = (normalized * 100.0).round() / 100.0;
    if rounded >= 360.0 {
        0.0
    } else {
        rounded
    }
}
