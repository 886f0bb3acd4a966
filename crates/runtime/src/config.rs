use foundation::{LngLat, Year, YearRange};
use layers::{LayerId, PollutantKind, SourceSpec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::overlay::Overlay;

pub const LIGHT_STYLE: &str = "mapbox://styles/mapbox/light-v10";
pub const DARK_STYLE: &str = "mapbox://styles/mapbox/dark-v10";
pub const SATELLITE_STYLE: &str = "mapbox://styles/mapbox/satellite-v9";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("at least one basemap style is required")]
    NoBasemaps,
    #[error("initial basemap index {index} is out of range for {len} styles")]
    BasemapIndex { index: usize, len: usize },
    #[error("year range {first}..={last} is empty")]
    EmptyYearRange { first: Year, last: Year },
    #[error("initial year {0} is outside the slider range")]
    YearOutOfRange(Year),
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
}

/// Page-level settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    /// Mapbox access token. Supplied by the page, never built in.
    pub access_token: Option<String>,
    /// DOM id of the map container.
    pub container: String,
    pub center: LngLat,
    pub zoom: f64,
    pub tileset_url: String,
    pub source_id: String,
    pub source_layer: String,
    pub layer_id: String,
    pub basemaps: Vec<String>,
    pub initial_basemap: usize,
    pub years: YearRange,
    pub initial_year: Year,
    pub initial_pollutant: PollutantKind,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            container: "map".to_string(),
            center: LngLat::new(-98.35, 39.5),
            zoom: 5.0,
            tileset_url: "mapbox://najay1.d182sure".to_string(),
            source_id: "air_quality".to_string(),
            source_layer: "Americaair_polution-6obltc".to_string(),
            layer_id: "air_quality".to_string(),
            basemaps: vec![
                LIGHT_STYLE.to_string(),
                DARK_STYLE.to_string(),
                SATELLITE_STYLE.to_string(),
            ],
            initial_basemap: 1,
            years: YearRange::default(),
            initial_year: Year(2020),
            initial_pollutant: PollutantKind::Pm25,
        }
    }
}

impl MapConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: MapConfig = if raw.trim().is_empty() {
            MapConfig::default()
        } else {
            serde_json::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.basemaps.is_empty() {
            return Err(ConfigError::NoBasemaps);
        }
        if self.initial_basemap >= self.basemaps.len() {
            return Err(ConfigError::BasemapIndex {
                index: self.initial_basemap,
                len: self.basemaps.len(),
            });
        }
        if self.years.is_empty() {
            return Err(ConfigError::EmptyYearRange {
                first: self.years.first,
                last: self.years.last,
            });
        }
        if !self.years.contains(self.initial_year) {
            return Err(ConfigError::YearOutOfRange(self.initial_year));
        }
        for (name, value) in [
            ("container", &self.container),
            ("tileset_url", &self.tileset_url),
            ("source_id", &self.source_id),
            ("source_layer", &self.source_layer),
            ("layer_id", &self.layer_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
        }
        Ok(())
    }

    pub fn overlay(&self) -> Overlay {
        Overlay {
            source_id: self.source_id.clone(),
            source: SourceSpec::vector(self.tileset_url.clone()),
            layer_id: LayerId::new(self.layer_id.clone()),
            source_layer: self.source_layer.clone(),
        }
    }
}
