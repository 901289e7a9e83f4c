//! Configuration for the marker caches.

use map_common::{MarkerError, MarkerResult};
use serde::{Deserialize, Serialize};

/// Capacities and switches for the caches owned by
/// [`MarkerCaches`](crate::MarkerCaches).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerCacheConfig {
    /// Master switch. When false every lookup misses and nothing is stored.
    pub enabled: bool,

    /// Maximum number of resolved attribute sets.
    pub attr_cache_size: usize,

    /// Maximum number of procedurally built ellipses.
    pub ellipse_cache_size: usize,

    /// Maximum number of rasterized sub-image pairs.
    pub image_cache_size: usize,

    /// Sub-pixel sampling rate per axis for the sub-image cache.
    /// Higher values are closer to direct rendering but hit less often.
    pub sampling_rate: u32,
}

impl Default for MarkerCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            attr_cache_size: 256,
            ellipse_cache_size: 256,
            image_cache_size: 4096,
            sampling_rate: 8,
        }
    }
}

impl MarkerCacheConfig {
    /// Configuration with every cache switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MARKER_CACHES_ENABLED") {
            config.enabled = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("MARKER_ATTR_CACHE_SIZE") {
            if let Ok(size) = val.parse() {
                config.attr_cache_size = size;
            }
        }

        if let Ok(val) = std::env::var("MARKER_ELLIPSE_CACHE_SIZE") {
            if let Ok(size) = val.parse() {
                config.ellipse_cache_size = size;
            }
        }

        if let Ok(val) = std::env::var("MARKER_IMAGE_CACHE_SIZE") {
            if let Ok(size) = val.parse() {
                config.image_cache_size = size;
            }
        }

        if let Ok(val) = std::env::var("MARKER_SAMPLING_RATE") {
            if let Ok(rate) = val.parse() {
                config.sampling_rate = rate;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> MarkerResult<()> {
        if self.attr_cache_size == 0 {
            return Err(MarkerError::InvalidConfig(
                "attr_cache_size must be > 0".to_string(),
            ));
        }

        if self.ellipse_cache_size == 0 {
            return Err(MarkerError::InvalidConfig(
                "ellipse_cache_size must be > 0".to_string(),
            ));
        }

        if self.image_cache_size == 0 {
            return Err(MarkerError::InvalidConfig(
                "image_cache_size must be > 0".to_string(),
            ));
        }

        if self.sampling_rate == 0 || self.sampling_rate > 64 {
            return Err(MarkerError::InvalidConfig(
                "sampling_rate must be 1-64".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MarkerCacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.attr_cache_size, 256);
        assert_eq!(config.ellipse_cache_size, 256);
        assert_eq!(config.image_cache_size, 4096);
        assert_eq!(config.sampling_rate, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = MarkerCacheConfig::default();
        config.sampling_rate = 0;
        assert!(config.validate().is_err());

        let mut config = MarkerCacheConfig::default();
        config.image_cache_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flag_parsing() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }

    #[test]
    fn test_partial_json() {
        let config: MarkerCacheConfig = serde_json::from_str(r#"{"sampling_rate": 4}"#).unwrap();
        assert_eq!(config.sampling_rate, 4);
        assert_eq!(config.attr_cache_size, 256);
    }
}
