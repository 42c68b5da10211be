//! Heap configuration.
//!
//! Configuration can be set programmatically or loaded from environment
//! variables. All environment variables use the `HUMMINGBIRD_` prefix:
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HUMMINGBIRD_GC_THRESHOLD` | Bytes allocated before the first collection | 1048576 (1MB) |
//! | `HUMMINGBIRD_GC_GROW_FACTOR` | Multiplier applied to live bytes after a collection | 2 |
//! | `HUMMINGBIRD_MAX_HEAP_SIZE` | Maximum heap size in bytes (0 = unlimited) | 0 |
//! | `HUMMINGBIRD_GC_STRESS` | Collect on every allocation ("true"/"false") | false |

use std::env;

use thiserror::Error;

/// Tuning knobs for allocation and collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapConfig {
    /// Bytes that may be allocated before the first collection runs. Also the
    /// floor for every later threshold.
    pub initial_threshold: usize,
    /// After a collection the next threshold is the live byte count times
    /// this factor.
    pub grow_factor: usize,
    /// Hard cap on allocated bytes. 0 means unlimited.
    pub max_heap_size: usize,
    /// Collect before every allocation. Flushes out missing roots.
    pub stress: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            initial_threshold: 1024 * 1024, // 1 MB
            grow_factor: 2,
            max_heap_size: 0,
            stress: false,
        }
    }
}

impl HeapConfig {
    pub fn builder() -> HeapConfigBuilder {
        HeapConfigBuilder::new()
    }

    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = parse_env_usize("HUMMINGBIRD_GC_THRESHOLD") {
            if val > 0 {
                config.initial_threshold = val;
            }
        }

        if let Some(val) = parse_env_usize("HUMMINGBIRD_GC_GROW_FACTOR") {
            if val > 0 {
                config.grow_factor = val;
            }
        }

        if let Some(val) = parse_env_usize("HUMMINGBIRD_MAX_HEAP_SIZE") {
            config.max_heap_size = val;
        }

        if let Some(val) = parse_env_bool("HUMMINGBIRD_GC_STRESS") {
            config.stress = val;
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_threshold == 0 {
            return Err(ConfigError::new("initial_threshold must be greater than 0"));
        }
        if self.grow_factor == 0 {
            return Err(ConfigError::new("grow_factor must be greater than 0"));
        }
        if self.max_heap_size != 0 && self.max_heap_size < self.initial_threshold {
            return Err(ConfigError::new(
                "max_heap_size must be 0 or at least initial_threshold",
            ));
        }
        Ok(())
    }
}

/// Builder for [`HeapConfig`].
#[derive(Debug, Default)]
pub struct HeapConfigBuilder {
    config: HeapConfig,
}

impl HeapConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_threshold(mut self, bytes: usize) -> Self {
        self.config.initial_threshold = bytes;
        self
    }

    pub fn grow_factor(mut self, factor: usize) -> Self {
        self.config.grow_factor = factor;
        self
    }

    pub fn max_heap_size(mut self, bytes: usize) -> Self {
        self.config.max_heap_size = bytes;
        self
    }

    pub fn stress(mut self, stress: bool) -> Self {
        self.config.stress = stress;
        self
    }

    pub fn build(self) -> Result<HeapConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ConfigError: {message}")]
pub struct ConfigError {
    message: &'static str,
}

impl ConfigError {
    fn new(message: &'static str) -> Self {
        Self { message }
    }
}

fn parse_env_usize(name: &str) -> Option<usize> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

fn parse_env_bool(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .and_then(|s| match s.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        })
}
