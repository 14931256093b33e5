//! Configuration for the imputation pipeline.
//!
//! This module provides configuration options using the builder pattern.
//! The insufficient-data threshold and the held-out split ratio are
//! deliberately configuration rather than constants; the defaults match
//! the production pipeline.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::AlleyWidthImputer`].
///
/// Use [`ImputerConfig::builder()`] for fluent construction.
///
/// # Example
///
/// ```rust,ignore
/// use alley_impute::ImputerConfig;
///
/// let config = ImputerConfig::builder()
///     .min_training_rows(100)
///     .test_fraction(0.25)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputerConfig {
    /// Minimum number of clean training rows required to attempt
    /// imputation. Below this the pipeline returns the input unchanged.
    /// Default: 50
    pub min_training_rows: usize,

    /// Fraction of clean rows held out for evaluation (0.0 - 0.5).
    /// Default: 0.2
    pub test_fraction: f64,

    /// Seed for the train/test shuffle.
    /// Default: 42
    pub seed: u64,

    /// Number of boosting iterations.
    /// Default: 100
    pub iterations: usize,

    /// Shrinkage (learning rate) per iteration.
    /// Default: 0.1
    pub shrinkage: f64,

    /// Maximum depth of each regression tree.
    /// Default: 6
    pub max_depth: u32,
}

impl Default for ImputerConfig {
    fn default() -> Self {
        Self {
            min_training_rows: 50,
            test_fraction: 0.2,
            seed: 42,
            iterations: 100,
            shrinkage: 0.1,
            max_depth: 6,
        }
    }
}

impl ImputerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ImputerConfigBuilder {
        ImputerConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=0.5).contains(&self.test_fraction) {
            return Err(ConfigValidationError::InvalidTestFraction(
                self.test_fraction,
            ));
        }
        if self.min_training_rows == 0 {
            return Err(ConfigValidationError::InvalidMinTrainingRows(
                self.min_training_rows,
            ));
        }
        if self.iterations == 0 {
            return Err(ConfigValidationError::InvalidIterations(self.iterations));
        }
        if !(self.shrinkage > 0.0 && self.shrinkage <= 1.0) {
            return Err(ConfigValidationError::InvalidShrinkage(self.shrinkage));
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid test fraction: {0} (must be between 0.0 and 0.5)")]
    InvalidTestFraction(f64),

    #[error("Invalid minimum training rows: {0} (must be at least 1)")]
    InvalidMinTrainingRows(usize),

    #[error("Invalid iteration count: {0} (must be at least 1)")]
    InvalidIterations(usize),

    #[error("Invalid shrinkage: {0} (must be in (0.0, 1.0])")]
    InvalidShrinkage(f64),
}

/// Builder for [`ImputerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ImputerConfigBuilder {
    min_training_rows: Option<usize>,
    test_fraction: Option<f64>,
    seed: Option<u64>,
    iterations: Option<usize>,
    shrinkage: Option<f64>,
    max_depth: Option<u32>,
}

impl ImputerConfigBuilder {
    /// Set the minimum number of clean training rows.
    pub fn min_training_rows(mut self, rows: usize) -> Self {
        self.min_training_rows = Some(rows);
        self
    }

    /// Set the held-out evaluation fraction (0.0 - 0.5).
    pub fn test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = Some(fraction);
        self
    }

    /// Set the shuffle seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the number of boosting iterations.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Set the shrinkage (learning rate).
    pub fn shrinkage(mut self, shrinkage: f64) -> Self {
        self.shrinkage = Some(shrinkage);
        self
    }

    /// Set the maximum tree depth.
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ImputerConfig` or an error if validation fails.
    pub fn build(self) -> Result<ImputerConfig, ConfigValidationError> {
        let defaults = ImputerConfig::default();
        let config = ImputerConfig {
            min_training_rows: self.min_training_rows.unwrap_or(defaults.min_training_rows),
            test_fraction: self.test_fraction.unwrap_or(defaults.test_fraction),
            seed: self.seed.unwrap_or(defaults.seed),
            iterations: self.iterations.unwrap_or(defaults.iterations),
            shrinkage: self.shrinkage.unwrap_or(defaults.shrinkage),
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ImputerConfig::default();
        assert_eq!(config.min_training_rows, 50);
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!(config.seed, 42);
        assert_eq!(config.iterations, 100);
        assert_eq!(config.shrinkage, 0.1);
        assert_eq!(config.max_depth, 6);
    }

    #[test]
    fn test_builder_defaults() {
        let config = ImputerConfig::builder().build().unwrap();
        assert_eq!(config.min_training_rows, 50);
        assert_eq!(config.test_fraction, 0.2);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ImputerConfig::builder()
            .min_training_rows(100)
            .test_fraction(0.3)
            .seed(7)
            .iterations(50)
            .shrinkage(0.05)
            .max_depth(4)
            .build()
            .unwrap();

        assert_eq!(config.min_training_rows, 100);
        assert_eq!(config.test_fraction, 0.3);
        assert_eq!(config.seed, 7);
        assert_eq!(config.iterations, 50);
        assert_eq!(config.shrinkage, 0.05);
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn test_validation_invalid_test_fraction() {
        let result = ImputerConfig::builder().test_fraction(0.9).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidTestFraction(_)
        ));
    }

    #[test]
    fn test_validation_invalid_min_training_rows() {
        let result = ImputerConfig::builder().min_training_rows(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidMinTrainingRows(0)
        ));
    }

    #[test]
    fn test_validation_invalid_shrinkage() {
        let result = ImputerConfig::builder().shrinkage(0.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidShrinkage(_)
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = ImputerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ImputerConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.min_training_rows, deserialized.min_training_rows);
        assert_eq!(config.test_fraction, deserialized.test_fraction);
        assert_eq!(config.seed, deserialized.seed);
    }
}
