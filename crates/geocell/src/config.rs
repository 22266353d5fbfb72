//! Engine configuration
//!
//! Loads tessellation defaults, the rigid tolerance and codec limits from a TOML
//! file. Every section and key is optional; missing values take the
//! defaults shown below.
//!
//! ```toml
//! [tessellation]
//! default_resolution = 32
//!
//! [tolerance]
//! rigid = 1e-9
//!
//! [limits]
//! max_depth = 64
//! max_children = 1048576
//! ```

use std::fs;
use std::path::Path;

use geocell_cells::DEFAULT_RESOLUTION;
use geocell_io::ReadLimits;
use geocell_math::RIGID_TOLERANCE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error reading or writing the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has wrongly typed keys.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeomConfig {
    /// Mesh density for newly built cells
    pub tessellation: TessellationConfig,
    /// Transform validation tolerance
    pub tolerance: ToleranceConfig,
    /// Bounds on stored trees, for both reading and writing
    pub limits: LimitsConfig,
}

/// Tessellation configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TessellationConfig {
    /// Resolution given to cells built through [`crate::Builder`]
    pub default_resolution: u32,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self {
            default_resolution: DEFAULT_RESOLUTION,
        }
    }
}

/// Tolerance configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Allowed deviation of a rotation block from orthonormality
    ///
    /// Applied when validating transforms from matrices and from files.
    pub rigid: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            rigid: RIGID_TOLERANCE,
        }
    }
}

/// Codec limit configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum nesting depth of a stored tree
    pub max_depth: usize,
    /// Maximum children of one stored composite
    pub max_children: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = ReadLimits::default();
        Self {
            max_depth: limits.max_depth,
            max_children: limits.max_children,
        }
    }
}

impl GeomConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use geocell::GeomConfig;
    ///
    /// let config = GeomConfig::from_file("geocell.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: GeomConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty-printed TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rigid = self.tolerance.rigid;
        if !rigid.is_finite() || rigid <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tolerance.rigid must be a positive finite number, got {rigid}"
            )));
        }
        if self.limits.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Limits shared by the reader and the writer
    pub fn limits(&self) -> ReadLimits {
        ReadLimits {
            max_depth: self.limits.max_depth,
            max_children: self.limits.max_children,
            rigid_tolerance: self.tolerance.rigid,
        }
    }
}
