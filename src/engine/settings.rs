// Engine settings - loaded with the config crate

//! # Flow Settings
//!
//! Settings are layered, lowest priority first:
//!
//! 1. Built-in defaults ([`FlowSettings::default`])
//! 2. `flow-engine.{toml,yaml,json}` in the working directory, if present
//! 3. An explicit settings file, if one is given
//! 4. `FLOW_`-prefixed environment variables (`FLOW_MAX_DEPTH=16`)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::format::FlowFormat;
use crate::Result;

/// Settings of one flow engine instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    /// Deepest nesting of branches and groups the reader accepts
    pub max_depth: usize,

    /// Field of a `condition` node naming its type
    pub discriminator: String,

    /// Format used when none can be inferred, e.g. for stdin
    pub default_format: FlowFormat,

    /// Accept a single object with several fields where an array of
    /// single-field objects is expected
    pub accept_object_shape: bool,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            max_depth: 64,
            discriminator: "type".to_string(),
            default_format: FlowFormat::Yaml,
            accept_object_shape: true,
        }
    }
}

impl FlowSettings {
    /// Prefix of the environment variables read by [`FlowSettings::load`]
    pub const ENV_PREFIX: &'static str = "FLOW";

    /// Base name of the optional settings file in the working directory
    pub const FILE_NAME: &'static str = "flow-engine";

    /// Load from the working directory and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load, additionally reading `path` (which must exist)
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name(Self::FILE_NAME).required(false));
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: FlowSettings = builder
            .add_source(Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the reader cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(ConfigError::Message("max_depth must be at least 1".to_string()).into());
        }
        if self.discriminator.trim().is_empty() {
            return Err(ConfigError::Message("discriminator must not be empty".to_string()).into());
        }
        Ok(())
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = discriminator.into();
        self
    }

    pub fn with_object_shape(mut self, accept: bool) -> Self {
        self.accept_object_shape = accept;
        self
    }
}
