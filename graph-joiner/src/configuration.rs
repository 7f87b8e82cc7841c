//! Logic for loading configuration in to an object model
use std::str::FromStr;

use displaydoc::Display;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_yaml::Error),
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// Resolution settings.
///
/// Can be created through `serde::Deserialize` from YAML or JSON, or inline
/// in Rust code with the builder.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Maximum nesting of selections in a request
    /// default: 512
    #[serde(default = "default_max_depth")]
    pub(crate) max_depth: usize,

    /// Fetch the relationships requested at one level concurrently
    /// default: true
    #[serde(default = "default_parallel_relationships")]
    pub(crate) parallel_relationships: bool,
}

// The recursion limit is chosen to be:
//   < # expected to cause stack overflow &&
//   > # expected in a legitimate query
fn default_max_depth() -> usize {
    512
}

fn default_parallel_relationships() -> bool {
    true
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(max_depth: Option<usize>, parallel_relationships: Option<bool>) -> Self {
        Self {
            max_depth: max_depth.unwrap_or_else(default_max_depth),
            parallel_relationships: parallel_relationships
                .unwrap_or_else(default_parallel_relationships),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn parallel_relationships(&self) -> bool {
        self.parallel_relationships
    }

    /// Parse and check a YAML configuration.
    pub fn validate(raw_yaml: &str) -> Result<Self, ConfigurationError> {
        if raw_yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let configuration: Self =
            serde_yaml::from_str(raw_yaml).map_err(ConfigurationError::DeserializeConfigError)?;
        if configuration.max_depth == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "max_depth must be at least 1",
                error: format!("got {}", configuration.max_depth),
            });
        }
        Ok(configuration)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Parse configuration from a string in YAML syntax
impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s)
    }
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    settings.into_generator().into_root_schema_for::<Configuration>()
}
