//! Configuration management for the controller shim.
//!
//! Sources are merged with priority (later overrides earlier):
//! 1. Default values (hardcoded)
//! 2. Configuration file named by `CONFIG_PATH`
//! 3. Explicit override files
//! 4. Environment variables with `SHIM__` prefix (highest priority)
//!
//! `SHIM__SELECTOR__NAMESPACES` accepts a comma-separated list.

mod dispatch;
mod selector;
pub use dispatch::*;
pub use selector::*;


//---
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

const ENV_PREFIX: &str = "SHIM";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Watched resource type and object scope
    #[serde(default)]
    pub selector: Selector,
    /// Dispatch loop parameters
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Settings {
    /// Loads configuration from defaults, `CONFIG_PATH` and the environment.
    ///
    /// # Note
    /// This method does NOT validate. Call `validate()` once every override
    /// has been applied.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        let config: Self = builder.add_source(environment()).build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies an override file on top of the current values. Environment
    /// variables are re-applied last so they keep the highest priority.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn validate(self) -> Result<Self> {
        self.selector.validate()?;
        self.dispatch.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("selector.namespaces")
}
