use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Scope of a controller: which resource type, which namespaces, and which
/// objects to exclude.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Selector {
    /// API group and version of the watched type, e.g. `apps/v1`
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Kind of the watched type, e.g. `Deployment`
    #[serde(default)]
    pub kind: String,

    /// Namespace allow-list. Empty means every namespace.
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Exclusion expressions evaluated against the serialized object.
    /// An object is dropped if any of them yields `true`.
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl Default for Selector {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: String::new(),
            namespaces: vec![],
            excludes: vec![],
        }
    }
}

impl Selector {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_namespaces<I, S>(
        mut self,
        namespaces: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_excludes<I, S>(
        mut self,
        excludes: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = excludes.into_iter().map(Into::into).collect();
        self
    }

    /// Identifier used to tag logs and metrics of the controller built from
    /// this selector.
    pub fn controller_id(&self) -> String {
        format!("{}/{}", self.api_version, self.kind)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_version.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "selector.api_version must not be empty".into(),
            )));
        }

        if self.kind.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "selector.kind must not be empty".into(),
            )));
        }

        if let Some(ns) = self.namespaces.iter().find(|ns| ns.trim().is_empty()) {
            return Err(Error::Config(ConfigError::Message(format!(
                "selector.namespaces contains a blank entry: {ns:?}"
            ))));
        }

        if self.excludes.iter().any(|e| e.trim().is_empty()) {
            return Err(Error::Config(ConfigError::Message(
                "selector.excludes must not contain blank expressions".into(),
            )));
        }

        Ok(())
    }
}

fn default_api_version() -> String {
    "v1".to_string()
}
