//! Notifier configuration model
//!
//! Defines:
//! - `Configuration` - API key, endpoint, release-stage filters and project
//!   classification lists
//! - Environment overrides (`BUGSNAG_*`)
//!
//! No file format is defined here: hosts deserialize `Configuration` from
//! whatever format they already use, then optionally layer the environment
//! on top with [`Configuration::apply_env`].

use std::collections::BTreeMap;

use bugsnag_core::prelude::*;
use bugsnag_core::{Metadata, DEFAULT_TAB_NAME};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::classify::ProjectConfig;

/// Default delivery endpoint
pub const DEFAULT_ENDPOINT: &str = "https://notify.bugsnag.com";

/// Prefix shared by all environment overrides
pub const ENV_PREFIX: &str = "BUGSNAG_";

/// Notifier configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Configuration {
    /// Project API key (required)
    #[serde(default)]
    pub api_key: String,

    /// Application type reported with each event (e.g., "worker")
    #[serde(default)]
    pub app_type: Option<String>,

    /// Application version reported with each event
    #[serde(default)]
    pub app_version: Option<String>,

    /// Delivery endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Release stages that are allowed to send reports; `None` allows all
    #[serde(default, deserialize_with = "deserialize_optional_list")]
    pub notify_release_stages: Option<Vec<String>>,

    /// Release stage of the running application (e.g., "production")
    #[serde(default)]
    pub release_stage: Option<String>,

    /// Path prefixes stripped from stack trace file names
    #[serde(default, deserialize_with = "deserialize_list")]
    pub file_prefixes: Vec<String>,

    /// Module paths whose frames are marked as project code
    #[serde(default, deserialize_with = "deserialize_list")]
    pub project_namespaces: Vec<String>,

    /// Error classes that are never reported
    #[serde(default, deserialize_with = "deserialize_list")]
    pub ignore_classes: Vec<String>,

    /// Global metadata attached to every report
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            app_type: None,
            app_version: None,
            endpoint: default_endpoint(),
            notify_release_stages: None,
            release_stage: None,
            file_prefixes: Vec::new(),
            project_namespaces: Vec::new(),
            ignore_classes: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Configuration {
    /// Configuration with an API key and defaults for everything else
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `BUGSNAG_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `BUGSNAG_*` environment variables that are set.
    ///
    /// List variables are comma-separated.
    pub fn apply_env(&mut self) {
        if let Some(value) = env_var("API_KEY") {
            self.api_key = value;
        }
        if let Some(value) = env_var("APP_TYPE") {
            self.app_type = Some(value);
        }
        if let Some(value) = env_var("APP_VERSION") {
            self.app_version = Some(value);
        }
        if let Some(value) = env_var("ENDPOINT") {
            self.endpoint = value;
        }
        if let Some(value) = env_var("NOTIFY_RELEASE_STAGES") {
            self.notify_release_stages = Some(split_list(&value));
        }
        if let Some(value) = env_var("RELEASE_STAGE") {
            self.release_stage = Some(value);
        }
        if let Some(value) = env_var("FILE_PREFIXES") {
            self.file_prefixes = split_list(&value);
        }
        if let Some(value) = env_var("PROJECT_NAMESPACES") {
            self.project_namespaces = split_list(&value);
        }
        if let Some(value) = env_var("IGNORE_CLASSES") {
            self.ignore_classes = split_list(&value);
        }
    }

    /// Check that a report could be delivered with this configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::MissingApiKey);
        }
        self.endpoint_url()?;
        Ok(())
    }

    /// The delivery endpoint as a URL; only http(s) is accepted
    pub fn endpoint_url(&self) -> Result<Url> {
        let url =
            Url::parse(&self.endpoint).map_err(|e| Error::invalid_endpoint(&self.endpoint, e))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(Error::invalid_endpoint(
                &self.endpoint,
                format!("unsupported scheme '{}'", scheme),
            )),
        }
    }

    /// Whether the current release stage is allowed to send reports.
    ///
    /// Without a `notify_release_stages` filter every stage notifies. With a
    /// filter, an unset release stage does not.
    pub fn should_notify(&self) -> bool {
        match (&self.notify_release_stages, &self.release_stage) {
            (None, _) => true,
            (Some(stages), Some(stage)) => stages.iter().any(|s| s == stage),
            (Some(_), None) => false,
        }
    }

    /// Whether errors of this class are excluded from reporting
    pub fn is_ignored_class(&self, class: &str) -> bool {
        self.ignore_classes.iter().any(|ignored| ignored == class)
    }

    /// Global metadata as a store, in the default tab
    pub fn global_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        for (key, value) in &self.metadata {
            metadata.add_to_tab(DEFAULT_TAB_NAME, key.as_str(), value.as_str());
        }
        metadata
    }

    /// Lists used to classify stack trace lines
    pub fn project_config(&self) -> ProjectConfig {
        ProjectConfig::new(self.file_prefixes.clone(), self.project_namespaces.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn env_var(name: &str) -> Option<String> {
    let key = format!("{}{}", ENV_PREFIX, name);
    match std::env::var(&key) {
        Ok(value) => Some(value),
        Err(std::env::VarError::NotPresent) => None,
        Err(std::env::VarError::NotUnicode(_)) => {
            warn!("Ignoring {}: value is not valid unicode", key);
            None
        }
    }
}

/// Split a comma-separated list, dropping empty items
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// A list written either as an array or as one comma-separated string
#[derive(Deserialize)]
#[serde(untagged)]
enum ListValue {
    Items(Vec<String>),
    Joined(String),
}

impl ListValue {
    fn into_items(self) -> Vec<String> {
        match self {
            ListValue::Items(items) => items,
            ListValue::Joined(joined) => split_list(&joined),
        }
    }
}

fn deserialize_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    ListValue::deserialize(deserializer).map(ListValue::into_items)
}

fn deserialize_optional_list<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<ListValue>::deserialize(deserializer).map(|list| list.map(ListValue::into_items))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
