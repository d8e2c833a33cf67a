//! Enabled endpoint list
//!
//! The set of endpoints the server mounts is declared once at startup from
//! `ENABLED_ENDPOINTS` and validated against the closed set in [`Endpoint`].

use crate::config::env_names::ENABLED_ENDPOINTS;
use crate::config::ConfigError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Every endpoint the service knows how to mount
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Endpoint {
    /// `POST /summarize`
    #[strum(serialize = "ik_llama.text_summarization")]
    #[serde(rename = "ik_llama.text_summarization")]
    TextSummarization,
    /// `POST /infer`, raw prompt in and raw output back
    #[strum(serialize = "ik_llama.inference")]
    #[serde(rename = "ik_llama.inference")]
    Inference,
}

impl Endpoint {
    /// HTTP path the endpoint is mounted at
    pub fn route(&self) -> &'static str {
        match self {
            Endpoint::TextSummarization => "/summarize",
            Endpoint::Inference => "/infer",
        }
    }
}

/// Ordered, de-duplicated set of enabled endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledEndpoints(BTreeSet<Endpoint>);

impl EnabledEndpoints {
    /// Parse a comma-separated identifier list.
    ///
    /// Blank entries are skipped. A list with no entries at all yields the
    /// default set; any unknown identifier is an error.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut endpoints = BTreeSet::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let endpoint = Endpoint::from_str(entry)
                .map_err(|_| ConfigError::UnknownEndpoint(entry.to_string()))?;
            endpoints.insert(endpoint);
        }

        if endpoints.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self(endpoints))
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(ENABLED_ENDPOINTS) {
            Ok(raw) => Self::parse(&raw),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Invalid(format!("{}: {}", ENABLED_ENDPOINTS, e))),
        }
    }

    /// Every known endpoint
    pub fn all() -> Self {
        Self(Endpoint::iter().collect())
    }

    pub fn contains(&self, endpoint: Endpoint) -> bool {
        self.0.contains(&endpoint)
    }

    pub fn iter(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.0.iter().copied()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.0.iter().map(|e| <&'static str>::from(*e)).collect()
    }
}

impl Default for EnabledEndpoints {
    fn default() -> Self {
        Self(BTreeSet::from([Endpoint::TextSummarization]))
    }
}
