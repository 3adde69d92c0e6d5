#![forbid(unsafe_code)]

//! Renderer configuration.

use serde::Deserialize;

use crate::error::{RenderError, Result};

/// Knobs shared by every handle of one app.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Label anchor comments with the handle kind (`<!--repeat-->`).
    pub debug_anchors: bool,
    /// Capacity of the non-fatal report ring.
    pub max_reports: usize,
    /// Emit `tracing` events for reports.
    pub log_reports: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            debug_anchors: false,
            max_reports: 64,
            log_reports: true,
        }
    }
}

impl RenderConfig {
    /// Defaults overridden by `BORF_DEBUG_ANCHORS`, `BORF_MAX_REPORTS` and
    /// `BORF_LOG_REPORTS`.
    ///
    /// # Errors
    ///
    /// [`RenderError::Config`] when a variable is set to something unparsable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// [`RenderError::Config`] when a value is unparsable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup("BORF_DEBUG_ANCHORS") {
            config.debug_anchors = parse_flag("BORF_DEBUG_ANCHORS", &value)?;
        }
        if let Some(value) = lookup("BORF_LOG_REPORTS") {
            config.log_reports = parse_flag("BORF_LOG_REPORTS", &value)?;
        }
        if let Some(value) = lookup("BORF_MAX_REPORTS") {
            config.max_reports = value.trim().parse().map_err(|_| RenderError::Config {
                key: "BORF_MAX_REPORTS",
                value,
            })?;
        }
        Ok(config)
    }

    /// Parse a JSON object; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// [`RenderError::Json`] for malformed input or unknown fields.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(RenderError::Config {
            key,
            value: value.to_owned(),
        }),
    }
}
