//! Run configuration
//!
//! The configuration is read once at program start and is immutable afterwards.
//! Values come from the environment (optionally populated from a `.env` file
//! by the binary) or from explicit CLI flags.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use reqwest::Url;
use crate::error::{Error, Result};

/// Environment key holding the index page URL (required)
pub const INDEX_URL_KEY: &str = "PDF_INDEX_URL";
/// Environment key holding the letterhead PDF path
pub const LETTERHEAD_PATH_KEY: &str = "LETTERHEAD_PATH";
/// Environment key holding the output directory
pub const OUTPUT_DIR_KEY: &str = "OUTPUT_DIR";
/// Environment key holding the downward shift in PDF points
pub const SHIFT_DOWN_KEY: &str = "SHIFT_DOWN_AMOUNT";
/// Environment key holding the HTTP timeout in seconds
pub const TIMEOUT_KEY: &str = "HTTP_TIMEOUT_SECS";

pub const DEFAULT_LETTERHEAD_PATH: &str = "letterhead.pdf";
pub const DEFAULT_OUTPUT_DIR: &str = "processed_pdfs";
pub const DEFAULT_SHIFT_DOWN: i32 = 20;

/// Immutable configuration for a stamping run
#[derive(Debug, Clone)]
pub struct Config {
    /// Page listing the PDFs to process
    pub index_url: Url,
    /// One-page PDF used as background for every output page
    pub letterhead_path: PathBuf,
    /// Directory receiving the stamped PDFs
    pub output_dir: PathBuf,
    /// Downward shift applied to page content, in PDF points
    pub shift_down: i32,
    /// Per-request HTTP timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Config {
    /// Build a configuration, validating the index URL
    pub fn new(
        index_url: &str,
        letterhead_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        shift_down: i32,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let index_url = index_url.trim();
        if index_url.is_empty() {
            return Err(Error::MissingConfig(INDEX_URL_KEY));
        }

        let index_url = Url::parse(index_url).map_err(|e| Error::InvalidConfig {
            key: INDEX_URL_KEY,
            value: index_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            index_url,
            letterhead_path: letterhead_path.into(),
            output_dir: output_dir.into(),
            shift_down,
            timeout,
        })
    }

    /// Build a configuration from an arbitrary key lookup
    ///
    /// Unset or empty optional keys fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let index_url = value(INDEX_URL_KEY).ok_or(Error::MissingConfig(INDEX_URL_KEY))?;
        let letterhead_path = value(LETTERHEAD_PATH_KEY)
            .unwrap_or_else(|| DEFAULT_LETTERHEAD_PATH.to_string());
        let output_dir = value(OUTPUT_DIR_KEY).unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());

        let shift_down = match value(SHIFT_DOWN_KEY) {
            Some(raw) => parse_number(SHIFT_DOWN_KEY, &raw)?,
            None => DEFAULT_SHIFT_DOWN,
        };

        let timeout = match value(TIMEOUT_KEY) {
            Some(raw) => Some(Duration::from_secs(parse_number(TIMEOUT_KEY, &raw)?)),
            None => None,
        };

        Self::new(&index_url, letterhead_path, output_dir, shift_down, timeout)
    }

    /// Build a configuration from `overrides` layered over `fallback`
    ///
    /// A blank override is treated as unset and defers to `fallback`.
    pub fn from_layers<F>(overrides: &HashMap<&str, String>, fallback: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|key| {
            overrides
                .get(key)
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .or_else(|| fallback(key))
        })
    }

    /// Build a configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from `overrides` layered over the process environment
    pub fn from_env_with_overrides(overrides: &HashMap<&str, String>) -> Result<Self> {
        Self::from_layers(overrides, |key| std::env::var(key).ok())
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| Error::InvalidConfig {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
