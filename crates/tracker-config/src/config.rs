//! Typed read/write of user preferences (spec §4.11, §6, C11).
//!
//! Wire format is a single JSON document (spec §6 names the keys and their
//! JSON types explicitly), following the *shape* of the teacher's
//! `csa-config::ProjectConfig` (one struct per concern, `#[serde(default)]`
//! + free functions for defaults, a `load`/`save` pair) but not its TOML wire
//! format — noted in DESIGN.md as a deliberate deviation since spec.md §6 is
//! explicit that the config file is JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub skip_permissions: bool,
    #[serde(default = "default_max_review_rounds")]
    pub max_review_rounds: u32,
    #[serde(default)]
    pub usage_limits: UsageLimits,
    #[serde(default)]
    pub worktree: WorktreeConfig,
}

fn default_max_review_rounds() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            skip_permissions: false,
            max_review_rounds: default_max_review_rounds(),
            usage_limits: UsageLimits::default(),
            worktree: WorktreeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimits {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_min_input_tokens")]
    pub min_available_input_tokens: u64,
    #[serde(default = "default_min_requests")]
    pub min_available_requests: u32,
    #[serde(default = "default_max_cost_per_session")]
    pub max_cost_per_session: f64,
    #[serde(default = "default_max_wait_minutes")]
    pub max_wait_minutes: u32,
    /// 1..4; `None` means "auto" (spec §6: "(auto)").
    #[serde(default)]
    pub organization_tier: Option<u8>,
}

fn default_min_input_tokens() -> u64 {
    10_000
}
fn default_min_requests() -> u32 {
    5
}
fn default_max_cost_per_session() -> f64 {
    1.0
}
fn default_max_wait_minutes() -> u32 {
    10
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self {
            enabled: false,
            min_available_input_tokens: default_min_input_tokens(),
            min_available_requests: default_min_requests(),
            max_cost_per_session: default_max_cost_per_session(),
            max_wait_minutes: default_max_wait_minutes(),
            organization_tier: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub copy_gitignored: bool,
    #[serde(default)]
    pub auto_cleanup_on_complete: bool,
}

fn default_true() -> bool {
    true
}

impl Default for WorktreeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            copy_gitignored: true,
            auto_cleanup_on_complete: false,
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields defaults silently; a present
    /// but malformed file is a `ConfigError` that is "invisible" per spec
    /// §7 — callers should prefer [`Config::load_or_default`], which is the
    /// one that actually implements that swallow-and-warn policy.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Load from `path`, falling back to defaults on any error (missing
    /// file or malformed JSON) per spec §7: "ConfigError is invisible
    /// (silently load defaults)."
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "falling back to default config");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Parse)?;
        std::fs::write(path, content).map_err(ConfigError::Io)
    }

    /// Read a single key by its dotted JSON path (`usageLimits.enabled`),
    /// used by `tracker config <key>` (spec §6 CLI command).
    pub fn get_key(&self, key: &str) -> Option<serde_json::Value> {
        let value = serde_json::to_value(self).ok()?;
        key.split('.').try_fold(value, |acc, segment| {
            acc.as_object()?.get(&camel_case(segment)).cloned()
        })
    }

    /// Write a single key by its dotted JSON path, parsing `raw` as JSON
    /// first and falling back to a bare string if that fails (so `tracker
    /// config maxReviewRounds 3` and `tracker config worktree.enabled false`
    /// both work without the caller quoting anything).
    pub fn set_key(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let new_value: serde_json::Value =
            serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));

        let mut document = serde_json::to_value(&*self).map_err(ConfigError::Parse)?;
        let segments: Vec<String> = key.split('.').map(camel_case).collect();
        set_path(&mut document, &segments, new_value)
            .ok_or_else(|| ConfigError::Parse(serde::de::Error::custom(format!("unknown config key '{key}'"))))?;

        *self = serde_json::from_value(document).map_err(ConfigError::Parse)?;
        Ok(())
    }
}

fn set_path(document: &mut serde_json::Value, segments: &[String], new_value: serde_json::Value) -> Option<()> {
    let (head, rest) = segments.split_first()?;
    let object = document.as_object_mut()?;
    if rest.is_empty() {
        if !object.contains_key(head) {
            return None;
        }
        object.insert(head.clone(), new_value);
        Some(())
    } else {
        set_path(object.get_mut(head)?, rest, new_value)
    }
}

/// The struct fields are already camelCase idents; dotted CLI keys may be
/// typed either way, so normalize snake_case/kebab-case input to camelCase
/// before looking it up in the serialized JSON object.
fn camel_case(segment: &str) -> String {
    let mut result = String::new();
    let mut upper_next = false;
    for ch in segment.chars() {
        if ch == '_' || ch == '-' {
            upper_next = true;
        } else if upper_next {
            result.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
