//! Repair-engine configuration.
//!
//! Tunables for prompt size, rewrite timeouts, and validator strictness.
//! Loaded from a TOML file when one exists; every field has a default so a
//! missing or partial file still yields a working configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;

/// What the validator does when no vocabulary could be extracted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoVocabPolicy {
    /// No dictionary means no way to keep invented words out; rewrites are
    /// disabled outright.
    DisableRewrites,
    /// Validate against observed context only and otherwise pass through.
    Permissive,
}

/// Configuration for classification, arbitration, and the retry coordinator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Hard-reject rewrites whose verb or preposition is absent from the
    /// vocabulary.
    pub strict: bool,
    pub no_vocab_policy: NoVocabPolicy,
    /// Budget for one rewrite-service call, in seconds.
    pub rewrite_timeout_secs: u64,
    /// Triggering output is truncated to this many characters in the prompt.
    pub max_output_context: usize,
    /// Replies longer than this are rejected during normalization.
    pub max_reply_len: usize,
    /// Output token budget for the rewrite call; low to bias toward a bare
    /// command.
    pub max_tokens: u32,
    /// Sampling temperature for the rewrite call.
    pub temperature: f32,
    /// At most this many words per vocabulary slice in the prompt.
    pub prompt_word_cap: usize,
    /// How many recent commands the context retains.
    pub recent_command_limit: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            strict: true,
            no_vocab_policy: NoVocabPolicy::DisableRewrites,
            rewrite_timeout_secs: 4,
            max_output_context: 500,
            max_reply_len: 100,
            max_tokens: 24,
            temperature: 0.1,
            prompt_word_cap: 60,
            recent_command_limit: 10,
        }
    }
}

impl RepairConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file is absent.
    ///
    /// # Errors
    /// Returns an error only when the file exists but cannot be read or
    /// parsed; a missing file logs a warning and yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("no repair config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        info!("repair config loaded from {}", path.display());
        Ok(config)
    }
}
