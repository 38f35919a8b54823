use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub definitions: DefinitionsConfig,
    pub fixtures: FixturesConfig,
    pub evaluation: EvaluationConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `AGGCOUNT_PROFILE`. When set (e.g. `STAGING`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("AGGCOUNT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            definitions: DefinitionsConfig::from_env_profiled(p),
            fixtures: FixturesConfig::from_env_profiled(p),
            evaluation: EvaluationConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  definitions: dir={}", self.definitions.dir.display());
        tracing::info!(
            "  fixtures:    messages={}",
            self.fixtures
                .messages_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        );
        tracing::info!(
            "  evaluation:  evidence_limit={}, window_seconds={}",
            self.evaluation.evidence_limit,
            self.evaluation.window_seconds
        );
    }
}

// ── Definitions ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionsConfig {
    /// Directory scanned for event definition YAML files.
    pub dir: PathBuf,
}

impl DefinitionsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            dir: PathBuf::from(profiled_env_or(p, "DEFINITIONS_DIR", "data/definitions")),
        }
    }
}

// ── Fixtures ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixturesConfig {
    /// JSON-lines message dump backing the in-memory search backend.
    pub messages_file: Option<PathBuf>,
}

impl FixturesConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            messages_file: profiled_env_opt(p, "MESSAGES_FILE").map(PathBuf::from),
        }
    }
}

// ── Evaluation ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Cap applied when re-fetching evidence for an emitted event.
    pub evidence_limit: u32,
    /// Window evaluated when no explicit range is given.
    pub window_seconds: u32,
}

impl EvaluationConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            evidence_limit: profiled_env_u32(p, "EVIDENCE_LIMIT", 500),
            window_seconds: profiled_env_u32(p, "WINDOW_SECONDS", 3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_is_uppercased_and_labelled() {
        let config = Config::for_profile("aggcount_test_unset_profile");
        assert_eq!(config.profile, "AGGCOUNT_TEST_UNSET_PROFILE");
        assert_eq!(config.profile_label(), "AGGCOUNT_TEST_UNSET_PROFILE");
        assert_eq!(Config::for_profile("").profile_label(), "default");
    }

    #[test]
    fn profiled_lookup_prefers_prefixed_key() {
        env::set_var("AGGCOUNT_CFG_TEST_KEY", "plain");
        env::set_var("QA_AGGCOUNT_CFG_TEST_KEY", "prefixed");

        assert_eq!(
            profiled_env_opt("QA", "AGGCOUNT_CFG_TEST_KEY").as_deref(),
            Some("prefixed")
        );
        assert_eq!(
            profiled_env_opt("", "AGGCOUNT_CFG_TEST_KEY").as_deref(),
            Some("plain")
        );
        assert_eq!(profiled_env_u32("QA", "AGGCOUNT_CFG_TEST_MISSING", 7), 7);
    }
}
