//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{EpyError, Result};

/// Full harness configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub subjects: SubjectsConfig,
    pub trials: TrialsConfig,
    pub http: HttpConfig,
    pub report: ReportConfig,
}

/// Addresses and display names of the two subjects under comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SubjectsConfig {
    /// Base URL of the model (reference) subject.
    pub model_url: String,
    /// Base URL of the tested (candidate) subject.
    pub tested_url: String,
    /// Display name used in per-call diagnostics for the model subject.
    pub model_name: String,
    /// Display name used in per-call diagnostics for the tested subject.
    pub tested_name: String,
}

/// Trial campaign knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrialsConfig {
    /// Number of generated action sequences to replay.
    pub trials: u32,
    /// Upper bound on actions per generated sequence.
    pub max_actions: usize,
    /// Deterministic seed. `None` draws a fresh seed per campaign.
    pub seed: Option<u64>,
}

/// HTTP transport knobs shared by both test clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout. A hung call is a harness-level failure, not a skip.
    pub timeout_ms: u64,
    /// Emit one color-tagged diagnostic line per API call.
    pub log_calls: bool,
}

/// Trial report sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ReportConfig {
    /// Append one JSONL record per trial to this path when set.
    pub jsonl_path: Option<PathBuf>,
}

impl Default for SubjectsConfig {
    fn default() -> Self {
        Self {
            model_url: "http://localhost:8080".to_string(),
            tested_url: "http://localhost:8081".to_string(),
            model_name: "model".to_string(),
            tested_name: "tested".to_string(),
        }
    }
}

impl Default for TrialsConfig {
    fn default() -> Self {
        // 110 tries matches the regression campaign the contract was
        // calibrated against.
        Self {
            trials: 110,
            max_actions: 32,
            seed: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            log_calls: true,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        home_dir.join(".config").join("epy").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| EpyError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(EpyError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(|key| env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging/reports.
    ///
    /// Uses FNV-1a for cross-process-stable hashing (no `DefaultHasher`
    /// whose seed may vary across Rust releases).
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // subjects
        set_env_string(
            &mut lookup,
            "EPY_MODEL_URL",
            &mut self.subjects.model_url,
        );
        set_env_string(
            &mut lookup,
            "EPY_TESTED_URL",
            &mut self.subjects.tested_url,
        );
        set_env_string(
            &mut lookup,
            "EPY_MODEL_NAME",
            &mut self.subjects.model_name,
        );
        set_env_string(
            &mut lookup,
            "EPY_TESTED_NAME",
            &mut self.subjects.tested_name,
        );

        // trials
        set_env_u32(&mut lookup, "EPY_TRIALS", &mut self.trials.trials)?;
        set_env_usize(&mut lookup, "EPY_MAX_ACTIONS", &mut self.trials.max_actions)?;
        if let Some(raw) = lookup("EPY_SEED") {
            let parsed = raw.parse::<u64>().map_err(|e| EpyError::InvalidConfig {
                details: format!("EPY_SEED={raw}: {e}"),
            })?;
            self.trials.seed = Some(parsed);
        }

        // http
        set_env_u64(&mut lookup, "EPY_HTTP_TIMEOUT_MS", &mut self.http.timeout_ms)?;
        set_env_bool(&mut lookup, "EPY_HTTP_LOG_CALLS", &mut self.http.log_calls)?;

        // report
        if let Some(raw) = lookup("EPY_REPORT_PATH") {
            self.report.jsonl_path = Some(PathBuf::from(raw));
        }

        Ok(())
    }

    /// Reject configurations that cannot drive a meaningful campaign.
    pub fn validate(&self) -> Result<()> {
        for (label, url) in [
            ("subjects.model_url", &self.subjects.model_url),
            ("subjects.tested_url", &self.subjects.tested_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(EpyError::InvalidConfig {
                    details: format!("{label} must be an http(s) URL, got {url:?}"),
                });
            }
        }
        if self.subjects.model_url == self.subjects.tested_url {
            return Err(EpyError::InvalidConfig {
                details: "model and tested subjects must be distinct instances".to_string(),
            });
        }
        if self.trials.trials == 0 {
            return Err(EpyError::InvalidConfig {
                details: "trials.trials must be at least 1".to_string(),
            });
        }
        if self.trials.max_actions == 0 {
            return Err(EpyError::InvalidConfig {
                details: "trials.max_actions must be at least 1".to_string(),
            });
        }
        if self.http.timeout_ms == 0 {
            return Err(EpyError::InvalidConfig {
                details: "http.timeout_ms must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

fn set_env_string<F>(lookup: &mut F, key: &str, target: &mut String)
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *target = raw;
    }
}

fn set_env_u32<F>(lookup: &mut F, key: &str, target: &mut u32) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *target = raw.parse().map_err(|e| EpyError::InvalidConfig {
            details: format!("{key}={raw}: {e}"),
        })?;
    }
    Ok(())
}

fn set_env_u64<F>(lookup: &mut F, key: &str, target: &mut u64) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *target = raw.parse().map_err(|e| EpyError::InvalidConfig {
            details: format!("{key}={raw}: {e}"),
        })?;
    }
    Ok(())
}

fn set_env_usize<F>(lookup: &mut F, key: &str, target: &mut usize) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *target = raw.parse().map_err(|e| EpyError::InvalidConfig {
            details: format!("{key}={raw}: {e}"),
        })?;
    }
    Ok(())
}

fn set_env_bool<F>(lookup: &mut F, key: &str, target: &mut bool) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *target = match raw.as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                return Err(EpyError::InvalidConfig {
                    details: format!("{key}={other}: expected a boolean"),
                });
            }
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().expect("default config must validate");
        assert_eq!(cfg.trials.trials, 110);
        assert!(cfg.http.log_calls);
    }

    #[test]
    fn toml_roundtrip_preserves_config() {
        let cfg = Config::default();
        let raw = toml::to_string(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&raw).expect("parse");
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [trials]
            trials = 7
            "#,
        )
        .expect("parse");
        assert_eq!(parsed.trials.trials, 7);
        assert_eq!(parsed.trials.max_actions, TrialsConfig::default().max_actions);
        assert_eq!(parsed.subjects, SubjectsConfig::default());
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = Config::default();
        cfg.apply_env_overrides_from(|key| match key {
            "EPY_MODEL_URL" => Some("http://localhost:9001".to_string()),
            "EPY_TRIALS" => Some("3".to_string()),
            "EPY_SEED" => Some("42".to_string()),
            "EPY_HTTP_LOG_CALLS" => Some("off".to_string()),
            _ => None,
        })
        .expect("overrides");
        assert_eq!(cfg.subjects.model_url, "http://localhost:9001");
        assert_eq!(cfg.trials.trials, 3);
        assert_eq!(cfg.trials.seed, Some(42));
        assert!(!cfg.http.log_calls);
    }

    #[test]
    fn malformed_env_override_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_env_overrides_from(|key| {
                (key == "EPY_TRIALS").then(|| "lots".to_string())
            })
            .unwrap_err();
        assert_eq!(err.code(), "EPY-1001");
    }

    #[test]
    fn identical_subject_urls_are_rejected() {
        let mut cfg = Config::default();
        cfg.subjects.tested_url.clone_from(&cfg.subjects.model_url);
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code(), "EPY-1001");
    }

    #[test]
    fn non_http_url_is_rejected() {
        let mut cfg = Config::default();
        cfg.subjects.model_url = "ftp://example.com".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_trials_is_rejected() {
        let mut cfg = Config::default();
        cfg.trials.trials = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn explicit_missing_path_errors() {
        let err = Config::load(Some(Path::new("/nonexistent/epy.toml"))).unwrap_err();
        assert_eq!(err.code(), "EPY-1002");
    }

    #[test]
    fn stable_hash_is_deterministic_and_content_sensitive() {
        let cfg = Config::default();
        let h1 = cfg.stable_hash().expect("hash");
        let h2 = cfg.stable_hash().expect("hash");
        assert_eq!(h1, h2);

        let mut other = Config::default();
        other.trials.trials = 1;
        assert_ne!(h1, other.stable_hash().expect("hash"));
    }
}
