//! EPY-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, EpyError>;

/// Top-level error type for the employee-parity harness.
///
/// Behavioral divergence between subjects is deliberately *not* an error
/// variant: a divergence is the harness's product and travels as data
/// (`harness::Divergence`). Errors cover the harness's own failures —
/// configuration, transport, serialization, and the embedded service.
#[derive(Debug, Error)]
pub enum EpyError {
    #[error("[EPY-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[EPY-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[EPY-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    /// Transport-level HTTP failure (connection refused, timeout, bad URL).
    /// Always fatal to the current trial; never a subject-behavior signal.
    #[error("[EPY-2001] transport failure in {context}: {details}")]
    Transport {
        context: &'static str,
        details: String,
    },

    /// A subject answered with a status outside the documented contract
    /// mapping. This indicates a harness or environment bug, not a
    /// business-logic divergence.
    #[error("[EPY-2002] unexpected status {status} from {client} on {call}: {body}")]
    UnexpectedStatus {
        client: String,
        call: String,
        status: u16,
        body: String,
    },

    #[error("[EPY-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[cfg(feature = "service")]
    #[error("[EPY-2102] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[cfg(feature = "service")]
    #[error("[EPY-3001] reference service spawn failure: {details}")]
    ServiceSpawn { details: String },

    #[error("[EPY-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[EPY-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[EPY-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl EpyError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "EPY-1001",
            Self::MissingConfig { .. } => "EPY-1002",
            Self::ConfigParse { .. } => "EPY-1003",
            Self::Transport { .. } => "EPY-2001",
            Self::UnexpectedStatus { .. } => "EPY-2002",
            Self::Serialization { .. } => "EPY-2101",
            #[cfg(feature = "service")]
            Self::Sql { .. } => "EPY-2102",
            #[cfg(feature = "service")]
            Self::ServiceSpawn { .. } => "EPY-3001",
            Self::Io { .. } => "EPY-3002",
            Self::ChannelClosed { .. } => "EPY-3003",
            Self::Runtime { .. } => "EPY-3900",
        }
    }

    /// Whether retrying (with a fresh trial, not a silent in-trial retry)
    /// might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<reqwest::Error> for EpyError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport {
            context: "reqwest",
            details: value.to_string(),
        }
    }
}

#[cfg(feature = "service")]
impl From<rusqlite::Error> for EpyError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for EpyError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for EpyError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_errors() -> Vec<EpyError> {
        let mut errors = vec![
            EpyError::InvalidConfig {
                details: String::new(),
            },
            EpyError::MissingConfig {
                path: PathBuf::new(),
            },
            EpyError::ConfigParse {
                context: "",
                details: String::new(),
            },
            EpyError::Transport {
                context: "",
                details: String::new(),
            },
            EpyError::UnexpectedStatus {
                client: String::new(),
                call: String::new(),
                status: 0,
                body: String::new(),
            },
            EpyError::Serialization {
                context: "",
                details: String::new(),
            },
            EpyError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            EpyError::ChannelClosed { component: "" },
            EpyError::Runtime {
                details: String::new(),
            },
        ];
        #[cfg(feature = "service")]
        {
            errors.push(EpyError::Sql {
                context: "",
                details: String::new(),
            });
            errors.push(EpyError::ServiceSpawn {
                details: String::new(),
            });
        }
        errors
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = sample_errors();
        let codes: Vec<&str> = errors.iter().map(EpyError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_epy_prefix() {
        for err in &sample_errors() {
            assert!(
                err.code().starts_with("EPY-"),
                "code {} must start with EPY-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = EpyError::UnexpectedStatus {
            client: "model".to_string(),
            call: "GET /api/employees/HR-7".to_string(),
            status: 503,
            body: "oops".to_string(),
        };
        let msg = err.to_string();
        assert!(
            msg.contains("EPY-2002"),
            "display should contain error code: {msg}"
        );
        assert!(msg.contains("503"), "display should contain status: {msg}");
        assert!(
            msg.contains("GET /api/employees/HR-7"),
            "display should contain the call: {msg}"
        );
    }

    #[test]
    fn transport_errors_are_retryable_but_contract_errors_are_not() {
        assert!(
            EpyError::Transport {
                context: "reqwest",
                details: String::new()
            }
            .is_retryable()
        );
        assert!(EpyError::ChannelClosed { component: "spawn" }.is_retryable());

        assert!(
            !EpyError::UnexpectedStatus {
                client: String::new(),
                call: String::new(),
                status: 500,
                body: String::new(),
            }
            .is_retryable()
        );
        assert!(
            !EpyError::InvalidConfig {
                details: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = EpyError::io(
            "/tmp/report.jsonl",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "EPY-3002");
        assert!(err.to_string().contains("/tmp/report.jsonl"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: EpyError = json_err.into();
        assert_eq!(err.code(), "EPY-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: EpyError = toml_err.into();
        assert_eq!(err.code(), "EPY-1003");
    }
}
