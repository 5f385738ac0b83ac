//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use employee_parity::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{EpyError, Result};

// Client
pub use crate::client::{CreateOutcome, EmployeeRecord, TestHttpClient, UpdateOutcome};

// Harness
pub use crate::harness::{
    Action, CampaignConfig, CampaignOutcome, Divergence, DivergenceKind, JsonlReporter, RunState,
    SequenceRunner, SubjectPair, TrialReport, TrialSubjects, fresh_seed, run_campaign,
};

// Service
#[cfg(feature = "service")]
pub use crate::service::{ServeOptions, ServiceHandle, ServiceQuirks};
