#![forbid(unsafe_code)]

//! employee-parity (epy) — differential model-based test harness for the
//! employee registry HTTP contract.
//!
//! Randomized action sequences are replayed in lock-step against two
//! subjects — a "model" treated as ground truth and a "tested" candidate —
//! and the first observable divergence (status classification, body,
//! failure message, or post-mutation state) fails the trial with a
//! shrunk, replayable reproduction.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use employee_parity::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use employee_parity::client::TestHttpClient;
//! use employee_parity::harness::{CampaignConfig, run_campaign};
//! ```

pub mod prelude;

pub mod client;
pub mod core;
pub mod harness;
#[cfg(feature = "service")]
pub mod service;
