//! Fail-fast sequence runner: the differential oracle.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::errors::Result;
use crate::harness::action::{Action, Divergence, SubjectPair};

/// Lifecycle of one trial.
///
/// `NotStarted -> Running -> {Completed, Failed}`. A transport error aborts
/// the trial while still `Running`; there is no retry state because a
/// divergence is a genuine defect signal, not a transient condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    /// No sequence has been applied yet.
    NotStarted,
    /// Actions are being applied in order.
    Running,
    /// Every action ran without divergence.
    Completed,
    /// A divergence aborted the sequence.
    Failed,
}

/// Replays one generated action sequence against a subject pair in
/// lock-step, aborting on the first observable divergence.
#[derive(Debug)]
pub struct SequenceRunner {
    pair: SubjectPair,
    state: RunState,
}

/// Evidence record for one trial, serializable as a single JSONL line.
#[derive(Debug, Clone, Serialize)]
pub struct TrialReport {
    /// Display name of the model subject.
    pub model: String,
    /// Display name of the tested subject.
    pub tested: String,
    /// SHA-256 fingerprint of the action sequence, for traceability and
    /// deterministic replay bookkeeping.
    pub fingerprint: String,
    /// Total actions in the generated sequence.
    pub total_actions: usize,
    /// Actions executed before completion or abort (the failing prefix
    /// length when a divergence was found).
    pub executed_actions: usize,
    /// Terminal state of the trial.
    pub state: RunState,
    /// The detected divergence, when the trial failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<Divergence>,
    /// UTC start timestamp.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the trial.
    pub duration_ms: u64,
}

impl SequenceRunner {
    /// Build a runner owning the given subject pair.
    #[must_use]
    pub fn new(pair: SubjectPair) -> Self {
        Self {
            pair,
            state: RunState::NotStarted,
        }
    }

    /// Current lifecycle state (of the most recent run, if any).
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Borrow the owned pair, e.g. for post-run inspection.
    #[must_use]
    pub const fn pair(&self) -> &SubjectPair {
        &self.pair
    }

    /// Replay `actions` in order against the pair.
    ///
    /// The first divergence transitions the run to [`RunState::Failed`] and
    /// aborts the remaining actions. A run with no divergence reaches
    /// [`RunState::Completed`]. Transport-level errors propagate as `Err`
    /// and leave the runner `Running` — the trial has no verdict.
    pub fn run_sequence(&mut self, actions: &[Action]) -> Result<TrialReport> {
        self.state = RunState::Running;
        let started_at = Utc::now();
        let clock = Instant::now();
        let fingerprint = sequence_fingerprint(actions)?;

        for (index, action) in actions.iter().enumerate() {
            if let Some(divergence) = action.run(&self.pair)? {
                self.state = RunState::Failed;
                return Ok(self.report(
                    fingerprint,
                    actions.len(),
                    index + 1,
                    Some(divergence),
                    started_at,
                    clock,
                ));
            }
        }

        self.state = RunState::Completed;
        Ok(self.report(fingerprint, actions.len(), actions.len(), None, started_at, clock))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn report(
        &self,
        fingerprint: String,
        total: usize,
        executed: usize,
        divergence: Option<Divergence>,
        started_at: DateTime<Utc>,
        clock: Instant,
    ) -> TrialReport {
        TrialReport {
            model: self.pair.model.name().to_string(),
            tested: self.pair.tested.name().to_string(),
            fingerprint,
            total_actions: total,
            executed_actions: executed,
            state: self.state,
            divergence,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
        }
    }
}

/// SHA-256 over the canonical JSON rendering of the sequence.
pub fn sequence_fingerprint(actions: &[Action]) -> Result<String> {
    let canonical = serde_json::to_string(actions)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
