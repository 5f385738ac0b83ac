//! Seeded trial campaigns: generation, replay, and shrinking.
//!
//! A campaign draws `trials` action sequences from the generator and
//! replays each through a fresh [`SequenceRunner`]. The whole campaign is
//! deterministic in the `u64` seed, and a failing sequence is handed to
//! proptest's shrinker so the reported reproduction is minimal.

use std::any::Any;
use std::cell::RefCell;
use std::time::{SystemTime, UNIX_EPOCH};

use proptest::test_runner::{
    Config as ProptestConfig, RngAlgorithm, TestCaseError, TestError, TestRng, TestRunner,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::errors::{EpyError, Result};
use crate::harness::action::{Action, Divergence, SubjectPair};
use crate::harness::generate::action_sequence;
use crate::harness::report::JsonlReporter;
use crate::harness::runner::SequenceRunner;

/// Campaign knobs.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CampaignConfig {
    /// Number of generated sequences to replay.
    pub trials: u32,
    /// Upper bound on actions per sequence.
    pub max_actions: usize,
    /// Seed the whole campaign is a pure function of.
    pub seed: u64,
}

/// Subjects for one trial, plus whatever must stay alive while they are in
/// use (embedded service handles, temp dirs).
pub struct TrialSubjects {
    /// The clients handed to the runner.
    pub pair: SubjectPair,
    guards: Vec<Box<dyn Any>>,
}

impl TrialSubjects {
    /// Subjects with no attached lifetime guards (external URLs).
    #[must_use]
    pub fn new(pair: SubjectPair) -> Self {
        Self {
            pair,
            guards: Vec::new(),
        }
    }

    /// Attach a guard dropped only after the trial finishes.
    #[must_use]
    pub fn with_guard(mut self, guard: Box<dyn Any>) -> Self {
        self.guards.push(guard);
        self
    }
}

/// Terminal result of a campaign.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum CampaignOutcome {
    /// Every trial completed without divergence.
    Clean {
        /// Trials replayed.
        trials: u32,
    },
    /// A divergence was found; the sequence is the shrunk minimal
    /// reproduction.
    Divergent {
        /// Shortest failing sequence the shrinker reached.
        minimal_sequence: Vec<Action>,
        /// The divergence observed on the minimal sequence.
        divergence: Option<Divergence>,
        /// Failure reason as rendered by the runner.
        reason: String,
    },
}

impl CampaignOutcome {
    /// Whether the campaign found no divergence.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(self, Self::Clean { .. })
    }
}

/// A fresh seed for campaigns that did not pin one.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn fresh_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0x5eed, |d| d.as_nanos() as u64);
    nanos ^ u64::from(std::process::id()).rotate_left(32)
}

/// Expand a `u64` campaign seed into the 32-byte ChaCha seed the
/// generator's RNG requires.
fn expand_seed(seed: u64) -> [u8; 32] {
    Sha256::digest(seed.to_le_bytes()).into()
}

/// Run a full campaign.
///
/// `make_subjects` is invoked once per executed sequence — including
/// shrink replays — so embedded subjects start every replay from a clean
/// state. Harness-level failures (transport, spawn, reporting) abort the
/// campaign as errors; only behavioral divergence produces
/// [`CampaignOutcome::Divergent`].
pub fn run_campaign<F>(
    config: &CampaignConfig,
    make_subjects: F,
    reporter: Option<&JsonlReporter>,
) -> Result<CampaignOutcome>
where
    F: Fn() -> Result<TrialSubjects>,
{
    let proptest_config = ProptestConfig {
        cases: config.trials,
        failure_persistence: None,
        ..ProptestConfig::default()
    };
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &expand_seed(config.seed));
    let mut runner = TestRunner::new_with_rng(proptest_config, rng);
    let strategy = action_sequence(config.max_actions);

    let harness_error: RefCell<Option<EpyError>> = RefCell::new(None);
    let last_divergence: RefCell<Option<Divergence>> = RefCell::new(None);

    let result = runner.run(&strategy, |actions| {
        // A stored harness error ends the campaign; shrink replays after it
        // are pointless, so short-circuit them.
        if harness_error.borrow().is_some() {
            return Err(TestCaseError::fail("harness failure"));
        }

        let subjects = match make_subjects() {
            Ok(subjects) => subjects,
            Err(e) => {
                *harness_error.borrow_mut() = Some(e);
                return Err(TestCaseError::fail("harness failure"));
            }
        };
        let TrialSubjects { pair, guards } = subjects;
        let mut sequence_runner = SequenceRunner::new(pair);

        let report = match sequence_runner.run_sequence(&actions) {
            Ok(report) => report,
            Err(e) => {
                *harness_error.borrow_mut() = Some(e);
                return Err(TestCaseError::fail("harness failure"));
            }
        };
        if let Some(reporter) = reporter {
            if let Err(e) = reporter.append(&report) {
                *harness_error.borrow_mut() = Some(e);
                return Err(TestCaseError::fail("harness failure"));
            }
        }
        drop(guards);

        report.divergence.map_or(Ok(()), |divergence| {
            let reason = divergence.to_string();
            *last_divergence.borrow_mut() = Some(divergence);
            Err(TestCaseError::fail(reason))
        })
    });

    if let Some(error) = harness_error.into_inner() {
        return Err(error);
    }

    match result {
        Ok(()) => Ok(CampaignOutcome::Clean {
            trials: config.trials,
        }),
        Err(TestError::Fail(reason, minimal_sequence)) => Ok(CampaignOutcome::Divergent {
            minimal_sequence,
            divergence: last_divergence.into_inner(),
            reason: format!("{reason}"),
        }),
        Err(TestError::Abort(reason)) => Err(EpyError::Runtime {
            details: format!("campaign aborted: {reason}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TestHttpClient;
    use crate::core::config::HttpConfig;

    fn quiet_http() -> HttpConfig {
        HttpConfig {
            timeout_ms: 1_000,
            log_calls: false,
        }
    }

    #[test]
    fn expand_seed_is_deterministic_and_seed_sensitive() {
        assert_eq!(expand_seed(7), expand_seed(7));
        assert_ne!(expand_seed(7), expand_seed(8));
    }

    #[test]
    fn fresh_seeds_vary() {
        // Nanosecond clock means two draws are overwhelmingly distinct;
        // equality here would indicate a broken entropy source.
        let a = fresh_seed();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = fresh_seed();
        assert_ne!(a, b);
    }

    #[test]
    fn unreachable_subjects_abort_the_campaign_as_a_transport_error() {
        let config = CampaignConfig {
            trials: 3,
            max_actions: 4,
            seed: 11,
        };
        let http = quiet_http();
        let err = run_campaign(
            &config,
            || {
                Ok(TrialSubjects::new(SubjectPair {
                    model: TestHttpClient::new("model", "http://127.0.0.1:9", &http)?,
                    tested: TestHttpClient::new("tested", "http://127.0.0.1:10", &http)?,
                }))
            },
            None,
        )
        .unwrap_err();
        assert!(err.is_retryable(), "transport failure expected, got {err}");
    }
}
