//! Closed action vocabulary and per-variant equivalence checks.
//!
//! Each variant performs the same API call against both subjects of a
//! [`SubjectPair`] and checks the observable outcomes for equivalence. The
//! live model subject is the oracle: for mutating actions, a pre-read of
//! the model decides which branch (fresh insert vs. duplicate, present vs.
//! absent) both subjects are expected to take. No shadow state is kept —
//! the model's own answers are authoritative, so harness bookkeeping can
//! never drift from it.

#![allow(missing_docs)]

use std::fmt;

use serde::Serialize;

use crate::client::{CreateOutcome, EmployeeRecord, TestHttpClient, UpdateOutcome};
use crate::core::errors::Result;

/// The two subjects under comparison. `model` is ground truth; `tested` is
/// the candidate checked against it.
#[derive(Debug, Clone)]
pub struct SubjectPair {
    pub model: TestHttpClient,
    pub tested: TestHttpClient,
}

/// One discrete, replayable API operation with generated parameters.
///
/// The vocabulary is fixed and finite; exhaustive matching keeps every
/// equivalence check in one place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    Create { employee_no: String, name: String },
    Update { employee_no: String, new_name: String },
    GetOne { employee_no: String },
    GetByDepartment { department: String },
    GetAll,
}

/// Which comparison detected the divergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DivergenceKind {
    /// Different outcome classification (created vs. rejected, found vs.
    /// absent, updated vs. not-found).
    Outcome,
    /// Same classification, different record or collection content.
    Body,
    /// Same failure classification, different server-supplied message.
    FailureMessage,
    /// Post-mutation reads of the two subjects disagree.
    PostState,
    /// The model subject contradicted its own pre-state (e.g. accepted a
    /// create it had just reported as a duplicate). Points at the model
    /// subject or a concurrent writer, not at the tested subject.
    ModelInconsistency,
}

impl DivergenceKind {
    /// Human label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Outcome => "outcome",
            Self::Body => "body",
            Self::FailureMessage => "failure-message",
            Self::PostState => "post-state",
            Self::ModelInconsistency => "model-inconsistency",
        }
    }
}

/// An observable difference between the two subjects for one action.
///
/// The primary product of the harness: carries the offending action with
/// its literal parameters and both observed outcomes, rendered for humans.
#[derive(Debug, Clone, Serialize)]
pub struct Divergence {
    pub action: Action,
    pub kind: DivergenceKind,
    pub model_observed: String,
    pub tested_observed: String,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} divergence on {}: model observed {}, tested observed {}",
            self.kind.label(),
            self.action,
            self.model_observed,
            self.tested_observed
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { employee_no, name } => write!(f, "create({employee_no}, {name:?})"),
            Self::Update {
                employee_no,
                new_name,
            } => write!(f, "update({employee_no}, {new_name:?})"),
            Self::GetOne { employee_no } => write!(f, "get-one({employee_no})"),
            Self::GetByDepartment { department } => {
                write!(f, "get-by-department({department:?})")
            }
            Self::GetAll => write!(f, "get-all"),
        }
    }
}

impl Action {
    /// Execute this action against both subjects and compare outcomes.
    ///
    /// `Ok(None)` means the subjects were equivalent. `Ok(Some(_))` is a
    /// detected divergence. `Err(_)` is a harness-level failure (transport,
    /// undocumented status) that aborts the trial without a verdict.
    pub fn run(&self, pair: &SubjectPair) -> Result<Option<Divergence>> {
        match self {
            Self::Create { employee_no, name } => self.run_create(pair, employee_no, name),
            Self::Update {
                employee_no,
                new_name,
            } => self.run_update(pair, employee_no, new_name),
            Self::GetOne { employee_no } => {
                let tested = pair.tested.get(employee_no)?;
                let model = pair.model.get(employee_no)?;
                Ok(self.compare_single(&model, &tested))
            }
            Self::GetByDepartment { department } => {
                let tested = pair.tested.get_by_department(department)?;
                let model = pair.model.get_by_department(department)?;
                Ok(self.compare_collections(model, tested))
            }
            Self::GetAll => {
                let tested = pair.tested.get_all()?;
                let model = pair.model.get_all()?;
                Ok(self.compare_collections(model, tested))
            }
        }
    }

    fn run_create(
        &self,
        pair: &SubjectPair,
        employee_no: &str,
        name: &str,
    ) -> Result<Option<Divergence>> {
        let pre = pair.model.get(employee_no)?;
        let tested = pair.tested.create(employee_no, name)?;
        let model = pair.model.create(employee_no, name)?;

        // The model must honor its own pre-state before it can judge the
        // tested subject.
        let model_matches_pre = matches!(
            (&pre, &model),
            (None, CreateOutcome::Created(_)) | (Some(_), CreateOutcome::AlreadyExists { .. })
        );
        if !model_matches_pre {
            return Ok(Some(self.divergence(
                DivergenceKind::ModelInconsistency,
                format!("pre-state {}, then {}", fmt_pre(&pre), fmt_create(&model)),
                fmt_create(&tested),
            )));
        }

        let outcome_divergence = match (&model, &tested) {
            (CreateOutcome::Created(m), CreateOutcome::Created(t)) => (m != t).then(|| {
                self.divergence(DivergenceKind::Body, fmt_record(m), fmt_record(t))
            }),
            (
                CreateOutcome::AlreadyExists { message: m },
                CreateOutcome::AlreadyExists { message: t },
            ) => (m != t).then(|| {
                self.divergence(
                    DivergenceKind::FailureMessage,
                    format!("{m:?}"),
                    format!("{t:?}"),
                )
            }),
            _ => Some(self.divergence(
                DivergenceKind::Outcome,
                fmt_create(&model),
                fmt_create(&tested),
            )),
        };
        if outcome_divergence.is_some() {
            return Ok(outcome_divergence);
        }

        self.compare_post_state(pair, employee_no)
    }

    fn run_update(
        &self,
        pair: &SubjectPair,
        employee_no: &str,
        new_name: &str,
    ) -> Result<Option<Divergence>> {
        let pre = pair.model.get(employee_no)?;
        let tested = pair.tested.update(employee_no, new_name)?;
        let model = pair.model.update(employee_no, new_name)?;

        let model_matches_pre = matches!(
            (&pre, &model),
            (Some(_), UpdateOutcome::Updated(_)) | (None, UpdateOutcome::NotFound)
        );
        if !model_matches_pre {
            return Ok(Some(self.divergence(
                DivergenceKind::ModelInconsistency,
                format!("pre-state {}, then {}", fmt_pre(&pre), fmt_update(&model)),
                fmt_update(&tested),
            )));
        }

        let outcome_divergence = match (&model, &tested) {
            (UpdateOutcome::Updated(m), UpdateOutcome::Updated(t)) => (m != t).then(|| {
                self.divergence(DivergenceKind::Body, fmt_record(m), fmt_record(t))
            }),
            (UpdateOutcome::NotFound, UpdateOutcome::NotFound) => None,
            _ => Some(self.divergence(
                DivergenceKind::Outcome,
                fmt_update(&model),
                fmt_update(&tested),
            )),
        };
        if outcome_divergence.is_some() {
            return Ok(outcome_divergence);
        }

        self.compare_post_state(pair, employee_no)
    }

    /// Read the same employee back from both subjects after a mutation and
    /// require field-wise equality (including both-absent).
    fn compare_post_state(
        &self,
        pair: &SubjectPair,
        employee_no: &str,
    ) -> Result<Option<Divergence>> {
        let tested = pair.tested.get(employee_no)?;
        let model = pair.model.get(employee_no)?;
        Ok((model != tested).then(|| {
            self.divergence(
                DivergenceKind::PostState,
                fmt_opt_record(&model),
                fmt_opt_record(&tested),
            )
        }))
    }

    fn compare_single(
        &self,
        model: &Option<EmployeeRecord>,
        tested: &Option<EmployeeRecord>,
    ) -> Option<Divergence> {
        if model == tested {
            return None;
        }
        let kind = if model.is_some() && tested.is_some() {
            DivergenceKind::Body
        } else {
            DivergenceKind::Outcome
        };
        Some(self.divergence(kind, fmt_opt_record(model), fmt_opt_record(tested)))
    }

    /// Collections compare as unordered multisets; response order is not
    /// part of the contract.
    fn compare_collections(
        &self,
        mut model: Vec<EmployeeRecord>,
        mut tested: Vec<EmployeeRecord>,
    ) -> Option<Divergence> {
        model.sort_unstable();
        tested.sort_unstable();
        (model != tested).then(|| {
            self.divergence(
                DivergenceKind::Body,
                fmt_records(&model),
                fmt_records(&tested),
            )
        })
    }

    fn divergence(&self, kind: DivergenceKind, model: String, tested: String) -> Divergence {
        Divergence {
            action: self.clone(),
            kind,
            model_observed: model,
            tested_observed: tested,
        }
    }
}

fn fmt_record(record: &EmployeeRecord) -> String {
    format!("{} {:?}", record.employee_no, record.name)
}

fn fmt_opt_record(record: &Option<EmployeeRecord>) -> String {
    record.as_ref().map_or_else(|| "absent".to_string(), fmt_record)
}

fn fmt_records(records: &[EmployeeRecord]) -> String {
    let rendered: Vec<String> = records.iter().map(fmt_record).collect();
    format!("[{}]", rendered.join(", "))
}

fn fmt_pre(pre: &Option<EmployeeRecord>) -> String {
    pre.as_ref()
        .map_or_else(|| "absent".to_string(), |r| format!("present as {}", fmt_record(r)))
}

fn fmt_create(outcome: &CreateOutcome) -> String {
    match outcome {
        CreateOutcome::Created(record) => format!("created {}", fmt_record(record)),
        CreateOutcome::AlreadyExists { message } => format!("rejected with {message:?}"),
    }
}

fn fmt_update(outcome: &UpdateOutcome) -> String {
    match outcome {
        UpdateOutcome::Updated(record) => format!("updated {}", fmt_record(record)),
        UpdateOutcome::NotFound => "not-found".to_string(),
    }
}
