//! Typed HTTP test client for the employee registry contract.
//!
//! One blocking round trip per operation. Documented non-2xx responses map
//! to typed outcomes (`None`, [`CreateOutcome::AlreadyExists`],
//! [`UpdateOutcome::NotFound`]); anything outside the documented mapping is
//! an [`EpyError::UnexpectedStatus`](crate::core::errors::EpyError) — a
//! harness bug, never a subject-behavior signal.

pub mod http;

use serde::{Deserialize, Serialize};

pub use http::TestHttpClient;

/// One employee as observed over the wire.
///
/// The server may attach an `id` field; identity is opaque (subjects may
/// allocate ids differently), so only `employeeNo` and `name` participate
/// in equality. Unknown response fields are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmployeeRecord {
    /// Unique employee number, format `<Department>-<Id>`.
    #[serde(rename = "employeeNo")]
    pub employee_no: String,
    /// Display name. The only mutable field.
    pub name: String,
}

/// Wire shape of a create request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEmployeeRequest {
    /// Unique employee number.
    #[serde(rename = "employeeNo")]
    pub employee_no: String,
    /// Display name.
    pub name: String,
}

/// Typed result of a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// 201 — the created record.
    Created(EmployeeRecord),
    /// 400 — duplicate employee number, with the server-supplied message.
    AlreadyExists { message: String },
}

/// Typed result of an update call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// 200 — the updated record.
    Updated(EmployeeRecord),
    /// 404 — no employee with that number.
    NotFound,
}
