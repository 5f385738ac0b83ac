//! Blocking HTTP client wrapping one subject instance.

use std::time::Duration;

use colored::Colorize;

use crate::client::{CreateEmployeeRequest, CreateOutcome, EmployeeRecord, UpdateOutcome};
use crate::core::config::HttpConfig;
use crate::core::errors::{EpyError, Result};

/// Wraps one running service instance behind typed operations.
///
/// Each operation performs exactly one network round trip and logs one
/// color-tagged diagnostic line naming the acting client. Diagnostics are
/// behavior-free; suppress them via [`HttpConfig::log_calls`].
#[derive(Debug, Clone)]
pub struct TestHttpClient {
    name: String,
    employees_url: String,
    http: reqwest::blocking::Client,
    log_calls: bool,
}

impl TestHttpClient {
    /// Build a client for the subject at `base_url` (service root, without
    /// the `/api/employees` suffix).
    pub fn new(name: impl Into<String>, base_url: &str, http: &HttpConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(http.timeout_ms))
            .build()?;
        Ok(Self {
            name: name.into(),
            employees_url: format!("{}/api/employees", base_url.trim_end_matches('/')),
            http: client,
            log_calls: http.log_calls,
        })
    }

    /// Display name used in diagnostics and error reports.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `GET /api/employees/{employeeNo}` — `None` on 404, never an error
    /// for the not-found case.
    pub fn get(&self, employee_no: &str) -> Result<Option<EmployeeRecord>> {
        let call = format!("GET /api/employees/{employee_no}");
        self.log(&call.as_str().yellow().to_string());
        let resp = self
            .http
            .get(format!("{}/{employee_no}", self.employees_url))
            .send()?;
        let (status, body) = split_response(resp)?;
        match status {
            200 => Ok(Some(parse_record(&body)?)),
            404 => Ok(None),
            _ => Err(self.unexpected(call, status, body)),
        }
    }

    /// `GET /api/employees` — all employees, order not significant.
    pub fn get_all(&self) -> Result<Vec<EmployeeRecord>> {
        let call = "GET /api/employees".to_string();
        self.log(&call.as_str().green().to_string());
        let resp = self.http.get(&self.employees_url).send()?;
        let (status, body) = split_response(resp)?;
        match status {
            200 => parse_records(&body),
            _ => Err(self.unexpected(call, status, body)),
        }
    }

    /// `GET /api/employees?department=` — employees whose number has the
    /// department as a case-insensitive prefix followed by `-`. Empty vec
    /// (never an error) for non-matching or garbage departments.
    pub fn get_by_department(&self, department: &str) -> Result<Vec<EmployeeRecord>> {
        let call = format!("GET /api/employees?department={department}");
        self.log(&call.as_str().blue().to_string());
        let resp = self
            .http
            .get(&self.employees_url)
            .query(&[("department", department)])
            .send()?;
        let (status, body) = split_response(resp)?;
        match status {
            200 => parse_records(&body),
            _ => Err(self.unexpected(call, status, body)),
        }
    }

    /// `POST /api/employees` — 201 maps to [`CreateOutcome::Created`],
    /// 400 to [`CreateOutcome::AlreadyExists`] with the server message.
    pub fn create(&self, employee_no: &str, name: &str) -> Result<CreateOutcome> {
        let call = format!("POST /api/employees {{ employeeNo={employee_no}, name={name} }}");
        self.log(&call.as_str().cyan().to_string());
        let resp = self
            .http
            .post(&self.employees_url)
            .json(&CreateEmployeeRequest {
                employee_no: employee_no.to_string(),
                name: name.to_string(),
            })
            .send()?;
        let (status, body) = split_response(resp)?;
        match status {
            201 => Ok(CreateOutcome::Created(parse_record(&body)?)),
            400 => Ok(CreateOutcome::AlreadyExists { message: body }),
            _ => Err(self.unexpected(call, status, body)),
        }
    }

    /// `PUT /api/employees/{employeeNo}?name=` — 200 maps to
    /// [`UpdateOutcome::Updated`], 404 to [`UpdateOutcome::NotFound`].
    pub fn update(&self, employee_no: &str, new_name: &str) -> Result<UpdateOutcome> {
        let call = format!("PUT /api/employees/{employee_no}?name={new_name}");
        self.log(&call.as_str().purple().to_string());
        let resp = self
            .http
            .put(format!("{}/{employee_no}", self.employees_url))
            .query(&[("name", new_name)])
            .send()?;
        let (status, body) = split_response(resp)?;
        match status {
            200 => Ok(UpdateOutcome::Updated(parse_record(&body)?)),
            404 => Ok(UpdateOutcome::NotFound),
            _ => Err(self.unexpected(call, status, body)),
        }
    }

    fn log(&self, painted_call: &str) {
        if self.log_calls {
            eprintln!("[{}] {painted_call}", self.name);
        }
    }

    fn unexpected(&self, call: String, status: u16, body: String) -> EpyError {
        EpyError::UnexpectedStatus {
            client: self.name.clone(),
            call,
            status,
            body,
        }
    }
}

fn split_response(resp: reqwest::blocking::Response) -> Result<(u16, String)> {
    let status = resp.status().as_u16();
    let body = resp.text()?;
    Ok((status, body))
}

fn parse_record(body: &str) -> Result<EmployeeRecord> {
    serde_json::from_str(body).map_err(|e| EpyError::Serialization {
        context: "employee record body",
        details: format!("{e}: {body:?}"),
    })
}

fn parse_records(body: &str) -> Result<Vec<EmployeeRecord>> {
    serde_json::from_str(body).map_err(|e| EpyError::Serialization {
        context: "employee list body",
        details: format!("{e}: {body:?}"),
    })
}
