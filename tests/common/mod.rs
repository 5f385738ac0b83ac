#![allow(dead_code)] // Shared between test binaries; not every binary uses every helper.

use employee_parity::client::TestHttpClient;
use employee_parity::core::config::HttpConfig;
use employee_parity::harness::{SubjectPair, TrialSubjects};
use employee_parity::service::{ServiceHandle, ServiceQuirks};

/// A spawned model/tested pair with the handles kept alive alongside the
/// clients.
pub struct EmbeddedPair {
    pub pair: SubjectPair,
    pub model: ServiceHandle,
    pub tested: ServiceHandle,
}

impl EmbeddedPair {
    /// Repackage for the campaign driver, which needs the handles to
    /// outlive the trial as lifetime guards.
    pub fn into_trial_subjects(self) -> TrialSubjects {
        TrialSubjects::new(self.pair)
            .with_guard(Box::new(self.model))
            .with_guard(Box::new(self.tested))
    }
}

pub fn quiet_http() -> HttpConfig {
    HttpConfig {
        timeout_ms: 5_000,
        log_calls: false,
    }
}

/// Spawn a faithful model and a (possibly quirky) tested instance.
pub fn spawn_pair(tested_quirks: ServiceQuirks) -> EmbeddedPair {
    let model = ServiceHandle::spawn(ServiceQuirks::none()).expect("spawn model service");
    let tested = ServiceHandle::spawn(tested_quirks).expect("spawn tested service");
    let http = quiet_http();
    let pair = SubjectPair {
        model: TestHttpClient::new("model", &model.base_url(), &http).expect("model client"),
        tested: TestHttpClient::new("tested", &tested.base_url(), &http).expect("tested client"),
    };
    EmbeddedPair {
        pair,
        model,
        tested,
    }
}

/// Spawn one faithful instance with a client against it.
pub fn spawn_single() -> (ServiceHandle, TestHttpClient) {
    let service = ServiceHandle::spawn(ServiceQuirks::none()).expect("spawn service");
    let client =
        TestHttpClient::new("subject", &service.base_url(), &quiet_http()).expect("client");
    (service, client)
}
