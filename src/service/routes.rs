//! axum router and handlers for the employee registry contract.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::client::CreateEmployeeRequest;
use crate::core::errors::EpyError;
use crate::service::quirks::ServiceQuirks;
use crate::service::repository::{EmployeeRepository, InsertOutcome};

/// Shared handler state: the store plus this instance's quirks.
#[derive(Clone)]
pub struct AppState {
    /// The employee store.
    pub repo: Arc<EmployeeRepository>,
    /// Behavior deviations for this instance.
    pub quirks: ServiceQuirks,
}

/// Build the full employee router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/employees", get(get_all).post(create_employee))
        .route("/api/employees/{employee_no}", get(get_one).put(update_name))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    department: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateQuery {
    name: Option<String>,
}

async fn get_all(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let result = match query.department {
        Some(department) => state
            .repo
            .find_by_department(&department, state.quirks.case_sensitive_department),
        None => state.repo.find_all(),
    };
    match result {
        Ok(employees) => (StatusCode::OK, Json(employees)).into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn get_one(State(state): State<AppState>, Path(employee_no): Path<String>) -> Response {
    match state.repo.find_by_employee_no(&employee_no) {
        Ok(Some(employee)) => (StatusCode::OK, Json(employee)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn create_employee(
    State(state): State<AppState>,
    Json(request): Json<CreateEmployeeRequest>,
) -> Response {
    match state.repo.insert(&request.employee_no, &request.name) {
        Ok(InsertOutcome::Inserted(employee)) => {
            (StatusCode::CREATED, Json(employee)).into_response()
        }
        Ok(InsertOutcome::Duplicate) => {
            let mut message = format!(
                "an employee with employeeNo={} already exists",
                request.employee_no
            );
            if state.quirks.lowercase_conflict_message {
                message = message.to_lowercase();
            }
            (StatusCode::BAD_REQUEST, message).into_response()
        }
        Err(e) => internal_error(&e),
    }
}

async fn update_name(
    State(state): State<AppState>,
    Path(employee_no): Path<String>,
    Query(query): Query<UpdateQuery>,
) -> Response {
    let Some(new_name) = query.name else {
        return (
            StatusCode::BAD_REQUEST,
            "missing required query parameter: name",
        )
            .into_response();
    };

    if state.quirks.drop_update_writes {
        // Quirk: acknowledge the rename without writing it.
        return match state.repo.find_by_employee_no(&employee_no) {
            Ok(Some(mut employee)) => {
                employee.name = new_name;
                (StatusCode::OK, Json(employee)).into_response()
            }
            Ok(None) => StatusCode::NOT_FOUND.into_response(),
            Err(e) => internal_error(&e),
        };
    }

    match state.repo.update_name(&employee_no, &new_name) {
        Ok(Some(employee)) => (StatusCode::OK, Json(employee)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal_error(&e),
    }
}

fn internal_error(error: &EpyError) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    fn test_app(quirks: ServiceQuirks) -> Router {
        let repo = EmployeeRepository::open_in_memory().expect("in-memory repository");
        build_router(AppState {
            repo: Arc::new(repo),
            quirks,
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.clone().oneshot(request).await.expect("route request");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    async fn post_employee(app: &Router, employee_no: &str, name: &str) -> (StatusCode, String) {
        let body = json!({ "employeeNo": employee_no, "name": name });
        send(
            app,
            Request::builder()
                .method("POST")
                .uri("/api/employees")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
    }

    async fn get_path(app: &Router, path: &str) -> (StatusCode, String) {
        send(
            app,
            Request::builder()
                .uri(path)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    async fn put_path(app: &Router, path: &str) -> (StatusCode, String) {
        send(
            app,
            Request::builder()
                .method("PUT")
                .uri(path)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let app = test_app(ServiceQuirks::none());
        let (status, body) = post_employee(&app, "HR-7", "Ann").await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(created["employeeNo"], "HR-7");
        assert_eq!(created["name"], "Ann");
        assert!(created["id"].is_i64());

        let (status, body) = get_path(&app, "/api/employees/HR-7").await;
        assert_eq!(status, StatusCode::OK);
        let fetched: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(fetched["name"], "Ann");
    }

    #[tokio::test]
    async fn duplicate_create_returns_400_with_the_exact_message() {
        let app = test_app(ServiceQuirks::none());
        post_employee(&app, "HR-7", "Ann").await;
        let (status, body) = post_employee(&app, "HR-7", "Bob").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "an employee with employeeNo=HR-7 already exists");
    }

    #[tokio::test]
    async fn unknown_employee_returns_404_with_empty_body() {
        let app = test_app(ServiceQuirks::none());
        let (status, body) = get_path(&app, "/api/employees/HR-404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn update_renames_and_returns_the_updated_record() {
        let app = test_app(ServiceQuirks::none());
        post_employee(&app, "HR-7", "Ann").await;
        let (status, body) = put_path(&app, "/api/employees/HR-7?name=Anna").await;
        assert_eq!(status, StatusCode::OK);
        let updated: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(updated["name"], "Anna");

        let (_, body) = get_path(&app, "/api/employees/HR-7").await;
        let fetched: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(fetched["name"], "Anna");
    }

    #[tokio::test]
    async fn update_of_absent_employee_returns_404() {
        let app = test_app(ServiceQuirks::none());
        let (status, _) = put_path(&app, "/api/employees/HR-404?name=Ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_without_name_parameter_returns_400() {
        let app = test_app(ServiceQuirks::none());
        post_employee(&app, "HR-7", "Ann").await;
        let (status, body) = put_path(&app, "/api/employees/HR-7").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("name"), "body: {body}");
    }

    #[tokio::test]
    async fn department_filter_matches_prefix_case_insensitively() {
        let app = test_app(ServiceQuirks::none());
        post_employee(&app, "HR-1", "A").await;
        post_employee(&app, "Frontend-1", "B").await;

        for query in ["hr", "HR", "hR"] {
            let (status, body) = get_path(&app, &format!("/api/employees?department={query}")).await;
            assert_eq!(status, StatusCode::OK);
            let list: Vec<Value> = serde_json::from_str(&body).expect("json");
            assert_eq!(list.len(), 1, "query {query:?}: {body}");
            assert_eq!(list[0]["employeeNo"], "HR-1");
        }
    }

    #[tokio::test]
    async fn garbage_department_returns_an_empty_list_not_an_error() {
        let app = test_app(ServiceQuirks::none());
        post_employee(&app, "HR-1", "A").await;
        for query in ["%25", "zzz", "!!"] {
            let (status, body) = get_path(&app, &format!("/api/employees?department={query}")).await;
            assert_eq!(status, StatusCode::OK, "query {query:?}");
            let list: Vec<Value> = serde_json::from_str(&body).expect("json");
            assert!(list.is_empty(), "query {query:?}: {body}");
        }
    }

    #[tokio::test]
    async fn case_sensitive_quirk_changes_filter_behavior() {
        let app = test_app(ServiceQuirks {
            case_sensitive_department: true,
            ..ServiceQuirks::default()
        });
        post_employee(&app, "HR-1", "A").await;
        let (_, body) = get_path(&app, "/api/employees?department=hr").await;
        let list: Vec<Value> = serde_json::from_str(&body).expect("json");
        assert!(list.is_empty(), "case-sensitive match must miss: {body}");
    }

    #[tokio::test]
    async fn drop_update_writes_quirk_acknowledges_without_persisting() {
        let app = test_app(ServiceQuirks {
            drop_update_writes: true,
            ..ServiceQuirks::default()
        });
        post_employee(&app, "HR-7", "Ann").await;
        let (status, body) = put_path(&app, "/api/employees/HR-7?name=Anna").await;
        assert_eq!(status, StatusCode::OK);
        let echoed: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(echoed["name"], "Anna");

        let (_, body) = get_path(&app, "/api/employees/HR-7").await;
        let fetched: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(fetched["name"], "Ann", "write must not persist");
    }

    #[tokio::test]
    async fn lowercase_conflict_message_quirk_changes_the_message() {
        let app = test_app(ServiceQuirks {
            lowercase_conflict_message: true,
            ..ServiceQuirks::default()
        });
        post_employee(&app, "HR-7", "Ann").await;
        let (status, body) = post_employee(&app, "HR-7", "Bob").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "an employee with employeeno=hr-7 already exists");
    }
}
