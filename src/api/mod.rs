use axum::{
    Router,
    extract::{Json, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::core::{
    Assumptions, GoalSolveConfig, GoalType, MAX_PLAN_AGE, ProjectionInput, ProjectionResult,
    project_with, solve_goal,
};
use crate::report::{
    AuditRecord, AuditSink, LogNotifier, Notifier, NullAuditLog, notify_plan, record_best_effort,
};

pub const MAX_ACCEPTED_AGE: u32 = MAX_PLAN_AGE;

const DEFAULT_SOLVE_SEARCH_MAX: f64 = 1_000_000.0;
const DEFAULT_SOLVE_TOLERANCE: f64 = 1.0;
const DEFAULT_SOLVE_MAX_ITERATIONS: u32 = 64;

#[derive(Clone)]
pub struct AppState {
    pub assumptions: Assumptions,
    pub notifier: Arc<dyn Notifier>,
    pub audit: Arc<dyn AuditSink>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            assumptions: Assumptions::default(),
            notifier: Arc::new(LogNotifier),
            audit: Arc::new(NullAuditLog),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlanPayload {
    current_age: Option<u32>,
    retire_age: Option<u32>,
    monthly_basic_expense: Option<f64>,
    monthly_fun_expense: Option<f64>,
    monthly_saving: Option<f64>,
    current_saving: Option<f64>,
    user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SolvePayload {
    #[serde(flatten)]
    plan: PlanPayload,
    goal: Option<GoalType>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug)]
struct PlanRequest {
    input: ProjectionInput,
    user_id: Option<String>,
}

#[derive(Debug)]
struct SolveRequest {
    input: ProjectionInput,
    config: GoalSolveConfig,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn validate_input(input: &ProjectionInput) -> Result<(), String> {
    if input.current_age > MAX_ACCEPTED_AGE {
        return Err(format!("current_age must be <= {MAX_ACCEPTED_AGE}"));
    }
    if input.retire_age > MAX_ACCEPTED_AGE {
        return Err(format!("retire_age must be <= {MAX_ACCEPTED_AGE}"));
    }

    for (name, value) in [
        ("monthly_basic_expense", input.monthly_basic_expense),
        ("monthly_fun_expense", input.monthly_fun_expense),
        ("monthly_saving", input.monthly_saving),
        ("current_saving", input.current_saving),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be a finite amount >= 0"));
        }
    }
    Ok(())
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("{name} is required"))
}

fn input_from_payload(payload: &PlanPayload) -> Result<ProjectionInput, String> {
    let input = ProjectionInput {
        current_age: required(payload.current_age, "current_age")?,
        retire_age: required(payload.retire_age, "retire_age")?,
        monthly_basic_expense: required(
            payload.monthly_basic_expense,
            "monthly_basic_expense",
        )?,
        monthly_fun_expense: payload.monthly_fun_expense.unwrap_or(0.0),
        monthly_saving: required(payload.monthly_saving, "monthly_saving")?,
        current_saving: required(payload.current_saving, "current_saving")?,
    };
    validate_input(&input)?;
    Ok(input)
}

fn plan_request_from_payload(payload: PlanPayload) -> Result<PlanRequest, String> {
    let input = input_from_payload(&payload)?;
    Ok(PlanRequest {
        input,
        user_id: payload.user_id,
    })
}

fn solve_request_from_payload(mut payload: SolvePayload) -> Result<SolveRequest, String> {
    let goal = payload.goal.unwrap_or(GoalType::RequiredSaving);
    // The solved field is free, so callers may omit it.
    match goal {
        GoalType::RequiredSaving => {
            payload.plan.monthly_saving.get_or_insert(0.0);
        }
        GoalType::MaxBasicExpense => {
            payload.plan.monthly_basic_expense.get_or_insert(0.0);
        }
    }
    let input = input_from_payload(&payload.plan)?;

    let config = GoalSolveConfig {
        goal_type: goal,
        search_min: payload.search_min.unwrap_or(0.0),
        search_max: payload.search_max.unwrap_or(DEFAULT_SOLVE_SEARCH_MAX),
        tolerance: payload.tolerance.unwrap_or(DEFAULT_SOLVE_TOLERANCE),
        max_iterations: payload
            .max_iterations
            .unwrap_or(DEFAULT_SOLVE_MAX_ITERATIONS),
    };
    Ok(SolveRequest { input, config })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/calculate", post(calculate_handler))
        .route("/api/solve", post(solve_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("retirement plan API listening on http://{addr}");
    info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn root_handler() -> Response {
    json_response(
        StatusCode::OK,
        StatusResponse {
            message: "Retirement plan API is running.",
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn calculate_handler(
    State(state): State<AppState>,
    Json(payload): Json<PlanPayload>,
) -> Response {
    let request = match plan_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let result = match project_with(&request.input, &state.assumptions) {
        Ok(result) => result,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };

    let record = AuditRecord::new(
        request.user_id.as_deref(),
        &request.input,
        &result,
        Utc::now(),
    );
    let report = tokio::task::spawn_blocking({
        let result = result.clone();
        move || deliver_report(&state, request.user_id.as_deref(), &record, &result)
    });
    if let Err(err) = report.await {
        warn!("report delivery task failed: {err}");
    }

    json_response(StatusCode::OK, result)
}

// Sinks may do blocking file or network I/O.
fn deliver_report(
    state: &AppState,
    recipient: Option<&str>,
    record: &AuditRecord,
    result: &ProjectionResult,
) {
    record_best_effort(state.audit.as_ref(), record);
    notify_plan(state.notifier.as_ref(), recipient, result);
}

async fn solve_handler(
    State(state): State<AppState>,
    Json(payload): Json<SolvePayload>,
) -> Response {
    let request = match solve_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match solve_goal(&request.input, &state.assumptions, request.config) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{AuditError, NotifyError, PlanMessage};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryAudit {
        records: Mutex<Vec<AuditRecord>>,
    }

    impl AuditSink for MemoryAudit {
        fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
            self.records.lock().expect("lock").push(record.clone());
            Ok(())
        }
    }

    struct BrokenAudit;

    impl AuditSink for BrokenAudit {
        fn append(&self, _record: &AuditRecord) -> Result<(), AuditError> {
            Err(AuditError::Io(std::io::Error::other("disk full")))
        }
    }

    #[derive(Default)]
    struct MemoryNotifier {
        recipients: Mutex<Vec<String>>,
    }

    impl Notifier for MemoryNotifier {
        fn push(&self, recipient: &str, _message: &PlanMessage) -> Result<(), NotifyError> {
            self.recipients.lock().expect("lock").push(recipient.to_string());
            Ok(())
        }
    }

    fn plan_payload_from_json(json: &str) -> PlanPayload {
        serde_json::from_str(json).expect("json should parse")
    }

    fn sample_json() -> &'static str {
        r#"{
          "current_age": 30,
          "retire_age": 65,
          "monthly_basic_expense": 40000,
          "monthly_fun_expense": 10000,
          "monthly_saving": 20000,
          "current_saving": 1000000,
          "user_id": "U123"
        }"#
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    #[test]
    fn plan_request_parses_wire_keys() {
        let request =
            plan_request_from_payload(plan_payload_from_json(sample_json())).expect("valid");

        assert_eq!(request.input.current_age, 30);
        assert_eq!(request.input.retire_age, 65);
        assert_eq!(request.input.monthly_basic_expense, 40_000.0);
        assert_eq!(request.input.monthly_fun_expense, 10_000.0);
        assert_eq!(request.input.monthly_saving, 20_000.0);
        assert_eq!(request.input.current_saving, 1_000_000.0);
        assert_eq!(request.user_id.as_deref(), Some("U123"));
    }

    #[test]
    fn plan_request_defaults_fun_expense_to_zero() {
        let payload = plan_payload_from_json(
            r#"{"current_age": 40, "retire_age": 60, "monthly_basic_expense": 1,
                "monthly_saving": 2, "current_saving": 3}"#,
        );
        let request = plan_request_from_payload(payload).expect("valid");
        assert_eq!(request.input.monthly_fun_expense, 0.0);
        assert!(request.user_id.is_none());
    }

    #[test]
    fn plan_request_requires_core_fields() {
        let payload = plan_payload_from_json(r#"{"current_age": 40, "retire_age": 60}"#);
        let err = plan_request_from_payload(payload).expect_err("must reject");
        assert!(err.contains("monthly_basic_expense"));
    }

    #[test]
    fn validate_input_rejects_negative_money() {
        let mut payload = plan_payload_from_json(sample_json());
        payload.monthly_saving = Some(-1.0);
        let err = plan_request_from_payload(payload).expect_err("must reject");
        assert!(err.contains("monthly_saving"));
    }

    #[test]
    fn validate_input_rejects_absurd_ages() {
        let mut payload = plan_payload_from_json(sample_json());
        payload.retire_age = Some(400);
        let err = plan_request_from_payload(payload).expect_err("must reject");
        assert!(err.contains("retire_age"));
    }

    #[test]
    fn solve_request_fills_free_field_and_defaults() {
        let payload: SolvePayload = serde_json::from_str(
            r#"{"current_age": 30, "retire_age": 65, "monthly_basic_expense": 40000,
                "current_saving": 0, "goal": "required_saving", "tolerance": 5}"#,
        )
        .expect("json should parse");
        let request = solve_request_from_payload(payload).expect("valid");

        assert_eq!(request.input.monthly_saving, 0.0);
        assert_eq!(request.config.goal_type, GoalType::RequiredSaving);
        assert_eq!(request.config.tolerance, 5.0);
        assert_eq!(request.config.search_max, DEFAULT_SOLVE_SEARCH_MAX);
        assert_eq!(request.config.max_iterations, DEFAULT_SOLVE_MAX_ITERATIONS);
    }

    #[tokio::test]
    async fn calculate_returns_projection_and_reaches_collaborators() {
        let audit = Arc::new(MemoryAudit::default());
        let notifier = Arc::new(MemoryNotifier::default());
        let state = AppState {
            assumptions: Assumptions::default(),
            notifier: notifier.clone(),
            audit: audit.clone(),
        };

        let response =
            calculate_handler(State(state), Json(plan_payload_from_json(sample_json()))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );

        let body = body_json(response).await;
        assert_eq!(body["total_fund"], 21_260_656.0);
        assert_eq!(body["gap"], 16_104_911.0);
        assert_eq!(body["history"]["ages"].as_array().map(Vec::len), Some(71));

        let records = audit.records.lock().expect("lock");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].recipient, "U123");
        assert_eq!(*notifier.recipients.lock().expect("lock"), vec!["U123".to_string()]);
    }

    #[tokio::test]
    async fn calculate_without_user_skips_notification() {
        let notifier = Arc::new(MemoryNotifier::default());
        let state = AppState {
            notifier: notifier.clone(),
            ..AppState::default()
        };
        let mut payload = plan_payload_from_json(sample_json());
        payload.user_id = None;

        let response = calculate_handler(State(state), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(notifier.recipients.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn calculate_survives_audit_failure() {
        let state = AppState {
            audit: Arc::new(BrokenAudit),
            ..AppState::default()
        };
        let response =
            calculate_handler(State(state), Json(plan_payload_from_json(sample_json()))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn calculate_maps_range_error_to_bad_request() {
        let mut payload = plan_payload_from_json(sample_json());
        payload.current_age = Some(100);
        payload.retire_age = Some(101);

        let response = calculate_handler(State(AppState::default()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|msg| msg.contains("horizon age 100"))
        );
    }

    #[tokio::test]
    async fn solve_returns_required_saving() {
        let payload: SolvePayload = serde_json::from_str(
            r#"{"current_age": 30, "retire_age": 65, "monthly_basic_expense": 40000,
                "monthly_fun_expense": 10000, "current_saving": 1000000}"#,
        )
        .expect("json should parse");

        let response = solve_handler(State(AppState::default()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["feasible"], true);
        assert_eq!(body["goal_type"], "required_saving");
        let solved = body["solved_value"].as_f64().expect("solved value");
        assert!(solved > 20_000.0, "solved saving {solved}");
    }

    #[tokio::test]
    async fn solve_rejects_oversized_iteration_budget() {
        let payload: SolvePayload = serde_json::from_str(
            r#"{"current_age": 30, "retire_age": 65, "monthly_basic_expense": 40000,
                "current_saving": 0, "max_iterations": 4294967295}"#,
        )
        .expect("json should parse");

        let response = solve_handler(State(AppState::default()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|msg| msg.contains("max_iterations"))
        );
    }

    #[tokio::test]
    async fn unknown_paths_return_json_not_found() {
        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let response = root_handler().await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["message"].as_str().is_some_and(|m| m.contains("running")));
    }
}
