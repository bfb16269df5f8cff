use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{self, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use products_hr::{Employee, EmployeeStore, HrError, Roster, parse_id};
use serde::Serialize;
use serde_json::{Map, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, instrument};

use crate::config::AppConfig;

const NOT_FOUND_MESSAGE: &str = "Employee not found";
const DELETED_MESSAGE: &str = "Employee deleted";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EmployeeStore>,
    pub config: Arc<AppConfig>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "employee server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/employees", get(list_employees).post(create_employee))
        .route(
            "/employees/{id}",
            get(get_employee)
                .put(update_employee)
                .delete(delete_employee),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

#[instrument(name = "employees.list", skip_all)]
async fn list_employees(State(state): State<AppState>) -> HttpResult<Json<Roster>> {
    let roster = state.store.load()?;
    Ok(Json(roster))
}

#[instrument(name = "employees.get", skip_all)]
async fn get_employee(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> HttpResult<Json<Employee>> {
    let roster = state.store.load()?;
    let employee = parse_id(&raw_id)
        .and_then(|id| roster.find(id))
        .cloned()
        .ok_or_else(HttpError::not_found)?;
    Ok(Json(employee))
}

#[instrument(name = "employees.create", skip_all)]
async fn create_employee(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResult<Json<Employee>> {
    let mut roster = state.store.load()?;
    let employee = employee_body(&headers, &body)?;
    let created = roster.create(employee);
    state.store.save(&roster)?;
    info!(id = ?created.id(), "employee created");
    Ok(Json(created))
}

#[instrument(name = "employees.update", skip_all)]
async fn update_employee(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResult<Json<Employee>> {
    let id = parse_id(&raw_id).ok_or_else(HttpError::not_found)?;
    let mut roster = state.store.load()?;
    if roster.position(id).is_none() {
        return Err(HttpError::not_found());
    }
    let updated = roster.replace(id, employee_body(&headers, &body)?)?;
    state.store.save(&roster)?;
    info!(id, "employee updated");
    Ok(Json(updated))
}

#[instrument(name = "employees.delete", skip_all)]
async fn delete_employee(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> HttpResult<&'static str> {
    let id = parse_id(&raw_id).ok_or_else(HttpError::not_found)?;
    let mut roster = state.store.load()?;
    roster.remove(id)?;
    state.store.save(&roster)?;
    info!(id, "employee deleted");
    Ok(DELETED_MESSAGE)
}

/// Reads a request body into an employee. Only JSON content types are parsed;
/// any other body, and an empty JSON body, counts as an empty object.
fn employee_body(headers: &HeaderMap, body: &Bytes) -> HttpResult<Employee> {
    if !is_json(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Employee::default());
    }
    let fields: Map<String, Value> = serde_json::from_slice(body).map_err(|err| {
        HttpError::new(StatusCode::BAD_REQUEST, &format!("invalid JSON body: {err}"))
    })?;
    Ok(Employee::from(fields))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.store.load().is_ok();
    Json(HealthResponse {
        ok: store_ok,
        store_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    store_ok: bool,
    version: &'static str,
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
    }

    fn internal(err: anyhow::Error) -> Self {
        error!(error = %err, "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<HrError> for HttpError {
    fn from(err: HrError) -> Self {
        match err {
            HrError::NotFound { .. } => Self::not_found(),
            other => Self::internal(other.into()),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
    info!("shutdown signal received");
}
