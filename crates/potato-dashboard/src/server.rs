use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use minijinja::Environment;
use potato_control::{ActivationController, ControlError, DesiredServiceState, ServiceLogs};
use potato_projects::{ActiveProjectSummary, ProjectScanReport};
use potato_service::ServiceName;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::page::{
    build_page_environment, render_control_panel_page, FlashLevel, FlashMessage, PageView,
};


const INDEX_ENDPOINT: &str = "/";
const SWITCH_ENDPOINT: &str = "/switch/{project_id}";
const START_ENDPOINT: &str = "/start/{service_name}";
const STOP_ENDPOINT: &str = "/stop/{service_name}";
const RESTART_ENDPOINT: &str = "/restart";
const LOGS_ENDPOINT: &str = "/logs/{service_name}";
const SETUP_MULTI_ENDPOINT: &str = "/setup-multi";
const STATUS_ENDPOINT: &str = "/api/status";
const HEALTH_ENDPOINT: &str = "/healthz";

const SETUP_MULTI_MESSAGE: &str =
    "Multi-project setup is not automated here. Run the setup-multi-project.sh script on the host.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardServerConfig {
    pub bind: String,
    pub log_lines: usize,
}

/// Shared state behind every control panel route.
///
/// The flash queue is process-wide: it is shared by all clients and drained
/// by whichever page render comes next, not scoped to the client that
/// triggered the action.
pub struct DashboardState {
    controller: Arc<ActivationController>,
    log_lines: usize,
    flash: Mutex<Vec<FlashMessage>>,
    pages: Environment<'static>,
}

impl DashboardState {
    pub fn new(controller: Arc<ActivationController>, log_lines: usize) -> Result<Self> {
        let pages = build_page_environment().context("failed to load control panel template")?;
        Ok(Self {
            controller,
            log_lines,
            flash: Mutex::new(Vec::new()),
            pages,
        })
    }

    fn push_flash(&self, level: FlashLevel, text: impl Into<String>) {
        self.flash
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FlashMessage {
                level,
                text: text.into(),
            });
    }

    fn take_flash(&self) -> Vec<FlashMessage> {
        std::mem::take(&mut *self.flash.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

pub async fn run_dashboard_server(
    config: DashboardServerConfig,
    controller: Arc<ActivationController>,
) -> Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind control panel on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound control panel address")?;

    let state = Arc::new(DashboardState::new(controller, config.log_lines)?);
    info!(
        addr = %local_addr,
        hub_dir = %state.controller.registry().config().hub_dir.display(),
        "control panel listening"
    );
    let app = build_dashboard_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("control panel server exited unexpectedly")?;
    info!("control panel stopped");
    Ok(())
}

pub fn build_dashboard_router(state: Arc<DashboardState>) -> Router {
    Router::new()
        .route(INDEX_ENDPOINT, get(handle_index))
        .route(SWITCH_ENDPOINT, get(handle_switch_project))
        .route(START_ENDPOINT, get(handle_start_service))
        .route(STOP_ENDPOINT, get(handle_stop_service))
        .route(RESTART_ENDPOINT, get(handle_restart_primary))
        .route(LOGS_ENDPOINT, get(handle_view_logs))
        .route(SETUP_MULTI_ENDPOINT, get(handle_setup_multi))
        .route(STATUS_ENDPOINT, get(handle_status))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .with_state(state)
}

fn request_host(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn redirect_home() -> Response {
    Redirect::to(INDEX_ENDPOINT).into_response()
}

/// Runs blocking registry/controller work off the async executor.
async fn run_blocking<T, F>(state: &Arc<DashboardState>, task: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&ActivationController) -> T + Send + 'static,
{
    let controller = state.controller.clone();
    tokio::task::spawn_blocking(move || task(&controller))
        .await
        .map_err(|join_error| {
            error!(error = %join_error, "control panel task failed");
            format!("internal task failed: {join_error}")
        })
}

fn flash_control_result<T>(
    state: &DashboardState,
    result: Result<Result<T, ControlError>, String>,
    failure_prefix: &str,
    success: impl FnOnce(T) -> String,
) {
    match result {
        Ok(Ok(value)) => state.push_flash(FlashLevel::Success, success(value)),
        Ok(Err(error)) => state.push_flash(FlashLevel::Error, format!("{failure_prefix}: {error}")),
        Err(reason) => state.push_flash(FlashLevel::Error, format!("{failure_prefix}: {reason}")),
    }
}

fn parse_service_name(state: &DashboardState, raw: &str) -> Option<ServiceName> {
    match ServiceName::new(raw) {
        Ok(name) => Some(name),
        Err(error) => {
            warn!(service = %raw, error = %error, "rejected service name");
            state.push_flash(
                FlashLevel::Error,
                format!("Invalid service name '{raw}': {error}"),
            );
            None
        }
    }
}

struct ListingSnapshot {
    active: ActiveProjectSummary,
    report: ProjectScanReport,
}

fn collect_listing(controller: &ActivationController, host: &str) -> ListingSnapshot {
    let registry = controller.registry();
    ListingSnapshot {
        active: registry.current_active(host),
        report: registry.scan_report(),
    }
}

async fn render_listing(
    state: Arc<DashboardState>,
    host: String,
    logs: Option<ServiceLogs>,
) -> Response {
    let snapshot = match run_blocking(&state, move |controller| {
        collect_listing(controller, &host)
    })
    .await
    {
        Ok(snapshot) => snapshot,
        Err(reason) => return (StatusCode::INTERNAL_SERVER_ERROR, reason).into_response(),
    };

    let flash = state.take_flash();
    let registry_config = state.controller.registry().config();
    let view = PageView {
        flash: &flash,
        active: &snapshot.active,
        projects: &snapshot.report.projects,
        issues: &snapshot.report.issues,
        hub_dir: registry_config.hub_dir.display().to_string(),
        primary_service: &registry_config.primary_service,
        logs: logs.as_ref(),
    };
    match render_control_panel_page(&state.pages, &view) {
        Ok(html) => Html(html).into_response(),
        Err(render_error) => {
            error!(error = %render_error, "failed to render control panel");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to render control panel: {render_error}"),
            )
                .into_response()
        }
    }
}

async fn handle_index(State(state): State<Arc<DashboardState>>, headers: HeaderMap) -> Response {
    render_listing(state, request_host(&headers), None).await
}

async fn handle_view_logs(
    State(state): State<Arc<DashboardState>>,
    Path(service_name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Some(service) = parse_service_name(&state, &service_name) else {
        return redirect_home();
    };
    let line_count = state.log_lines;
    let logs = match run_blocking(&state, move |controller| {
        controller.fetch_logs(&service, line_count)
    })
    .await
    {
        Ok(logs) => logs,
        Err(reason) => return (StatusCode::INTERNAL_SERVER_ERROR, reason).into_response(),
    };
    render_listing(state, request_host(&headers), Some(logs)).await
}

async fn handle_switch_project(
    State(state): State<Arc<DashboardState>>,
    Path(project_id): Path<String>,
) -> Response {
    let result = run_blocking(&state, move |controller| controller.activate(&project_id)).await;
    flash_control_result(&state, result, "Error switching project", |receipt| {
        format!("Switched to project: {}", receipt.display_name)
    });
    redirect_home()
}

async fn handle_start_service(
    State(state): State<Arc<DashboardState>>,
    Path(service_name): Path<String>,
) -> Response {
    change_service_state(state, &service_name, DesiredServiceState::Running).await
}

async fn handle_stop_service(
    State(state): State<Arc<DashboardState>>,
    Path(service_name): Path<String>,
) -> Response {
    change_service_state(state, &service_name, DesiredServiceState::Stopped).await
}

async fn change_service_state(
    state: Arc<DashboardState>,
    service_name: &str,
    desired: DesiredServiceState,
) -> Response {
    let Some(service) = parse_service_name(&state, service_name) else {
        return redirect_home();
    };
    let label = service.to_string();
    let result = run_blocking(&state, move |controller| {
        controller.set_service_state(&service, desired)
    })
    .await;
    let (failure_prefix, verb) = match desired {
        DesiredServiceState::Running => ("Error starting service", "Started"),
        DesiredServiceState::Stopped => ("Error stopping service", "Stopped"),
    };
    flash_control_result(&state, result, failure_prefix, |()| {
        format!("{verb} service: {label}")
    });
    redirect_home()
}

async fn handle_restart_primary(State(state): State<Arc<DashboardState>>) -> Response {
    let primary = state.controller.primary_service().to_string();
    let result = run_blocking(&state, |controller| controller.restart_primary()).await;
    flash_control_result(&state, result, "Error restarting service", |()| {
        format!("Restarted main service: {primary}")
    });
    redirect_home()
}

async fn handle_setup_multi(State(state): State<Arc<DashboardState>>) -> Response {
    state.push_flash(FlashLevel::Info, SETUP_MULTI_MESSAGE);
    redirect_home()
}

async fn handle_status(State(state): State<Arc<DashboardState>>, headers: HeaderMap) -> Response {
    let host = request_host(&headers);
    match run_blocking(&state, move |controller| {
        collect_listing(controller, &host)
    })
    .await
    {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({
                "active": snapshot.active,
                "projects": snapshot.report.projects,
                "issues": snapshot.report.issues,
            })),
        )
            .into_response(),
        Err(reason) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": reason })),
        )
            .into_response(),
    }
}

async fn handle_health() -> &'static str {
    "ok"
}
