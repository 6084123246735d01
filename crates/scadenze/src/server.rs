use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, NaiveDate};
use scadenze_core::{next_milestone, StreakState};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::calendar::{CalendarError, CalendarMonth};
use crate::config::Config;
use crate::dashboard::{Dashboard, Filter};
use crate::db::{self, AssignmentUpdate};
use crate::html;
use crate::reminders::{self, Reminder};
use crate::tracker::{local_now, CompletionChange, Tracker, TrackerError};
use crate::types::{Assignment, NewAssignment};

/// Application state shared across requests
pub struct AppState {
    pub tracker: Mutex<Tracker>,
}

/// Open the tracker session and serve the dashboard on localhost
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let conn = db::init_db(&config.db_path)?;
    let tracker = Tracker::open(conn, local_now().date(), config.celebrations)?;
    let state = Arc::new(AppState {
        tracker: Mutex::new(tracker),
    });

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!(%addr, db = %config.db_path.display(), "Server running");
    println!("\nServer running at http://{}", addr);
    println!("Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/calendar", get(calendar_handler))
        .route("/api/assignments", get(list_handler).post(create_handler))
        .route(
            "/api/assignments/{id}",
            get(get_handler).patch(update_handler).delete(delete_handler),
        )
        .route("/api/assignments/{id}/toggle", post(toggle_handler))
        .route("/api/streak", get(streak_handler))
        .route("/api/reminders", get(reminders_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error returned by API handlers, rendered as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotFound(_) => ApiError::NotFound(err.to_string()),
            TrackerError::Invalid(e) => ApiError::BadRequest(e.to_string()),
            TrackerError::Store(e) => ApiError::Internal(e),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<CalendarError> for ApiError {
    fn from(err: CalendarError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(err) => {
                error!(error = %format!("{:#}", err), "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Serve the dashboard page
async fn index_handler(State(state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    let mut tracker = state.tracker.lock().await;
    let now = local_now();
    tracker.reconcile(now.date())?;
    let assignments = tracker.assignments()?;

    let dashboard = Dashboard::build(&assignments, now, tracker.streak());
    let reminders = reminders::due_reminders(&assignments, now);
    let markup = html::render_dashboard(&dashboard, tracker.streak(), &reminders, true);
    Ok(Html(markup.into_string()))
}

#[derive(Debug, Deserialize)]
struct CalendarQuery {
    year: Option<i32>,
    month: Option<u32>,
}

async fn calendar_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<Html<String>> {
    let tracker = state.tracker.lock().await;
    let now = local_now();
    let year = query.year.unwrap_or(now.year());
    let month = query.month.unwrap_or(now.month());

    let month = CalendarMonth::build(year, month, &tracker.assignments()?, now)?;
    Ok(Html(html::render_calendar(&month).into_string()))
}

/// List assignments, optionally filtered by `search`, `status`, `source`, and `priority`
async fn list_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<Filter>,
) -> ApiResult<Json<Vec<Assignment>>> {
    let tracker = state.tracker.lock().await;
    let assignments = tracker.assignments()?;
    let listed = filter.apply(&assignments, local_now());
    Ok(Json(listed.into_iter().cloned().collect()))
}

async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Assignment>> {
    let tracker = state.tracker.lock().await;
    Ok(Json(tracker.get(&id)?))
}

async fn create_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewAssignment>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Assignment>)> {
    let Json(new) = payload?;
    let tracker = state.tracker.lock().await;
    let assignment = tracker.create(new)?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn update_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<AssignmentUpdate>, JsonRejection>,
) -> ApiResult<Json<Assignment>> {
    let Json(updates) = payload?;
    let tracker = state.tracker.lock().await;
    Ok(Json(tracker.update(&id, updates)?))
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let tracker = state.tracker.lock().await;
    tracker.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CompletionChange>> {
    let mut tracker = state.tracker.lock().await;
    Ok(Json(tracker.toggle(&id, local_now())?))
}

#[derive(Debug, Serialize)]
struct StreakResponse {
    count: u32,
    last_completion: Option<NaiveDate>,
    alive: bool,
    next_milestone: Option<u32>,
}

impl StreakResponse {
    fn new(streak: StreakState, today: NaiveDate) -> Self {
        Self {
            count: streak.count,
            last_completion: streak.last_completion,
            alive: streak.is_alive(today),
            next_milestone: next_milestone(streak.count),
        }
    }
}

async fn streak_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<StreakResponse>> {
    let mut tracker = state.tracker.lock().await;
    let today = local_now().date();
    tracker.reconcile(today)?;
    Ok(Json(StreakResponse::new(tracker.streak(), today)))
}

async fn reminders_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Reminder>>> {
    let tracker = state.tracker.lock().await;
    let assignments = tracker.assignments()?;
    Ok(Json(reminders::due_reminders(&assignments, local_now())))
}
