use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{
        Path, Query, Request, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use mealplan_core::calendar::{DayAgenda, MonthGrid, YearMonth};
use mealplan_core::models::{
    NewRecipe, Recipe, ScheduledMeal, parse_plan_date, validate_meal_type,
};
use mealplan_core::service::PlannerService;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<PlannerService>>,
}

impl AppState {
    fn new(svc: PlannerService) -> Self {
        Self {
            svc: Arc::new(Mutex::new(svc)),
        }
    }

    /// Each handler holds the lock for its whole read or write, so every
    /// mutation is one serialised store operation.
    fn lock(&self) -> MutexGuard<'_, PlannerService> {
        self.svc.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreateRecipeRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    instructions: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateScheduledMealRequest {
    #[serde(alias = "recipe_id")]
    recipe_id: i64,
    date: String,
    #[serde(alias = "meal_type")]
    meal_type: String,
}

#[derive(Deserialize)]
struct DateQuery {
    date: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    PayloadTooLarge,
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large".to_string(),
            ),
            Self::Internal(err) => {
                tracing::error!(error = %format!("{err:#}"), "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn parse_date_param(raw: &str) -> Result<chrono::NaiveDate, ApiError> {
    parse_plan_date(raw)
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{raw}'. Use YYYY-MM-DD")))
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    response
}

// --- Handlers ---

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = state.lock().list_recipes().context("database error")?;
    Ok(Json(recipes))
}

async fn create_recipe(
    State(state): State<AppState>,
    body: Result<Json<CreateRecipeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let Json(req) = body?;
    let new_recipe = NewRecipe::new(
        &req.name,
        &req.description,
        &req.ingredients,
        &req.instructions,
    )
    .map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let recipe = state
        .lock()
        .add_recipe(&new_recipe)
        .context("failed to create recipe")?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn get_recipe(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Recipe>, ApiError> {
    let Path(id) = id?;
    let recipe = state.lock().get_recipe(id).context("database error")?;
    recipe
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {id} not found")))
}

async fn list_scheduled_meals(
    State(state): State<AppState>,
    params: Result<Query<DateQuery>, QueryRejection>,
) -> Result<Json<Vec<ScheduledMeal>>, ApiError> {
    let Query(params) = params?;
    let date = params.date.as_deref().map(parse_date_param).transpose()?;

    let svc = state.lock();
    let meals = match date {
        Some(date) => svc.list_for_date(date),
        None => svc.list_scheduled_meals(),
    }
    .context("database error")?;
    Ok(Json(meals))
}

async fn create_scheduled_meal(
    State(state): State<AppState>,
    body: Result<Json<CreateScheduledMealRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ScheduledMeal>), ApiError> {
    let Json(req) = body?;
    let meal_type =
        validate_meal_type(&req.meal_type).map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let date = parse_date_param(&req.date)?;

    let meal = state
        .lock()
        .add_scheduled_meal(req.recipe_id, date, meal_type)
        .context("failed to schedule meal")?;
    Ok((StatusCode::CREATED, Json(meal)))
}

async fn delete_scheduled_meal(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if state
        .lock()
        .remove_scheduled_meal(id)
        .context("database error")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Scheduled meal {id} not found")))
    }
}

async fn get_month_grid(
    State(state): State<AppState>,
    path: Result<Path<(i32, u32)>, PathRejection>,
) -> Result<Json<MonthGrid>, ApiError> {
    let Path((year, month)) = path?;
    let month = YearMonth::new(year, month).map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let grid = state.lock().month_grid(month).context("database error")?;
    Ok(Json(grid))
}

async fn get_day_agenda(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DayAgenda>, ApiError> {
    let date = parse_date_param(&date_str)?;
    let agenda = state.lock().day_agenda(date).context("database error")?;
    Ok(Json(agenda))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route("/api/recipes/{id}", get(get_recipe))
        .route(
            "/api/scheduled-meals",
            get(list_scheduled_meals).post(create_scheduled_meal),
        )
        .route("/api/scheduled-meals/{id}", delete(delete_scheduled_meal))
        .route("/api/calendar/{year}/{month}", get(get_month_grid))
        .route("/api/agenda/{date}", get(get_day_agenda))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

pub async fn start_server(svc: PlannerService, port: u16, bind: &str) -> anyhow::Result<()> {
    let app = build_router(AppState::new(svc));

    if bind != "127.0.0.1" && bind != "localhost" {
        tracing::warn!(
            %bind,
            "listening beyond localhost; the API has no authentication and any device on your network can change your plan"
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    tracing::info!("Listening on http://{bind}:{port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
