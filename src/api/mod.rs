use axum::Json;
use axum::extract::Query;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use crate::catalog::{COLLEGES, College, CourseFilter, TermFilter, find_college};
use crate::error::AppError;
use crate::export;
use crate::models::{Course, Plan, PlanId, PlanSet, Weekday};
use crate::schedule::{CreditStatus, Quarter, is_off_grid};
use crate::state::AppState;

#[derive(Deserialize)]
struct SelectCollegeRequest {
    college: String,
}

#[derive(Serialize)]
struct CatalogSummary {
    college: College,
    course_count: usize,
    fields: Vec<String>,
}

#[derive(Deserialize)]
struct CourseQueryParams {
    #[serde(default)]
    term_type: TermFilter,
    /// Comma-separated field labels.
    #[serde(default)]
    fields: Option<String>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    semester: Option<u32>,
}

#[derive(Deserialize)]
struct CellQueryParams {
    day: String,
    period: u8,
    quarter: Quarter,
    semester: u32,
}

#[derive(Deserialize)]
struct SemesterParams {
    semester: u32,
}

#[derive(Deserialize)]
struct NewPlanRequest {
    #[serde(default)]
    copy: bool,
}

#[derive(Deserialize)]
struct SelectPlanRequest {
    plan_id: String,
}

#[derive(Deserialize)]
struct RenamePlanRequest {
    name: String,
}

#[derive(Deserialize)]
struct AddCourseRequest {
    subject_code: String,
    term: String,
    #[serde(default)]
    day: Option<String>,
    #[serde(default)]
    period: Option<String>,
    semester: u32,
}

#[derive(Deserialize)]
struct RemoveCourseRequest {
    subject_code: String,
    term: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/colleges", get(list_colleges))
        .route("/catalog/select", post(select_college))
        .route("/catalog/courses", get(list_courses))
        .route("/catalog/cell", get(cell_courses))
        .route("/catalog/sessions", get(session_courses))
        .route("/catalog/on-demand", get(on_demand_courses))
        .route("/plans", get(get_plans).post(create_plan).delete(reset_plans))
        .route(
            "/plans/current",
            get(current_plan).put(select_plan).patch(rename_plan).delete(delete_plan),
        )
        .route("/plans/current/courses", post(add_course).delete(remove_course))
        .route("/plans/current/courses/all", delete(clear_plan))
        .route("/plans/current/credits", get(credits))
        .route("/plans/current/export", get(export_plan))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    if state.planner.snapshot().await.is_empty() {
        return Err(AppError::InternalServerError);
    }
    Ok(StatusCode::OK)
}

async fn list_colleges() -> Json<Vec<College>> {
    Json(COLLEGES.to_vec())
}

async fn select_college(
    State(state): State<AppState>,
    Json(req): Json<SelectCollegeRequest>
) -> Result<Json<CatalogSummary>, AppError> {
    let college = find_college(&req.college)
        .ok_or_else(|| AppError::NotFound(format!("unknown college {}", req.college)))?;
    let catalog = state.catalog.select(college).await?;
    Ok(Json(CatalogSummary {
        college,
        course_count: catalog.courses().len(),
        fields: catalog.fields().into_iter().map(String::from).collect(),
    }))
}

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseQueryParams>
) -> Result<Json<Vec<Course>>, AppError> {
    let catalog = state.catalog.require_current().await?;
    let filter = CourseFilter {
        term: params.term_type,
        fields: params
            .fields
            .map(|f| f.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default(),
        search: params.search,
        semester: params.semester,
    };
    Ok(Json(catalog.filter(&filter).into_iter().cloned().collect()))
}

async fn cell_courses(
    State(state): State<AppState>,
    Query(params): Query<CellQueryParams>
) -> Result<Json<Vec<Course>>, AppError> {
    let day: Weekday = params.day.parse().map_err(AppError::BadRequest)?;
    let catalog = state.catalog.require_current().await?;
    let courses = catalog.for_cell(day, params.period, params.quarter, params.semester);
    Ok(Json(courses.into_iter().cloned().collect()))
}

async fn session_courses(
    State(state): State<AppState>,
    Query(params): Query<SemesterParams>
) -> Result<Json<Vec<Course>>, AppError> {
    let catalog = state.catalog.require_current().await?;
    Ok(Json(catalog.sessions(params.semester).into_iter().cloned().collect()))
}

async fn on_demand_courses(
    State(state): State<AppState>,
    Query(params): Query<SemesterParams>
) -> Result<Json<Vec<Course>>, AppError> {
    let catalog = state.catalog.require_current().await?;
    Ok(Json(catalog.on_demand(params.semester).into_iter().cloned().collect()))
}

async fn get_plans(State(state): State<AppState>) -> Json<PlanSet> {
    Json(state.planner.snapshot().await)
}

async fn current_plan(State(state): State<AppState>) -> Json<Plan> {
    Json(state.planner.snapshot().await.current().clone())
}

async fn create_plan(
    State(state): State<AppState>,
    Json(req): Json<NewPlanRequest>
) -> Result<(StatusCode, Json<PlanSet>), AppError> {
    let plans = state.planner.create_plan(req.copy).await?;
    Ok((StatusCode::CREATED, Json(plans)))
}

async fn select_plan(
    State(state): State<AppState>,
    Json(req): Json<SelectPlanRequest>
) -> Result<Json<PlanSet>, AppError> {
    let plans = state.planner.select_plan(&PlanId::from(req.plan_id)).await?;
    Ok(Json(plans))
}

async fn rename_plan(
    State(state): State<AppState>,
    Json(req): Json<RenamePlanRequest>
) -> Result<Json<PlanSet>, AppError> {
    let plans = state.planner.rename_plan(&req.name).await?;
    Ok(Json(plans))
}

async fn delete_plan(State(state): State<AppState>) -> Result<Json<PlanSet>, AppError> {
    let plans = state.planner.delete_plan().await?;
    Ok(Json(plans))
}

async fn reset_plans(State(state): State<AppState>) -> Result<Json<PlanSet>, AppError> {
    let plans = state.planner.reset().await?;
    Ok(Json(plans))
}

async fn add_course(
    State(state): State<AppState>,
    Json(req): Json<AddCourseRequest>
) -> Result<Json<Plan>, AppError> {
    let catalog = state.catalog.require_current().await?;
    let course = catalog
        .find(&req.subject_code, &req.term, req.day.as_deref(), req.period.as_deref())
        .ok_or_else(|| AppError::NotFound(format!("course {} ({}) is not in the catalog", req.subject_code, req.term)))?;

    let plans = state.planner.add_course(course, catalog.courses(), req.semester).await?;
    Ok(Json(plans.current().clone()))
}

async fn remove_course(
    State(state): State<AppState>,
    Json(req): Json<RemoveCourseRequest>
) -> Result<Json<Plan>, AppError> {
    let plans = state.planner.snapshot().await;
    let entries = &plans.current().planned_courses;
    let planned = entries
        .values()
        .find(|c| c.subject_code == req.subject_code && c.term == req.term)
        .or_else(|| {
            entries
                .values()
                .find(|c| c.subject_code == req.subject_code && !is_off_grid(c))
        })
        .cloned();

    // removing a course that is not planned leaves the plan as is
    let Some(course) = planned else {
        return Ok(Json(plans.current().clone()));
    };
    let plans = state.planner.remove_course(&course).await?;
    Ok(Json(plans.current().clone()))
}

async fn clear_plan(State(state): State<AppState>) -> Result<Json<Plan>, AppError> {
    let plans = state.planner.clear_plan().await?;
    Ok(Json(plans.current().clone()))
}

async fn credits(
    State(state): State<AppState>,
    Query(params): Query<SemesterParams>
) -> Json<CreditStatus> {
    Json(state.planner.credits(params.semester).await)
}

async fn export_plan(State(state): State<AppState>) -> impl IntoResponse {
    let plans = state.planner.snapshot().await;
    let plan = plans.current();
    let body = export::to_csv(&export::timetable_rows(plan));
    let disposition = format!("attachment; filename=\"{}\"", export::file_name(plan));

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
}
