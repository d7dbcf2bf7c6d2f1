use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::{Extension, Json};

use super::middleware::Owner;
use super::response::{created, message, ok};
use super::AppState;
use crate::error::AppError;
use crate::model::{
    DailyGoalChanges, DailyGoalInput, DailyGoalQuery, MonthlyPlanCompletion, MonthlyPlanInput,
};

pub(crate) async fn list_daily_goals(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    query: Result<Query<DailyGoalQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let goals = state.app(owner).list_daily_goals(query.date).await?;
    Ok(ok(goals))
}

pub(crate) async fn create_daily_goal(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    payload: Result<Json<DailyGoalInput>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = payload?;
    let goal = state.app(owner).add_daily_goal(input).await?;
    Ok(created(goal))
}

pub(crate) async fn update_daily_goal(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<DailyGoalChanges>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let Json(changes) = payload?;
    let goal = state.app(owner).update_daily_goal(id, changes).await?;
    Ok(ok(goal))
}

pub(crate) async fn toggle_daily_goal(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let goal = state.app(owner).toggle_daily_goal(id).await?;
    Ok(ok(goal))
}

pub(crate) async fn delete_daily_goal(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    state.app(owner).delete_daily_goal(id).await?;
    Ok(message("Goal deleted"))
}

pub(crate) async fn list_monthly_plans(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> Result<Response, AppError> {
    let plans = state.app(owner).list_monthly_plans().await?;
    Ok(ok(plans))
}

pub(crate) async fn create_monthly_plan(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    payload: Result<Json<MonthlyPlanInput>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = payload?;
    let plan = state.app(owner).add_monthly_plan(input).await?;
    Ok(created(plan))
}

pub(crate) async fn edit_monthly_plan(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<MonthlyPlanInput>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let plan = state.app(owner).edit_monthly_plan(id, input).await?;
    Ok(ok(plan))
}

pub(crate) async fn set_monthly_plan_completion(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<MonthlyPlanCompletion>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let Json(completion) = payload?;
    let plan = state
        .app(owner)
        .set_monthly_plan_completed(id, completion.completed)
        .await?;
    Ok(ok(plan))
}

pub(crate) async fn toggle_monthly_plan(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let plan = state.app(owner).toggle_monthly_plan(id).await?;
    Ok(ok(plan))
}

pub(crate) async fn delete_monthly_plan(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    state.app(owner).delete_monthly_plan(id).await?;
    Ok(message("Plan deleted"))
}
