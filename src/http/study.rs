use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::{Extension, Json};

use super::middleware::Owner;
use super::response::{created, message, ok};
use super::AppState;
use crate::error::AppError;
use crate::model::{
    StudyGroupInput, StudyResourceInput, StudySessionInput, StudySessionQuery, SyllabusQuery,
    SyllabusTopicInput,
};

pub(crate) async fn list_sessions(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    query: Result<Query<StudySessionQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    Ok(ok(state.app(owner).list_study_sessions(query.date).await?))
}

pub(crate) async fn create_session(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    payload: Result<Json<StudySessionInput>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = payload?;
    Ok(created(state.app(owner).add_study_session(input).await?))
}

pub(crate) async fn delete_session(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    state.app(owner).delete_study_session(id).await?;
    Ok(message("Session deleted"))
}

pub(crate) async fn list_syllabus(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    query: Result<Query<SyllabusQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let topics = state
        .app(owner)
        .list_syllabus_topics(query.subject.as_deref())
        .await?;
    Ok(ok(topics))
}

pub(crate) async fn create_syllabus_topic(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    payload: Result<Json<SyllabusTopicInput>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = payload?;
    Ok(created(state.app(owner).add_syllabus_topic(input).await?))
}

pub(crate) async fn toggle_syllabus_topic(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    Ok(ok(state.app(owner).toggle_syllabus_topic(id).await?))
}

pub(crate) async fn delete_syllabus_topic(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    state.app(owner).delete_syllabus_topic(id).await?;
    Ok(message("Topic deleted"))
}

pub(crate) async fn list_resources(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> Result<Response, AppError> {
    Ok(ok(state.app(owner).list_study_resources().await?))
}

pub(crate) async fn create_resource(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    payload: Result<Json<StudyResourceInput>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = payload?;
    Ok(created(state.app(owner).add_study_resource(input).await?))
}

pub(crate) async fn delete_resource(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    state.app(owner).delete_study_resource(id).await?;
    Ok(message("Resource deleted"))
}

pub(crate) async fn list_groups(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> Result<Response, AppError> {
    Ok(ok(state.app(owner).list_study_groups().await?))
}

pub(crate) async fn create_group(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    payload: Result<Json<StudyGroupInput>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = payload?;
    Ok(created(state.app(owner).add_study_group(input).await?))
}

pub(crate) async fn delete_group(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    state.app(owner).delete_study_group(id).await?;
    Ok(message("Group deleted"))
}
