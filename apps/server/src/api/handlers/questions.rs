//! Question handlers
//!
//! Protected operations extract [`AuthenticatedPrincipal`] before the body, so
//! unauthenticated calls are rejected before any parsing or store access.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    api::extractors::ApiJson,
    auth::AuthenticatedPrincipal,
    models::{ListQuestionsParams, QuestionInput},
    state::AppState,
    Result,
};

/// `POST /questions`
pub async fn create_question(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    ApiJson(input): ApiJson<QuestionInput>,
) -> Result<Response> {
    let question = state.question_service.create(&principal, input).await?;
    let location = format!("/questions/{}", question.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(question),
    )
        .into_response())
}

/// `GET /questions?tag=`
pub async fn list_questions(
    State(state): State<AppState>,
    Query(params): Query<ListQuestionsParams>,
) -> Result<Response> {
    let questions = state.question_service.list(params.tag_filter()).await?;
    Ok(Json(questions).into_response())
}

/// `GET /questions/{id}`
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let question = state.question_service.get(&id).await?;
    Ok(Json(question).into_response())
}

/// `PUT /questions/{id}`
pub async fn update_question(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<QuestionInput>,
) -> Result<StatusCode> {
    state.question_service.update(&principal, &id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /questions/{id}`
pub async fn delete_question(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.question_service.delete(&principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
