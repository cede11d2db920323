//! Question API Routes

use crate::api::handlers::questions;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn question_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/questions/:id",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
}
