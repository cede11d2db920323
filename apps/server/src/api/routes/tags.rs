//! Tag API Routes

use crate::api::handlers::tags;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn tag_routes() -> Router<AppState> {
    Router::new().route("/tags", get(tags::list_tags))
}
