pub mod history;
pub mod medications;
pub mod schedule;

use axum::{routing::get, Router};

use crate::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(medications::routes(state.clone()))
        .merge(schedule::routes(state.clone()))
        .merge(history::routes(state))
        .route("/health", get(|| async { "✅ Backend up" }))
}
