//! Semesters Lambda - CRUD operations for semesters.
//!
//! Endpoints:
//! - GET /semesters?semesterId=&isCurrent= - List semesters
//! - POST /semesters - Create a semester
//! - PUT /semesters - Update a semester
//! - DELETE /semesters - Delete a semester and its events

use lambda_http::{run, service_fn, Error};
use shared::{handle_semesters, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::from_env().await);
    info!(
        "Semesters Lambda ready (semesters table: {})",
        state.config.semesters_table
    );

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handle_semesters(&state, event).await }
    }))
    .await
}
