//! Events Lambda - CRUD operations for calendar events.
//!
//! Endpoints:
//! - GET /events?id=&date=&startDate=&endDate=&semesterId=&title= - Look up events
//! - POST /events - Create an event
//! - PUT /events - Update an event
//! - DELETE /events - Delete an event

use lambda_http::{run, service_fn, Error};
use shared::{handle_events, AppState};
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
        "Events Lambda ready (events table: {}, semesters table: {})",
        state.config.events_table, state.config.semesters_table
    );

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handle_events(&state, event).await }
    }))
    .await
}
