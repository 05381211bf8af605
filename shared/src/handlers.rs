//! Method dispatch for the events and semesters Lambdas.
//!
//! Each handler routes on the HTTP method and turns every operation error
//! into a JSON `{"error": ...}` response carrying the CORS headers.

use lambda_http::{Body, Request, RequestExt, Response};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::http::{error_response, json_response, parse_json_body};
use crate::models::{EventQuery, SemesterQuery};
use crate::{events, semesters, AppState, Error, Result};

type Outcome = Result<(u16, Value)>;

fn respond(outcome: Outcome) -> std::result::Result<Response<Body>, lambda_http::Error> {
    match outcome {
        Ok((status, body)) => json_response(status, &body),
        Err(e) => {
            let status = e.status_code();
            if status >= 500 {
                error!("Request failed: {}", e);
            } else {
                warn!("Request rejected ({}): {}", status, e);
            }
            error_response(status, e.to_string())
        }
    }
}

fn preflight() -> std::result::Result<Response<Body>, lambda_http::Error> {
    json_response(200, &json!({"message": "CORS preflight"}))
}

fn param(event: &Request, name: &str) -> Option<String> {
    event
        .query_string_parameters_ref()
        .and_then(|params| params.first(name))
        .map(str::to_string)
}

fn event_query(event: &Request) -> EventQuery {
    EventQuery {
        id: param(event, "id"),
        date: param(event, "date"),
        start_date: param(event, "startDate"),
        end_date: param(event, "endDate"),
        semester_id: param(event, "semesterId"),
        title: param(event, "title"),
    }
}

fn semester_query(event: &Request) -> SemesterQuery {
    SemesterQuery {
        semester_id: param(event, "semesterId"),
        is_current: param(event, "isCurrent"),
    }
}

/// Handle a request against the events resource.
pub async fn handle_events(
    state: &AppState,
    event: Request,
) -> std::result::Result<Response<Body>, lambda_http::Error> {
    let method = event.method().as_str().to_ascii_uppercase();
    info!("Events request: {}", method);

    let outcome: Outcome = match method.as_str() {
        "OPTIONS" => return preflight(),
        "GET" => events::get_events(state, &event_query(&event))
            .await
            .map(|found| (200, found.into_json())),
        "POST" => match parse_json_body(event.body()) {
            Ok(request) => events::create_event(state, request).await.map(|event_id| {
                (
                    201,
                    json!({"message": "Event created successfully", "eventId": event_id}),
                )
            }),
            Err(e) => Err(e),
        },
        "PUT" => match parse_json_body(event.body()) {
            Ok(request) => events::update_event(state, request)
                .await
                .map(|()| (200, json!({"message": "Event updated successfully"}))),
            Err(e) => Err(e),
        },
        "DELETE" => match parse_json_body(event.body()) {
            Ok(request) => events::delete_event(state, request)
                .await
                .map(|()| (200, json!({"message": "Event deleted successfully"}))),
            Err(e) => Err(e),
        },
        other => Err(Error::MethodNotAllowed(other.to_string())),
    };

    respond(outcome)
}

/// Handle a request against the semesters resource.
pub async fn handle_semesters(
    state: &AppState,
    event: Request,
) -> std::result::Result<Response<Body>, lambda_http::Error> {
    let method = event.method().as_str().to_ascii_uppercase();
    info!("Semesters request: {}", method);

    let outcome: Outcome = match method.as_str() {
        "OPTIONS" => return preflight(),
        "GET" => semesters::get_semesters(state, &semester_query(&event))
            .await
            .map(|list| (200, json!(list))),
        "POST" => match parse_json_body(event.body()) {
            Ok(request) => semesters::create_semester(state, request)
                .await
                .map(|semester_id| {
                    (
                        201,
                        json!({"message": "Semester created successfully", "semesterId": semester_id}),
                    )
                }),
            Err(e) => Err(e),
        },
        "PUT" => match parse_json_body(event.body()) {
            Ok(request) => semesters::update_semester(state, request)
                .await
                .map(|semester_id| {
                    (
                        200,
                        json!({"message": "Semester updated successfully", "semesterId": semester_id}),
                    )
                }),
            Err(e) => Err(e),
        },
        "DELETE" => match parse_json_body(event.body()) {
            Ok(request) => semesters::delete_semester(state, request)
                .await
                .map(|deleted| (200, json!(deleted))),
            Err(e) => Err(e),
        },
        other => Err(Error::MethodNotAllowed(other.to_string())),
    };

    respond(outcome)
}
