//! Event operations: lookup, create, partial update and delete.

use chrono::Utc;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    to_document, CreateEventRequest, DeleteEventRequest, Event, EventQuery, UpdateEventRequest,
    EVENT_KEY, SEMESTER_KEY,
};
use crate::store::{Document, Filter, Key};
use crate::{AppState, Error, Result};

/// Result of `GET /events`: a single item for id lookups, a list otherwise.
#[derive(Debug)]
pub enum EventLookup {
    One(Document),
    Many(Vec<Document>),
}

impl EventLookup {
    pub fn into_json(self) -> Value {
        match self {
            EventLookup::One(item) => Value::Object(item),
            EventLookup::Many(items) => Value::Array(items.into_iter().map(Value::Object).collect()),
        }
    }
}

fn not_found() -> Error {
    Error::NotFound("Event not found".to_string())
}

fn stored_date(item: &Document) -> Option<&str> {
    item.get("Date").and_then(Value::as_str)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Fail with 400 unless `semester_id` names a stored semester.
async fn ensure_semester_exists(state: &AppState, semester_id: &str) -> Result<()> {
    let key = Key::new(SEMESTER_KEY, semester_id);
    match state
        .store()
        .get_item(&state.config.semesters_table, &key)
        .await?
    {
        Some(_) => Ok(()),
        None => Err(Error::InvalidReference(semester_id.to_string())),
    }
}

/// Look up events. Parameters are considered in the order
/// `id`, `date`, `startDate`+`endDate`, `semesterId`, `title`.
pub async fn get_events(state: &AppState, query: &EventQuery) -> Result<EventLookup> {
    let store = state.store();
    let config = &state.config;
    let table = config.events_table.as_str();

    if let Some(id) = &query.id {
        let item = store
            .get_item(table, &Key::new(EVENT_KEY, id.as_str()))
            .await?
            .ok_or_else(not_found)?;
        if let Some(date) = &query.date {
            if stored_date(&item) != Some(date.as_str()) {
                return Err(not_found());
            }
        }
        return Ok(EventLookup::One(item));
    }

    if let Some(date) = &query.date {
        let page = store
            .query_index(table, &config.date_index, "Date", date)
            .await?;
        return Ok(EventLookup::Many(page.items));
    }

    if let (Some(start), Some(end)) = (&query.start_date, &query.end_date) {
        // Unindexed range: one scan page, fine for a single institution's calendar.
        let filter = Filter::between("Date", start.as_str(), end.as_str());
        let page = store.scan(table, Some(&filter), None).await?;
        return Ok(EventLookup::Many(page.items));
    }

    if let Some(semester_id) = &query.semester_id {
        let page = store
            .query_index(table, &config.semester_index, SEMESTER_KEY, semester_id)
            .await?;
        return Ok(EventLookup::Many(page.items));
    }

    if let Some(title) = &query.title {
        return Ok(EventLookup::Many(find_by_title(state, title).await?));
    }

    Err(Error::Validation(
        "Please provide query parameters (date, startDate+endDate, id[+date], semesterId, or title)"
            .to_string(),
    ))
}

/// Exact title lookup: the title index first, then a filtered scan when the
/// index has nothing (it is eventually consistent and may lag writes).
async fn find_by_title(state: &AppState, title: &str) -> Result<Vec<Document>> {
    let store = state.store();
    let table = state.config.events_table.as_str();

    let page = store
        .query_index(table, &state.config.title_index, "Title", title)
        .await?;
    if !page.items.is_empty() {
        return Ok(page.items);
    }

    let filter = Filter::equals("Title", title);
    let page = store.scan(table, Some(&filter), None).await?;
    Ok(page.items)
}

/// Create an event under an existing semester, returning its id.
pub async fn create_event(state: &AppState, request: CreateEventRequest) -> Result<String> {
    let (Some(date), Some(title), Some(semester_id)) = (
        non_empty(&request.date),
        non_empty(&request.title),
        non_empty(&request.semester_id),
    ) else {
        return Err(Error::Validation(
            "date, title, and semesterId are required".to_string(),
        ));
    };

    ensure_semester_exists(state, semester_id).await?;

    let event = Event {
        event_id: Uuid::new_v4().to_string(),
        date: date.to_string(),
        title: title.to_string(),
        description: request.description.unwrap_or_default(),
        event_type: request.event_type.unwrap_or_else(|| "other".to_string()),
        semester_id: semester_id.to_string(),
        created_at: Utc::now()
            .naive_utc()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string(),
    };

    state
        .store()
        .put_item(&state.config.events_table, to_document(&event)?)
        .await?;

    info!("Created event {} on {} in semester {}", event.event_id, event.date, event.semester_id);
    Ok(event.event_id)
}

/// Apply a partial update to an event.
pub async fn update_event(state: &AppState, request: UpdateEventRequest) -> Result<()> {
    let event_id = non_empty(&request.event_id)
        .ok_or_else(|| Error::Validation("eventId is required".to_string()))?;
    let key = Key::new(EVENT_KEY, event_id);
    let table = state.config.events_table.as_str();

    state
        .store()
        .get_item(table, &key)
        .await?
        .ok_or_else(not_found)?;

    let fields = request.changed_fields();
    if fields.is_empty() {
        return Err(Error::Validation("No valid fields to update".to_string()));
    }

    if let Some(semester_id) = &request.semester_id {
        ensure_semester_exists(state, semester_id).await?;
    }

    let changed: Vec<&str> = fields.keys().map(String::as_str).collect();
    info!("Updating event {} fields {:?}", event_id, changed);

    state.store().update_item(table, &key, fields).await
}

/// Delete an event, optionally requiring its stored date to match.
pub async fn delete_event(state: &AppState, request: DeleteEventRequest) -> Result<()> {
    let event_id = non_empty(&request.event_id)
        .ok_or_else(|| Error::Validation("eventId is required".to_string()))?;
    let key = Key::new(EVENT_KEY, event_id);
    let table = state.config.events_table.as_str();

    let item = state
        .store()
        .get_item(table, &key)
        .await?
        .ok_or_else(not_found)?;

    if let Some(date) = non_empty(&request.date) {
        if stored_date(&item) != Some(date) {
            return Err(not_found());
        }
    }

    state.store().delete_item(table, &key).await?;
    info!("Deleted event {}", event_id);
    Ok(())
}
