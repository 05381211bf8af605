//! Calendar data models.
//!
//! Stored items keep the attribute names already present in the tables,
//! hence the mix of `PascalCase` (`EventId`, `Date`, `Title`) and `camelCase`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Document;
use crate::{Error, Result};

pub const EVENT_KEY: &str = "EventId";
pub const SEMESTER_KEY: &str = "semesterId";

fn default_event_type() -> String {
    "other".to_string()
}

/// A dated calendar entry belonging to a semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "EventId")]
    pub event_id: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_event_type")]
    pub event_type: String,
    #[serde(rename = "semesterId")]
    pub semester_id: String,
    #[serde(rename = "CreatedAt")]
    pub created_at: String,
}

/// An academic term. Attributes missing from a stored item read as empty
/// (`isCurrent` as false), so one hand-edited item cannot break a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Semester {
    pub semester_id: String,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub is_current: bool,
}

/// Convert a model into the document written to the store.
pub fn to_document<T: Serialize>(model: &T) -> Result<Document> {
    match serde_json::to_value(model) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(Error::Store("model did not serialize to an object".to_string())),
        Err(e) => Err(Error::Store(e.to_string())),
    }
}

/// Decode a stored document into a model.
pub fn from_document<T: for<'de> Deserialize<'de>>(doc: Document) -> Result<T> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| Error::Store(format!("Malformed stored item: {}", e)))
}

/// Query parameters accepted by `GET /events`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    pub id: Option<String>,
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub semester_id: Option<String>,
    pub title: Option<String>,
}

/// Create event request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub date: Option<String>,
    pub title: Option<String>,
    pub semester_id: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

/// Update event request. `None` means the field was not sent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub event_id: Option<String>,
    pub date: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub semester_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

impl UpdateEventRequest {
    /// The stored attributes this request changes.
    pub fn changed_fields(&self) -> Document {
        let mut fields = Document::new();
        let pairs = [
            ("Date", &self.date),
            ("Title", &self.title),
            ("description", &self.description),
            ("semesterId", &self.semester_id),
            ("type", &self.event_type),
        ];
        for (attribute, value) in pairs {
            if let Some(value) = value {
                fields.insert(attribute.to_string(), Value::String(value.clone()));
            }
        }
        fields
    }
}

/// Delete event request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventRequest {
    pub event_id: Option<String>,
    pub date: Option<String>,
}

/// Query parameters accepted by `GET /semesters`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterQuery {
    pub semester_id: Option<String>,
    pub is_current: Option<String>,
}

/// Create semester request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSemesterRequest {
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_current: Option<bool>,
}

/// Update semester request. Omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSemesterRequest {
    pub semester_id: Option<String>,
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_current: Option<bool>,
}

/// Delete semester request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSemesterRequest {
    pub semester_id: Option<String>,
}

/// Body returned by `GET /semesters`.
#[derive(Debug, Serialize)]
pub struct SemesterList {
    pub semesters: Vec<Semester>,
    pub count: usize,
}

impl From<Vec<Semester>> for SemesterList {
    fn from(semesters: Vec<Semester>) -> Self {
        Self {
            count: semesters.len(),
            semesters,
        }
    }
}

/// Body returned after a successful semester delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterDeleted {
    pub message: String,
    pub semester_id: String,
    pub deleted_event_count: usize,
}
