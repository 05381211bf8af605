//! Semester operations, the single-current-semester reset, and the cascading
//! delete of a semester's events.
//!
//! Neither the reset-then-write sequence nor the scan-then-delete cascade is
//! transactional. Two concurrent requests marking different semesters current
//! can both survive, and an event created mid-cascade can be orphaned.

use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    from_document, to_document, CreateSemesterRequest, DeleteSemesterRequest, Semester,
    SemesterDeleted, SemesterList, SemesterQuery, UpdateSemesterRequest, EVENT_KEY, SEMESTER_KEY,
};
use crate::store::{scan_all, Document, Filter, Key};
use crate::{AppState, Error, Result};

/// An item a best-effort pass could not process.
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    /// Key of the item, when it had one.
    pub id: Option<String>,
    pub reason: String,
}

/// Outcome of clearing `isCurrent` on other semesters.
#[derive(Debug, Default)]
pub struct ResetReport {
    pub cleared: Vec<String>,
    pub skipped: Vec<Skipped>,
}

/// Outcome of deleting a semester's events.
#[derive(Debug, Default)]
pub struct CascadeReport {
    pub deleted: usize,
    pub skipped: Vec<Skipped>,
}

fn not_found() -> Error {
    Error::NotFound("Semester not found".to_string())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn check_date_order(start_date: &str, end_date: &str) -> Result<()> {
    if start_date >= end_date {
        return Err(Error::Validation(
            "Start date must be before end date".to_string(),
        ));
    }
    Ok(())
}

async fn load_semester(state: &AppState, semester_id: &str) -> Result<Semester> {
    let doc = state
        .store()
        .get_item(
            &state.config.semesters_table,
            &Key::new(SEMESTER_KEY, semester_id),
        )
        .await?
        .ok_or_else(not_found)?;
    from_document(doc)
}

/// List semesters: one by id, those matching `isCurrent`, or all of them.
/// Lists are ordered by `startDate`, newest first.
pub async fn get_semesters(state: &AppState, query: &SemesterQuery) -> Result<SemesterList> {
    if let Some(semester_id) = &query.semester_id {
        let semester = load_semester(state, semester_id).await?;
        return Ok(SemesterList::from(vec![semester]));
    }

    let filter = query
        .is_current
        .as_ref()
        .map(|flag| Filter::equals("isCurrent", flag.eq_ignore_ascii_case("true")));

    let docs = scan_all(state.store(), &state.config.semesters_table, filter.as_ref()).await?;
    let mut semesters = docs
        .into_iter()
        .map(from_document::<Semester>)
        .collect::<Result<Vec<_>>>()?;
    semesters.sort_by(|a, b| b.start_date.cmp(&a.start_date));

    Ok(SemesterList::from(semesters))
}

/// Create a semester, returning its id.
pub async fn create_semester(state: &AppState, request: CreateSemesterRequest) -> Result<String> {
    let (Some(name), Some(start_date), Some(end_date)) = (
        non_empty(&request.name),
        non_empty(&request.start_date),
        non_empty(&request.end_date),
    ) else {
        return Err(Error::Validation(
            "Name, startDate, and endDate are required".to_string(),
        ));
    };
    check_date_order(start_date, end_date)?;

    let is_current = request.is_current.unwrap_or(false);
    if is_current {
        reset_current_semesters(state, None).await;
    }

    let semester = Semester {
        semester_id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        start_date: start_date.to_string(),
        end_date: end_date.to_string(),
        is_current,
    };

    state
        .store()
        .put_item(&state.config.semesters_table, to_document(&semester)?)
        .await?;

    info!(
        "Created semester {} ({}) current={}",
        semester.semester_id, semester.name, semester.is_current
    );
    Ok(semester.semester_id)
}

/// Update a semester. Omitted fields keep their stored values.
pub async fn update_semester(state: &AppState, request: UpdateSemesterRequest) -> Result<String> {
    let semester_id = non_empty(&request.semester_id)
        .ok_or_else(|| Error::Validation("semesterId is required".to_string()))?
        .to_string();

    let existing = load_semester(state, &semester_id).await?;

    let merged = Semester {
        semester_id: semester_id.clone(),
        name: request.name.unwrap_or(existing.name),
        start_date: request.start_date.unwrap_or(existing.start_date),
        end_date: request.end_date.unwrap_or(existing.end_date),
        is_current: request.is_current.unwrap_or(existing.is_current),
    };

    if !merged.start_date.is_empty() && !merged.end_date.is_empty() {
        check_date_order(&merged.start_date, &merged.end_date)?;
    }

    if merged.is_current {
        // This semester is rewritten below, so only the others need clearing.
        reset_current_semesters(state, Some(&semester_id)).await;
    }

    let mut fields = to_document(&merged)?;
    fields.remove(SEMESTER_KEY);

    state
        .store()
        .update_item(
            &state.config.semesters_table,
            &Key::new(SEMESTER_KEY, semester_id.as_str()),
            fields,
        )
        .await?;

    info!("Updated semester {} current={}", semester_id, merged.is_current);
    Ok(semester_id)
}

/// Delete a non-current semester together with its events.
pub async fn delete_semester(
    state: &AppState,
    request: DeleteSemesterRequest,
) -> Result<SemesterDeleted> {
    let semester_id = non_empty(&request.semester_id)
        .ok_or_else(|| Error::Validation("semesterId is required".to_string()))?
        .to_string();

    let semester = load_semester(state, &semester_id).await?;
    if semester.is_current {
        return Err(Error::Validation(
            "Cannot delete the active/current semester".to_string(),
        ));
    }

    let report = delete_semester_events(state, &semester_id)
        .await
        .map_err(|e| Error::Store(format!("Failed to scan or delete events: {}", e)))?;

    state
        .store()
        .delete_item(
            &state.config.semesters_table,
            &Key::new(SEMESTER_KEY, semester_id.as_str()),
        )
        .await?;

    info!(
        "Deleted semester {} with {} events ({} skipped)",
        semester_id,
        report.deleted,
        report.skipped.len()
    );

    Ok(SemesterDeleted {
        message: "Semester and associated events deleted successfully".to_string(),
        semester_id,
        deleted_event_count: report.deleted,
    })
}

/// Delete every event of a semester, page by page.
///
/// A failing scan aborts with an error. Individual events that cannot be
/// deleted are skipped and reported.
pub async fn delete_semester_events(state: &AppState, semester_id: &str) -> Result<CascadeReport> {
    let store = state.store();
    let table = state.config.events_table.as_str();
    let filter = Filter::equals(SEMESTER_KEY, semester_id);

    let mut report = CascadeReport::default();
    let mut start = None;

    loop {
        let page = store.scan(table, Some(&filter), start).await?;

        for item in &page.items {
            let Some(event_id) = item.get(EVENT_KEY).and_then(Value::as_str) else {
                let shown = Value::Object(item.clone());
                warn!("Skipping event with missing EventId: {}", shown);
                report.skipped.push(Skipped {
                    id: None,
                    reason: "missing EventId".to_string(),
                });
                continue;
            };

            match store.delete_item(table, &Key::new(EVENT_KEY, event_id)).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    warn!("Failed to delete event {}: {}", event_id, e);
                    report.skipped.push(Skipped {
                        id: Some(event_id.to_string()),
                        reason: e.to_string(),
                    });
                }
            }
        }

        match page.cursor {
            Some(cursor) => start = Some(cursor),
            None => return Ok(report),
        }
    }
}

/// Clear `isCurrent` on every current semester except `keep`.
///
/// Best-effort: failures are logged and reported, never returned as errors,
/// so a failure here can leave more than one semester current.
pub async fn reset_current_semesters(state: &AppState, keep: Option<&str>) -> ResetReport {
    let store = state.store();
    let table = state.config.semesters_table.as_str();
    let mut report = ResetReport::default();

    let current: Vec<Document> =
        match scan_all(store, table, Some(&Filter::equals("isCurrent", true))).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Error resetting current semesters: {}", e);
                report.skipped.push(Skipped {
                    id: None,
                    reason: e.to_string(),
                });
                return report;
            }
        };

    for item in current {
        let Some(semester_id) = item.get(SEMESTER_KEY).and_then(Value::as_str) else {
            continue;
        };
        if keep == Some(semester_id) {
            continue;
        }

        let mut fields = Document::new();
        fields.insert("isCurrent".to_string(), json!(false));

        match store
            .update_item(table, &Key::new(SEMESTER_KEY, semester_id), fields)
            .await
        {
            Ok(()) => report.cleared.push(semester_id.to_string()),
            Err(e) => {
                warn!("Error resetting current semester {}: {}", semester_id, e);
                report.skipped.push(Skipped {
                    id: Some(semester_id.to_string()),
                    reason: e.to_string(),
                });
            }
        }
    }

    if !report.cleared.is_empty() {
        info!("Cleared isCurrent on {:?}", report.cleared);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ItemStore, MemoryStore};
    use crate::Config;
    use std::sync::Arc;

    fn memory_store() -> MemoryStore {
        MemoryStore::new()
            .with_table("Events", "EventId")
            .with_table("Semesters", "semesterId")
    }

    fn state(store: &Arc<MemoryStore>) -> AppState {
        AppState::new(store.clone(), Config::default())
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seed_semester(store: &MemoryStore, id: &str, start: &str, current: bool) {
        store
            .put_item(
                "Semesters",
                doc(json!({
                    "semesterId": id,
                    "name": format!("Term {id}"),
                    "startDate": start,
                    "endDate": "2099-01-01",
                    "isCurrent": current,
                })),
            )
            .await
            .unwrap();
    }

    async fn seed_event(store: &MemoryStore, id: &str, semester_id: &str) {
        store
            .put_item(
                "Events",
                doc(json!({
                    "EventId": id,
                    "Date": "2024-10-01",
                    "Title": "Lecture",
                    "semesterId": semester_id,
                    "CreatedAt": "2024-09-01T00:00:00.000000",
                })),
            )
            .await
            .unwrap();
    }

    async fn current_ids(store: &MemoryStore) -> Vec<String> {
        scan_all(store, "Semesters", Some(&Filter::equals("isCurrent", true)))
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["semesterId"].as_str().unwrap().to_string())
            .collect()
    }

    fn create_request(start: &str, end: &str, current: Option<bool>) -> CreateSemesterRequest {
        CreateSemesterRequest {
            name: Some("Fall 2024".to_string()),
            start_date: Some(start.to_string()),
            end_date: Some(end.to_string()),
            is_current: current,
        }
    }

    #[tokio::test]
    async fn test_create_current_clears_others() {
        let store = Arc::new(memory_store());
        seed_semester(&store, "old-1", "2023-01-01", true).await;
        seed_semester(&store, "old-2", "2023-06-01", true).await;
        let state = state(&store);

        let id = create_semester(&state, create_request("2024-09-01", "2024-12-20", Some(true)))
            .await
            .unwrap();

        assert_eq!(current_ids(&store).await, vec![id]);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_date_order() {
        let store = Arc::new(memory_store());
        let state = state(&store);

        for (start, end) in [("2024-12-20", "2024-09-01"), ("2024-09-01", "2024-09-01")] {
            let err = create_semester(&state, create_request(start, end, None))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Start date must be before end date");
        }
        assert!(store.is_empty("Semesters").await);
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let store = Arc::new(memory_store());
        let mut request = create_request("2024-09-01", "2024-12-20", None);
        request.name = Some(String::new());

        let err = create_semester(&state(&store), request).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_single_current() {
        let store = Arc::new(memory_store());
        seed_semester(&store, "a", "2024-01-01", true).await;
        seed_semester(&store, "b", "2024-06-01", false).await;
        let state = state(&store);

        update_semester(
            &state,
            UpdateSemesterRequest {
                semester_id: Some("b".to_string()),
                is_current: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(current_ids(&store).await, vec!["b".to_string()]);
        let b = load_semester(&state, "b").await.unwrap();
        assert_eq!(b.name, "Term b");
        assert_eq!(b.start_date, "2024-06-01");
    }

    #[tokio::test]
    async fn test_update_validates_merged_dates() {
        let store = Arc::new(memory_store());
        seed_semester(&store, "a", "2024-01-01", false).await;

        let err = update_semester(
            &state(&store),
            UpdateSemesterRequest {
                semester_id: Some("a".to_string()),
                end_date: Some("2023-12-31".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = Arc::new(memory_store());
        let err = update_semester(
            &state(&store),
            UpdateSemesterRequest {
                semester_id: Some("ghost".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_list_sorted_newest_first() {
        let store = Arc::new(memory_store());
        seed_semester(&store, "a", "2023-09-01", false).await;
        seed_semester(&store, "b", "2024-09-01", true).await;
        seed_semester(&store, "c", "2024-01-10", false).await;
        let state = state(&store);

        let all = get_semesters(&state, &SemesterQuery::default()).await.unwrap();
        let order: Vec<&str> = all.semesters.iter().map(|s| s.semester_id.as_str()).collect();
        assert_eq!(order, ["b", "c", "a"]);
        assert_eq!(all.count, 3);

        let query = SemesterQuery {
            is_current: Some("TRUE".to_string()),
            ..Default::default()
        };
        let current = get_semesters(&state, &query).await.unwrap();
        assert_eq!(current.count, 1);
        assert_eq!(current.semesters[0].semester_id, "b");

        let query = SemesterQuery {
            is_current: Some("no".to_string()),
            ..Default::default()
        };
        let others = get_semesters(&state, &query).await.unwrap();
        assert_eq!(others.count, 2);
        assert_eq!(others.semesters[0].semester_id, "c");
    }

    #[tokio::test]
    async fn test_get_by_id_wraps_single_semester() {
        let store = Arc::new(memory_store());
        seed_semester(&store, "a", "2023-09-01", false).await;
        seed_semester(&store, "b", "2024-09-01", true).await;
        let state = state(&store);

        let query = SemesterQuery {
            semester_id: Some("a".to_string()),
            ..Default::default()
        };
        let found = get_semesters(&state, &query).await.unwrap();
        assert_eq!(found.count, 1);
        assert_eq!(found.semesters[0].semester_id, "a");
        assert_eq!(found.semesters[0].name, "Term a");

        let query = SemesterQuery {
            semester_id: Some("ghost".to_string()),
            ..Default::default()
        };
        let err = get_semesters(&state, &query).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Semester not found");
    }

    #[tokio::test]
    async fn test_list_tolerates_incomplete_items() {
        let store = Arc::new(memory_store());
        seed_semester(&store, "a", "2023-09-01", false).await;
        store
            .put_item("Semesters", doc(json!({"semesterId": "bare"})))
            .await
            .unwrap();

        let all = get_semesters(&state(&store), &SemesterQuery::default())
            .await
            .unwrap();
        assert_eq!(all.count, 2);
        assert_eq!(all.semesters[0].semester_id, "a");
        assert_eq!(all.semesters[1].semester_id, "bare");
        assert_eq!(all.semesters[1].start_date, "");
        assert!(!all.semesters[1].is_current);
    }

    #[tokio::test]
    async fn test_create_succeeds_when_reset_fails() {
        let store = Arc::new(memory_store().fail_update_of("stuck"));
        seed_semester(&store, "stuck", "2023-01-01", true).await;
        let state = state(&store);

        let id = create_semester(&state, create_request("2024-09-01", "2024-12-20", Some(true)))
            .await
            .unwrap();

        let mut current = current_ids(&store).await;
        current.sort();
        let mut expected = vec![id, "stuck".to_string()];
        expected.sort();
        assert_eq!(current, expected);
    }

    #[tokio::test]
    async fn test_update_succeeds_when_reset_fails() {
        let store = Arc::new(memory_store().fail_update_of("stuck"));
        seed_semester(&store, "stuck", "2023-01-01", true).await;
        seed_semester(&store, "b", "2024-06-01", false).await;
        let state = state(&store);

        let id = update_semester(
            &state,
            UpdateSemesterRequest {
                semester_id: Some("b".to_string()),
                is_current: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(id, "b");

        let mut current = current_ids(&store).await;
        current.sort();
        assert_eq!(current, ["b", "stuck"]);
    }

    #[tokio::test]
    async fn test_delete_current_is_refused() {
        let store = Arc::new(memory_store());
        seed_semester(&store, "a", "2024-01-01", true).await;
        seed_event(&store, "e-1", "a").await;

        let err = delete_semester(
            &state(&store),
            DeleteSemesterRequest {
                semester_id: Some("a".to_string()),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Cannot delete the active/current semester");
        assert_eq!(store.len("Semesters").await, 1);
        assert_eq!(store.len("Events").await, 1);
    }

    #[tokio::test]
    async fn test_cascade_spans_pages() {
        let store = Arc::new(memory_store().with_page_size(2));
        seed_semester(&store, "a", "2024-01-01", false).await;
        seed_semester(&store, "keep", "2024-06-01", false).await;
        for i in 0..5 {
            seed_event(&store, &format!("a-{i}"), "a").await;
        }
        seed_event(&store, "k-1", "keep").await;

        let deleted = delete_semester(
            &state(&store),
            DeleteSemesterRequest {
                semester_id: Some("a".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(deleted.deleted_event_count, 5);
        assert_eq!(store.len("Events").await, 1);
        assert_eq!(store.len("Semesters").await, 1);
    }

    #[tokio::test]
    async fn test_cascade_skips_failed_deletes() {
        let store = Arc::new(memory_store().fail_delete_of("e-2"));
        seed_semester(&store, "a", "2024-01-01", false).await;
        for id in ["e-1", "e-2", "e-3"] {
            seed_event(&store, id, "a").await;
        }

        let state = state(&store);
        let report = delete_semester_events(&state, "a").await.unwrap();
        assert_eq!(report.deleted, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id.as_deref(), Some("e-2"));
    }

    #[tokio::test]
    async fn test_failed_scan_keeps_semester() {
        let store = Arc::new(memory_store().fail_scans_of("Events"));
        seed_semester(&store, "a", "2024-01-01", false).await;

        let err = delete_semester(
            &state(&store),
            DeleteSemesterRequest {
                semester_id: Some("a".to_string()),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().starts_with("Failed to scan or delete events"));
        assert_eq!(store.len("Semesters").await, 1);
    }

    #[tokio::test]
    async fn test_reset_failure_is_reported_not_raised() {
        let store = Arc::new(memory_store().fail_update_of("stuck"));
        seed_semester(&store, "stuck", "2023-01-01", true).await;
        seed_semester(&store, "other", "2023-06-01", true).await;

        let report = reset_current_semesters(&state(&store), None).await;
        assert_eq!(report.cleared, vec!["other".to_string()]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(current_ids(&store).await, vec!["stuck".to_string()]);
    }
}
