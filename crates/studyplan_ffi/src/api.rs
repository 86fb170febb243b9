//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose one function per planner use-case to Dart via FRB.
//! - Translate core errors into flat response envelopes.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - Each call opens the database, runs one use-case against a fresh store
//!   and drops it; calls within the process are serialized.

use chrono::NaiveDate;
use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use studyplan_core::db::open_db;
use studyplan_core::service::insights::search_resources;
use studyplan_core::service::kanban::{move_task, DropOutcome, DropTarget};
use studyplan_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Difficulty, NewResource, NewTask, Priority, SqliteBlobRepository, StudyStore, SystemClock,
    TaskStatus,
};

const DB_FILE_NAME: &str = "studyplan.sqlite3";
const DB_PATH_ENV: &str = "STUDYPLAN_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static STORE_LOCK: Mutex<()> = Mutex::new(());

type FfiStore = StudyStore<SqliteBlobRepository>;

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// # FFI contract
/// - `level`: `trace|debug|info|warn|error`, case-insensitive.
/// - `log_dir`: absolute directory for rotated log files.
/// - Returns an empty string on success and the error text otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Result envelope for mutating calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Id of the created or affected entity, when there is one.
    pub entity_id: Option<String>,
    /// Human-readable outcome for diagnostics and toasts.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, entity_id: Option<String>) -> Self {
        Self {
            ok: true,
            entity_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            entity_id: None,
            message: message.into(),
        }
    }
}

/// Full document snapshot as the persisted JSON shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotResponse {
    pub ok: bool,
    pub json: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    pub id: String,
    pub url: String,
    pub title: String,
    pub subject: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSearchResponse {
    pub items: Vec<ResourceItem>,
    pub message: String,
}

/// Returns the whole study document for rendering the board and library.
#[flutter_rust_bridge::frb(sync)]
pub fn board_snapshot_json() -> SnapshotResponse {
    let result = with_store(|store| {
        serde_json::to_string(store.data()).map_err(|err| format!("encode failed: {err}"))
    });
    match result {
        Ok(json) => SnapshotResponse {
            ok: true,
            json,
            message: String::new(),
        },
        Err(err) => SnapshotResponse {
            ok: false,
            json: String::new(),
            message: format!("board_snapshot_json failed: {err}"),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn study_add_subject(name: String) -> ActionResponse {
    respond("study_add_subject", |store| {
        let added = store.add_subject(&name).map_err(|err| err.to_string())?;
        let subject = store.subjects().last().cloned();
        Ok(if added {
            ActionResponse::success("Subject added.", subject)
        } else {
            ActionResponse::success("Subject already exists.", None)
        })
    })
}

/// Removes a subject together with its tasks and resources.
///
/// Destructive: the Dart side must confirm with the user before calling.
#[flutter_rust_bridge::frb(sync)]
pub fn study_remove_subject(name: String) -> ActionResponse {
    respond("study_remove_subject", |store| {
        let removal = store.remove_subject(&name);
        if removal.is_noop() {
            return Ok(ActionResponse::success("Subject not found.", None));
        }
        Ok(ActionResponse::success(
            format!(
                "Subject removed with {} task(s) and {} resource(s).",
                removal.tasks_removed, removal.resources_removed
            ),
            None,
        ))
    })
}

/// Creates a task.
///
/// `due_date` is `YYYY-MM-DD`. Optional enum fields take wire ids such as
/// `inProgress`, `urgent` or `hard`; absent values use the task defaults.
#[flutter_rust_bridge::frb(sync)]
pub fn study_create_task(
    title: String,
    subject: String,
    due_date: String,
    status: Option<String>,
    priority: Option<String>,
    difficulty: Option<String>,
    description: Option<String>,
) -> ActionResponse {
    respond("study_create_task", |store| {
        let due = NaiveDate::parse_from_str(due_date.trim(), "%Y-%m-%d")
            .map_err(|_| format!("invalid due date `{}`", due_date.trim()))?;
        let mut input = NewTask::new(title, subject, due)
            .with_description(description.unwrap_or_default());
        if let Some(raw) = status {
            let status = raw.trim().parse::<TaskStatus>().map_err(|err| err.to_string())?;
            input = input.with_status(status);
        }
        if let Some(raw) = priority {
            input = input.with_priority(parse_wire(&raw, "priority", Priority::parse)?);
        }
        if let Some(raw) = difficulty {
            input = input.with_difficulty(parse_wire(&raw, "difficulty", Difficulty::parse)?);
        }
        let task = store.create_task(input).map_err(|err| err.to_string())?;
        Ok(ActionResponse::success("Task created.", Some(task.id)))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn study_delete_task(task_id: String) -> ActionResponse {
    respond("study_delete_task", |store| {
        Ok(match store.delete_task(task_id.trim()) {
            Some(task) => ActionResponse::success("Task deleted.", Some(task.id)),
            None => ActionResponse::success("Task not found.", None),
        })
    })
}

/// Applies a kanban drop of `task_id` onto column id `column`.
#[flutter_rust_bridge::frb(sync)]
pub fn study_move_task(task_id: String, column: String) -> ActionResponse {
    respond("study_move_task", |store| {
        let target = DropTarget::resolve(Some(column.trim()));
        let outcome = move_task(store, task_id.trim(), target).map_err(|err| err.to_string())?;
        Ok(match outcome {
            DropOutcome::Moved { to, .. } => {
                ActionResponse::success(format!("Task moved to {to}."), Some(task_id))
            }
            DropOutcome::Unchanged => {
                ActionResponse::success("Task already in column.", Some(task_id))
            }
            DropOutcome::TaskMissing => ActionResponse::failure("Task not found."),
            DropOutcome::NotAColumn | DropOutcome::Aborted | DropOutcome::NoActiveDrag => {
                ActionResponse::failure(format!("Unknown column `{}`.", column.trim()))
            }
        })
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn study_create_resource(
    url: String,
    title: String,
    subject: String,
    description: Option<String>,
    tags: Vec<String>,
) -> ActionResponse {
    respond("study_create_resource", |store| {
        let input = NewResource::new(url, title, subject)
            .with_description(description.unwrap_or_default())
            .with_tags(tags);
        let resource = store.create_resource(input).map_err(|err| err.to_string())?;
        Ok(ActionResponse::success("Resource saved.", Some(resource.id)))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn study_delete_resource(resource_id: String) -> ActionResponse {
    respond("study_delete_resource", |store| {
        Ok(match store.delete_resource(resource_id.trim()) {
            Some(resource) => ActionResponse::success("Resource deleted.", Some(resource.id)),
            None => ActionResponse::success("Resource not found.", None),
        })
    })
}

/// Searches resource titles, descriptions and tags, case-insensitively.
#[flutter_rust_bridge::frb(sync)]
pub fn study_search_resources(query: String, subject: Option<String>) -> ResourceSearchResponse {
    let result = with_store(|store| {
        let items = search_resources(store.data(), &query, subject.as_deref())
            .into_iter()
            .map(|resource| ResourceItem {
                id: resource.id.clone(),
                url: resource.url.clone(),
                title: resource.title.clone(),
                subject: resource.subject.clone(),
                tags: resource.tags.clone(),
            })
            .collect::<Vec<_>>();
        Ok(items)
    });
    match result {
        Ok(items) => {
            let message = if items.is_empty() {
                "No results.".to_string()
            } else {
                format!("Found {} result(s).", items.len())
            };
            ResourceSearchResponse { items, message }
        }
        Err(err) => ResourceSearchResponse {
            items: Vec::new(),
            message: format!("study_search_resources failed: {err}"),
        },
    }
}

fn respond(
    call: &str,
    f: impl FnOnce(&mut FfiStore) -> Result<ActionResponse, String>,
) -> ActionResponse {
    match with_store(f) {
        Ok(response) => response,
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error call={}", call);
            ActionResponse::failure(format!("{call} failed: {err}"))
        }
    }
}

fn with_store<T>(f: impl FnOnce(&mut FfiStore) -> Result<T, String>) -> Result<T, String> {
    let _guard = STORE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let conn = open_db(resolve_db_path()).map_err(|err| format!("DB open failed: {err}"))?;
    let mut store = StudyStore::open(SqliteBlobRepository::new(conn), SystemClock::shared());
    let value = f(&mut store)?;
    if !store.last_save_succeeded() {
        return Err("changes could not be saved".to_string());
    }
    Ok(value)
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn parse_wire<T>(raw: &str, field: &str, parse: fn(&str) -> Option<T>) -> Result<T, String> {
    parse(raw.trim()).ok_or_else(|| format!("invalid {field} `{}`", raw.trim()))
}

#[cfg(test)]
mod tests {
    use super::{
        board_snapshot_json, core_version, init_logging, ping, study_add_subject,
        study_create_resource, study_create_task, study_delete_resource, study_delete_task,
        study_move_task, study_remove_subject, study_search_resources,
    };
    use std::time::{SystemTime, UNIX_EPOCH};
    use studyplan_core::StudyData;

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn task_lifecycle_through_envelopes() {
        let subject = unique_token("Subject");
        assert!(study_add_subject(subject.clone()).ok);

        let created = study_create_task(
            "HW1".to_string(),
            subject.clone(),
            "2025-01-10".to_string(),
            None,
            Some("urgent".to_string()),
            None,
            None,
        );
        assert!(created.ok, "{}", created.message);
        let task_id = created.entity_id.unwrap();

        let moved = study_move_task(task_id.clone(), "inProgress".to_string());
        assert!(moved.ok, "{}", moved.message);
        let bad_column = study_move_task(task_id.clone(), "done".to_string());
        assert!(!bad_column.ok);

        let snapshot = board_snapshot_json();
        assert!(snapshot.ok, "{}", snapshot.message);
        let data: StudyData = serde_json::from_str(&snapshot.json).unwrap();
        assert!(data.tasks.in_progress.iter().any(|task| task.id == task_id));

        assert_eq!(study_delete_task(task_id.clone()).entity_id, Some(task_id));
        assert!(study_remove_subject(subject).ok);
    }

    #[test]
    fn create_task_reports_validation_errors() {
        let response = study_create_task(
            "HW".to_string(),
            unique_token("Undeclared"),
            "2025-01-10".to_string(),
            None,
            None,
            None,
            None,
        );
        assert!(!response.ok);
        assert!(response.message.contains("subject"));

        let bad_date = study_create_task(
            "HW".to_string(),
            "Math".to_string(),
            "10/01/2025".to_string(),
            None,
            None,
            None,
            None,
        );
        assert!(!bad_date.ok);
        assert!(bad_date.message.contains("due date"));

        let bad_priority = study_create_task(
            "HW".to_string(),
            "Math".to_string(),
            "2025-01-10".to_string(),
            None,
            Some("critical".to_string()),
            None,
            None,
        );
        assert!(!bad_priority.ok);
        assert!(bad_priority.message.contains("priority"));
    }

    #[test]
    fn resources_are_searchable_by_tag() {
        let subject = unique_token("Library");
        let tag = unique_token("tag");
        assert!(study_add_subject(subject.clone()).ok);

        let created = study_create_resource(
            "https://a.example".to_string(),
            "Notes".to_string(),
            subject.clone(),
            None,
            vec![tag.clone()],
        );
        assert!(created.ok, "{}", created.message);
        let resource_id = created.entity_id.unwrap();

        let hits = study_search_resources(tag.to_uppercase(), Some(subject.clone()));
        assert_eq!(hits.items.len(), 1);
        assert_eq!(hits.items[0].id, resource_id);

        assert!(study_delete_resource(resource_id).ok);
        assert!(study_search_resources(tag, None).items.is_empty());
        assert!(study_remove_subject(subject).ok);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("{prefix}{nanos}")
    }
}
