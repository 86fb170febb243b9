//! Storage adapter for the study document.
//!
//! # Responsibility
//! - Load the single study snapshot from its durable slot.
//! - Persist full snapshots, swallowing and logging write failures.
//! - Merge partially-shaped documents against defaults on load.
//!
//! # Invariants
//! - `load` never fails: absent or malformed blobs yield `StudyData::default()`.
//! - `save` never panics or returns an error to the caller.
//! - A valid document survives `save` then `load` unchanged.

use crate::model::resource::Resource;
use crate::model::study::{StudyData, TaskBuckets, UserProfile};
use crate::model::task::{StudyTask, TaskStatus};
use crate::repo::blob_repo::{BlobRepository, RepoError};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Well-known slot key for the study document.
pub const STUDY_DATA_KEY: &str = "study_planner_data";

/// Persistence failure, recovered locally by the adapter.
#[derive(Debug)]
pub enum StorageError {
    Repo(RepoError),
    Encode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode study data: {err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<RepoError> for StorageError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Reads and writes the study document through a blob slot.
pub struct StudyStorage<B: BlobRepository> {
    repo: B,
    key: String,
}

impl<B: BlobRepository> StudyStorage<B> {
    /// Creates an adapter bound to the default study slot key.
    pub fn new(repo: B) -> Self {
        Self::with_key(repo, STUDY_DATA_KEY)
    }

    pub fn with_key(repo: B, key: impl Into<String>) -> Self {
        Self {
            repo,
            key: key.into(),
        }
    }

    pub fn repo(&self) -> &B {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut B {
        &mut self.repo
    }

    /// Loads the persisted document, defaulting anything missing or broken.
    pub fn load(&self) -> StudyData {
        let raw = match self.repo.read_blob(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("event=study_load module=storage status=empty");
                return StudyData::default();
            }
            Err(err) => {
                error!(
                    "event=study_load module=storage status=error error_code=read_failed error={}",
                    err
                );
                return StudyData::default();
            }
        };

        let mut data = match decode_study_data(&raw) {
            Some(data) => data,
            None => {
                warn!(
                    "event=study_load module=storage status=fallback error_code=malformed_blob bytes={}",
                    raw.len()
                );
                return StudyData::default();
            }
        };

        let report = data.repair();
        if !report.is_clean() {
            warn!(
                "event=study_repair module=storage status=ok rebucketed_tasks={} duplicate_tasks={} rebucketed_resources={} duplicate_resources={} adopted_subjects={} duplicate_subjects={}",
                report.rebucketed_tasks,
                report.duplicate_tasks,
                report.rebucketed_resources,
                report.duplicate_resources,
                report.adopted_subjects,
                report.duplicate_subjects
            );
        }
        info!(
            "event=study_load module=storage status=ok subjects={} tasks={} resources={}",
            data.user_profile.subjects.len(),
            data.tasks.len(),
            data.all_resources().count()
        );
        data
    }

    /// Persists a full snapshot.
    ///
    /// Returns whether the snapshot reached durable storage. Failures are
    /// logged and otherwise ignored; the caller's in-memory data stays
    /// authoritative.
    pub fn save(&mut self, data: &StudyData) -> bool {
        let started_at = Instant::now();
        match self.try_save(data) {
            Ok(bytes) => {
                info!(
                    "event=study_save module=storage status=ok bytes={} duration_ms={}",
                    bytes,
                    started_at.elapsed().as_millis()
                );
                true
            }
            Err(err) => {
                error!(
                    "event=study_save module=storage status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                false
            }
        }
    }

    /// Persists a snapshot and surfaces the failure instead of logging it.
    pub fn try_save(&mut self, data: &StudyData) -> Result<usize, StorageError> {
        let encoded = serde_json::to_string(data)?;
        self.repo.write_blob(&self.key, &encoded)?;
        Ok(encoded.len())
    }

    /// True iff the persisted profile declares no subjects.
    pub fn is_first_run(&self) -> bool {
        self.load().user_profile.subjects.is_empty()
    }
}

/// Decodes a study document field by field.
///
/// Returns `None` only when the blob is not a JSON object. Individual tasks
/// or resources that fail to decode are skipped.
fn decode_study_data(raw: &str) -> Option<StudyData> {
    let root = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(root)) => root,
        _ => return None,
    };

    let user_profile = root
        .get("userProfile")
        .and_then(|value| decode_lenient::<UserProfile>(value, "userProfile"))
        .unwrap_or_default();

    let mut tasks = TaskBuckets::default();
    if let Some(Value::Object(buckets)) = root.get("tasks") {
        for status in TaskStatus::ALL {
            if let Some(Value::Array(items)) = buckets.get(status.as_str()) {
                let bucket = tasks.bucket_mut(status);
                bucket.extend(
                    items
                        .iter()
                        .filter_map(|item| decode_lenient::<StudyTask>(item, status.as_str())),
                );
            }
        }
    }

    let resources = root
        .get("resources")
        .and_then(Value::as_object)
        .map(decode_resource_buckets)
        .unwrap_or_default();

    Some(StudyData {
        user_profile,
        tasks,
        resources,
    })
}

fn decode_resource_buckets(buckets: &Map<String, Value>) -> BTreeMap<String, Vec<Resource>> {
    buckets
        .iter()
        .map(|(subject, items)| {
            let decoded = items
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| decode_lenient::<Resource>(item, "resources"))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            (subject.clone(), decoded)
        })
        .collect()
}

fn decode_lenient<T: DeserializeOwned>(value: &Value, section: &str) -> Option<T> {
    match T::deserialize(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(
                "event=study_load module=storage status=skipped section={} error={}",
                section, err
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_study_data, StudyStorage, STUDY_DATA_KEY};
    use crate::repo::blob_repo::MemoryBlobRepository;

    #[test]
    fn non_object_blob_is_malformed() {
        assert!(decode_study_data("[1,2,3]").is_none());
        assert!(decode_study_data("{not json").is_none());
        assert!(decode_study_data("{}").is_some());
    }

    #[test]
    fn broken_task_is_skipped_without_losing_siblings() {
        let raw = r#"{
            "userProfile": {"subjects": ["Math"]},
            "tasks": {
                "toStudy": [
                    {"id": "bad", "title": "no due date", "subject": "Math", "status": "toStudy"},
                    {"id": "ok", "title": "HW1", "subject": "Math", "due": "2025-01-10",
                     "status": "toStudy", "createdAt": "2025-01-01T00:00:00Z",
                     "updatedAt": "2025-01-01T00:00:00Z"}
                ]
            }
        }"#;
        let storage = StudyStorage::new(MemoryBlobRepository::new().with_slot(STUDY_DATA_KEY, raw));

        let data = storage.load();
        assert_eq!(data.tasks.to_study.len(), 1);
        assert_eq!(data.tasks.to_study[0].id, "ok");
        assert!(data.resources.is_empty());
    }
}
