//! Study data store: the mutation and query API over `StudyData`.
//!
//! # Responsibility
//! - Own the in-memory study document for one session.
//! - Validate, apply and persist every mutation as a full snapshot.
//! - Generate ids and timestamps; enforce column membership and subject
//!   references, including cascade delete on subject removal.
//!
//! # Invariants
//! - Rejected mutations leave the document untouched, including time still
//!   owed by dropped timers.
//! - `update_task` removes the id from every bucket before re-inserting it.
//! - `updated_at` strictly increases on every task mutation and never
//!   precedes `created_at`.
//! - Every task/resource subject is declared in the profile.

use crate::clock::SharedClock;
use crate::model::resource::{NewResource, Resource};
use crate::model::study::StudyData;
use crate::model::task::{NewTask, StudyTask, SubTask, TaskStatus};
use crate::model::text::{collapse_whitespace, normalize_subject, normalize_tags};
use crate::model::{new_entity_id, EntityId, ValidationError};
use crate::repo::blob_repo::BlobRepository;
use crate::service::timer::{PendingTimeLedger, TaskTimer};
use crate::storage::StudyStorage;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error returned by store mutators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Validation(ValidationError),
    TaskNotFound(EntityId),
    SubtaskNotFound {
        task_id: EntityId,
        subtask_id: EntityId,
    },
    ResourceNotFound(EntityId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::SubtaskNotFound {
                task_id,
                subtask_id,
            } => write!(f, "subtask {subtask_id} not found on task {task_id}"),
            Self::ResourceNotFound(id) => write!(f, "resource not found: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of `StudyStore::remove_subject`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubjectRemoval {
    /// Whether the subject was declared before the call.
    pub subject_removed: bool,
    pub tasks_removed: usize,
    pub resources_removed: usize,
}

impl SubjectRemoval {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Session-scoped owner of the study document.
///
/// Construct once per session with `open` and pass by reference to callers;
/// all mutation goes through `&mut self`.
pub struct StudyStore<B: BlobRepository> {
    data: StudyData,
    storage: StudyStorage<B>,
    clock: SharedClock,
    pending_time: PendingTimeLedger,
    last_save_ok: bool,
}

impl<B: BlobRepository> StudyStore<B> {
    /// Loads the persisted document and wraps it in a store.
    pub fn open(repo: B, clock: SharedClock) -> Self {
        Self::with_storage(StudyStorage::new(repo), clock)
    }

    pub fn with_storage(storage: StudyStorage<B>, clock: SharedClock) -> Self {
        let data = storage.load();
        Self {
            data,
            storage,
            clock,
            pending_time: PendingTimeLedger::default(),
            last_save_ok: true,
        }
    }

    /// Read-only snapshot of the current document.
    pub fn data(&self) -> &StudyData {
        &self.data
    }

    pub fn storage(&self) -> &StudyStorage<B> {
        &self.storage
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Whether the most recent snapshot write reached durable storage.
    pub fn last_save_succeeded(&self) -> bool {
        self.last_save_ok
    }

    /// True while no subject has been declared.
    pub fn is_first_run(&self) -> bool {
        self.data.user_profile.subjects.is_empty()
    }

    pub fn subjects(&self) -> &[String] {
        &self.data.user_profile.subjects
    }

    /// Declared subject that `name` refers to, spelled as stored.
    ///
    /// An exact match after trimming wins. Otherwise names are compared with
    /// inner whitespace collapsed, so documents written before names were
    /// normalized stay addressable.
    pub fn resolve_subject(&self, name: &str) -> Option<&str> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }
        let subjects = &self.data.user_profile.subjects;
        subjects
            .iter()
            .find(|declared| declared.trim() == trimmed)
            .or_else(|| {
                let wanted = collapse_whitespace(trimmed);
                subjects
                    .iter()
                    .find(|declared| collapse_whitespace(declared) == wanted)
            })
            .map(String::as_str)
    }

    pub fn find_task(&self, task_id: &str) -> Option<&StudyTask> {
        self.data.tasks.find(task_id).map(|(_, task)| task)
    }

    pub fn find_resource(&self, resource_id: &str) -> Option<&Resource> {
        self.data.find_resource(resource_id)
    }

    /// Creates a task in the bucket named by `input.status` (default `toStudy`).
    pub fn create_task(&mut self, input: NewTask) -> StoreResult<StudyTask> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(self.rejected("task_create", ValidationError::EmptyTitle));
        }
        let subject = match self.declared_subject(&input.subject) {
            Ok(subject) => subject,
            Err(err) => return Err(self.rejected("task_create", err)),
        };
        let Some(due) = input.due else {
            return Err(self.rejected("task_create", ValidationError::MissingDueDate));
        };

        self.apply_pending_time();
        let now = self.clock.now();
        let task = StudyTask {
            id: new_entity_id(),
            title,
            description: input.description.trim().to_string(),
            subject,
            due,
            time_spent: input.time_spent,
            status: input.status.unwrap_or_default(),
            priority: input.priority,
            difficulty: input.difficulty,
            subtasks: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.data.tasks.insert(task.clone());
        self.persist();
        info!(
            "event=task_create module=store status=ok task_id={} column={}",
            task.id, task.status
        );
        Ok(task)
    }

    /// Replaces a task and re-buckets it by `task.status`.
    ///
    /// The stored `created_at` is kept; `updated_at` is always bumped.
    /// Time handed back by dropped timers is credited after the
    /// replacement, so a caller holding an older copy cannot erase it.
    pub fn update_task(&mut self, task: StudyTask) -> StoreResult<StudyTask> {
        let updated = self.replace_task(task, "task_update")?;
        if self.apply_pending_time() == 0 {
            return Ok(updated);
        }
        Ok(self.find_task(&updated.id).cloned().unwrap_or(updated))
    }

    /// Removes a task and its embedded subtasks. No-op when absent.
    pub fn delete_task(&mut self, task_id: &str) -> Option<StudyTask> {
        self.data.tasks.find(task_id)?;
        self.apply_pending_time();
        let removed = self.data.tasks.remove_everywhere(task_id)?;
        self.persist();
        info!(
            "event=task_delete module=store status=ok task_id={} subtasks={}",
            removed.id,
            removed.subtasks.len()
        );
        Some(removed)
    }

    /// Appends a subtask to a task's checklist.
    pub fn add_subtask(&mut self, task_id: &str, title: &str) -> StoreResult<SubTask> {
        let title = title.trim();
        if title.is_empty() {
            return Err(self.rejected("subtask_add", ValidationError::EmptyTitle));
        }
        let mut task = self.task_for_edit(task_id)?;
        let subtask = SubTask {
            id: new_entity_id(),
            title: title.to_string(),
            completed: false,
            created_at: self.clock.now(),
        };
        task.subtasks.push(subtask.clone());
        self.update_task(task)?;
        Ok(subtask)
    }

    /// Flips a subtask's `completed` flag.
    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> StoreResult<StudyTask> {
        let mut task = self.task_for_edit(task_id)?;
        let subtask = task
            .subtasks
            .iter_mut()
            .find(|subtask| subtask.id == subtask_id)
            .ok_or_else(|| subtask_not_found(task_id, subtask_id))?;
        subtask.completed = !subtask.completed;
        self.update_task(task)
    }

    pub fn delete_subtask(&mut self, task_id: &str, subtask_id: &str) -> StoreResult<StudyTask> {
        let mut task = self.task_for_edit(task_id)?;
        let before = task.subtasks.len();
        task.subtasks.retain(|subtask| subtask.id != subtask_id);
        if task.subtasks.len() == before {
            return Err(subtask_not_found(task_id, subtask_id));
        }
        self.update_task(task)
    }

    /// Adds tracked study time to a task. Only ever increases `time_spent`.
    pub fn record_study_time(&mut self, task_id: &str, seconds: u64) -> StoreResult<StudyTask> {
        self.task_for_edit(task_id)?;
        self.apply_pending_time();
        self.add_time_spent(task_id, seconds)
    }

    /// Returns a timer bound to one task and to this store's clock.
    pub fn task_timer(&self, task_id: impl Into<EntityId>) -> TaskTimer {
        TaskTimer::new(task_id, self.clock.clone(), self.pending_time.clone())
    }

    /// Applies time handed back by timers that were dropped while running.
    ///
    /// Returns the number of seconds credited.
    pub fn flush_pending_time(&mut self) -> u64 {
        self.apply_pending_time()
    }

    pub fn create_resource(&mut self, input: NewResource) -> StoreResult<Resource> {
        let url = input.url.trim().to_string();
        if url.is_empty() {
            return Err(self.rejected("resource_create", ValidationError::EmptyUrl));
        }
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(self.rejected("resource_create", ValidationError::EmptyTitle));
        }
        let subject = match self.declared_subject(&input.subject) {
            Ok(subject) => subject,
            Err(err) => return Err(self.rejected("resource_create", err)),
        };

        self.apply_pending_time();
        let resource = Resource {
            id: new_entity_id(),
            url,
            title,
            description: input.description.trim().to_string(),
            subject,
            tags: normalize_tags(&input.tags),
            created_at: self.clock.now(),
        };
        self.data
            .resources
            .entry(resource.subject.clone())
            .or_default()
            .push(resource.clone());
        self.persist();
        info!(
            "event=resource_create module=store status=ok resource_id={} tags={}",
            resource.id,
            resource.tags.len()
        );
        Ok(resource)
    }

    /// Replaces a resource, moving it when its subject changed.
    pub fn update_resource(&mut self, resource: Resource) -> StoreResult<Resource> {
        let Some(existing) = self.data.find_resource(&resource.id).cloned() else {
            return Err(StoreError::ResourceNotFound(resource.id));
        };
        let url = resource.url.trim().to_string();
        if url.is_empty() {
            return Err(self.rejected("resource_update", ValidationError::EmptyUrl));
        }
        let title = resource.title.trim().to_string();
        if title.is_empty() {
            return Err(self.rejected("resource_update", ValidationError::EmptyTitle));
        }
        let subject = match self.declared_subject(&resource.subject) {
            Ok(subject) => subject,
            Err(err) => return Err(self.rejected("resource_update", err)),
        };

        let updated = Resource {
            url,
            title,
            description: resource.description.trim().to_string(),
            subject,
            tags: normalize_tags(&resource.tags),
            created_at: existing.created_at,
            ..resource
        };

        self.apply_pending_time();
        let moved = existing.subject != updated.subject;
        if moved {
            self.remove_resource_everywhere(&updated.id);
            self.data
                .resources
                .entry(updated.subject.clone())
                .or_default()
                .push(updated.clone());
        } else if let Some(slot) = self
            .data
            .resources
            .get_mut(&updated.subject)
            .and_then(|bucket| bucket.iter_mut().find(|item| item.id == updated.id))
        {
            *slot = updated.clone();
        }

        self.persist();
        info!(
            "event=resource_update module=store status=ok resource_id={} moved={}",
            updated.id, moved
        );
        Ok(updated)
    }

    pub fn delete_resource(&mut self, resource_id: &str) -> Option<Resource> {
        self.data.find_resource(resource_id)?;
        self.apply_pending_time();
        let removed = self.remove_resource_everywhere(resource_id)?;
        self.persist();
        info!(
            "event=resource_delete module=store status=ok resource_id={}",
            removed.id
        );
        Some(removed)
    }

    /// Declares a subject and initializes its resource bucket.
    ///
    /// Returns `Ok(false)` when the subject was already declared.
    pub fn add_subject(&mut self, name: &str) -> StoreResult<bool> {
        let Some(subject) = normalize_subject(name) else {
            return Err(self.rejected("subject_add", ValidationError::EmptySubjectName));
        };
        if self.resolve_subject(&subject).is_some() {
            return Ok(false);
        }

        self.apply_pending_time();
        self.data.user_profile.subjects.push(subject.clone());
        self.data.resources.entry(subject).or_default();
        self.persist();
        info!(
            "event=subject_add module=store status=ok subjects={}",
            self.data.user_profile.subjects.len()
        );
        Ok(true)
    }

    /// Removes a subject and every task and resource that references it.
    ///
    /// Destructive and irreversible at this layer; callers that want a
    /// confirmation step must ask before calling. Absent subjects are a no-op.
    pub fn remove_subject(&mut self, name: &str) -> SubjectRemoval {
        let subject = match self.resolve_subject(name) {
            Some(declared) => declared.to_string(),
            None => name.trim().to_string(),
        };
        let declared = self.data.user_profile.has_subject(&subject);
        let referenced = self.data.resources.contains_key(&subject)
            || self.data.tasks.iter().any(|task| task.subject == subject)
            || self.data.all_resources().any(|resource| resource.subject == subject);
        if !declared && !referenced {
            return SubjectRemoval::default();
        }

        self.apply_pending_time();
        let before = self.data.user_profile.subjects.len();
        self.data
            .user_profile
            .subjects
            .retain(|name| name != &subject);

        let removal = SubjectRemoval {
            subject_removed: self.data.user_profile.subjects.len() != before,
            tasks_removed: self.data.tasks.retain_not(|task| task.subject == subject),
            resources_removed: self.remove_resources_for_subject(&subject),
        };

        self.persist();
        info!(
            "event=subject_remove module=store status=ok tasks_removed={} resources_removed={}",
            removal.tasks_removed, removal.resources_removed
        );
        removal
    }

    fn replace_task(&mut self, task: StudyTask, event: &str) -> StoreResult<StudyTask> {
        let Some((_, existing)) = self.data.tasks.find(&task.id) else {
            warn!(
                "event={} module=store status=rejected error_code=task_not_found task_id={}",
                event, task.id
            );
            return Err(StoreError::TaskNotFound(task.id));
        };
        let created_at = existing.created_at;
        let previous_update = existing.updated_at;
        let previous_status = existing.status;

        let title = task.title.trim().to_string();
        if title.is_empty() {
            return Err(self.rejected(event, ValidationError::EmptyTitle));
        }
        let subject = match self.declared_subject(&task.subject) {
            Ok(subject) => subject,
            Err(err) => return Err(self.rejected(event, err)),
        };

        let updated = StudyTask {
            title,
            subject,
            created_at,
            updated_at: self.next_timestamp(created_at.max(previous_update)),
            ..task
        };
        updated.validate()?;

        self.data.tasks.remove_everywhere(&updated.id);
        self.data.tasks.insert(updated.clone());
        self.persist();
        info!(
            "event={} module=store status=ok task_id={} from={} to={}",
            event, updated.id, previous_status, updated.status
        );
        Ok(updated)
    }

    fn add_time_spent(&mut self, task_id: &str, seconds: u64) -> StoreResult<StudyTask> {
        let mut task = self.task_for_edit(task_id)?;
        task.time_spent = task.time_spent.saturating_add(seconds);
        self.replace_task(task, "task_time")
    }

    fn apply_pending_time(&mut self) -> u64 {
        let mut credited = 0;
        for pending in self.pending_time.drain() {
            if pending.seconds == 0 {
                continue;
            }
            match self.add_time_spent(&pending.task_id, pending.seconds) {
                Ok(_) => credited += pending.seconds,
                Err(err) => warn!(
                    "event=timer_flush module=store status=dropped task_id={} seconds={} error={}",
                    pending.task_id, pending.seconds, err
                ),
            }
        }
        credited
    }

    fn task_for_edit(&self, task_id: &str) -> StoreResult<StudyTask> {
        self.find_task(task_id)
            .cloned()
            .ok_or_else(|| StoreError::TaskNotFound(task_id.to_string()))
    }

    fn declared_subject(&self, subject: &str) -> Result<String, ValidationError> {
        self.resolve_subject(subject)
            .map(str::to_string)
            .ok_or_else(|| ValidationError::UnknownSubject(subject.to_string()))
    }

    /// Current time, forced strictly after `previous`.
    fn next_timestamp(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        let now = self.clock.now();
        if now > previous {
            now
        } else {
            previous + ChronoDuration::milliseconds(1)
        }
    }

    fn remove_resource_everywhere(&mut self, resource_id: &str) -> Option<Resource> {
        let mut removed = None;
        for bucket in self.data.resources.values_mut() {
            while let Some(index) = bucket.iter().position(|item| item.id == resource_id) {
                let resource = bucket.remove(index);
                removed.get_or_insert(resource);
            }
        }
        removed
    }

    fn remove_resources_for_subject(&mut self, subject: &str) -> usize {
        let mut removed = self
            .data
            .resources
            .remove(subject)
            .map_or(0, |bucket| bucket.len());
        for bucket in self.data.resources.values_mut() {
            let before = bucket.len();
            bucket.retain(|resource| resource.subject != subject);
            removed += before - bucket.len();
        }
        removed
    }

    fn rejected(&self, event: &str, err: ValidationError) -> StoreError {
        warn!("event={} module=store status=rejected error={}", event, err);
        StoreError::Validation(err)
    }

    fn persist(&mut self) {
        self.last_save_ok = self.storage.save(&self.data);
    }
}

fn subtask_not_found(task_id: &str, subtask_id: &str) -> StoreError {
    StoreError::SubtaskNotFound {
        task_id: task_id.to_string(),
        subtask_id: subtask_id.to_string(),
    }
}

/// Tasks per column, in board order.
pub fn column_counts(data: &StudyData) -> [(TaskStatus, usize); 4] {
    TaskStatus::ALL.map(|status| (status, data.tasks.bucket(status).len()))
}
