//! Injected study-suggestion capability.
//!
//! # Responsibility
//! - Define the provider contract: request in, suggestion list out, may fail.
//! - Keep a registry of providers with one active selection.
//! - Apply accepted suggestions through ordinary store mutators.
//!
//! # Invariants
//! - Suggestions receive no special treatment: the same validation as
//!   `create_task`/`add_subtask` applies.
//! - Applying a batch is all-or-nothing: every item is checked before the
//!   first mutation.
//! - Core code assumes nothing about provider latency; callers decide where
//!   to run `suggest` and whether to retry.

use crate::model::task::{Difficulty, NewTask, Priority, StudyTask, SubTask};
use crate::model::ValidationError;
use crate::repo::blob_repo::BlobRepository;
use crate::service::study_store::{StoreError, StoreResult, StudyStore};
use chrono::{Days, NaiveDate};
use log::info;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// What the caller wants suggestions for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionRequest {
    /// Split one task into checklist steps.
    Breakdown {
        task_title: String,
        subject: String,
        prompt: Option<String>,
    },
    /// Turn a free-form goal into a handful of tasks.
    Plan {
        prompt: String,
        subjects: Vec<String>,
    },
}

/// One suggested task or subtask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSuggestion {
    pub title: String,
    pub description: String,
    /// Target subject for plan suggestions; `None` uses the caller default.
    pub subject: Option<String>,
    pub priority: Priority,
    pub difficulty: Difficulty,
    pub estimated_minutes: Option<u32>,
    /// Days from the plan start date until the task is due.
    pub estimated_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionError {
    /// Provider could not produce suggestions right now.
    Unavailable(String),
    /// Request lacks the context the provider needs.
    InvalidRequest(String),
}

impl Display for SuggestionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "suggestions unavailable: {reason}"),
            Self::InvalidRequest(reason) => write!(f, "invalid suggestion request: {reason}"),
        }
    }
}

impl Error for SuggestionError {}

/// Suggestion backend contract.
pub trait SuggestionProvider: Send + Sync {
    fn provider_id(&self) -> &str;
    fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<TaskSuggestion>, SuggestionError>;
}

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionRegistryError {
    InvalidProviderId(String),
    DuplicateProviderId(String),
    ProviderNotFound(String),
}

impl Display for SuggestionRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidProviderId(id) => write!(f, "suggestion provider id is invalid: {id}"),
            Self::DuplicateProviderId(id) => {
                write!(f, "suggestion provider already registered: {id}")
            }
            Self::ProviderNotFound(id) => write!(f, "suggestion provider not found: {id}"),
        }
    }
}

impl Error for SuggestionRegistryError {}

/// Registered providers with one optional active selection.
#[derive(Default)]
pub struct SuggestionRegistry {
    providers: BTreeMap<String, Arc<dyn SuggestionProvider>>,
    active: Option<String>,
}

impl SuggestionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider. The first registration becomes active.
    pub fn register(
        &mut self,
        provider: Arc<dyn SuggestionProvider>,
    ) -> Result<(), SuggestionRegistryError> {
        let id = provider.provider_id().trim().to_string();
        if id.is_empty() {
            return Err(SuggestionRegistryError::InvalidProviderId(id));
        }
        if self.providers.contains_key(&id) {
            return Err(SuggestionRegistryError::DuplicateProviderId(id));
        }
        if self.active.is_none() {
            self.active = Some(id.clone());
        }
        self.providers.insert(id, provider);
        Ok(())
    }

    pub fn select_active(&mut self, provider_id: &str) -> Result<(), SuggestionRegistryError> {
        let id = provider_id.trim();
        if !self.providers.contains_key(id) {
            return Err(SuggestionRegistryError::ProviderNotFound(id.to_string()));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    pub fn provider_ids(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn active_provider(&self) -> Option<Arc<dyn SuggestionProvider>> {
        let id = self.active.as_deref()?;
        self.providers.get(id).cloned()
    }

    /// Asks the active provider; fails with `Unavailable` when none is set.
    pub fn suggest(
        &self,
        request: &SuggestionRequest,
    ) -> Result<Vec<TaskSuggestion>, SuggestionError> {
        let provider = self
            .active_provider()
            .ok_or_else(|| SuggestionError::Unavailable("no active provider".to_string()))?;
        provider.suggest(request)
    }
}

/// Offline provider returning fixed study templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSuggestionProvider;

impl SuggestionProvider for TemplateSuggestionProvider {
    fn provider_id(&self) -> &str {
        "template"
    }

    fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<TaskSuggestion>, SuggestionError> {
        match request {
            SuggestionRequest::Breakdown {
                task_title,
                subject,
                ..
            } => {
                if task_title.trim().is_empty() {
                    return Err(SuggestionError::InvalidRequest(
                        "task title is blank".to_string(),
                    ));
                }
                Ok(vec![
                    step(
                        format!("Research fundamentals of {subject}"),
                        format!("Gather basic information and key concepts for {task_title}"),
                        30,
                        Difficulty::Easy,
                    ),
                    step(
                        "Create outline and structure".to_string(),
                        "Organize main points and create a logical flow".to_string(),
                        20,
                        Difficulty::Medium,
                    ),
                    step(
                        "Deep dive into core concepts".to_string(),
                        "Study the most important aspects in detail".to_string(),
                        45,
                        Difficulty::Hard,
                    ),
                    step(
                        "Practice exercises and examples".to_string(),
                        "Apply knowledge through practical exercises".to_string(),
                        60,
                        Difficulty::Medium,
                    ),
                    step(
                        "Review and summarize".to_string(),
                        "Create summary notes and identify key takeaways".to_string(),
                        25,
                        Difficulty::Easy,
                    ),
                ])
            }
            SuggestionRequest::Plan { prompt, subjects } => {
                let topic = prompt.trim();
                if topic.is_empty() {
                    return Err(SuggestionError::InvalidRequest("prompt is blank".to_string()));
                }
                let subject = subjects.first().cloned();
                Ok(vec![
                    plan_item(
                        format!("Study {topic}"),
                        format!("Complete comprehensive study session on {topic} topics"),
                        subject.clone(),
                        Priority::Medium,
                        Difficulty::Medium,
                        2,
                    ),
                    plan_item(
                        format!("Practice exercises for {topic}"),
                        "Work through practice problems and examples".to_string(),
                        subject.clone(),
                        Priority::High,
                        Difficulty::Hard,
                        1,
                    ),
                    plan_item(
                        format!("Review {topic} concepts"),
                        "Review and consolidate understanding".to_string(),
                        subject,
                        Priority::Low,
                        Difficulty::Easy,
                        1,
                    ),
                ])
            }
        }
    }
}

fn step(title: String, description: String, minutes: u32, difficulty: Difficulty) -> TaskSuggestion {
    TaskSuggestion {
        title,
        description,
        subject: None,
        priority: Priority::Medium,
        difficulty,
        estimated_minutes: Some(minutes),
        estimated_days: None,
    }
}

fn plan_item(
    title: String,
    description: String,
    subject: Option<String>,
    priority: Priority,
    difficulty: Difficulty,
    days: u32,
) -> TaskSuggestion {
    TaskSuggestion {
        title,
        description,
        subject,
        priority,
        difficulty,
        estimated_minutes: None,
        estimated_days: Some(days),
    }
}

/// Adds accepted breakdown steps to a task's checklist.
///
/// Returns the created subtasks in order.
pub fn apply_breakdown<B: BlobRepository>(
    store: &mut StudyStore<B>,
    task_id: &str,
    accepted: &[TaskSuggestion],
) -> StoreResult<Vec<SubTask>> {
    if store.find_task(task_id).is_none() {
        return Err(StoreError::TaskNotFound(task_id.to_string()));
    }
    if accepted.iter().any(|item| item.title.trim().is_empty()) {
        return Err(ValidationError::EmptyTitle.into());
    }

    let mut created = Vec::with_capacity(accepted.len());
    for item in accepted {
        created.push(store.add_subtask(task_id, &item.title)?);
    }
    info!(
        "event=suggestion_apply module=suggestion status=ok kind=breakdown task_id={} count={}",
        task_id,
        created.len()
    );
    Ok(created)
}

/// Creates tasks from accepted plan suggestions.
///
/// Each task is due `estimated_days` after `start` (same day when unset) and
/// lands in `toStudy`.
pub fn create_suggested_tasks<B: BlobRepository>(
    store: &mut StudyStore<B>,
    accepted: &[TaskSuggestion],
    default_subject: &str,
    start: NaiveDate,
) -> StoreResult<Vec<StudyTask>> {
    let mut inputs = Vec::with_capacity(accepted.len());
    for item in accepted {
        if item.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        let subject = item.subject.as_deref().unwrap_or(default_subject);
        if store.resolve_subject(subject).is_none() {
            return Err(ValidationError::UnknownSubject(subject.to_string()).into());
        }
        let due = start
            .checked_add_days(Days::new(u64::from(item.estimated_days.unwrap_or(0))))
            .ok_or(ValidationError::MissingDueDate)?;
        inputs.push(
            NewTask::new(item.title.clone(), subject, due)
                .with_description(item.description.clone())
                .with_priority(item.priority)
                .with_difficulty(item.difficulty),
        );
    }

    let mut created = Vec::with_capacity(inputs.len());
    for input in inputs {
        created.push(store.create_task(input)?);
    }
    info!(
        "event=suggestion_apply module=suggestion status=ok kind=plan count={}",
        created.len()
    );
    Ok(created)
}
