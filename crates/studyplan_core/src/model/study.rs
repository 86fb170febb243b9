//! Root study document.
//!
//! # Responsibility
//! - Define `StudyData`, the single persisted aggregate.
//! - Provide bucket lookup/removal helpers used by store mutators.
//! - Repair documents loaded from older or hand-edited blobs.
//!
//! # Invariants
//! - A task id appears in exactly one status bucket.
//! - A task sits in the bucket named by its own `status`.
//! - Every task/resource subject is declared in `user_profile.subjects`.

use super::resource::Resource;
use super::task::{StudyTask, TaskStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

const DEFAULT_SUBJECTS: &[&str] = &[
    "Computer Science",
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "History",
    "Literature",
    "Languages",
];

/// Suggested subjects offered on first run.
pub fn default_subjects() -> &'static [&'static str] {
    DEFAULT_SUBJECTS
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Declared subjects in user order, unique.
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl UserProfile {
    pub fn has_subject(&self, subject: &str) -> bool {
        self.subjects.iter().any(|value| value == subject)
    }
}

/// The four kanban columns. One field per status so a missing bucket
/// cannot be represented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBuckets {
    #[serde(default)]
    pub to_study: Vec<StudyTask>,
    #[serde(default)]
    pub in_progress: Vec<StudyTask>,
    #[serde(default)]
    pub revision: Vec<StudyTask>,
    #[serde(default)]
    pub completed: Vec<StudyTask>,
}

impl TaskBuckets {
    pub fn bucket(&self, status: TaskStatus) -> &[StudyTask] {
        match status {
            TaskStatus::ToStudy => &self.to_study,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Revision => &self.revision,
            TaskStatus::Completed => &self.completed,
        }
    }

    pub fn bucket_mut(&mut self, status: TaskStatus) -> &mut Vec<StudyTask> {
        match status {
            TaskStatus::ToStudy => &mut self.to_study,
            TaskStatus::InProgress => &mut self.in_progress,
            TaskStatus::Revision => &mut self.revision,
            TaskStatus::Completed => &mut self.completed,
        }
    }

    /// Iterates all tasks in column order.
    pub fn iter(&self) -> impl Iterator<Item = &StudyTask> {
        TaskStatus::ALL
            .into_iter()
            .flat_map(move |status| self.bucket(status).iter())
    }

    pub fn len(&self) -> usize {
        TaskStatus::ALL
            .into_iter()
            .map(|status| self.bucket(status).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds a task and the bucket that currently holds it.
    pub fn find(&self, task_id: &str) -> Option<(TaskStatus, &StudyTask)> {
        TaskStatus::ALL.into_iter().find_map(|status| {
            self.bucket(status)
                .iter()
                .find(|task| task.id == task_id)
                .map(|task| (status, task))
        })
    }

    /// Removes every copy of `task_id` from every bucket.
    ///
    /// Returns the first removed copy in column order.
    pub fn remove_everywhere(&mut self, task_id: &str) -> Option<StudyTask> {
        let mut removed = None;
        for status in TaskStatus::ALL {
            let bucket = self.bucket_mut(status);
            while let Some(index) = bucket.iter().position(|task| task.id == task_id) {
                let task = bucket.remove(index);
                removed.get_or_insert(task);
            }
        }
        removed
    }

    /// Appends to the bucket named by `task.status`.
    pub fn insert(&mut self, task: StudyTask) {
        self.bucket_mut(task.status).push(task);
    }

    /// Removes all tasks matching `predicate`; returns how many were removed.
    pub fn retain_not<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&StudyTask) -> bool,
    {
        let mut removed = 0;
        for status in TaskStatus::ALL {
            let bucket = self.bucket_mut(status);
            let before = bucket.len();
            bucket.retain(|task| !predicate(task));
            removed += before - bucket.len();
        }
        removed
    }
}

/// Root aggregate persisted as one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyData {
    #[serde(default)]
    pub user_profile: UserProfile,
    #[serde(default)]
    pub tasks: TaskBuckets,
    /// Resource buckets keyed by subject.
    #[serde(default)]
    pub resources: BTreeMap<String, Vec<Resource>>,
}

/// Counters describing what `StudyData::repair` changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub rebucketed_tasks: usize,
    pub duplicate_tasks: usize,
    pub rebucketed_resources: usize,
    pub duplicate_resources: usize,
    pub adopted_subjects: usize,
    pub duplicate_subjects: usize,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl StudyData {
    pub fn find_resource(&self, resource_id: &str) -> Option<&Resource> {
        self.resources
            .values()
            .flat_map(|bucket| bucket.iter())
            .find(|resource| resource.id == resource_id)
    }

    /// Resources for one subject; empty when the bucket is absent.
    pub fn resources_for(&self, subject: &str) -> &[Resource] {
        self.resources
            .get(subject)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn all_resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values().flat_map(|bucket| bucket.iter())
    }

    /// Restores document invariants without discarding user data.
    ///
    /// A document that already satisfies every invariant is left untouched.
    pub fn repair(&mut self) -> RepairReport {
        let mut report = RepairReport::default();

        let mut seen_subjects = HashSet::new();
        let before = self.user_profile.subjects.len();
        self.user_profile
            .subjects
            .retain(|subject| seen_subjects.insert(subject.clone()));
        report.duplicate_subjects = before - self.user_profile.subjects.len();

        let mut seen_tasks = HashSet::new();
        let mut repaired = TaskBuckets::default();
        for status in TaskStatus::ALL {
            for task in std::mem::take(self.tasks.bucket_mut(status)) {
                if !seen_tasks.insert(task.id.clone()) {
                    report.duplicate_tasks += 1;
                    continue;
                }
                if task.status != status {
                    report.rebucketed_tasks += 1;
                }
                repaired.insert(task);
            }
        }
        self.tasks = repaired;

        let mut seen_resources = HashSet::new();
        let mut moved = Vec::new();
        for (subject, bucket) in self.resources.iter_mut() {
            let mut kept = Vec::with_capacity(bucket.len());
            for resource in std::mem::take(bucket) {
                if !seen_resources.insert(resource.id.clone()) {
                    report.duplicate_resources += 1;
                } else if &resource.subject != subject {
                    report.rebucketed_resources += 1;
                    moved.push(resource);
                } else {
                    kept.push(resource);
                }
            }
            *bucket = kept;
        }
        for resource in moved {
            self.resources
                .entry(resource.subject.clone())
                .or_default()
                .push(resource);
        }

        let referenced = self
            .tasks
            .iter()
            .map(|task| task.subject.clone())
            .chain(self.all_resources().map(|resource| resource.subject.clone()))
            .collect::<Vec<_>>();
        for subject in referenced {
            if !self.user_profile.has_subject(&subject) {
                self.user_profile.subjects.push(subject);
                report.adopted_subjects += 1;
            }
        }

        report
    }
}
