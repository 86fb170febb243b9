//! Read-only queries over a study snapshot: search, tags and statistics.

use crate::model::resource::Resource;
use crate::model::study::{StudyData, TaskBuckets};
use crate::model::task::{Priority, StudyTask, TaskStatus};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Filter for board searches. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive substring of title or description.
    pub text: String,
    /// Exact subject name.
    pub subject: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &StudyTask) -> bool {
        let needle = self.text.trim().to_lowercase();
        let text_ok = needle.is_empty()
            || task.title.to_lowercase().contains(&needle)
            || task.description.to_lowercase().contains(&needle);
        let subject_ok = self
            .subject
            .as_deref()
            .map_or(true, |subject| task.subject == subject);
        text_ok && subject_ok
    }
}

/// Returns a filtered copy of the board that keeps column membership.
pub fn search_tasks(data: &StudyData, filter: &TaskFilter) -> TaskBuckets {
    let mut filtered = TaskBuckets::default();
    for status in TaskStatus::ALL {
        filtered.bucket_mut(status).extend(
            data.tasks
                .bucket(status)
                .iter()
                .filter(|task| filter.matches(task))
                .cloned(),
        );
    }
    filtered
}

/// Resources matching `query`, optionally restricted to one subject.
pub fn search_resources<'a>(
    data: &'a StudyData,
    query: &str,
    subject: Option<&str>,
) -> Vec<&'a Resource> {
    let candidates: Box<dyn Iterator<Item = &'a Resource> + 'a> = match subject {
        Some(subject) => Box::new(data.resources_for(subject).iter()),
        None => Box::new(data.all_resources()),
    };
    candidates
        .filter(|resource| resource.matches_query(query))
        .collect()
}

/// Distinct tags across the library, sorted.
pub fn all_tags(data: &StudyData) -> Vec<String> {
    data.all_resources()
        .flat_map(|resource| resource.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectProgress {
    pub subject: String,
    pub total: usize,
    pub completed: usize,
    pub time_spent: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityBreakdown {
    pub priority: Priority,
    pub total: usize,
    pub completed: usize,
}

/// Aggregate numbers for dashboard and analytics views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyStats {
    pub total_tasks: usize,
    pub completed: usize,
    pub in_progress: usize,
    /// Sum of `time_spent` across all tasks, in seconds.
    pub total_time_spent: u64,
    /// `time_spent` of tasks last touched on `today` (UTC date).
    pub today_time_spent: u64,
    /// Mean seconds per completed task; zero when none are completed.
    pub average_time_per_completed: u64,
    /// One entry per declared subject, in profile order.
    pub subjects: Vec<SubjectProgress>,
    pub priorities: Vec<PriorityBreakdown>,
}

impl StudyStats {
    /// Completed share of all tasks in percent, rounded down.
    pub fn completion_percent(&self) -> u8 {
        if self.total_tasks == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total_tasks) as u8
    }
}

pub fn study_stats(data: &StudyData, today: NaiveDate) -> StudyStats {
    let tasks = data.tasks.iter().collect::<Vec<_>>();
    let total_time_spent = tasks.iter().map(|task| task.time_spent).sum::<u64>();
    let today_time_spent = tasks
        .iter()
        .filter(|task| task.updated_at.date_naive() == today)
        .map(|task| task.time_spent)
        .sum();
    let completed = data.tasks.completed.len();

    let subjects = data
        .user_profile
        .subjects
        .iter()
        .map(|subject| {
            let scoped = tasks
                .iter()
                .filter(|task| &task.subject == subject)
                .collect::<Vec<_>>();
            SubjectProgress {
                subject: subject.clone(),
                total: scoped.len(),
                completed: scoped
                    .iter()
                    .filter(|task| task.status == TaskStatus::Completed)
                    .count(),
                time_spent: scoped.iter().map(|task| task.time_spent).sum(),
            }
        })
        .collect();

    let priorities = Priority::ALL
        .into_iter()
        .map(|priority| PriorityBreakdown {
            priority,
            total: tasks.iter().filter(|task| task.priority == priority).count(),
            completed: tasks
                .iter()
                .filter(|task| task.priority == priority && task.status == TaskStatus::Completed)
                .count(),
        })
        .collect();

    StudyStats {
        total_tasks: tasks.len(),
        completed,
        in_progress: data.tasks.in_progress.len(),
        total_time_spent,
        today_time_spent,
        average_time_per_completed: if completed == 0 {
            0
        } else {
            total_time_spent / completed as u64
        },
        subjects,
        priorities,
    }
}

#[cfg(test)]
mod tests {
    use super::{all_tags, search_resources, search_tasks, study_stats, TaskFilter};
    use crate::clock::ManualClock;
    use crate::model::resource::NewResource;
    use crate::model::task::{NewTask, Priority, TaskStatus};
    use crate::repo::blob_repo::MemoryBlobRepository;
    use crate::service::study_store::StudyStore;
    use chrono::NaiveDate;

    fn seeded() -> StudyStore<MemoryBlobRepository> {
        let clock = ManualClock::default();
        let mut store = StudyStore::open(MemoryBlobRepository::new(), clock.shared());
        store.add_subject("Math").unwrap();
        store.add_subject("Physics").unwrap();
        let due = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        let done = store
            .create_task(
                NewTask::new("Algebra drills", "Math", due)
                    .with_status(TaskStatus::Completed)
                    .with_priority(Priority::High),
            )
            .unwrap();
        store.record_study_time(&done.id, 600).unwrap();
        let lab = store
            .create_task(
                NewTask::new("Optics lab", "Physics", due).with_status(TaskStatus::InProgress),
            )
            .unwrap();
        store.record_study_time(&lab.id, 300).unwrap();
        store
            .create_resource(
                NewResource::new("https://a.example", "Lens notes", "Physics")
                    .with_tags(["optics", "Lab"]),
            )
            .unwrap();
        store
            .create_resource(NewResource::new("https://b.example", "Matrices", "Math"))
            .unwrap();
        store
    }

    #[test]
    fn task_search_keeps_columns_and_filters_subject() {
        let store = seeded();
        let filter = TaskFilter {
            text: "LAB".to_string(),
            subject: None,
        };
        let hits = search_tasks(store.data(), &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.in_progress[0].title, "Optics lab");

        let math_only = TaskFilter {
            text: String::new(),
            subject: Some("Math".to_string()),
        };
        assert_eq!(search_tasks(store.data(), &math_only).completed.len(), 1);
    }

    #[test]
    fn resource_search_and_tags() {
        let store = seeded();
        assert_eq!(search_resources(store.data(), "lab", None).len(), 1);
        assert!(search_resources(store.data(), "lens", Some("Math")).is_empty());
        assert_eq!(search_resources(store.data(), "", None).len(), 2);
        assert_eq!(all_tags(store.data()), vec!["Lab".to_string(), "optics".to_string()]);
    }

    #[test]
    fn stats_aggregate_time_and_progress() {
        let store = seeded();
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let stats = study_stats(store.data(), today);

        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.total_time_spent, 900);
        assert_eq!(stats.today_time_spent, 900);
        assert_eq!(stats.average_time_per_completed, 900);
        assert_eq!(stats.completion_percent(), 50);
        assert_eq!(stats.subjects[0].subject, "Math");
        assert_eq!(stats.subjects[0].time_spent, 600);
        let high = stats
            .priorities
            .iter()
            .find(|entry| entry.priority == Priority::High)
            .unwrap();
        assert_eq!((high.total, high.completed), (1, 1));
    }
}
