use chrono::{DateTime, NaiveDate, Utc};
use proptest::prelude::*;
use proptest::sample::Index;
use studyplan_core::db::{open_db, open_db_in_memory};
use studyplan_core::repo::blob_repo::RepoResult;
use studyplan_core::{
    BlobRepository, Difficulty, ManualClock, MemoryBlobRepository, NewResource, NewTask,
    Priority, RepoError, Resource, SqliteBlobRepository, StudyData, StudyStorage, StudyStore,
    StudyTask, SubTask, TaskStatus, STUDY_DATA_KEY,
};

/// Slot that refuses every write, like a full or read-only disk.
struct FullDisk;

impl BlobRepository for FullDisk {
    fn read_blob(&self, _key: &str) -> RepoResult<Option<String>> {
        Ok(None)
    }

    fn write_blob(&mut self, _key: &str, _value: &str) -> RepoResult<()> {
        Err(RepoError::Rejected("quota exceeded".to_string()))
    }

    fn remove_blob(&mut self, _key: &str) -> RepoResult<bool> {
        Ok(false)
    }
}

fn populated_store<B: BlobRepository>(repo: B, clock: &ManualClock) -> StudyStore<B> {
    let mut store = StudyStore::open(repo, clock.shared());
    store.add_subject("Math").unwrap();
    store.add_subject("Physics").unwrap();
    let task = store
        .create_task(
            NewTask::new("HW1", "Math", NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
                .with_priority(Priority::Urgent)
                .with_status(TaskStatus::InProgress),
        )
        .unwrap();
    store.add_subtask(&task.id, "Read chapter").unwrap();
    store
        .create_resource(
            NewResource::new("https://a.example", "Notes", "Physics").with_tags(["waves"]),
        )
        .unwrap();
    store
}

#[test]
fn sqlite_file_round_trip_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.db");
    let clock = ManualClock::default();

    let saved = {
        let store = populated_store(SqliteBlobRepository::new(open_db(&path).unwrap()), &clock);
        assert!(store.last_save_succeeded());
        store.data().clone()
    };

    let reopened = StudyStore::open(
        SqliteBlobRepository::new(open_db(&path).unwrap()),
        clock.shared(),
    );
    assert_eq!(reopened.data(), &saved);
    assert!(!reopened.is_first_run());
}

#[test]
fn rejected_writes_are_swallowed_and_memory_stays_authoritative() {
    let clock = ManualClock::default();
    let store = populated_store(FullDisk, &clock);

    assert!(!store.last_save_succeeded());
    assert_eq!(store.data().tasks.in_progress.len(), 1);
    assert_eq!(store.data().all_resources().count(), 1);
}

#[test]
fn try_save_surfaces_the_underlying_error() {
    let mut storage = StudyStorage::new(FullDisk);
    let err = storage.try_save(&StudyData::default()).unwrap_err();
    assert!(err.to_string().contains("quota exceeded"));
}

#[test]
fn malformed_blob_loads_as_default() {
    let storage = StudyStorage::new(
        MemoryBlobRepository::new().with_slot(STUDY_DATA_KEY, "{\"tasks\": ["),
    );
    assert_eq!(storage.load(), StudyData::default());
    assert!(storage.is_first_run());
}

#[test]
fn partial_document_is_merged_with_defaults() {
    let raw = r#"{"userProfile": {"subjects": ["Math"]}}"#;
    let storage = StudyStorage::new(MemoryBlobRepository::new().with_slot(STUDY_DATA_KEY, raw));

    let data = storage.load();
    assert_eq!(data.user_profile.subjects, vec!["Math".to_string()]);
    assert!(data.tasks.is_empty());
    assert!(data.resources.is_empty());
}

#[test]
fn misfiled_tasks_and_orphan_subjects_are_repaired_on_load() {
    let raw = r#"{
        "userProfile": {"subjects": ["Math"]},
        "tasks": {
            "toStudy": [
                {"id": "t1", "title": "HW1", "subject": "Math", "due": "2025-01-10",
                 "status": "completed", "createdAt": "2025-01-01T00:00:00Z",
                 "updatedAt": "2025-01-01T00:00:00Z"},
                {"id": "t2", "title": "Lab", "subject": "Physics", "due": "2025-01-11",
                 "status": "toStudy", "createdAt": "2025-01-01T00:00:00Z",
                 "updatedAt": "2025-01-01T00:00:00Z"}
            ],
            "completed": [
                {"id": "t1", "title": "dup", "subject": "Math", "due": "2025-01-10",
                 "status": "completed", "createdAt": "2025-01-01T00:00:00Z",
                 "updatedAt": "2025-01-01T00:00:00Z"}
            ]
        }
    }"#;
    let storage = StudyStorage::new(MemoryBlobRepository::new().with_slot(STUDY_DATA_KEY, raw));

    let data = storage.load();
    assert_eq!(data.tasks.len(), 2);
    assert_eq!(data.tasks.completed.len(), 1);
    assert_eq!(data.tasks.completed[0].title, "HW1");
    assert_eq!(data.tasks.to_study[0].id, "t2");
    assert!(data.user_profile.has_subject("Physics"));
}

#[test]
fn wire_format_uses_camel_case_keys() {
    let clock = ManualClock::default();
    let store = populated_store(MemoryBlobRepository::new(), &clock);
    let raw = store
        .storage()
        .repo()
        .read_blob(STUDY_DATA_KEY)
        .unwrap()
        .unwrap();

    for key in ["userProfile", "inProgress", "timeSpent", "createdAt", "updatedAt"] {
        assert!(raw.contains(key), "missing key {key}");
    }
    assert!(raw.contains("\"status\":\"inProgress\""));
    assert!(raw.contains("\"priority\":\"urgent\""));
}

fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, nanos).unwrap()
}

/// Consistent documents built field by field: every status, priority and
/// difficulty, subtasks, tags, and subjects with arbitrary printable text
/// (inner and edge whitespace, non-ASCII).
fn arbitrary_study_data() -> impl Strategy<Value = StudyData> {
    let subjects = prop::collection::btree_set("\\PC{1,10}", 1..4);
    let tasks = prop::collection::vec(
        (
            ("\\PC{1,16}", "\\PC{0,24}", any::<Index>(), 0usize..4),
            (any::<u64>(), 0usize..4, 0usize..3, 0i32..50_000),
            (0i64..4_000_000_000, 0i64..1_000_000, 0u32..1_000_000_000),
            prop::collection::vec(("\\PC{1,12}", any::<bool>()), 0..3),
        ),
        0..8,
    );
    let resources = prop::collection::vec(
        (
            any::<Index>(),
            ("\\PC{1,20}", "\\PC{1,16}", "\\PC{0,24}"),
            prop::collection::btree_set("\\PC{1,8}", 0..4),
            (0i64..4_000_000_000, 0u32..1_000_000_000),
        ),
        0..6,
    );

    (subjects, tasks, resources).prop_map(|(subjects, tasks, resources)| {
        let subjects = subjects.into_iter().collect::<Vec<String>>();
        let mut data = StudyData::default();
        for subject in &subjects {
            data.resources.insert(subject.clone(), Vec::new());
        }
        data.user_profile.subjects = subjects.clone();

        for (i, (head, meta, (created, age, nanos), subtasks)) in tasks.into_iter().enumerate() {
            let (title, description, subject, status) = head;
            let (time_spent, priority, difficulty, day) = meta;
            let created_at = at(created, nanos);
            let subtasks = subtasks
                .into_iter()
                .enumerate()
                .map(|(j, (title, completed))| SubTask {
                    id: format!("t{i}-s{j}"),
                    title,
                    completed,
                    created_at,
                })
                .collect();
            data.tasks.insert(StudyTask {
                id: format!("t{i}"),
                title,
                description,
                subject: subject.get(&subjects).clone(),
                due: NaiveDate::from_num_days_from_ce_opt(730_000 + day).unwrap(),
                time_spent,
                status: TaskStatus::ALL[status],
                priority: Priority::ALL[priority],
                difficulty: Difficulty::ALL[difficulty],
                subtasks,
                created_at,
                updated_at: at(created + age, nanos),
            });
        }

        for (i, (subject, (url, title, description), tags, (created, nanos))) in
            resources.into_iter().enumerate()
        {
            let subject = subject.get(&subjects).clone();
            let resource = Resource {
                id: format!("r{i}"),
                url,
                title,
                description,
                subject: subject.clone(),
                tags: tags.into_iter().collect(),
                created_at: at(created, nanos),
            };
            data.resources.entry(subject).or_default().push(resource);
        }
        data
    })
}

proptest! {
    #[test]
    fn prop_arbitrary_documents_survive_sqlite_round_trip(data in arbitrary_study_data()) {
        let mut storage = StudyStorage::new(SqliteBlobRepository::new(open_db_in_memory().unwrap()));
        prop_assert!(storage.try_save(&data).is_ok());
        prop_assert_eq!(storage.load(), data);
    }

    #[test]
    fn prop_saved_documents_load_back_unchanged(
        subjects in prop::collection::btree_set("[A-Z][a-z]{2,8}", 1..4),
        titles in prop::collection::vec("[a-z]{1,12}", 0..6),
        seconds in 0u64..100_000,
    ) {
        let clock = ManualClock::default();
        let mut store = StudyStore::open(
            SqliteBlobRepository::new(open_db_in_memory().unwrap()),
            clock.shared(),
        );
        let subjects = subjects.into_iter().collect::<Vec<_>>();
        for subject in &subjects {
            store.add_subject(subject).unwrap();
        }
        for (i, title) in titles.iter().enumerate() {
            let subject = &subjects[i % subjects.len()];
            let status = TaskStatus::ALL[i % TaskStatus::ALL.len()];
            let task = store
                .create_task(
                    NewTask::new(title.clone(), subject.clone(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
                        .with_status(status),
                )
                .unwrap();
            store.record_study_time(&task.id, seconds).unwrap();
        }

        prop_assert!(store.last_save_succeeded());
        prop_assert_eq!(&store.storage().load(), store.data());
    }
}
