//! Core domain logic for the study planner.
//! This crate is the single source of truth for board and library invariants.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::resource::{NewResource, Resource};
pub use model::study::{StudyData, TaskBuckets, UserProfile};
pub use model::task::{Difficulty, NewTask, Priority, StudyTask, SubTask, TaskStatus};
pub use model::{EntityId, ValidationError};
pub use repo::blob_repo::{
    BlobRepository, MemoryBlobRepository, RepoError, RepoResult, SqliteBlobRepository,
};
pub use service::kanban::{DragSession, DropOutcome, DropTarget};
pub use service::study_store::{StoreError, StoreResult, StudyStore, SubjectRemoval};
pub use service::timer::{format_elapsed, TaskTimer, TimerState};
pub use storage::{StorageError, StudyStorage, STUDY_DATA_KEY};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
