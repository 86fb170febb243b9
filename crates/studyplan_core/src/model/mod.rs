//! Study domain model.
//!
//! # Responsibility
//! - Define the canonical shapes persisted in the study document.
//! - Provide input normalization and validation shared by store paths.
//!
//! # Invariants
//! - Every entity is identified by a stable `EntityId`.
//! - Wire names are camelCase to match the persisted document layout.
//! - Model types hold no behavior beyond validation and lookup helpers.

pub mod resource;
pub mod study;
pub mod task;
pub mod text;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque identifier for tasks, subtasks and resources.
///
/// Fresh ids are UUID v4 strings; documents written by older builds may
/// carry any non-empty string.
pub type EntityId = String;

/// Generates a fresh entity id.
pub fn new_entity_id() -> EntityId {
    uuid::Uuid::new_v4().to_string()
}

/// Input rejected before any mutation is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is blank after trim.
    EmptyTitle,
    /// Task input carries no due date.
    MissingDueDate,
    /// Referenced subject is not declared in the user profile.
    UnknownSubject(String),
    /// Subject name is blank after trim.
    EmptySubjectName,
    /// Resource URL is blank after trim.
    EmptyUrl,
    /// `updatedAt` precedes `createdAt`.
    TimestampOrder,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be blank"),
            Self::MissingDueDate => write!(f, "due date is required"),
            Self::UnknownSubject(subject) => write!(f, "unknown subject: `{subject}`"),
            Self::EmptySubjectName => write!(f, "subject name must not be blank"),
            Self::EmptyUrl => write!(f, "url must not be blank"),
            Self::TimestampOrder => write!(f, "updatedAt must not precede createdAt"),
        }
    }
}

impl Error for ValidationError {}
