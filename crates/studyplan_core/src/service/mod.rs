//! Use-case services over the study document.
//!
//! # Responsibility
//! - `study_store` owns the document and every mutation.
//! - `kanban`, `timer` and `suggestion` drive the store from user gestures.
//! - `insights` answers read-only questions about a snapshot.

pub mod insights;
pub mod kanban;
pub mod study_store;
pub mod suggestion;
pub mod timer;
