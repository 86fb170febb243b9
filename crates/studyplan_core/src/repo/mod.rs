//! Repository layer for durable key-value slots.
//!
//! # Responsibility
//! - Define the slot access contract consumed by the storage adapter.
//! - Isolate SQLite query details from document encoding and store logic.
//!
//! # Invariants
//! - A slot write replaces the whole value under its key.
//! - Repository APIs report transport failures; they never interpret values.

pub mod blob_repo;
