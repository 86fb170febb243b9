//! Bookmarked study resources.
//!
//! # Invariants
//! - `tags` is deduplicated; order carries no meaning.
//! - `subject` names a declared subject and matches the bucket key the
//!   resource is stored under.

use super::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: EntityId,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub subject: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    /// Case-insensitive match on title, description or any tag.
    ///
    /// A blank query matches everything.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
    }
}

/// Caller input for `StudyStore::create_resource`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewResource {
    pub url: String,
    pub title: String,
    pub description: String,
    pub subject: String,
    pub tags: Vec<String>,
}

impl NewResource {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
