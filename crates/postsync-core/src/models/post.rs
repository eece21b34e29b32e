//! Post model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier assigned to a post by the remote source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(i64);

impl PostId {
    /// Wrap a raw remote identifier
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw identifier
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for PostId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PostId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A post as delivered by the remote source and shown in the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Author identifier
    pub user_id: i64,
    /// Unique, stable identifier
    pub id: PostId,
    /// Post title
    pub title: String,
    /// Post body
    pub body: String,
    /// Local-only like flag; `None` means unknown and reads as not liked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

impl Post {
    /// Create a post with an unknown like state
    #[must_use]
    pub fn new(id: i64, user_id: i64, title: &str, body: &str) -> Self {
        Self {
            user_id,
            id: PostId(id),
            title: title.to_string(),
            body: body.to_string(),
            is_liked: None,
        }
    }

    /// Like state with "unknown" resolved to `false`
    #[must_use]
    pub fn liked(&self) -> bool {
        self.is_liked.unwrap_or(false)
    }

    /// Flip the like state and return the new value
    pub fn toggle_like(&mut self) -> bool {
        let liked = !self.liked();
        self.is_liked = Some(liked);
        liked
    }
}

/// A persisted row: the post plus its durable like flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPostRecord {
    /// Post identifier (primary key)
    pub id: PostId,
    /// Author identifier
    pub user_id: i64,
    /// Stored title, if any
    pub title: Option<String>,
    /// Stored body, if any
    pub body: Option<String>,
    /// Durable like flag
    pub is_liked: bool,
}

impl From<&Post> for LocalPostRecord {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            user_id: post.user_id,
            title: Some(post.title.clone()),
            body: Some(post.body.clone()),
            is_liked: post.liked(),
        }
    }
}

impl From<LocalPostRecord> for Post {
    fn from(record: LocalPostRecord) -> Self {
        Self {
            user_id: record.user_id,
            id: record.id,
            title: record.title.unwrap_or_default(),
            body: record.body.unwrap_or_default(),
            is_liked: Some(record.is_liked),
        }
    }
}
