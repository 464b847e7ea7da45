//! The `Post` record and the values it is built from
mod id;
mod new_post;

pub use id::Id;
pub use new_post::{NewPost, PostErr};

use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A published post.
///
/// Posts are created by the `Store` and never change afterwards; everything downstream
/// of the store shares them behind an `Arc`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Post {
    pub id: Id,
    pub created_at: DateTime<Utc>,
    pub author: Author,
    pub text: String,
    pub tags: BTreeSet<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Author {
    pub id: Id,
    pub name: String,
    pub first_seen: DateTime<Utc>,
}

/// A hashtag as the store keeps it: lowercased, with the time it was first used.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: Id,
    pub tag: String,
    pub first_seen: DateTime<Utc>,
    pub trending: bool,
}

/// Row counts, as exported on `/metrics`.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub posts: u64,
    pub authors: u64,
    pub tags: u64,
}

impl Post {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

#[cfg(test)]
pub(crate) fn sample(id: i64, author: i64, tags: &[&str]) -> Post {
    use chrono::Utc;
    Post {
        id: Id(id),
        created_at: Utc::now(),
        author: Author {
            id: Id(author),
            name: format!("author_{}", author),
            first_seen: Utc::now(),
        },
        text: tags.iter().map(|t| format!("#{}", t)).collect::<Vec<_>>().join(" "),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}
