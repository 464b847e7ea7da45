//! What a long-poll request is waiting for
use super::err::FilterErr;
use super::filter::{Pagination, PostFilter};
use crate::post::{Id, Post};

/// A validated `GET /api/poll` request.
#[derive(Debug, Clone, PartialEq)]
pub struct PollRequest {
    /// The newest post id the client already has.  `None` means "whatever the hub knows
    /// right now", which races with posts the client has not seen yet.
    pub cursor: Option<Id>,
    pub filter: PollFilter,
}

/// The predicate a waiting client cares about.  Tag and author filters never combine.
#[derive(Debug, Clone, PartialEq)]
pub enum PollFilter {
    Any,
    Author(Id),
    Tag(String),
}

impl PollFilter {
    /// Build a tag filter, normalized the way the store keeps tags.
    pub fn tag(tag: &str) -> Result<Self, FilterErr> {
        let tag = tag.trim().trim_start_matches('#').to_lowercase();
        if tag.is_empty() {
            return Err(FilterErr::EmptyTag);
        }
        Ok(Self::Tag(tag))
    }

    pub fn matches(&self, post: &Post) -> bool {
        match self {
            Self::Author(id) => post.author.id == *id,
            Self::Tag(tag) => post.has_tag(tag),
            Self::Any => true,
        }
    }

    /// The store query that answers this filter for everything newer than `cursor`.
    pub fn newer_than(&self, cursor: Id) -> PostFilter {
        let pagination = Pagination {
            after_id: Some(cursor),
            ..Pagination::default()
        };
        match self {
            Self::Any => PostFilter {
                pagination,
                ..PostFilter::default()
            },
            Self::Author(id) => PostFilter {
                pagination,
                authors: vec![*id],
                ..PostFilter::default()
            },
            Self::Tag(tag) => PostFilter {
                pagination,
                tags: vec![tag.clone()],
                ..PostFilter::default()
            },
        }
    }
}
