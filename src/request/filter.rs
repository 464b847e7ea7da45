//! Pagination and filtering of post listings
use super::err::FilterErr;
use crate::post::{Id, Post};

use chrono::{DateTime, Utc};
use strum_macros::EnumString;

#[derive(EnumString, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum Order {
    Asc,
    Desc,
}

/// Bounds, size and order of a listing.
///
/// `before`/`before_id` and `after`/`after_id` are exclusive bounds; within one direction
/// only one form may be used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pagination {
    pub before_id: Option<Id>,
    pub after_id: Option<Id>,
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub order: Option<Order>,
}

impl Pagination {
    pub fn validate(&self) -> Result<(), FilterErr> {
        if self.before.is_some() && self.before_id.is_some() {
            return Err(FilterErr::BeforeConflict);
        }
        if self.after.is_some() && self.after_id.is_some() {
            return Err(FilterErr::AfterConflict);
        }
        if let (Some(before), Some(after)) = (self.before_id, self.after_id) {
            if before < after {
                return Err(FilterErr::BoundsInverted);
            }
        }
        if let (Some(before), Some(after)) = (self.before, self.after) {
            if before < after {
                return Err(FilterErr::BoundsInverted);
            }
        }
        if self.limit == Some(0) {
            return Err(FilterErr::ZeroLimit);
        }
        Ok(())
    }

    /// The order to apply; `None` leaves it to the store.
    pub fn effective_order(&self) -> Option<Order> {
        let lower = self.after_id.is_some() || self.after.is_some();
        let upper = self.before_id.is_some() || self.before.is_some();
        match (self.order, lower, upper) {
            (Some(order), _, _) => Some(order),
            (None, true, false) => Some(Order::Asc),
            (None, false, true) => Some(Order::Desc),
            (None, _, _) => None,
        }
    }

    /// Whether a row with this id and timestamp falls inside the bounds.
    pub fn admits(&self, id: Id, at: DateTime<Utc>) -> bool {
        self.after_id.map_or(true, |after| id > after)
            && self.before_id.map_or(true, |before| id < before)
            && self.after.map_or(true, |after| at > after)
            && self.before.map_or(true, |before| at < before)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A listing request for posts: pagination plus tag and author restrictions.
///
/// Empty `tags`/`authors` mean "any"; otherwise a post must carry at least one of the tags
/// and be written by one of the authors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    pub pagination: Pagination,
    pub tags: Vec<String>,
    pub authors: Vec<Id>,
}

impl PostFilter {
    pub fn validate(&self) -> Result<(), FilterErr> {
        self.pagination.validate()?;
        if self.tags.iter().any(String::is_empty) {
            return Err(FilterErr::EmptyTag);
        }
        Ok(())
    }

    pub fn admits(&self, post: &Post) -> bool {
        (self.tags.is_empty() || self.tags.iter().any(|tag| post.has_tag(tag)))
            && (self.authors.is_empty() || self.authors.contains(&post.author.id))
            && self.pagination.admits(post.id, post.created_at)
    }
}
