//! Validate query params with type checking
use super::err::FilterErr;
use super::filter::{Order, Pagination, PostFilter};
use super::poll::{PollFilter, PollRequest};
use crate::post::Id;

use chrono::{DateTime, Utc};
use serde_derive::Deserialize;
use std::convert::TryFrom;
use std::str::FromStr;
use url::form_urlencoded;
use warp::filters::BoxedFilter;
use warp::Filter as WarpFilter;

macro_rules! make_query_type {
    ($(#[$outer:meta])* $name:ident { $($parameter:ident: $type:ty),* $(,)? }) => {
        $(#[$outer])*
        #[derive(Deserialize, Debug, Default, Clone, PartialEq)]
        pub struct $name {
            $(pub $parameter: $type,)*
        }
        impl $name {
            pub(crate) fn to_filter() -> BoxedFilter<(Self,)> {
                warp::query::<Self>().boxed()
            }
        }
    };
}

make_query_type!(
    /// Query string of `GET /api/poll`
    PollQuery {
        last: Option<u64>,
        tag: Option<String>,
        author_id: Option<u64>,
    }
);

/// Query string of the listing endpoints.
///
/// `tag` and `author_id` may repeat, which `serde_urlencoded` can not express, so the raw
/// string is walked pair by pair.  Unknown keys are ignored.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ListQuery {
    pub before_id: Option<u64>,
    pub after_id: Option<u64>,
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub order: Option<Order>,
    pub tags: Vec<String>,
    pub author_ids: Vec<u64>,
    pub fill: Option<bool>,
}

impl ListQuery {
    pub(crate) fn to_filter() -> BoxedFilter<(Self,)> {
        warp::query::raw()
            .or(warp::any().map(String::new))
            .unify()
            .and_then(|raw: String| async move {
                Self::parse(&raw).map_err(warp::reject::custom)
            })
            .boxed()
    }

    pub fn parse(raw: &str) -> Result<Self, FilterErr> {
        let mut q = Self::default();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "before_id" => q.before_id = Some(param("before_id", &value)?),
                "after_id" => q.after_id = Some(param("after_id", &value)?),
                "before" => q.before = Some(param("before", &value)?),
                "after" => q.after = Some(param("after", &value)?),
                "limit" => q.limit = Some(param("limit", &value)?),
                "order" => q.order = Some(param("order", &value)?),
                "tag" => q.tags.push(value.into_owned()),
                "author_id" => q.author_ids.push(param("author_id", &value)?),
                "fill" => q.fill = Some(param("fill", &value)?),
                _ => (),
            }
        }
        Ok(q)
    }

    /// The validated bounds, size and order.
    pub fn pagination(&self) -> Result<Pagination, FilterErr> {
        let pagination = Pagination {
            before_id: self.before_id.map(|v| id("before_id", v)).transpose()?,
            after_id: self.after_id.map(|v| id("after_id", v)).transpose()?,
            before: self.before,
            after: self.after,
            limit: self.limit,
            order: self.order,
        };
        pagination.validate()?;
        Ok(pagination)
    }

    /// The page of posts to embed in an author or tag, or `None` for `fill=false`.
    /// Filling is the default; paginating an unfilled answer is an error.
    pub fn fill(&self) -> Result<Option<Pagination>, FilterErr> {
        let pagination = self.pagination()?;
        match self.fill {
            Some(false) if !pagination.is_empty() => Err(FilterErr::PaginationWithoutFill),
            Some(false) => Ok(None),
            _ => Ok(Some(pagination)),
        }
    }
}

fn param<T: FromStr>(name: &'static str, value: &str) -> Result<T, FilterErr> {
    value.parse().map_err(|_| FilterErr::Malformed(name))
}

/// Ids are unsigned on the wire but must also fit the store's `BIGINT`.
pub(crate) fn id(name: &'static str, value: u64) -> Result<Id, FilterErr> {
    i64::try_from(value)
        .map(Id)
        .map_err(|_| FilterErr::Malformed(name))
}

/// An id taken from the request path.
pub(crate) fn path_id(raw: &str) -> Result<Id, FilterErr> {
    id("id", param("id", raw)?)
}

/// A tag taken from the request path, percent-decoded and lowercased.
pub(crate) fn path_tag(raw: &str) -> Result<String, FilterErr> {
    let tag = urlencoding::decode(raw)
        .map_err(|_| FilterErr::Malformed("tag"))?
        .to_lowercase();
    if tag.is_empty() {
        return Err(FilterErr::EmptyTag);
    }
    Ok(tag)
}

impl TryFrom<PollQuery> for PollRequest {
    type Error = FilterErr;

    fn try_from(q: PollQuery) -> Result<Self, FilterErr> {
        let filter = match (q.tag, q.author_id) {
            (Some(_), Some(_)) => return Err(FilterErr::TagWithAuthor),
            (Some(tag), None) => PollFilter::tag(&tag)?,
            (None, Some(author)) => PollFilter::Author(id("author_id", author)?),
            (None, None) => PollFilter::Any,
        };
        Ok(PollRequest {
            cursor: q.last.map(|last| id("last", last)).transpose()?,
            filter,
        })
    }
}

impl TryFrom<ListQuery> for PostFilter {
    type Error = FilterErr;

    fn try_from(q: ListQuery) -> Result<Self, FilterErr> {
        let filter = PostFilter {
            pagination: q.pagination()?,
            tags: q.tags.iter().map(|t| t.to_lowercase()).collect(),
            authors: q
                .author_ids
                .iter()
                .map(|author| id("author_id", *author))
                .collect::<Result<_, _>>()?,
        };
        filter.validate()?;
        Ok(filter)
    }
}
