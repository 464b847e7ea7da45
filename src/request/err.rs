use crate::post::PostErr;
use std::fmt;

/// A client supplied a filter or query that can not be answered.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterErr {
    BeforeConflict,
    AfterConflict,
    BoundsInverted,
    ZeroLimit,
    EmptyTag,
    TagWithAuthor,
    PaginationWithoutFill,
    /// The named query parameter could not be parsed.
    Malformed(&'static str),
}

impl std::error::Error for FilterErr {}

impl fmt::Display for FilterErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use FilterErr::*;
        match self {
            BeforeConflict => write!(f, "before and before_id must not be used together"),
            AfterConflict => write!(f, "after and after_id must not be used together"),
            BoundsInverted => write!(f, "before must be after after"),
            ZeroLimit => write!(f, "limit 0 makes no sense"),
            EmptyTag => write!(f, "tag can not be empty"),
            TagWithAuthor => write!(f, "tag and author_id can not be used together"),
            PaginationWithoutFill => write!(f, "pagination is only allowed with fill"),
            Malformed(param) => write!(f, "invalid value for {}", param),
        }
    }
}

impl warp::reject::Reject for FilterErr {}
impl warp::reject::Reject for PostErr {}

/// The `X-Debug-Pin` header or the metrics bearer token was missing or wrong.
#[derive(Debug)]
pub struct Unauthorized;
impl warp::reject::Reject for Unauthorized {}
