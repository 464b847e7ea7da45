use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// A row id assigned by the store.
///
/// Post ids start at 1 and only ever grow, which is what lets the long-poll code reason
/// about "the next post" without asking the database.  `Id(0)` therefore means "before
/// the first post".
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Id(pub i64);

impl Id {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::ops::Deref for Id {
    type Target = i64;
    fn deref(&self) -> &i64 {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
