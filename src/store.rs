//! Persistence of posts, authors and tags
//!
//! The store is the source of truth; everything the hub knows is a cache of what was
//! read from, or just written to, a `Store`.  Both implementations are synchronous, so
//! async callers go through [`blocking`].
mod err;
mod memory;
mod pg;

pub use self::err::Error;
pub use self::memory::MemoryStore;
pub use self::pg::PgPool;

use crate::post::{Author, Counts, Id, NewPost, Post, Tag};
use crate::request::{Pagination, PostFilter};
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, Error>;

pub trait Store: Send + Sync + 'static {
    /// Persist a checked post, creating its author and tags as needed.
    fn create_post(&self, post: &NewPost) -> Result<Post>;
    fn get_posts(&self, filter: &PostFilter) -> Result<Vec<Post>>;
    /// The highest-id post, or `Error::NotFound` when there are none.
    fn get_last_post(&self) -> Result<Post>;
    fn get_post(&self, id: Id) -> Result<Post>;
    fn get_authors(&self, page: &Pagination) -> Result<Vec<Author>>;
    fn get_author(&self, id: Id) -> Result<Author>;
    fn get_tags(&self, page: &Pagination) -> Result<Vec<Tag>>;
    /// Look a tag up by its lowercased name.
    fn get_tag(&self, tag: &str) -> Result<Tag>;
    /// Names of the tags flagged trending, oldest tag first.
    fn get_trending_tags(&self) -> Result<Vec<String>>;
    /// Flag or unflag a tag; `Error::NotFound` when no post ever used it.
    fn set_trending(&self, tag: &str, trending: bool) -> Result<()>;
    fn counts(&self) -> Result<Counts>;
    /// Remove every row.  Only reachable through the debug endpoint.
    fn clean_up(&self) -> Result<()>;
}

pub type SharedStore = Arc<dyn Store>;

/// Run a store call on the blocking pool.
pub async fn blocking<T, F>(store: &SharedStore, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn Store) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(&*store))
        .await
        .map_err(|e| Error::Worker(e.to_string()))?
}

/// `get_last_post`, with "no posts yet" as `None`.
pub fn last_post_or_none(store: &dyn Store) -> Result<Option<Post>> {
    match store.get_last_post() {
        Ok(post) => Ok(Some(post)),
        Err(Error::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}
