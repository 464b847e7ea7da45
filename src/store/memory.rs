//! A `Store` that keeps everything in process memory
use super::{Error, Result, Store};
use crate::post::{Author, Counts, Id, NewPost, Post, Tag};
use crate::request::{Order, Pagination, PostFilter};

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    posts: Vec<Post>,
    authors: HashMap<String, Author>,
    tags: HashMap<String, Tag>,
    last_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Apply `page` to rows sorted by id; `key` gives each row's id and timestamp.
fn paginate<T>(
    rows: impl Iterator<Item = T>,
    page: &Pagination,
    key: impl Fn(&T) -> (Id, DateTime<Utc>),
) -> Vec<T> {
    let mut rows: Vec<T> = rows
        .filter(|row| {
            let (id, at) = key(row);
            page.admits(id, at)
        })
        .collect();
    if let Some(Order::Desc) = page.effective_order() {
        rows.reverse();
    }
    if let Some(limit) = page.limit {
        rows.truncate(limit as usize);
    }
    rows
}

/// Values of a table keyed by name, in id order.
fn by_id<T: Clone>(table: &HashMap<String, T>, id: impl Fn(&T) -> Id) -> Vec<T> {
    let mut rows: Vec<T> = table.values().cloned().collect();
    rows.sort_by_key(|row| id(row));
    rows
}

impl Store for MemoryStore {
    fn create_post(&self, new_post: &NewPost) -> Result<Post> {
        let mut tables = self.lock();
        let author_count = tables.authors.len() as i64;
        let author = tables
            .authors
            .entry(new_post.author.clone())
            .or_insert_with(|| Author {
                id: Id(author_count + 1),
                name: new_post.author.clone(),
                first_seen: Utc::now(),
            })
            .clone();

        let tags = new_post.tags();
        for tag in &tags {
            let tag_count = tables.tags.len() as i64;
            tables.tags.entry(tag.clone()).or_insert_with(|| Tag {
                id: Id(tag_count + 1),
                tag: tag.clone(),
                first_seen: Utc::now(),
                trending: false,
            });
        }

        tables.last_id += 1;
        let post = Post {
            id: Id(tables.last_id),
            created_at: Utc::now(),
            author,
            text: new_post.text.clone(),
            tags,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    fn get_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let tables = self.lock();
        let posts = tables.posts.iter().filter(|post| filter.admits(post)).cloned();
        Ok(paginate(posts, &filter.pagination, |post| {
            (post.id, post.created_at)
        }))
    }

    fn get_last_post(&self) -> Result<Post> {
        self.lock().posts.last().cloned().ok_or(Error::NotFound)
    }

    fn get_post(&self, id: Id) -> Result<Post> {
        self.lock()
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn get_authors(&self, page: &Pagination) -> Result<Vec<Author>> {
        let authors = by_id(&self.lock().authors, |author| author.id);
        Ok(paginate(authors.into_iter(), page, |author| {
            (author.id, author.first_seen)
        }))
    }

    fn get_author(&self, id: Id) -> Result<Author> {
        self.lock()
            .authors
            .values()
            .find(|author| author.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn get_tags(&self, page: &Pagination) -> Result<Vec<Tag>> {
        let tags = by_id(&self.lock().tags, |tag| tag.id);
        Ok(paginate(tags.into_iter(), page, |tag| (tag.id, tag.first_seen)))
    }

    fn get_tag(&self, tag: &str) -> Result<Tag> {
        self.lock().tags.get(tag).cloned().ok_or(Error::NotFound)
    }

    fn get_trending_tags(&self) -> Result<Vec<String>> {
        Ok(by_id(&self.lock().tags, |tag| tag.id)
            .into_iter()
            .filter(|tag| tag.trending)
            .map(|tag| tag.tag)
            .collect())
    }

    fn set_trending(&self, tag: &str, trending: bool) -> Result<()> {
        let mut tables = self.lock();
        let tag = tables.tags.get_mut(tag).ok_or(Error::NotFound)?;
        tag.trending = trending;
        Ok(())
    }

    fn counts(&self) -> Result<Counts> {
        let tables = self.lock();
        Ok(Counts {
            posts: tables.posts.len() as u64,
            authors: tables.authors.len() as u64,
            tags: tables.tags.len() as u64,
        })
    }

    fn clean_up(&self) -> Result<()> {
        *self.lock() = Tables::default();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Pagination;

    fn store_with(posts: &[(&str, &str)]) -> MemoryStore {
        let store = MemoryStore::new();
        for (author, text) in posts {
            store.create_post(&NewPost::new(*author, *text)).expect("in test");
        }
        store
    }

    #[test]
    fn ids_are_assigned_in_order() {
        let store = store_with(&[("alma", "one"), ("korte", "two"), ("alma", "three")]);
        let posts = store.get_posts(&PostFilter::default()).expect("in test");
        let ids: Vec<_> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Id(1), Id(2), Id(3)]);
        assert_eq!(posts[0].author.id, posts[2].author.id);
        assert_ne!(posts[0].author.id, posts[1].author.id);
    }

    #[test]
    fn last_post_is_not_found_when_empty() {
        let store = MemoryStore::new();
        assert!(store.get_last_post().unwrap_err().is_not_found());
        assert!(store.get_post(Id(1)).unwrap_err().is_not_found());
    }

    #[test]
    fn filters_by_tag_author_and_cursor() {
        let store = store_with(&[("alma", "#x"), ("korte", "#y"), ("alma", "#y #x")]);

        let tagged = PostFilter {
            tags: vec!["x".into()],
            ..PostFilter::default()
        };
        let ids: Vec<_> = store.get_posts(&tagged).expect("in test").iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Id(1), Id(3)]);

        let by_author = PostFilter {
            authors: vec![Id(2)],
            pagination: Pagination {
                after_id: Some(Id(1)),
                ..Pagination::default()
            },
            ..PostFilter::default()
        };
        let ids: Vec<_> = store.get_posts(&by_author).expect("in test").iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Id(2)]);
    }

    #[test]
    fn upper_bound_lists_newest_first() {
        let store = store_with(&[("a", "1"), ("a", "2"), ("a", "3"), ("a", "4")]);
        let filter = PostFilter {
            pagination: Pagination {
                before_id: Some(Id(4)),
                limit: Some(2),
                ..Pagination::default()
            },
            ..PostFilter::default()
        };
        let ids: Vec<_> = store.get_posts(&filter).expect("in test").iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Id(3), Id(2)]);
    }

    #[test]
    fn authors_and_tags_are_listed_in_id_order() {
        let store = store_with(&[("b", "#Go"), ("a", "#rust #go"), ("c", "#zig"), ("a", "#rust")]);

        let names: Vec<_> = store
            .get_authors(&Pagination::default())
            .expect("in test")
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);

        let page = Pagination {
            after_id: Some(Id(1)),
            limit: Some(1),
            ..Pagination::default()
        };
        let tags: Vec<_> = store
            .get_tags(&page)
            .expect("in test")
            .into_iter()
            .map(|t| t.tag)
            .collect();
        assert_eq!(tags, vec!["rust"]);

        assert_eq!(store.get_author(Id(3)).expect("in test").name, "c");
        assert!(store.get_author(Id(4)).unwrap_err().is_not_found());
        assert_eq!(store.get_tag("go").expect("in test").id, Id(1));
        assert!(store.get_tag("java").unwrap_err().is_not_found());
    }

    #[test]
    fn trending_flags_are_toggled_per_tag() {
        let store = store_with(&[("a", "#alma #barack #korte")]);
        assert!(store.get_trending_tags().expect("in test").is_empty());

        store.set_trending("korte", true).expect("in test");
        store.set_trending("alma", true).expect("in test");
        assert_eq!(store.get_trending_tags().expect("in test"), vec!["alma", "korte"]);
        assert!(store.get_tag("alma").expect("in test").trending);

        store.set_trending("alma", false).expect("in test");
        assert_eq!(store.get_trending_tags().expect("in test"), vec!["korte"]);
        assert!(store.set_trending("szilva", true).unwrap_err().is_not_found());
    }

    #[test]
    fn counts_every_table() {
        let store = store_with(&[("a", "#x #y"), ("b", "#y"), ("a", "plain")]);
        assert_eq!(
            store.counts().expect("in test"),
            Counts {
                posts: 3,
                authors: 2,
                tags: 2
            }
        );
        store.clean_up().expect("in test");
        assert_eq!(store.counts().expect("in test"), Counts::default());
    }

    #[test]
    fn clean_up_restarts_ids() {
        let store = store_with(&[("a", "1"), ("a", "2")]);
        store.clean_up().expect("in test");
        assert!(store.get_last_post().is_err());
        let post = store.create_post(&NewPost::new("b", "again")).expect("in test");
        assert_eq!(post.id, Id(1));
        assert_eq!(post.author.id, Id(1));
    }
}
