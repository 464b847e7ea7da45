//! Postgres queries
use super::{Error, Result, Store};
use crate::config;
use crate::post::{Author, Counts, Id, NewPost, Post, Tag};
use crate::request::{Order, Pagination, PostFilter};

use ::postgres::types::ToSql;
use ::postgres::{NoTls, Row};
use r2d2_postgres::PostgresConnectionManager;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS authors (
    id         BIGSERIAL PRIMARY KEY,
    name       VARCHAR(32) NOT NULL UNIQUE,
    first_seen TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS tags (
    id         BIGSERIAL PRIMARY KEY,
    tag        VARCHAR(280) NOT NULL UNIQUE,
    first_seen TIMESTAMPTZ NOT NULL DEFAULT now(),
    trending   BOOLEAN NOT NULL DEFAULT false
);
ALTER TABLE tags ADD COLUMN IF NOT EXISTS trending BOOLEAN NOT NULL DEFAULT false;
CREATE TABLE IF NOT EXISTS posts (
    id         BIGSERIAL PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    text       TEXT NOT NULL,
    author_id  BIGINT NOT NULL REFERENCES authors (id)
);
CREATE TABLE IF NOT EXISTS post_tags (
    post_id BIGINT NOT NULL REFERENCES posts (id) ON DELETE CASCADE,
    tag_id  BIGINT NOT NULL REFERENCES tags (id) ON DELETE CASCADE,
    PRIMARY KEY (post_id, tag_id)
);";

const SELECT_POSTS: &str = "
SELECT posts.id, posts.created_at, posts.text, authors.id, authors.name, authors.first_seen,
       ARRAY(SELECT tags.tag FROM post_tags JOIN tags ON tags.id = post_tags.tag_id
              WHERE post_tags.post_id = posts.id ORDER BY tags.tag)
  FROM posts
INNER JOIN authors ON authors.id = posts.author_id";

const SELECT_AUTHORS: &str = "SELECT authors.id, authors.name, authors.first_seen FROM authors";

const SELECT_TAGS: &str = "SELECT tags.id, tags.tag, tags.first_seen, tags.trending FROM tags";

type Params = Vec<Box<dyn ToSql + Sync>>;

#[derive(Clone, Debug)]
pub struct PgPool {
    pub conn: r2d2::Pool<PostgresConnectionManager<NoTls>>,
}

impl PgPool {
    pub fn new(pg_cfg: &config::Postgres) -> Result<Self> {
        let mut cfg = ::postgres::Config::new();
        cfg.user(&pg_cfg.user)
            .host(&pg_cfg.host)
            .port(*pg_cfg.port)
            .dbname(&pg_cfg.database);
        if let Some(password) = &*pg_cfg.password {
            cfg.password(password);
        };

        cfg.connect(NoTls)?; // Test connection, letting us immediately exit with an error
                             // when Postgres isn't running instead of timing out below
        let manager = PostgresConnectionManager::new(cfg, NoTls);
        let pool = r2d2::Pool::builder()
            .max_size(*pg_cfg.max_connections)
            .min_idle(Some((*pg_cfg.max_connections).min(10)))
            .build(manager)?;

        let pool = Self { conn: pool };
        pool.migrate()?;
        Ok(pool)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.get()?.batch_execute(SCHEMA)?;
        Ok(())
    }

    fn post_from_row(row: &Row) -> Post {
        Post {
            id: Id(row.get(0)),
            created_at: row.get(1),
            text: row.get(2),
            author: Author {
                id: Id(row.get(3)),
                name: row.get(4),
                first_seen: row.get(5),
            },
            tags: row.get::<_, Vec<String>>(6).into_iter().collect(),
        }
    }

    fn author_from_row(row: &Row) -> Author {
        Author {
            id: Id(row.get(0)),
            name: row.get(1),
            first_seen: row.get(2),
        }
    }

    fn tag_from_row(row: &Row) -> Tag {
        Tag {
            id: Id(row.get(0)),
            tag: row.get(1),
            first_seen: row.get(2),
            trending: row.get(3),
        }
    }

    fn select_one(&self, clause: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Post> {
        let mut conn = self.conn.get()?;
        let query = format!("{} {} LIMIT 1", SELECT_POSTS, clause);
        conn.query_opt(query.as_str(), params)?
            .map(|row| Self::post_from_row(&row))
            .ok_or(Error::NotFound)
    }

    /// Run `select` followed by a generated clause, mapping every row.
    fn select_all<T>(
        &self,
        select: &str,
        (clause, params): (String, Params),
        from_row: fn(&Row) -> T,
    ) -> Result<Vec<T>> {
        let mut conn = self.conn.get()?;
        let params: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref()).collect();
        let query = format!("{}{}", select, clause);
        Ok(conn.query(query.as_str(), &params)?.iter().map(from_row).collect())
    }
}

/// The `WHERE`/`ORDER BY`/`LIMIT` tail of a post listing and its parameters.
fn listing_clause(filter: &PostFilter) -> (String, Params) {
    let mut conditions = Vec::new();
    let mut params: Params = Vec::new();

    if !filter.tags.is_empty() {
        let n = bind(&mut params, Box::new(filter.tags.clone()));
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM post_tags JOIN tags ON tags.id = post_tags.tag_id \
             WHERE post_tags.post_id = posts.id AND tags.tag = ANY({}))",
            n
        ));
    }
    if !filter.authors.is_empty() {
        let ids: Vec<i64> = filter.authors.iter().map(|id| id.0).collect();
        let n = bind(&mut params, Box::new(ids));
        conditions.push(format!("posts.author_id = ANY({})", n));
    }

    let clause = page_clause(&filter.pagination, ("posts", "created_at"), conditions, &mut params);
    (clause, params)
}

/// Pagination over `table`, whose timestamp column is `at`, on top of `conditions`.
fn page_clause(
    page: &Pagination,
    (table, at): (&str, &str),
    mut conditions: Vec<String>,
    params: &mut Params,
) -> String {
    if let Some(id) = page.after_id {
        conditions.push(format!("{}.id > {}", table, bind(params, Box::new(id.0))));
    } else if let Some(after) = page.after {
        conditions.push(format!("{}.{} > {}", table, at, bind(params, Box::new(after))));
    }
    if let Some(id) = page.before_id {
        conditions.push(format!("{}.id < {}", table, bind(params, Box::new(id.0))));
    } else if let Some(before) = page.before {
        conditions.push(format!("{}.{} < {}", table, at, bind(params, Box::new(before))));
    }

    let mut clause = String::new();
    if !conditions.is_empty() {
        clause.push_str(" WHERE ");
        clause.push_str(&conditions.join(" AND "));
    }
    match page.effective_order() {
        Some(Order::Asc) => clause.push_str(&format!(" ORDER BY {}.id ASC", table)),
        Some(Order::Desc) => clause.push_str(&format!(" ORDER BY {}.id DESC", table)),
        None => clause.push_str(&format!(" ORDER BY {}.id", table)),
    }
    if let Some(limit) = page.limit {
        clause.push_str(&format!(" LIMIT {}", limit));
    }
    clause
}

/// The clause listing a whole table, one page at a time.
fn table_clause(page: &Pagination, columns: (&str, &str)) -> (String, Params) {
    let mut params = Vec::new();
    let clause = page_clause(page, columns, Vec::new(), &mut params);
    (clause, params)
}

/// Append a parameter and return its placeholder.
fn bind(params: &mut Params, param: Box<dyn ToSql + Sync>) -> String {
    params.push(param);
    format!("${}", params.len())
}

impl Store for PgPool {
    fn create_post(&self, new_post: &NewPost) -> Result<Post> {
        let mut conn = self.conn.get()?;
        let mut tx = conn.transaction()?;

        let author_row = tx.query_one(
            "INSERT INTO authors (name) VALUES ($1)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, first_seen",
            &[&new_post.author],
        )?;
        let post_row = tx.query_one(
            "INSERT INTO posts (text, author_id) VALUES ($1, $2) RETURNING id, created_at",
            &[&new_post.text, &author_row.get::<_, i64>(0)],
        )?;
        let post_id: i64 = post_row.get(0);

        let tags = new_post.tags();
        for tag in &tags {
            let tag_row = tx.query_one(
                "INSERT INTO tags (tag) VALUES ($1)
                 ON CONFLICT (tag) DO UPDATE SET tag = EXCLUDED.tag
                 RETURNING id",
                &[tag],
            )?;
            tx.execute(
                "INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2)",
                &[&post_id, &tag_row.get::<_, i64>(0)],
            )?;
        }
        tx.commit()?;

        Ok(Post {
            id: Id(post_id),
            created_at: post_row.get(1),
            author: Author {
                id: Id(author_row.get(0)),
                name: new_post.author.clone(),
                first_seen: author_row.get(1),
            },
            text: new_post.text.clone(),
            tags,
        })
    }

    fn get_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        self.select_all(SELECT_POSTS, listing_clause(filter), Self::post_from_row)
    }

    fn get_last_post(&self) -> Result<Post> {
        self.select_one("ORDER BY posts.id DESC", &[])
    }

    fn get_post(&self, id: Id) -> Result<Post> {
        self.select_one("WHERE posts.id = $1", &[&id.0])
    }

    fn get_authors(&self, page: &Pagination) -> Result<Vec<Author>> {
        let clause = table_clause(page, ("authors", "first_seen"));
        self.select_all(SELECT_AUTHORS, clause, Self::author_from_row)
    }

    fn get_author(&self, id: Id) -> Result<Author> {
        let query = format!("{} WHERE authors.id = $1", SELECT_AUTHORS);
        self.conn
            .get()?
            .query_opt(query.as_str(), &[&id.0])?
            .map(|row| Self::author_from_row(&row))
            .ok_or(Error::NotFound)
    }

    fn get_tags(&self, page: &Pagination) -> Result<Vec<Tag>> {
        let clause = table_clause(page, ("tags", "first_seen"));
        self.select_all(SELECT_TAGS, clause, Self::tag_from_row)
    }

    fn get_tag(&self, tag: &str) -> Result<Tag> {
        let query = format!("{} WHERE tags.tag = $1", SELECT_TAGS);
        self.conn
            .get()?
            .query_opt(query.as_str(), &[&tag])?
            .map(|row| Self::tag_from_row(&row))
            .ok_or(Error::NotFound)
    }

    fn get_trending_tags(&self) -> Result<Vec<String>> {
        Ok(self
            .conn
            .get()?
            .query("SELECT tag FROM tags WHERE trending ORDER BY id", &[])?
            .iter()
            .map(|row| row.get(0))
            .collect())
    }

    fn set_trending(&self, tag: &str, trending: bool) -> Result<()> {
        let updated = self
            .conn
            .get()?
            .execute("UPDATE tags SET trending = $2 WHERE tag = $1", &[&tag, &trending])?;
        match updated {
            0 => Err(Error::NotFound),
            _ => Ok(()),
        }
    }

    fn counts(&self) -> Result<Counts> {
        let row = self.conn.get()?.query_one(
            "SELECT (SELECT count(*) FROM posts), (SELECT count(*) FROM authors), \
                    (SELECT count(*) FROM tags)",
            &[],
        )?;
        let count = |n: usize| row.get::<_, i64>(n) as u64;
        Ok(Counts {
            posts: count(0),
            authors: count(1),
            tags: count(2),
        })
    }

    fn clean_up(&self) -> Result<()> {
        self.conn
            .get()?
            .batch_execute("TRUNCATE post_tags, posts, tags, authors RESTART IDENTITY")?;
        Ok(())
    }
}
