//! Parse client requests and answer them
mod err;
mod filter;
mod poll;
mod query;

pub use self::err::{FilterErr, Unauthorized};
pub use self::filter::{Order, Pagination, PostFilter};
pub use self::poll::{PollFilter, PollRequest};
pub use self::query::{ListQuery, PollQuery};

use crate::post::{Counts, NewPost, Post, PostErr};
use crate::response::{Hub, LongPoll, Metrics, Outcome};
use crate::store::{self, SharedStore};

use serde_derive::Serialize;
use serde_json::json;
use std::convert::{Infallible, TryFrom};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use warp::body::BodyDeserializeError;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reject::{InvalidQuery, MethodNotAllowed, Rejection};
use warp::reply::{self, Reply, Response};
use warp::Filter;

/// Helper macro to match on the first of any of the provided filters
macro_rules! any_of {
    ($filter:expr, $($other_filter:expr),*) => {
        $filter$(.or($other_filter).unify())*.boxed()
    };
}

/// Largest accepted `POST /api/post` body.
const MAX_BODY: u64 = 16 * 1024;

/// An author or tag, with a page of its posts unless the client asked for `fill=false`.
#[derive(Serialize)]
struct Filled<T> {
    #[serde(flatten)]
    record: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    posts: Option<Vec<Post>>,
}

#[derive(Clone)]
pub struct Handler {
    store: SharedStore,
    hub: Hub,
    long_poll: LongPoll,
    metrics: Metrics,
}

impl Handler {
    pub fn new(store: SharedStore, hub: Hub, poll_timeout: Duration) -> Self {
        let long_poll = LongPoll::new(hub.clone(), store.clone(), poll_timeout);
        Self {
            store,
            hub,
            long_poll,
            metrics: Metrics::new(),
        }
    }

    /// Every endpoint under `/api`, plus `/metrics`.
    ///
    /// `debug_pin` is `Some` only in debug mode; without it the debug endpoints do not
    /// exist.  `metrics_bearer`, when set, is the token `/metrics` requires.
    pub fn api(
        &self,
        debug_pin: Option<String>,
        metrics_bearer: Option<String>,
    ) -> BoxedFilter<(Response,)> {
        any_of!(
            self.poll(),
            self.create_post(),
            self.list_posts(),
            self.get_post(),
            self.list_authors(),
            self.get_author(),
            self.list_tags(),
            self.get_tag(),
            self.trending(),
            self.health(),
            self.status(),
            self.metrics(metrics_bearer),
            self.debug_cleanup(debug_pin.clone()),
            self.debug_trending(debug_pin)
        )
    }

    /// `GET /api/poll`
    pub fn poll(&self) -> BoxedFilter<(Response,)> {
        let long_poll = self.long_poll.clone();
        warp::path!("api" / "poll")
            .and(warp::get())
            .and(PollQuery::to_filter())
            .and_then(move |q: PollQuery| {
                let long_poll = long_poll.clone();
                async move {
                    let request = PollRequest::try_from(q).map_err(warp::reject::custom)?;
                    // Hyper drops this future when the client goes away, which ends the
                    // wait and its subscription.
                    let outcome = long_poll
                        .wait(request, CancellationToken::new())
                        .await
                        .map_err(warp::reject::custom)?;
                    Ok::<_, Rejection>(match outcome {
                        Outcome::Posts(posts) => reply::json(&posts).into_response(),
                        Outcome::TimedOut | Outcome::Disconnected => {
                            StatusCode::NO_CONTENT.into_response()
                        }
                    })
                }
            })
            .boxed()
    }

    /// `POST /api/post`
    pub fn create_post(&self) -> BoxedFilter<(Response,)> {
        let (store, hub) = (self.store.clone(), self.hub.clone());
        warp::path!("api" / "post")
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_BODY))
            .and(warp::body::json())
            .and_then(move |new_post: NewPost| {
                let (store, hub) = (store.clone(), hub.clone());
                async move {
                    let new_post = new_post.checked().map_err(warp::reject::custom)?;
                    let post = store::blocking(&store, move |store| store.create_post(&new_post))
                        .await
                        .map_err(warp::reject::custom)?;
                    log::info!("Post {} created by {}", post.id, post.author.name);

                    let response = reply::with_status(reply::json(&post), StatusCode::CREATED);
                    if let Err(e) = hub.notify(post) {
                        log::error!("Created a post the hub will not broadcast: {}", e);
                    }
                    Ok::<_, Rejection>(response.into_response())
                }
            })
            .boxed()
    }

    /// `GET /api/post`
    pub fn list_posts(&self) -> BoxedFilter<(Response,)> {
        let store = self.store.clone();
        warp::path!("api" / "post")
            .and(warp::get())
            .and(ListQuery::to_filter())
            .and_then(move |q: ListQuery| {
                let store = store.clone();
                async move {
                    let filter = PostFilter::try_from(q).map_err(warp::reject::custom)?;
                    let posts = match store::blocking(&store, move |s| s.get_posts(&filter)).await {
                        Ok(posts) => posts,
                        Err(e) if e.is_not_found() => Vec::new(),
                        Err(e) => return Err(warp::reject::custom(e)),
                    };
                    Ok::<_, Rejection>(reply::json(&posts).into_response())
                }
            })
            .boxed()
    }

    /// `GET /api/post/:id`
    pub fn get_post(&self) -> BoxedFilter<(Response,)> {
        let store = self.store.clone();
        warp::path!("api" / "post" / String)
            .and(warp::get())
            .and_then(move |id: String| {
                let store = store.clone();
                async move {
                    let id = query::path_id(&id).map_err(warp::reject::custom)?;
                    let post = store::blocking(&store, move |s| s.get_post(id))
                        .await
                        .map_err(warp::reject::custom)?;
                    Ok::<_, Rejection>(reply::json(&post).into_response())
                }
            })
            .boxed()
    }

    /// `GET /api/author`
    pub fn list_authors(&self) -> BoxedFilter<(Response,)> {
        let store = self.store.clone();
        warp::path!("api" / "author")
            .and(warp::get())
            .and(ListQuery::to_filter())
            .and_then(move |q: ListQuery| {
                let store = store.clone();
                async move {
                    let page = q.pagination().map_err(warp::reject::custom)?;
                    let authors = store::blocking(&store, move |s| s.get_authors(&page))
                        .await
                        .map_err(warp::reject::custom)?;
                    Ok::<_, Rejection>(reply::json(&authors).into_response())
                }
            })
            .boxed()
    }

    /// `GET /api/author/:id`
    pub fn get_author(&self) -> BoxedFilter<(Response,)> {
        let store = self.store.clone();
        warp::path!("api" / "author" / String)
            .and(warp::get())
            .and(ListQuery::to_filter())
            .and_then(move |id: String, q: ListQuery| {
                let store = store.clone();
                async move {
                    let id = query::path_id(&id).map_err(warp::reject::custom)?;
                    let fill = q.fill().map_err(warp::reject::custom)?;
                    let author = store::blocking(&store, move |s| {
                        let record = s.get_author(id)?;
                        let posts = fill
                            .map(|pagination| {
                                s.get_posts(&PostFilter {
                                    pagination,
                                    authors: vec![id],
                                    ..PostFilter::default()
                                })
                            })
                            .transpose()?;
                        Ok(Filled { record, posts })
                    })
                    .await
                    .map_err(warp::reject::custom)?;
                    Ok::<_, Rejection>(reply::json(&author).into_response())
                }
            })
            .boxed()
    }

    /// `GET /api/tag`
    pub fn list_tags(&self) -> BoxedFilter<(Response,)> {
        let store = self.store.clone();
        warp::path!("api" / "tag")
            .and(warp::get())
            .and(ListQuery::to_filter())
            .and_then(move |q: ListQuery| {
                let store = store.clone();
                async move {
                    let page = q.pagination().map_err(warp::reject::custom)?;
                    let tags = store::blocking(&store, move |s| s.get_tags(&page))
                        .await
                        .map_err(warp::reject::custom)?;
                    Ok::<_, Rejection>(reply::json(&tags).into_response())
                }
            })
            .boxed()
    }

    /// `GET /api/tag/:tag`
    pub fn get_tag(&self) -> BoxedFilter<(Response,)> {
        let store = self.store.clone();
        warp::path!("api" / "tag" / String)
            .and(warp::get())
            .and(ListQuery::to_filter())
            .and_then(move |tag: String, q: ListQuery| {
                let store = store.clone();
                async move {
                    let tag = query::path_tag(&tag).map_err(warp::reject::custom)?;
                    let fill = q.fill().map_err(warp::reject::custom)?;
                    let tag = store::blocking(&store, move |s| {
                        let record = s.get_tag(&tag)?;
                        let posts = fill
                            .map(|pagination| {
                                s.get_posts(&PostFilter {
                                    pagination,
                                    tags: vec![tag.clone()],
                                    ..PostFilter::default()
                                })
                            })
                            .transpose()?;
                        Ok(Filled { record, posts })
                    })
                    .await
                    .map_err(warp::reject::custom)?;
                    Ok::<_, Rejection>(reply::json(&tag).into_response())
                }
            })
            .boxed()
    }

    /// `GET /api/trending`
    pub fn trending(&self) -> BoxedFilter<(Response,)> {
        let store = self.store.clone();
        warp::path!("api" / "trending")
            .and(warp::get())
            .and_then(move || {
                let store = store.clone();
                async move {
                    let tags = store::blocking(&store, |s| s.get_trending_tags())
                        .await
                        .map_err(warp::reject::custom)?;
                    Ok::<_, Rejection>(reply::json(&tags).into_response())
                }
            })
            .boxed()
    }

    /// `GET /api/health`
    pub fn health(&self) -> BoxedFilter<(Response,)> {
        warp::path!("api" / "health")
            .and(warp::get())
            .map(|| "OK".into_response())
            .boxed()
    }

    /// `GET /api/status`
    #[cfg(feature = "stub_status")]
    pub fn status(&self) -> BoxedFilter<(Response,)> {
        let hub = self.hub.clone();
        warp::path!("api" / "status")
            .and(warp::get())
            .map(move || {
                format!(
                    "Current connections: {}\nLast post: {}",
                    hub.subscriber_count(),
                    hub.last_id().map_or_else(|| "none".to_string(), |id| id.to_string())
                )
                .into_response()
            })
            .boxed()
    }

    #[cfg(not(feature = "stub_status"))]
    pub fn status(&self) -> BoxedFilter<(Response,)> {
        warp::path!("api" / "status")
            .and_then(|| async { Err::<Response, _>(warp::reject::not_found()) })
            .boxed()
    }

    /// `GET /metrics`
    pub fn metrics(&self, bearer: Option<String>) -> BoxedFilter<(Response,)> {
        let (store, metrics) = (self.store.clone(), self.metrics.clone());
        let expected = bearer.map(|token| format!("Bearer {}", token));
        warp::path!("metrics")
            .and(warp::get())
            .and(warp::header::optional::<String>("authorization"))
            .and_then(move |given: Option<String>| {
                let (store, metrics) = (store.clone(), metrics.clone());
                let authorized = expected.is_none() || given == expected;
                async move {
                    if !authorized {
                        return Err(warp::reject::custom(Unauthorized));
                    }
                    let counts = match store::blocking(&store, |s| s.counts()).await {
                        Ok(counts) => counts,
                        Err(e) => {
                            log::error!("Could not count rows for the metrics: {}", e);
                            Counts::default()
                        }
                    };
                    Ok::<_, Rejection>(match metrics.render(counts) {
                        Ok((body, content_type)) => {
                            reply::with_header(body, "content-type", content_type).into_response()
                        }
                        Err(e) => {
                            log::error!("Could not render the metrics: {}", e);
                            StatusCode::INTERNAL_SERVER_ERROR.into_response()
                        }
                    })
                }
            })
            .boxed()
    }

    /// Passes only requests carrying the debug pin; rejects as not found when debug mode
    /// is off.
    fn debug_auth(pin: Option<String>) -> BoxedFilter<()> {
        warp::header::optional::<String>("x-debug-pin")
            .and_then(move |given: Option<String>| {
                let pin = pin.clone();
                async move {
                    let pin = pin.ok_or_else(warp::reject::not_found)?;
                    if given.as_deref() != Some(pin.as_str()) {
                        return Err(warp::reject::custom(Unauthorized));
                    }
                    Ok::<_, Rejection>(())
                }
            })
            .untuple_one()
            .boxed()
    }

    /// `POST /api/debug/cleanup`: wipe the store and forget the hub's last post.
    pub fn debug_cleanup(&self, pin: Option<String>) -> BoxedFilter<(Response,)> {
        let (store, hub) = (self.store.clone(), self.hub.clone());
        warp::path!("api" / "debug" / "cleanup")
            .and(warp::post())
            .and(Self::debug_auth(pin))
            .and_then(move || {
                let (store, hub) = (store.clone(), hub.clone());
                async move {
                    log::warn!("Debug cleanup requested; deleting every post");
                    store::blocking(&store, |s| s.clean_up())
                        .await
                        .map_err(warp::reject::custom)?;
                    if let Err(e) = hub.debug_reset() {
                        log::error!("Store wiped but the hub kept its last post: {}", e);
                    }
                    Ok::<_, Rejection>(StatusCode::OK.into_response())
                }
            })
            .boxed()
    }

    /// `PUT /api/debug/trending/:tag` flags a tag trending, `DELETE` clears the flag.
    pub fn debug_trending(&self, pin: Option<String>) -> BoxedFilter<(Response,)> {
        let store = self.store.clone();
        let method = warp::put().map(|| true).or(warp::delete().map(|| false)).unify();
        warp::path!("api" / "debug" / "trending" / String)
            .and(method)
            .and(Self::debug_auth(pin))
            .and_then(move |tag: String, trending: bool| {
                let store = store.clone();
                async move {
                    let tag = query::path_tag(&tag).map_err(warp::reject::custom)?;
                    log::warn!("Debug request sets trending={} on #{}", trending, tag);
                    store::blocking(&store, move |s| s.set_trending(&tag, trending))
                        .await
                        .map_err(warp::reject::custom)?;
                    Ok::<_, Rejection>(StatusCode::OK.into_response())
                }
            })
            .boxed()
    }

    /// Turn every rejection into the JSON error body clients expect.
    pub async fn err(r: Rejection) -> Result<impl Reply, Infallible> {
        let (status, body) = if let Some(e) = r.find::<FilterErr>() {
            (StatusCode::BAD_REQUEST, json!({ "reason": e.to_string() }))
        } else if let Some(e) = r.find::<PostErr>() {
            (StatusCode::BAD_REQUEST, json!({ "reason": e.to_string() }))
        } else if let Some(e) = r.find::<InvalidQuery>() {
            (StatusCode::BAD_REQUEST, json!({ "reason": e.to_string() }))
        } else if let Some(e) = r.find::<BodyDeserializeError>() {
            (StatusCode::BAD_REQUEST, json!({ "reason": e.to_string() }))
        } else if r.find::<Unauthorized>().is_some() {
            (StatusCode::UNAUTHORIZED, json!({ "reason": "wrong or missing credentials" }))
        } else if let Some(e) = r.find::<store::Error>() {
            if e.is_not_found() {
                (StatusCode::NOT_FOUND, json!({ "reason": e.to_string() }))
            } else {
                log::error!("{}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
            }
        } else if r.is_not_found() {
            (StatusCode::NOT_FOUND, json!({ "reason": "not found" }))
        } else if r.find::<MethodNotAllowed>().is_some() {
            (StatusCode::METHOD_NOT_ALLOWED, json!({ "reason": "method not allowed" }))
        } else if let Some(e) = r.find::<warp::reject::PayloadTooLarge>() {
            (StatusCode::PAYLOAD_TOO_LARGE, json!({ "reason": e.to_string() }))
        } else {
            log::warn!("Unhandled rejection: {:?}", r);
            (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "internal error" }))
        };
        Ok(reply::with_status(reply::json(&body), status))
    }
}
