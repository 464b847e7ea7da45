//! Waiting for the first post a poll request has not seen yet
//!
//! A wait alternates between two stages.  While `WaitingLocal` it only watches the hub:
//! posts at or below the cursor are old news, and the post directly after the cursor can
//! be judged on the spot because nothing can hide between the two.  Anything else (a
//! match, or a jump of more than one id) sends the wait to the store, which answers the
//! full question "what matches after the cursor".  An empty answer means the local view
//! was right after all, so the cursor moves to the post that triggered the query and the
//! wait goes back to the hub.
use super::hub::Hub;
use crate::post::{Id, Post};
use crate::request::{PollFilter, PollRequest};
use crate::store::{self, SharedStore};

use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Posts(Vec<Post>),
    TimedOut,
    Disconnected,
}

#[derive(Debug, PartialEq)]
enum State {
    WaitingLocal { cursor: Id },
    Reconciling { cursor: Id, hint: Id },
    Done(Vec<Post>),
    TimedOut,
    Disconnected,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use State::*;
        match self {
            WaitingLocal { cursor } => write!(f, "waiting for posts after {}", cursor),
            Reconciling { cursor, hint } => {
                write!(f, "querying posts after {} (saw {})", cursor, hint)
            }
            Done(posts) => write!(f, "done with {} post(s)", posts.len()),
            TimedOut => write!(f, "timed out"),
            Disconnected => write!(f, "disconnected"),
        }
    }
}

#[derive(Clone)]
pub struct LongPoll {
    hub: Hub,
    store: SharedStore,
    timeout: Duration,
}

impl LongPoll {
    pub fn new(hub: Hub, store: SharedStore, timeout: Duration) -> Self {
        Self {
            hub,
            store,
            timeout,
        }
    }

    /// Wait until a post matching `request` exists past its cursor, the timeout expires,
    /// or `cancel` fires.  Store failures abandon the wait.  The timeout also bounds a
    /// store query in flight; the blocking call itself runs to completion unobserved.
    ///
    /// Without an explicit cursor the wait starts from the hub's current last post; a
    /// post created between the client's previous answer and this call is then missed.
    pub async fn wait(
        &self,
        request: PollRequest,
        cancel: CancellationToken,
    ) -> Result<Outcome, store::Error> {
        let cursor = request
            .cursor
            .or_else(|| self.hub.last_id())
            .unwrap_or_default();

        // The subscription lives exactly as long as this future.
        let unsubscribe = cancel.child_token();
        let _unsubscribe_on_exit = unsubscribe.clone().drop_guard();
        let mut subscription = self.hub.subscribe(unsubscribe);

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let mut state = State::WaitingLocal { cursor };
        log::debug!("Poll {}: {}", subscription.id(), state);
        loop {
            let next = match state {
                State::WaitingLocal { cursor } => tokio::select! {
                    _ = cancel.cancelled() => State::Disconnected,
                    _ = &mut deadline => State::TimedOut,
                    post = subscription.recv() => match post {
                        Some(post) => evaluate(&post, cursor, &request.filter),
                        None => State::Disconnected,
                    },
                },
                State::Reconciling { cursor, hint } => {
                    let query = request.filter.newer_than(cursor);
                    let posts = store::blocking(&self.store, move |store| store.get_posts(&query));
                    tokio::select! {
                        _ = cancel.cancelled() => State::Disconnected,
                        _ = &mut deadline => State::TimedOut,
                        posts = posts => match posts {
                            Ok(posts) if !posts.is_empty() => State::Done(posts),
                            Ok(_) => State::WaitingLocal { cursor: hint },
                            Err(e) if e.is_not_found() => State::WaitingLocal { cursor: hint },
                            Err(e) => {
                                log::error!("Poll {}: {}", subscription.id(), e);
                                return Err(e);
                            }
                        },
                    }
                }
                State::Done(posts) => return Ok(Outcome::Posts(posts)),
                State::TimedOut => return Ok(Outcome::TimedOut),
                State::Disconnected => return Ok(Outcome::Disconnected),
            };
            log::debug!("Poll {}: {}", subscription.id(), next);
            state = next;
        }
    }
}

/// The local stage's decision about one post from the hub.
fn evaluate(post: &Post, cursor: Id, filter: &PollFilter) -> State {
    if post.id <= cursor {
        State::WaitingLocal { cursor }
    } else if post.id == cursor.next() && !filter.matches(post) {
        State::WaitingLocal { cursor: post.id }
    } else {
        State::Reconciling {
            cursor,
            hint: post.id,
        }
    }
}
