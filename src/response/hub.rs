//! Keeps the newest known post and pushes every newer one to the live subscribers.
//!
//! A single worker task owns all writes: it drains the inbound queue filled by
//! [`Hub::notify`], swaps the "last known" cell when a post is newer than what it
//! holds, and fans the post out to each subscriber with a non-blocking send.  Reading
//! the cell is a lock-free load.
mod err;
mod subscription;

pub use err::Error;
pub use subscription::Subscription;

use crate::post::{Id, Post};

use arc_swap::ArcSwapOption;
use hashbrown::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type Result<T> = std::result::Result<T, Error>;
type Registry = Arc<Mutex<HashMap<Uuid, mpsc::Sender<Arc<Post>>>>>;
type LastKnown = Arc<ArcSwapOption<Post>>;

enum Msg {
    Post(Arc<Post>),
    Reset,
}

#[derive(Clone, Debug)]
pub struct Hub {
    inbox: mpsc::UnboundedSender<Msg>,
    last_known: LastKnown,
    subscribers: Registry,
    queue_len: usize,
    allow_debug: bool,
}

impl std::fmt::Debug for Msg {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Msg::Post(post) => write!(f, "Post({})", post.id),
            Msg::Reset => write!(f, "Reset"),
        }
    }
}

impl Hub {
    /// Start a hub seeded with `last_post` and spawn its worker.  Must be called from
    /// within a tokio runtime.
    pub fn new(last_post: Option<Post>, queue_len: usize, allow_debug: bool) -> Self {
        if last_post.is_none() {
            log::warn!("Starting the hub without a last post");
        }
        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        let last_known = LastKnown::new(ArcSwapOption::from_pointee(last_post));
        let subscribers = Registry::default();

        let worker = Worker {
            inbox: inbox_rx,
            last_known: Arc::clone(&last_known),
            subscribers: Arc::clone(&subscribers),
        };
        tokio::spawn(worker.run());

        Self {
            inbox,
            last_known,
            subscribers,
            queue_len: queue_len.max(1),
            allow_debug,
        }
    }

    /// Queue a post for broadcast.  Posts that are not newer than the last known one are
    /// dropped by the worker, so notifying twice (or out of order) is harmless.
    pub fn notify(&self, post: impl Into<Arc<Post>>) -> Result<()> {
        self.inbox
            .send(Msg::Post(post.into()))
            .map_err(|_| Error::WorkerGone)
    }

    /// Register a subscriber until `cancel` fires.
    ///
    /// The current last post (if any) is queued before this returns, so callers never
    /// need to re-check the hub after subscribing.  The same post may therefore arrive
    /// twice; consumers must ignore ids they have already seen.
    pub fn subscribe(&self, cancel: CancellationToken) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_len);
        let id = Uuid::new_v4();
        {
            let mut subscribers = lock(&self.subscribers);
            // Read the cell under the registry lock: a post stored after this point is
            // fanned out to us, one stored before it is the one we queue here.
            if let Some(last) = self.last_post() {
                tx.try_send(last).unwrap_or_else(|e| log::error!("{}", e));
            }
            subscribers.insert(id, tx);
        }

        let subscribers = Arc::clone(&self.subscribers);
        tokio::spawn(async move {
            cancel.cancelled().await;
            if lock(&subscribers).remove(&id).is_some() {
                log::debug!("Subscription {} cancelled", id);
            }
        });

        Subscription::new(id, rx)
    }

    pub fn last_post(&self) -> Option<Arc<Post>> {
        self.last_known.load_full()
    }

    pub fn last_id(&self) -> Option<Id> {
        (*self.last_known.load()).as_ref().map(|post| post.id)
    }

    /// Forget the last known post.  Only allowed for hubs built with `allow_debug`.
    pub fn debug_reset(&self) -> Result<()> {
        if !self.allow_debug {
            return Err(Error::DebugDisabled);
        }
        self.inbox.send(Msg::Reset).map_err(|_| Error::WorkerGone)
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

fn lock(registry: &Registry) -> MutexGuard<HashMap<Uuid, mpsc::Sender<Arc<Post>>>> {
    registry.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        log::error!("{}", &poisoned);
        poisoned.into_inner()
    })
}

fn same_post(a: &Option<Arc<Post>>, b: &Option<Arc<Post>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

struct Worker {
    inbox: mpsc::UnboundedReceiver<Msg>,
    last_known: LastKnown,
    subscribers: Registry,
}

impl Worker {
    async fn run(mut self) {
        while let Some(msg) = self.inbox.recv().await {
            match msg {
                Msg::Post(post) => self.accept(post),
                Msg::Reset => {
                    log::warn!("Hub reset; the last known post is forgotten");
                    self.last_known.store(None);
                }
            }
        }
        log::info!("Hub worker stopped");
    }

    fn accept(&self, post: Arc<Post>) {
        let current = self.last_known.load_full();
        if let Some(last) = &current {
            if post.id <= last.id {
                log::trace!("Ignoring post {}; already at {}", post.id, last.id);
                return;
            }
        }

        let previous = self
            .last_known
            .compare_and_swap(&current, Some(Arc::clone(&post)));
        if !same_post(&previous, &current) {
            panic!(
                "The last known post changed outside of the hub worker while storing {}",
                post.id
            );
        }
        self.fan_out(post);
    }

    fn fan_out(&self, post: Arc<Post>) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|id, channel| match channel.try_send(Arc::clone(&post)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("Subscriber {} is lagging; dropped post {}", id, post.id);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }
}
