use crate::post::Post;

use futures::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use uuid::Uuid;

/// The receiving end of a hub subscription.
///
/// Yields posts in non-decreasing id order, possibly with repeats, and ends once the
/// cancellation token it was created with fires.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<Arc<Post>>,
}

impl Subscription {
    pub(super) fn new(id: Uuid, rx: mpsc::Receiver<Arc<Post>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Arc<Post>> {
        self.rx.recv().await
    }
}

impl Stream for Subscription {
    type Item = Arc<Post>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
