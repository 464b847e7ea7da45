//! Everything between a new post and the clients waiting for it
pub mod hub;
pub mod long_poll;
pub mod metrics;
pub mod reconcile;

pub use hub::{Hub, Subscription};
pub use long_poll::{LongPoll, Outcome};
pub use metrics::Metrics;
pub use reconcile::Reconciler;
