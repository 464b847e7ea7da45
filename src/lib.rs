//! Long-polling server for a small microblog
//!
//! Clients publish short posts (`POST /api/post`) and wait for new ones with
//! `GET /api/poll`, optionally narrowed to one author or one tag.  A waiting request is
//! answered as soon as a matching post exists past the client's cursor, or with
//! `204 No Content` once the poll timeout expires.
//!
//! # Notes on data flow
//! * **Client Request → Warp**:
//! Warp filters for valid requests and parses the query string into a `PollRequest` (or
//! a `PostFilter` for listings).  Invalid or conflicting parameters are rejected before
//! anything touches the store.
//!
//! * **Warp → LongPoll**:
//! Each poll request subscribes to the `Hub` and watches the posts it pushes.  A post
//! directly after the client's cursor is judged locally; anything else is settled with a
//! store query.  The subscription is dropped as soon as the request ends, including when
//! the client disconnects.
//!
//! * **Store → Hub**:
//! Every successful `POST /api/post` notifies the hub, whose single worker keeps the
//! newest known post and fans it out to the subscribers.  The `Reconciler` compares the
//! hub with the store on an interval to pick up posts the hub never heard about.

pub mod config;
pub mod err;
pub mod post;
pub mod request;
pub mod response;
pub mod store;
