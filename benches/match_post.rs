use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;
use tutter::post::{Author, Id, NewPost, Post};
use tutter::request::{PollFilter, PollQuery, PollRequest};

use chrono::Utc;
use std::convert::TryFrom;

const TEXT: &str = "Reading #Rust docs on the train, then #tokio and #warp before lunch #lunch";

fn parse_poll_query(c: &mut Criterion) {
    c.bench_function("parse poll query", |b| {
        b.iter(|| {
            PollRequest::try_from(black_box(PollQuery {
                last: Some(1234),
                tag: Some("#Rust".to_string()),
                author_id: None,
            }))
        })
    });
}

fn extract_tags(c: &mut Criterion) {
    let post = NewPost::new("commuter", TEXT);
    c.bench_function("extract tags", |b| b.iter(|| black_box(&post).tags()));
}

fn post() -> Post {
    let new_post = NewPost::new("commuter", TEXT);
    Post {
        id: Id(1),
        created_at: Utc::now(),
        author: Author {
            id: Id(7),
            name: new_post.author.clone(),
            first_seen: Utc::now(),
        },
        tags: new_post.tags(),
        text: new_post.text,
    }
}

fn match_post(c: &mut Criterion) {
    let post = post();
    let by_tag = PollFilter::tag("warp").expect("hardcoded");
    let by_author = PollFilter::Author(Id(8));
    c.bench_function("match tag filter", |b| {
        b.iter(|| by_tag.matches(black_box(&post)))
    });
    c.bench_function("match author filter", |b| {
        b.iter(|| by_author.matches(black_box(&post)))
    });
}

criterion_group!(benches, parse_poll_query, extract_tags, match_post);
criterion_main!(benches);
