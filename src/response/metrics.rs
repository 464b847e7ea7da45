//! Row counts in the Prometheus text format
use crate::post::Counts;

use prometheus::{Encoder, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    posts: IntGauge,
    authors: IntGauge,
    tags: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let gauge = |name: &str, help: &str| IntGauge::new(name, help).expect("hardcoded");
        let metrics = Self {
            registry: Registry::new(),
            posts: gauge("tutter_posts_count", "Count of posts"),
            authors: gauge("tutter_authors_count", "Count of authors"),
            tags: gauge("tutter_tags_count", "Count of tags"),
        };
        for collector in &[&metrics.posts, &metrics.authors, &metrics.tags] {
            metrics
                .registry
                .register(Box::new((*collector).clone()))
                .expect("registered once");
        }
        metrics
    }

    /// Record `counts` and render every metric, with the content type to serve it as.
    pub fn render(&self, counts: Counts) -> Result<(Vec<u8>, String), prometheus::Error> {
        self.posts.set(counts.posts as i64);
        self.authors.set(counts.authors as i64);
        self.tags.set(counts.tags as i64);

        let encoder = TextEncoder::new();
        let mut body = Vec::new();
        encoder.encode(&self.registry.gather(), &mut body)?;
        Ok((body, encoder.format_type().to_string()))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
