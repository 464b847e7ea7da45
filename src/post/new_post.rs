use regex::Regex;
use serde_derive::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

const MAX_TEXT_CHARS: usize = 260;
const MAX_AUTHOR_CHARS: usize = 32;

static AUTHOR: OnceLock<Regex> = OnceLock::new();
static TAG: OnceLock<Regex> = OnceLock::new();

/// The body of a `POST /api/post` request.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct NewPost {
    pub author: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostErr {
    Empty,
    TooLong,
    InvalidAuthor,
}

impl std::error::Error for PostErr {}

impl fmt::Display for PostErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use PostErr::*;
        let msg = match self {
            Empty => "text or author empty",
            TooLong => "text or author too long",
            InvalidAuthor => "author invalid",
        };
        write!(f, "{}", msg)
    }
}

impl NewPost {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }

    /// Check both fields against the posting rules and trim them.  Lengths apply to the
    /// text as sent, padding included.
    pub fn checked(self) -> Result<Self, PostErr> {
        if self.author.chars().count() > MAX_AUTHOR_CHARS
            || self.text.chars().count() > MAX_TEXT_CHARS
        {
            return Err(PostErr::TooLong);
        }
        let (author, text) = (self.author.trim(), self.text.trim());
        if author.is_empty() || text.is_empty() {
            return Err(PostErr::Empty);
        }
        let author_rule = AUTHOR.get_or_init(|| Regex::new(r"^[a-z0-9_]+$").expect("hardcoded"));
        if !author_rule.is_match(author) {
            return Err(PostErr::InvalidAuthor);
        }
        Ok(Self::new(author, text))
    }

    /// The lowercased, de-duplicated `#hashtags` of the text.
    pub fn tags(&self) -> BTreeSet<String> {
        TAG.get_or_init(|| Regex::new(r"#([a-zA-Z0-9]+)").expect("hardcoded"))
            .captures_iter(&self.text)
            .map(|cap| cap[1].to_lowercase())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tags_are_lowercased_and_deduplicated() {
        let post = NewPost::new("alma", "#Barack and #barack, #körte #x1");
        let tags: Vec<_> = post.tags().into_iter().collect();
        assert_eq!(tags, vec!["barack", "k", "x1"]);
    }

    #[test]
    fn checked_trims_fields() {
        let post = NewPost::new("  alma ", " hello ").checked().expect("in test");
        assert_eq!(post, NewPost::new("alma", "hello"));
    }

    #[test]
    fn checked_rejects_bad_input() {
        assert_eq!(NewPost::new("", "x").checked(), Err(PostErr::Empty));
        assert_eq!(NewPost::new("alma", "   ").checked(), Err(PostErr::Empty));
        assert_eq!(NewPost::new("Alma", "x").checked(), Err(PostErr::InvalidAuthor));
        assert_eq!(NewPost::new("a".repeat(33), "x").checked(), Err(PostErr::TooLong));
        assert_eq!(NewPost::new("alma", "é".repeat(261)).checked(), Err(PostErr::TooLong));
        assert!(NewPost::new("alma", "é".repeat(260)).checked().is_ok());
    }

    #[test]
    fn padding_counts_towards_the_limit() {
        let padded = format!("  {}  ", "x".repeat(258));
        assert_eq!(NewPost::new("alma", padded).checked(), Err(PostErr::TooLong));

        let padded = format!(" {} ", "x".repeat(258));
        assert!(NewPost::new("alma", padded).checked().is_ok());
        assert_eq!(
            NewPost::new(format!(" {}", "a".repeat(32)), "x").checked(),
            Err(PostErr::TooLong)
        );
    }
}
