// src/models/post.rs

//! Crawled posts.
//!
//! The crawl source emits ad hoc mappings, so a post keeps a fixed set of
//! well-known fields plus an open `extra` mapping for everything else
//! (author name, link, reply_to sub-records, ...).

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::codec::Value;
use crate::models::BOUND_FORMAT;

/// Timestamp as delivered by the crawl source: either epoch milliseconds
/// or a formatted "%Y-%m-%d %H:%M:%S %Z" string.
#[derive(Debug, Clone, PartialEq)]
pub enum PostTime {
    Millis(i64),
    Formatted(String),
}

impl PostTime {
    /// Resolve to a concrete UTC timestamp, if the raw value parses.
    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            PostTime::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            PostTime::Formatted(s) => {
                // The trailing zone token is informational; the source
                // reports in UTC.
                NaiveDateTime::parse_from_str(s, BOUND_FORMAT)
                    .ok()
                    .or_else(|| {
                        s.rsplit_once(' ').and_then(|(head, _zone)| {
                            NaiveDateTime::parse_from_str(head, BOUND_FORMAT).ok()
                        })
                    })
                    .map(|dt| dt.and_utc())
            }
        }
    }
}

/// One crawled item.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Unique identifier on the crawl source
    pub id: String,

    /// Free text content
    pub text: String,

    /// Timestamp as delivered by the source
    pub created_at: PostTime,

    /// Everything else the source emitted
    pub extra: HashMap<String, Value>,
}

impl Post {
    pub fn new(id: impl Into<String>, text: impl Into<String>, created_at: PostTime) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at,
            extra: HashMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Resolve the source timestamp to UTC.
    pub fn published_on(&self) -> Option<DateTime<Utc>> {
        self.created_at.resolve()
    }

    /// Encode as a codec value for the buffer file.
    pub fn to_value(&self) -> Value {
        let mut fields: HashMap<String, Value> = self.extra.clone();
        fields.insert("id".to_string(), Value::Str(self.id.clone()));
        fields.insert("text".to_string(), Value::Str(self.text.clone()));
        let created_at = match &self.created_at {
            PostTime::Millis(ms) => Value::Int(*ms),
            PostTime::Formatted(s) => Value::Str(s.clone()),
        };
        fields.insert("created_at".to_string(), created_at);
        Value::Map(fields)
    }

    /// Decode from a replayed codec value. Values missing the essential
    /// fields are not posts and yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Map(mut fields) = value else {
            return None;
        };
        let id = match fields.remove("id") {
            Some(Value::Str(s)) => s,
            Some(Value::Int(i)) => i.to_string(),
            _ => return None,
        };
        let text = match fields.remove("text") {
            Some(Value::Str(s)) => s,
            _ => return None,
        };
        let created_at = match fields.remove("created_at") {
            Some(Value::Int(ms)) => PostTime::Millis(ms),
            Some(Value::Str(s)) => PostTime::Formatted(s),
            Some(Value::DateTime(dt)) => {
                PostTime::Formatted(format!("{} UTC", dt.format(BOUND_FORMAT)))
            }
            _ => return None,
        };
        Some(Self {
            id,
            text,
            created_at,
            extra: fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_round_trip_keeps_extra_fields() {
        let post = Post::new("123", "hello", PostTime::Millis(1_700_000_000_000))
            .with_extra("link", Value::Str("https://example.com/123".to_string()))
            .with_extra("likes", Value::Int(9));
        let back = Post::from_value(post.to_value()).unwrap();
        assert_eq!(back, post);
    }

    #[test]
    fn from_value_rejects_non_posts() {
        assert!(Post::from_value(Value::Int(1)).is_none());
        assert!(Post::from_value(Value::Map(HashMap::new())).is_none());
    }

    #[test]
    fn from_value_accepts_integer_ids() {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), Value::Int(42));
        fields.insert("text".to_string(), Value::Str("t".to_string()));
        fields.insert("created_at".to_string(), Value::Int(0));
        let post = Post::from_value(Value::Map(fields)).unwrap();
        assert_eq!(post.id, "42");
    }

    #[test]
    fn millis_resolve_to_utc() {
        let time = PostTime::Millis(1_700_000_000_000);
        assert_eq!(
            time.resolve().unwrap().timestamp_millis(),
            1_700_000_000_000
        );
    }

    #[test]
    fn formatted_resolves_with_and_without_zone() {
        let with_zone = PostTime::Formatted("2026-03-01 09:30:00 UTC".to_string());
        let without = PostTime::Formatted("2026-03-01 09:30:00".to_string());
        assert_eq!(with_zone.resolve(), without.resolve());
        assert!(with_zone.resolve().is_some());
    }

    #[test]
    fn garbage_timestamp_resolves_to_none() {
        assert!(PostTime::Formatted("soon".to_string()).resolve().is_none());
    }
}
