// src/index/mod.rs

//! Search-index surface: the `Indexable` capability and the wire shape of
//! indexed documents.

pub mod client;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::codec::Value;
use crate::error::Result;
use crate::models::{Entity, Post};

pub use client::{IndexClient, connect, put_with_retry};

/// Index metadata for one document.
#[derive(Debug, Clone)]
pub struct DocMeta {
    pub id: String,
}

/// Wire representation of one document in the news index. Empty fields are
/// dropped from the serialized form.
#[derive(Debug, Clone, Serialize)]
pub struct NewsDoc {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub news_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_on: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Capability of record kinds that can be written to the news index.
pub trait Indexable {
    fn metadata(&self) -> DocMeta;
    fn fields(&self) -> NewsDoc;
}

/// A record transformed and ready for a bulk write.
#[derive(Debug, Clone)]
pub struct BulkDoc {
    pub meta: DocMeta,
    pub doc: NewsDoc,
}

impl BulkDoc {
    pub fn from_record<T: Indexable>(record: &T) -> Self {
        Self {
            meta: record.metadata(),
            doc: record.fields(),
        }
    }
}

/// Result of one bulk write. Duplicate rejections are benign overlap with
/// prior runs, not failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkOutcome {
    pub indexed: usize,
    pub duplicates: usize,
}

/// Remote bulk-write endpoint.
#[async_trait]
pub trait BulkSink: Send + Sync {
    async fn bulk_write(&self, docs: &[BulkDoc], timeout: Duration) -> Result<BulkOutcome>;
}

/// Remote single-document endpoint. One write attempt; retries are driven
/// by [`client::put_with_retry`].
#[async_trait]
pub trait DocSink: Send + Sync {
    async fn write_doc(&self, doc: &BulkDoc, timeout: Duration) -> Result<()>;
}

/// A crawled post paired with its source classification, ready for the
/// index.
///
/// Posts from an entity's own timeline carry the entity as their source;
/// mention-mode posts carry the post author instead.
#[derive(Debug, Clone)]
pub struct IndexedPost {
    post: Post,
    source: Option<String>,
    source_type: String,
}

impl IndexedPost {
    /// A post crawled from the entity's own timeline.
    pub fn own_timeline(post: Post, entity: &Entity) -> Self {
        Self {
            source: Some(entity.name.clone()),
            source_type: entity.kind.clone(),
            post,
        }
    }

    /// A post found by searching for mentions of an entity. The author's
    /// display name, when the source provided it, becomes the source.
    pub fn mention(post: Post) -> Self {
        Self {
            source: post
                .extra
                .get("name")
                .and_then(Value::as_str)
                .map(String::from),
            source_type: "author".to_string(),
            post,
        }
    }

    /// Flatten the `reply_to` sub-records into plain author names.
    fn mentions(&self) -> Vec<String> {
        let Some(Value::List(items)) = self.post.extra.get("reply_to") else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::Map(fields) => fields.get("name").and_then(Value::as_str),
                _ => None,
            })
            .map(String::from)
            .collect()
    }
}

impl Indexable for IndexedPost {
    fn metadata(&self) -> DocMeta {
        DocMeta {
            id: self.post.id.clone(),
        }
    }

    fn fields(&self) -> NewsDoc {
        NewsDoc {
            news_type: "post".to_string(),
            source: self.source.clone(),
            source_type: Some(self.source_type.clone()),
            mentions: self.mentions(),
            title: self.post.text.clone(),
            body: None,
            published_on: self.post.published_on(),
            url: self
                .post
                .extra
                .get("link")
                .and_then(Value::as_str)
                .map(String::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::models::PostTime;

    fn post() -> Post {
        let mut reply = HashMap::new();
        reply.insert("name".to_string(), Value::Str("somebody".to_string()));
        Post::new("9", "hello world", PostTime::Millis(1_700_000_000_000))
            .with_extra("name", Value::Str("Author Name".to_string()))
            .with_extra("link", Value::Str("https://example.com/9".to_string()))
            .with_extra("reply_to", Value::List(vec![Value::Map(reply)]))
    }

    #[test]
    fn own_timeline_posts_carry_the_entity() {
        let entity = Entity::new("Acme Corp", "acme", "organization");
        let doc = IndexedPost::own_timeline(post(), &entity).fields();
        assert_eq!(doc.source.as_deref(), Some("Acme Corp"));
        assert_eq!(doc.source_type.as_deref(), Some("organization"));
    }

    #[test]
    fn mention_posts_carry_the_author() {
        let doc = IndexedPost::mention(post()).fields();
        assert_eq!(doc.source.as_deref(), Some("Author Name"));
        assert_eq!(doc.source_type.as_deref(), Some("author"));
    }

    #[test]
    fn reply_to_flattens_to_name_list() {
        let doc = IndexedPost::mention(post()).fields();
        assert_eq!(doc.mentions, vec!["somebody"]);
    }

    #[test]
    fn empty_fields_are_dropped_from_the_document() {
        let entity = Entity::new("Acme Corp", "acme", "organization");
        let bare = Post::new("1", "text", PostTime::Formatted("garbage".to_string()));
        let doc = IndexedPost::own_timeline(bare, &entity).fields();
        let json = serde_json::to_value(&doc).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("mentions"));
        assert!(!obj.contains_key("url"));
        assert!(!obj.contains_key("body"));
        assert!(!obj.contains_key("published_on"));
        assert_eq!(obj["title"], "text");
    }

    #[test]
    fn metadata_uses_the_post_id() {
        let entity = Entity::new("Acme Corp", "acme", "organization");
        assert_eq!(IndexedPost::own_timeline(post(), &entity).metadata().id, "9");
    }
}
