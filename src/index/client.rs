// src/index/client.rs

//! HTTP client for the search index's bulk-write contract.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::IndexConfig;
use crate::error::{AppError, Result};
use crate::index::{BulkDoc, BulkOutcome, BulkSink, DocSink};
use crate::utils::retry::{RetryPolicy, with_retry};

static CLIENT: OnceLock<IndexClient> = OnceLock::new();

/// Process-wide index connection. The first call builds the client; later
/// calls return the cached handle regardless of their config.
pub fn connect(config: &IndexConfig) -> Result<&'static IndexClient> {
    if let Some(client) = CLIENT.get() {
        return Ok(client);
    }
    let client = IndexClient::new(config)?;
    Ok(CLIENT.get_or_init(|| client))
}

/// Client for one search index.
pub struct IndexClient {
    http: reqwest::Client,
    base_url: String,
    index: String,
    put_policy: RetryPolicy,
}

impl IndexClient {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            put_policy: RetryPolicy::backoff(10, Duration::from_secs(1), 2),
        })
    }

    /// Write a single document, retrying with backoff. For one-off writes;
    /// large sequences go through the bulk pusher.
    pub async fn put_doc(&self, doc: &BulkDoc, timeout: Duration) -> Result<()> {
        put_with_retry(self, &self.put_policy, doc, timeout).await
    }
}

/// Drive one document through the sink under the retry policy.
pub async fn put_with_retry(
    sink: &dyn DocSink,
    policy: &RetryPolicy,
    doc: &BulkDoc,
    timeout: Duration,
) -> Result<()> {
    with_retry(policy, || sink.write_doc(doc, timeout)).await
}

#[async_trait]
impl DocSink for IndexClient {
    async fn write_doc(&self, doc: &BulkDoc, timeout: Duration) -> Result<()> {
        let url = format!("{}/{}/_doc/{}", self.base_url, self.index, doc.meta.id);
        let response = self
            .http
            .put(&url)
            .header("content-type", "application/json")
            .body(serde_json::to_vec(&doc.doc)?)
            .timeout(timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::index(format!(
                "put failed with {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BulkSink for IndexClient {
    async fn bulk_write(&self, docs: &[BulkDoc], timeout: Duration) -> Result<BulkOutcome> {
        let mut body = String::new();
        for doc in docs {
            let action = serde_json::json!({ "index": { "_id": doc.meta.id } });
            body.push_str(&serde_json::to_string(&action)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(&doc.doc)?);
            body.push('\n');
        }

        let url = format!("{}/{}/_bulk", self.base_url, self.index);
        let response = self
            .http
            .post(&url)
            .header("content-type", "application/x-ndjson")
            .body(body)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AppError::index(format!(
                "bulk write failed with {status}: {text}"
            )));
        }
        parse_bulk_response(&text)
    }
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<BulkItem>,
}

#[derive(Deserialize)]
struct BulkItem {
    #[serde(alias = "create")]
    index: BulkItemStatus,
}

#[derive(Deserialize)]
struct BulkItemStatus {
    status: u16,
    error: Option<BulkItemError>,
}

#[derive(Deserialize)]
struct BulkItemError {
    #[serde(rename = "type")]
    kind: String,
    reason: Option<String>,
}

fn is_duplicate(item: &BulkItemStatus) -> bool {
    item.status == 409
        || item
            .error
            .as_ref()
            .is_some_and(|e| e.kind == "version_conflict_engine_exception")
}

/// Interpret the per-item results of a bulk write. Duplicate rejections
/// are counted and logged at info; any other per-item failure propagates.
fn parse_bulk_response(text: &str) -> Result<BulkOutcome> {
    let response: BulkResponse = serde_json::from_str(text)?;
    let mut outcome = BulkOutcome::default();
    for item in &response.items {
        if is_duplicate(&item.index) {
            outcome.duplicates += 1;
        } else if let Some(error) = &item.index.error {
            return Err(AppError::index(format!(
                "bulk item failed: {} ({})",
                error.kind,
                error.reason.as_deref().unwrap_or("no reason")
            )));
        } else {
            outcome.indexed += 1;
        }
    }
    if outcome.duplicates > 0 {
        log::info!("{} documents already exist in the index", outcome.duplicates);
    }
    if response.errors && response.items.is_empty() {
        return Err(AppError::index("bulk write reported errors".to_string()));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::index::{DocMeta, NewsDoc};

    fn doc() -> BulkDoc {
        BulkDoc {
            meta: DocMeta {
                id: "1".to_string(),
            },
            doc: NewsDoc {
                news_type: "post".to_string(),
                source: None,
                source_type: None,
                mentions: Vec::new(),
                title: "title".to_string(),
                body: None,
                published_on: None,
                url: None,
            },
        }
    }

    /// Sink failing a configurable number of writes before accepting.
    struct FlakyDocSink {
        fail_first: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl DocSink for FlakyDocSink {
        async fn write_doc(&self, _doc: &BulkDoc, _timeout: Duration) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(AppError::index("unavailable"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn put_recovers_after_transient_failures() {
        let sink = FlakyDocSink {
            fail_first: 2,
            calls: AtomicU32::new(0),
        };
        let policy = RetryPolicy::fixed(5, Duration::from_secs(0));
        put_with_retry(&sink, &policy, &doc(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn put_exhausts_the_backoff_policy() {
        let sink = FlakyDocSink {
            fail_first: u32::MAX,
            calls: AtomicU32::new(0),
        };
        let policy = RetryPolicy::backoff(10, Duration::from_secs(1), 2);
        let start = tokio::time::Instant::now();
        let result = put_with_retry(&sink, &policy, &doc(), Duration::from_secs(60)).await;

        assert!(result.is_err());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 10);
        // Nine doubling delays between ten attempts: 1 + 2 + ... + 256.
        assert_eq!(start.elapsed(), Duration::from_secs(511));
    }

    #[test]
    fn counts_successes() {
        let outcome = parse_bulk_response(
            r#"{"errors":false,"items":[
                {"index":{"status":201}},
                {"index":{"status":200}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(outcome.indexed, 2);
        assert_eq!(outcome.duplicates, 0);
    }

    #[test]
    fn duplicate_conflicts_are_not_errors() {
        let outcome = parse_bulk_response(
            r#"{"errors":true,"items":[
                {"index":{"status":201}},
                {"index":{"status":409,"error":{"type":"version_conflict_engine_exception","reason":"exists"}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(outcome.indexed, 1);
        assert_eq!(outcome.duplicates, 1);
    }

    #[test]
    fn conflict_status_without_error_body_counts_as_duplicate() {
        let outcome = parse_bulk_response(
            r#"{"errors":true,"items":[{"index":{"status":409}}]}"#,
        )
        .unwrap();
        assert_eq!(outcome.indexed, 0);
        assert_eq!(outcome.duplicates, 1);
    }

    #[test]
    fn other_item_failures_propagate() {
        let result = parse_bulk_response(
            r#"{"errors":true,"items":[
                {"index":{"status":400,"error":{"type":"mapper_parsing_exception","reason":"bad field"}}}
            ]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn connect_returns_the_same_handle() {
        let config = IndexConfig::default();
        let a = connect(&config).unwrap() as *const IndexClient;
        let b = connect(&config).unwrap() as *const IndexClient;
        assert_eq!(a, b);
    }
}
