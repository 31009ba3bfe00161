use async_trait::async_trait;

/// One piece of raw source content awaiting extraction, attributed to the
/// domain it came from.
#[derive(Debug, Clone)]
pub struct ContentItem {
    pub text: String,
    pub source_domain: String,
}

/// Pluggable acquisition of raw content for the ingestion loop to run
/// through `fc-crucible`. Fetching from RSS feeds, news APIs, or a web
/// crawl is out of scope here; a real deployment implements this trait
/// against whatever feed it has access to.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn poll(&self) -> Vec<ContentItem>;
}

/// The default source: never produces anything. Content instead arrives
/// through [`crate::node::Node::ingest_text`], a library-level entry point
/// callers can drive directly (tests, a local feed script, an admin tool)
/// in lieu of a real acquirer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopContentSource;

#[async_trait]
impl ContentSource for NoopContentSource {
    async fn poll(&self) -> Vec<ContentItem> {
        Vec::new()
    }
}
