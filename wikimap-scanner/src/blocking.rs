use crate::client::{ClientConfig, LinkType, WikiClient};
use crate::error::Result;
use tokio::runtime::{Builder, Runtime};
use url::Url;

/// Synchronous facade over [`WikiClient`].
///
/// Owns a current-thread runtime and blocks on each request, so callers outside
/// of any async context can use the client directly. Must not be called from
/// within a tokio runtime.
pub struct BlockingWikiClient {
    inner: WikiClient,
    runtime: Runtime,
}

impl BlockingWikiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::from_client(WikiClient::new(config)?)
    }

    pub fn from_client(inner: WikiClient) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    pub fn client(&self) -> &WikiClient {
        &self.inner
    }

    pub fn page_url(&self, title: &str) -> Result<Url> {
        self.inner.page_url(title)
    }

    pub fn get_page_links(
        &self,
        title: &str,
        link_type: LinkType,
        limit: u32,
        namespace: Option<i32>,
    ) -> Result<Vec<String>> {
        self.runtime
            .block_on(self.inner.get_page_links(title, link_type, limit, namespace))
    }

    pub fn search(&self, query: &str, limit: u32) -> Result<Vec<String>> {
        self.runtime.block_on(self.inner.search(query, limit))
    }

    pub fn get_page_raw_text(&self, title: &str) -> Result<String> {
        self.runtime.block_on(self.inner.get_page_raw_text(title))
    }

    pub fn get_page_categories(&self, title: &str) -> Result<Vec<String>> {
        self.runtime.block_on(self.inner.get_page_categories(title))
    }
}
