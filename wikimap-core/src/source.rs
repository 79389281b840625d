use wikimap_scanner::client::DEFAULT_LINK_LIMIT;
use wikimap_scanner::{BlockingWikiClient, LinkType, ScanError};

/// Supplies the outgoing internal links of a page.
///
/// Any error means the links of that page are unavailable. Callers treat it as
/// local to the page and keep going.
pub trait LinkSource {
    type Error: std::error::Error;

    fn fetch_links(&self, title: &str) -> Result<Vec<String>, Self::Error>;
}

/// Article lookup used by the service layer.
pub trait ArticleSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Titles matching `query`, best match first. Empty when nothing matches.
    fn search(&self, query: &str, limit: u32) -> Result<Vec<String>, Self::Error>;

    /// Plain-text body of the article. Empty when the page has no text.
    fn raw_text(&self, title: &str) -> Result<String, Self::Error>;
}

impl<T: LinkSource + ?Sized> LinkSource for &T {
    type Error = T::Error;

    fn fetch_links(&self, title: &str) -> Result<Vec<String>, Self::Error> {
        (**self).fetch_links(title)
    }
}

impl LinkSource for BlockingWikiClient {
    type Error = ScanError;

    fn fetch_links(&self, title: &str) -> Result<Vec<String>, ScanError> {
        self.get_page_links(title, LinkType::Internal, DEFAULT_LINK_LIMIT, None)
    }
}

impl ArticleSource for BlockingWikiClient {
    type Error = ScanError;

    fn search(&self, query: &str, limit: u32) -> Result<Vec<String>, ScanError> {
        match BlockingWikiClient::search(self, query, limit) {
            Err(ScanError::NoResults(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    fn raw_text(&self, title: &str) -> Result<String, ScanError> {
        match self.get_page_raw_text(title) {
            Err(ScanError::NoResults(_)) => Ok(String::new()),
            other => other,
        }
    }
}
