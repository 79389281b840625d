use crate::error::ServiceError;
use crate::graph::WikiGraph;
use crate::mapper::{PageMapper, ProgressCallback};
use crate::source::{ArticleSource, LinkSource};
use crate::tree::PageTree;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchResult> {
        self.results.iter()
    }
}

impl<'a> IntoIterator for &'a SearchResults {
    type Item = &'a SearchResult;
    type IntoIter = std::slice::Iter<'a, SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Plain text of an article. Both fields are empty when nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContent {
    pub title: String,
    pub content: String,
}

impl RawContent {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Front door over a wiki source: search, article text and link mapping.
pub struct WikiService<S> {
    source: S,
    progress_callback: Option<ProgressCallback>,
}

impl<S> WikiService<S> {
    pub fn new(source: S) -> Self {
        debug!("WikiService initialized");
        Self {
            source,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: ArticleSource> WikiService<S> {
    pub fn search_articles(&self, query: &str, limit: u32) -> Result<SearchResults, ServiceError> {
        info!("Starting article search for: '{}' (limit: {} results)", query, limit);

        let titles = self.source.search(query, limit).map_err(|e| {
            error!("Error searching articles for '{}': {}", query, e);
            ServiceError::Search {
                reason: format!("Error during article search: {}", e),
                source: Some(Box::new(e)),
            }
        })?;

        if titles.is_empty() {
            warn!("No articles found for search query: '{}'", query);
            return Ok(SearchResults::default());
        }

        let results = SearchResults {
            results: titles.into_iter().map(|title| SearchResult { title }).collect(),
        };
        debug!("Search for '{}' completed, found {} articles", query, results.len());
        Ok(results)
    }

    /// Text of the best search hit for `query`.
    pub fn get_article_raw_content(&self, query: &str) -> Result<RawContent, ServiceError> {
        info!("Fetching article content for: '{}'", query);

        let hits = self.source.search(query, 1).map_err(|e| content_error(query, e))?;
        let Some(title) = hits.into_iter().next() else {
            warn!("No articles found for search query: '{}'", query);
            return Ok(RawContent::default());
        };

        info!("First search result: '{}'. Getting article text...", title);
        let content = self.source.raw_text(&title).map_err(|e| content_error(query, e))?;

        if content.is_empty() {
            warn!("Could not retrieve text for article '{}'", title);
        } else {
            info!("Successfully retrieved content for article '{}'", title);
        }
        Ok(RawContent { title, content })
    }
}

impl<S: LinkSource> WikiService<S> {
    pub fn map_page_graph(
        &self,
        root_title: &str,
        max_depth: usize,
        include_errors: bool,
    ) -> Result<WikiGraph, ServiceError> {
        self.mapper().map(root_title, max_depth, include_errors)
    }

    pub fn map_page_tree(
        &self,
        root_title: &str,
        max_depth: usize,
        include_errors: bool,
    ) -> Result<PageTree, ServiceError> {
        self.mapper().map_tree(root_title, max_depth, include_errors)
    }

    fn mapper(&self) -> PageMapper<'_, S> {
        let mapper = PageMapper::new(&self.source);
        match self.progress_callback {
            Some(ref callback) => mapper.with_progress_callback(callback.clone()),
            None => mapper,
        }
    }
}

fn content_error<E>(query: &str, e: E) -> ServiceError
where
    E: std::error::Error + Send + Sync + 'static,
{
    error!("Error retrieving content for '{}': {}", query, e);
    ServiceError::PageContent {
        reason: format!("Error retrieving article content: {}", e),
        source: Some(Box::new(e)),
    }
}
