use crate::error::{Result, ScanError};
use crate::response::{ApiResponse, PageBody, continuation_params};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

pub const USER_AGENT: &str = "wikimap/0.1 (+https://www.mediawiki.org/wiki/API:Etiquette)";
pub const VALID_LANGUAGES: &[&str] = &[
    "en", "ceb", "es", "fr", "de", "it", "pt", "ja", "zh", "ru", "ko", "nl", "ar", "simple",
];
pub const DEFAULT_LANGUAGE: &str = "es";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_REDIRECTS: usize = 3;
pub const DEFAULT_LINK_LIMIT: u32 = 500;

/// Statuses worth another attempt before giving up.
const RETRY_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub language: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub max_redirects: usize,
    /// Base delay; attempt `n` waits `retry_backoff * 2^n`.
    pub retry_backoff: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            retry_backoff: Duration::from_millis(500),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

/// Which `prop` module a link query reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Internal,
    External,
    LinksHere,
    Interwiki,
}

impl LinkType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "internal" => Some(LinkType::Internal),
            "external" => Some(LinkType::External),
            "linkshere" => Some(LinkType::LinksHere),
            "interwiki" => Some(LinkType::Interwiki),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Internal => "internal",
            LinkType::External => "external",
            LinkType::LinksHere => "linkshere",
            LinkType::Interwiki => "interwiki",
        }
    }

    fn module(&self) -> &'static str {
        match self {
            LinkType::Internal => "links",
            LinkType::External => "extlinks",
            LinkType::LinksHere => "linkshere",
            LinkType::Interwiki => "iwlinks",
        }
    }

    fn param_prefix(&self) -> &'static str {
        match self {
            LinkType::Internal => "pl",
            LinkType::External => "el",
            LinkType::LinksHere => "lh",
            LinkType::Interwiki => "iw",
        }
    }

    fn extract(&self, page: &PageBody) -> Vec<String> {
        match self {
            LinkType::Internal => page.links.iter().map(|l| l.title.clone()).collect(),
            LinkType::LinksHere => page.linkshere.iter().map(|l| l.title.clone()).collect(),
            LinkType::External => page.extlinks.iter().map(|l| l.url.clone()).collect(),
            LinkType::Interwiki => page
                .iwlinks
                .iter()
                .map(|l| format!("{}:{}", l.prefix, l.title))
                .collect(),
        }
    }
}

/// Async client for the MediaWiki action API.
pub struct WikiClient {
    client: Client,
    config: ClientConfig,
    base_url: Url,
    api_url: Url,
}

impl WikiClient {
    /// Client for `https://<language>.wikipedia.org/`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base = format!("https://{}.wikipedia.org/", config.language);
        let base_url = Url::parse(&base).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", base, e)))?;
        Self::with_base_url(config, base_url)
    }

    /// Client for any MediaWiki host serving `/w/api.php` under `base_url`.
    pub fn with_base_url(config: ClientConfig, base_url: Url) -> Result<Self> {
        if !VALID_LANGUAGES.contains(&config.language.as_str()) {
            return Err(ScanError::UnsupportedLanguage(config.language.clone()));
        }

        let base_url = if base_url.path().ends_with('/') {
            base_url
        } else {
            let with_slash = format!("{}/", base_url);
            Url::parse(&with_slash).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", with_slash, e)))?
        };
        let api_url = base_url
            .join("w/api.php")
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.div_ceil(2)))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        debug!(
            "WikiClient ready: base={} timeout={}s retries={}",
            base_url, config.timeout_secs, config.max_retries
        );

        Ok(Self {
            client,
            config,
            base_url,
            api_url,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Article URL for `title`, percent-encoded as a single path segment.
    pub fn page_url(&self, title: &str) -> Result<Url> {
        validate_title(title)?;
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ScanError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("wiki")
            .push(title.trim());
        Ok(url)
    }

    /// Links of `link_type` on `title`, following `continue` pagination.
    pub async fn get_page_links(
        &self,
        title: &str,
        link_type: LinkType,
        limit: u32,
        namespace: Option<i32>,
    ) -> Result<Vec<String>> {
        validate_title(title)?;

        let prefix = link_type.param_prefix();
        let mut base_params = vec![
            ("titles".to_string(), title.to_string()),
            ("prop".to_string(), link_type.module().to_string()),
            (format!("{}limit", prefix), limit.to_string()),
        ];
        if let Some(ns) = namespace {
            base_params.push((format!("{}namespace", prefix), ns.to_string()));
        }

        info!("Retrieving {} links from '{}' (limit {})", link_type.as_str(), title, limit);

        let mut links = Vec::new();
        let mut continuation: Vec<(String, String)> = Vec::new();

        loop {
            let mut params = base_params.clone();
            params.extend(continuation.iter().cloned());

            let response = self.query(&params).await?;
            let pages = response.query.map(|q| q.pages).unwrap_or_default();

            if pages.is_empty() {
                warn!(
                    "No page data for '{}'; treating as no {} links",
                    title,
                    link_type.as_str()
                );
                break;
            }

            for page in pages.values() {
                links.extend(link_type.extract(page));
            }

            match response.continuation {
                Some(next) => {
                    continuation = continuation_params(&next);
                    debug!("Continuing pagination with {:?}", continuation);
                }
                None => break,
            }
        }

        info!("Retrieved {} {} links from '{}'", links.len(), link_type.as_str(), title);
        Ok(links)
    }

    /// Titles matching `query`, best match first.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<String>> {
        let params = vec![
            ("list".to_string(), "search".to_string()),
            ("srsearch".to_string(), query.to_string()),
            ("srlimit".to_string(), limit.to_string()),
            ("srprop".to_string(), String::new()),
        ];

        info!("Searching for '{}' (limit {})", query, limit);
        let response = self.query(&params).await?;

        let hits = response
            .query
            .and_then(|q| q.search)
            .ok_or_else(|| ScanError::NoResults(format!("search '{}' returned no results", query)))?;

        if hits.is_empty() {
            warn!("Search '{}' returned no results", query);
            return Err(ScanError::NoResults(format!("search '{}' returned no results", query)));
        }

        let titles: Vec<String> = hits.into_iter().map(|h| h.title).collect();
        info!("Search '{}' found {} results", query, titles.len());
        Ok(titles)
    }

    /// Plain-text extract of the article.
    pub async fn get_page_raw_text(&self, title: &str) -> Result<String> {
        validate_title(title)?;
        let params = vec![
            ("titles".to_string(), title.to_string()),
            ("prop".to_string(), "extracts".to_string()),
            ("explaintext".to_string(), "true".to_string()),
            ("exlimit".to_string(), "1".to_string()),
        ];

        info!("Fetching plain text for '{}'", title);
        let response = self.query(&params).await?;
        let pages = response.query.map(|q| q.pages).unwrap_or_default();

        let page = pages
            .into_values()
            .next()
            .ok_or_else(|| ScanError::NoResults(format!("page '{}' not found", title)))?;

        if page.is_missing() {
            warn!("Page '{}' is missing", title);
            return Err(ScanError::NoResults(format!("page '{}' not found", title)));
        }

        match page.extract {
            Some(text) if !text.is_empty() => Ok(text),
            Some(_) => Err(ScanError::NoResults(format!("page '{}' has no plain text", title))),
            None => Err(ScanError::ParseError(format!(
                "unexpected API response for '{}': no extract",
                title
            ))),
        }
    }

    /// Visible categories of the article, without the `Category:` prefix.
    pub async fn get_page_categories(&self, title: &str) -> Result<Vec<String>> {
        validate_title(title)?;
        let base_params = vec![
            ("titles".to_string(), title.to_string()),
            ("prop".to_string(), "categories".to_string()),
            ("cllimit".to_string(), "max".to_string()),
            ("clshow".to_string(), "!hidden".to_string()),
        ];

        info!("Retrieving categories for '{}'", title);

        let mut categories = Vec::new();
        let mut continuation: Vec<(String, String)> = Vec::new();

        loop {
            let mut params = base_params.clone();
            params.extend(continuation.iter().cloned());

            let response = self.query(&params).await?;
            let pages = response.query.map(|q| q.pages).unwrap_or_default();

            let Some(page) = pages.values().next() else {
                return Err(ScanError::NoResults(format!("page '{}' does not exist", title)));
            };
            if page.is_missing() || pages.contains_key("-1") {
                warn!("Page not found: '{}'", title);
                return Err(ScanError::NoResults(format!("page '{}' does not exist", title)));
            }

            categories.extend(page.categories.iter().filter_map(|c| {
                let name = c.title.split_once(':').map_or(c.title.as_str(), |(_, n)| n);
                (!name.is_empty()).then(|| name.to_string())
            }));

            match response.continuation {
                Some(next) => continuation = continuation_params(&next),
                None => break,
            }
        }

        info!("Retrieved {} categories for '{}'", categories.len(), title);
        Ok(categories)
    }

    /// Runs one `action=query` request with retry and API error detection.
    async fn query(&self, params: &[(String, String)]) -> Result<ApiResponse> {
        let mut attempt: u32 = 0;

        loop {
            debug!("GET {} {:?} (attempt {})", self.api_url, params, attempt + 1);
            let outcome = self
                .client
                .get(self.api_url.clone())
                .query(&[("action", "query"), ("format", "json")])
                .query(params)
                .send()
                .await;

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if RETRY_STATUSES.contains(&status.as_u16()) && attempt < self.config.max_retries {
                        warn!("HTTP {} from {}, retrying", status.as_u16(), self.api_url);
                        self.backoff(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    if !status.is_success() {
                        error!("HTTP {} from {}", status.as_u16(), response.url());
                        return Err(ScanError::StatusError {
                            status: status.as_u16(),
                            url: response.url().to_string(),
                        });
                    }

                    let text = response.text().await?;
                    let mut body: ApiResponse = serde_json::from_str(&text)
                        .map_err(|e| ScanError::ParseError(format!("invalid API response: {}", e)))?;

                    if let Some(api_error) = body.error.take() {
                        let code = api_error.code.unwrap_or_else(|| "unknown".to_string());
                        let info = api_error
                            .info
                            .unwrap_or_else(|| "Unknown MediaWiki API error".to_string());
                        error!("MediaWiki API error: {} (code: {})", info, code);
                        return Err(ScanError::ApiError { code, info });
                    }

                    return Ok(body);
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.config.max_retries => {
                    warn!("Request to {} failed ({}), retrying", self.api_url, e);
                    self.backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("Request to {} failed: {}", self.api_url, e);
                    return Err(e.into());
                }
            }
        }
    }

    async fn backoff(&self, attempt: u32) {
        let delay = self.config.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(ScanError::InvalidTitle("page title must be a non-empty string".to_string()));
    }
    Ok(())
}
