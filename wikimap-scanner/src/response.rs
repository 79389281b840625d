use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Top level body of an `api.php?action=query&format=json` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
    #[serde(default)]
    pub query: Option<QueryBody>,
    /// Pagination parameters to merge into the next request.
    #[serde(default, rename = "continue")]
    pub continuation: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryBody {
    /// Keyed by page id; missing pages use negative ids such as `"-1"`.
    #[serde(default)]
    pub pages: BTreeMap<String, PageBody>,
    #[serde(default)]
    pub search: Option<Vec<SearchHit>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub missing: Option<Value>,
    #[serde(default)]
    pub extract: Option<String>,
    #[serde(default)]
    pub links: Vec<TitleItem>,
    #[serde(default)]
    pub linkshere: Vec<TitleItem>,
    #[serde(default)]
    pub extlinks: Vec<ExternalLinkItem>,
    #[serde(default)]
    pub iwlinks: Vec<InterwikiItem>,
    #[serde(default)]
    pub categories: Vec<TitleItem>,
}

impl PageBody {
    pub fn is_missing(&self) -> bool {
        self.missing.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleItem {
    #[serde(default)]
    pub ns: Option<i64>,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalLinkItem {
    #[serde(rename = "*", alias = "url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterwikiItem {
    pub prefix: String,
    #[serde(rename = "*", alias = "title")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
}

/// Flattens a `continue` block into query parameters.
pub fn continuation_params(continuation: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    continuation
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_links_page_with_continue() {
        let body = r#"{
            "continue": {"plcontinue": "736|0|Zeta", "continue": "||"},
            "query": {"pages": {"736": {"pageid": 736, "ns": 0, "title": "Rust",
                "links": [{"ns": 0, "title": "Cargo"}, {"ns": 0, "title": "LLVM"}]}}}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();

        let pages = parsed.query.unwrap().pages;
        let page = pages.get("736").unwrap();
        let titles: Vec<&str> = page.links.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Cargo", "LLVM"]);

        let params = continuation_params(parsed.continuation.as_ref().unwrap());
        assert!(params.contains(&("plcontinue".to_string(), "736|0|Zeta".to_string())));
        assert!(params.contains(&("continue".to_string(), "||".to_string())));
    }

    #[test]
    fn test_parse_missing_page() {
        let body = r#"{"query": {"pages": {"-1": {"ns": 0, "title": "Nope", "missing": ""}}}}"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        let pages = parsed.query.unwrap().pages;
        assert!(pages.get("-1").unwrap().is_missing());
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"error": {"code": "badvalue", "info": "Unrecognized value", "*": "docs"}}"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        let error = parsed.error.unwrap();
        assert_eq!(error.code.as_deref(), Some("badvalue"));
        assert_eq!(error.info.as_deref(), Some("Unrecognized value"));
        assert!(parsed.query.is_none());
    }

    #[test]
    fn test_parse_external_and_interwiki_items() {
        let body = r#"{"query": {"pages": {"1": {
            "extlinks": [{"*": "https://example.org/"}],
            "iwlinks": [{"prefix": "fr", "*": "Rouille"}]
        }}}}"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        let pages = parsed.query.unwrap().pages;
        let page = pages.get("1").unwrap();
        assert_eq!(page.extlinks[0].url, "https://example.org/");
        assert_eq!(page.iwlinks[0].prefix, "fr");
        assert_eq!(page.iwlinks[0].title, "Rouille");
    }
}
