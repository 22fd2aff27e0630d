use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::credibility::source_domain;
use super::WebSearch;
use crate::core::errors::EngineError;
use crate::rag::WebResult;

const DUCKDUCKGO_URL: &str = "https://api.duckduckgo.com";
const WIKIPEDIA_URL: &str = "https://en.wikipedia.org";

fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("grammar-rag/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn web_result(title: &str, snippet: &str, url: &str) -> WebResult {
    WebResult {
        title: title.trim().to_string(),
        snippet: snippet.trim().to_string(),
        url: url.to_string(),
        source_domain: source_domain(url),
        credibility_score: 0.0,
    }
}

/// DuckDuckGo instant answer API.
#[derive(Clone)]
pub struct DuckDuckGoSearch {
    base_url: String,
    client: Client,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(DUCKDUCKGO_URL.to_string(), timeout)
    }

    pub fn with_base_url(base_url: String, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, EngineError> {
        let url = format!(
            "{}/?q={}&format=json&no_redirect=1&no_html=1&skip_disambig=1",
            self.base_url,
            urlencoding::encode(query)
        );

        let response = self.client.get(url).send().await.map_err(EngineError::web)?;

        if !response.status().is_success() {
            return Err(EngineError::WebSearchUnavailable(format!(
                "DuckDuckGo search failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(EngineError::web)?;
        let mut results = parse_duckduckgo(&payload);
        results.truncate(max_results);
        Ok(results)
    }
}

pub(crate) fn parse_duckduckgo(payload: &Value) -> Vec<WebResult> {
    let mut results = Vec::new();

    let abstract_text = payload
        .get("AbstractText")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .or_else(|| payload.get("Abstract").and_then(|v| v.as_str()))
        .unwrap_or("");
    let abstract_url = payload.get("AbstractURL").and_then(|v| v.as_str()).unwrap_or("");
    if !abstract_text.is_empty() && !abstract_url.is_empty() {
        let heading = payload
            .get("Heading")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| abstract_text.split(" - ").next().unwrap_or(abstract_text));
        results.push(web_result(heading, abstract_text, abstract_url));
    }

    if let Some(items) = payload.get("Results").and_then(|v| v.as_array()) {
        extract_topics(items, &mut results);
    }
    if let Some(items) = payload.get("RelatedTopics").and_then(|v| v.as_array()) {
        extract_topics(items, &mut results);
    }

    results
}

fn extract_topics(items: &[Value], results: &mut Vec<WebResult>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            extract_topics(topics, results);
            continue;
        }
        let text = item.get("Text").and_then(|v| v.as_str()).unwrap_or("");
        let url = item.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        results.push(web_result(
            text.split(" - ").next().unwrap_or(text),
            text,
            url,
        ));
    }
}

/// Wikipedia page summaries, with full-text search as a fallback.
#[derive(Clone)]
pub struct WikipediaSearch {
    base_url: String,
    client: Client,
}

impl WikipediaSearch {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(WIKIPEDIA_URL.to_string(), timeout)
    }

    pub fn with_base_url(base_url: String, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout),
        }
    }

    async fn summary(&self, title: &str) -> Result<Option<WebResult>, EngineError> {
        let url = format!(
            "{}/api/rest_v1/page/summary/{}",
            self.base_url,
            urlencoding::encode(&title.trim().replace(' ', "_"))
        );
        let response = self.client.get(url).send().await.map_err(EngineError::web)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(EngineError::WebSearchUnavailable(format!(
                "Wikipedia summary failed: {}",
                response.status()
            )));
        }
        let payload: Value = response.json().await.map_err(EngineError::web)?;
        Ok(parse_wikipedia_summary(&payload))
    }

    async fn full_text(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, EngineError> {
        let url = format!(
            "{}/w/api.php?action=query&list=search&format=json&srlimit={}&srsearch={}",
            self.base_url,
            max_results.max(1),
            urlencoding::encode(query)
        );
        let response = self.client.get(url).send().await.map_err(EngineError::web)?;
        if !response.status().is_success() {
            return Err(EngineError::WebSearchUnavailable(format!(
                "Wikipedia search failed: {}",
                response.status()
            )));
        }
        let payload: Value = response.json().await.map_err(EngineError::web)?;
        let titles: Vec<String> = payload
            .pointer("/query/search")
            .and_then(|v| v.as_array())
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| hit.get("title").and_then(|v| v.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/w/api.php?action=query&prop=extracts&exintro=1&explaintext=1&format=json&titles={}",
            self.base_url,
            urlencoding::encode(&titles.join("|"))
        );
        let response = self.client.get(url).send().await.map_err(EngineError::web)?;
        if !response.status().is_success() {
            return Err(EngineError::WebSearchUnavailable(format!(
                "Wikipedia extracts failed: {}",
                response.status()
            )));
        }
        let payload: Value = response.json().await.map_err(EngineError::web)?;
        Ok(parse_wikipedia_extracts(&payload, &titles, &self.base_url))
    }
}

#[async_trait]
impl WebSearch for WikipediaSearch {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, EngineError> {
        if let Some(hit) = self.summary(query).await? {
            return Ok(vec![hit]);
        }
        let mut results = self.full_text(query, max_results).await?;
        results.truncate(max_results);
        Ok(results)
    }
}

pub(crate) fn parse_wikipedia_summary(payload: &Value) -> Option<WebResult> {
    // disambiguation pages carry no useful extract
    if payload.get("type").and_then(|v| v.as_str()) == Some("disambiguation") {
        return None;
    }
    let extract = payload.get("extract").and_then(|v| v.as_str()).unwrap_or("");
    let url = payload
        .pointer("/content_urls/desktop/page")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if extract.trim().is_empty() || url.is_empty() {
        return None;
    }
    let title = payload.get("title").and_then(|v| v.as_str()).unwrap_or("");
    Some(web_result(title, extract, url))
}

/// Extracts come back keyed by page id; `titles` fixes the output order.
pub(crate) fn parse_wikipedia_extracts(
    payload: &Value,
    titles: &[String],
    base_url: &str,
) -> Vec<WebResult> {
    let Some(pages) = payload.pointer("/query/pages").and_then(|v| v.as_object()) else {
        return Vec::new();
    };

    titles
        .iter()
        .filter_map(|title| {
            let page = pages
                .values()
                .find(|page| page.get("title").and_then(|v| v.as_str()) == Some(title.as_str()))?;
            let extract = page.get("extract").and_then(|v| v.as_str())?;
            if extract.trim().is_empty() {
                return None;
            }
            let url = format!("{}/wiki/{}", base_url, title.replace(' ', "_"));
            Some(web_result(title, extract, &url))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn duckduckgo_flattens_nested_topics() {
        let payload = json!({
            "Heading": "Present perfect",
            "AbstractText": "The present perfect is a grammatical combination of the present tense and perfect aspect.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Present_perfect",
            "RelatedTopics": [
                {"Text": "Past perfect - a tense", "FirstURL": "https://duckduckgo.com/Past_perfect"},
                {"Name": "Grammar", "Topics": [
                    {"Text": "Aspect - grammatical category", "FirstURL": "https://duckduckgo.com/Aspect"}
                ]},
                {"Text": "", "FirstURL": "https://duckduckgo.com/Empty"}
            ]
        });

        let results = parse_duckduckgo(&payload);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Present perfect");
        assert_eq!(results[0].source_domain, "en.wikipedia.org");
        assert_eq!(results[1].title, "Past perfect");
        assert_eq!(results[2].url, "https://duckduckgo.com/Aspect");
    }

    #[test]
    fn wikipedia_summary_requires_extract_and_url() {
        let payload = json!({
            "type": "standard",
            "title": "Present perfect",
            "extract": "The present perfect is used for past actions with present relevance.",
            "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Present_perfect"}}
        });
        let hit = parse_wikipedia_summary(&payload).unwrap();
        assert_eq!(hit.title, "Present perfect");
        assert_eq!(hit.source_domain, "en.wikipedia.org");

        let disambiguation = json!({"type": "disambiguation", "extract": "may refer to", "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/X"}}});
        assert!(parse_wikipedia_summary(&disambiguation).is_none());
    }

    #[test]
    fn wikipedia_extracts_follow_search_order() {
        let payload = json!({"query": {"pages": {
            "2": {"title": "Perfect aspect", "extract": "Perfect aspect text"},
            "1": {"title": "Present perfect", "extract": "Present perfect text"},
            "3": {"title": "Empty page", "extract": ""}
        }}});
        let titles = vec![
            "Present perfect".to_string(),
            "Perfect aspect".to_string(),
            "Empty page".to_string(),
        ];
        let results = parse_wikipedia_extracts(&payload, &titles, "https://en.wikipedia.org");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://en.wikipedia.org/wiki/Present_perfect");
        assert_eq!(results[1].title, "Perfect aspect");
    }
}
