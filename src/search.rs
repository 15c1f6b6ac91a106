//! YouTube live-stream search.
//!
//! One request to the results page with the "Live" filter, then the embedded
//! `ytInitialData` blob is pulled out and walked. No API key involved.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::{Result, YtotError};

const RESULTS_URL: &str = "https://www.youtube.com/results";

/// Search filter "Live"
const LIVE_FILTER: &str = "EgJAAQ==";

static INITIAL_DATA: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"var ytInitialData\s*=\s*(\{.*?\});").unwrap(),
        Regex::new(r#"window\["ytInitialData"\]\s*=\s*(\{.*?\});"#).unwrap(),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveResult {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub is_live: bool,
}

impl LiveResult {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

pub struct SearchClient {
    client: Client,
}

impl SearchClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| YtotError::Search(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Live streams matching `query`
    pub async fn search(&self, query: &str) -> Result<Vec<LiveResult>> {
        let url = search_url(query)?;
        tracing::debug!("GET {}", url);

        let html = self
            .client
            .get(url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_results(&html)
    }
}

pub fn search_url(query: &str) -> Result<Url> {
    let mut url = Url::parse(RESULTS_URL).map_err(|e| YtotError::Search(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("search_query", query)
        .append_pair("sp", LIVE_FILTER);
    Ok(url)
}

/// Extract live results from a results page
pub fn parse_results(html: &str) -> Result<Vec<LiveResult>> {
    let blob = INITIAL_DATA
        .iter()
        .find_map(|pattern| pattern.captures(html))
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| YtotError::Search("Could not parse YouTube results".to_string()))?;

    let data: Value = serde_json::from_str(&blob)?;
    let contents = data
        .pointer(
            "/contents/twoColumnSearchResultsRenderer/primaryContents/sectionListRenderer/contents/0/itemSectionRenderer/contents",
        )
        .and_then(Value::as_array)
        .ok_or_else(|| YtotError::Search("No results found".to_string()))?;

    Ok(contents
        .iter()
        .filter_map(|item| item.get("videoRenderer"))
        .map(video_result)
        .filter(|result| result.is_live)
        .collect())
}

fn video_result(renderer: &Value) -> LiveResult {
    let text = |pointer: &str| {
        renderer
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let is_live = renderer
        .get("badges")
        .and_then(Value::as_array)
        .is_some_and(|badges| {
            badges.iter().any(|badge| {
                badge
                    .pointer("/metadataBadgeRenderer/label")
                    .and_then(Value::as_str)
                    .is_some_and(|label| label.to_lowercase().contains("live"))
            })
        });

    LiveResult {
        video_id: text("/videoId"),
        title: text("/title/runs/0/text"),
        channel: text("/ownerText/runs/0/text"),
        is_live,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, title: &str, channel: &str, badge: Option<&str>) -> Value {
        let mut renderer = serde_json::json!({
            "videoId": id,
            "title": { "runs": [{ "text": title }] },
            "ownerText": { "runs": [{ "text": channel }] },
        });
        if let Some(label) = badge {
            renderer["badges"] =
                serde_json::json!([{ "metadataBadgeRenderer": { "label": label } }]);
        }
        serde_json::json!({ "videoRenderer": renderer })
    }

    fn page(items: Vec<Value>, assignment: &str) -> String {
        let data = serde_json::json!({
            "contents": { "twoColumnSearchResultsRenderer": { "primaryContents": {
                "sectionListRenderer": { "contents": [
                    { "itemSectionRenderer": { "contents": items } }
                ] }
            } } }
        });
        format!(
            "<html><script>{} = {};</script><script>var other = {{}};</script></html>",
            assignment, data
        )
    }

    #[test]
    fn keeps_only_live_videos() {
        let html = page(
            vec![
                video("live0000001", "Race day", "Some Channel", Some("LIVE")),
                video("vod00000001", "Yesterday", "Some Channel", None),
                serde_json::json!({ "shelfRenderer": {} }),
                video("live0000002", "Chill", "Other", Some("Live now")),
            ],
            "var ytInitialData",
        );

        let results = parse_results(&html).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].video_id, "live0000001");
        assert_eq!(results[0].title, "Race day");
        assert_eq!(results[0].channel, "Some Channel");
        assert!(results.iter().all(|r| r.is_live));
    }

    #[test]
    fn accepts_window_assignment() {
        let html = page(
            vec![video("live0000001", "Race day", "Some Channel", Some("LIVE"))],
            "window[\"ytInitialData\"]",
        );
        assert_eq!(parse_results(&html).unwrap().len(), 1);
    }

    #[test]
    fn page_without_initial_data_is_an_error() {
        let err = parse_results("<html></html>").unwrap_err();
        assert!(err.to_string().contains("Could not parse YouTube results"));
    }

    #[test]
    fn missing_result_list_is_no_results() {
        let err = parse_results("<script>var ytInitialData = {\"contents\":{}};</script>")
            .unwrap_err();
        assert!(err.to_string().contains("No results found"));
    }

    #[test]
    fn search_url_carries_live_filter() {
        let url = search_url("lofi radio").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.youtube.com/results?search_query=lofi+radio&sp=EgJAAQ%3D%3D"
        );
    }
}
