use evaluation_core::NewsItem;
use std::time::Duration;

const SERP_BASE_URL: &str = "https://serpapi.com/search";

/// Canned research queries for a company, beyond plain news.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchTopic {
    Management,
    Competitors,
    Litigation,
    Esg,
}

impl ResearchTopic {
    fn query(&self, company_name: &str) -> String {
        match self {
            ResearchTopic::Management => {
                format!("{company_name} CEO management team leadership")
            }
            ResearchTopic::Competitors => {
                format!("{company_name} competitors industry analysis")
            }
            ResearchTopic::Litigation => format!("{company_name} lawsuit legal issues"),
            ResearchTopic::Esg => {
                format!("{company_name} ESG sustainability environmental")
            }
        }
    }
}

/// Best-effort news/info search via the SERP API. News is supporting signal
/// for the evaluation, so every failure path degrades to an empty result
/// instead of an error: no key configured, upstream failure, or a payload we
/// cannot parse.
pub struct SerpClient {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl SerpClient {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: SERP_BASE_URL.to_string(),
            client,
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("SERP_API_KEY").ok())
    }

    /// Recent news for a company. Empty when no key is configured or the
    /// search fails.
    pub async fn search_company_news(&self, company_name: &str, ticker: &str) -> Vec<NewsItem> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Vec::new();
        };

        let query = format!("{company_name} {ticker} stock news");
        let params = [
            ("engine", "google"),
            ("q", query.as_str()),
            ("api_key", api_key),
            ("num", "10"),
            ("tbm", "nws"),
        ];

        match self.search(&params).await {
            Ok(value) => parse_results(&value, "news_results"),
            Err(err) => {
                tracing::warn!(ticker, error = %err, "news search failed");
                Vec::new()
            }
        }
    }

    /// Targeted research search (management, competitors, litigation, ESG).
    pub async fn search_company_info(
        &self,
        company_name: &str,
        topic: ResearchTopic,
    ) -> Vec<NewsItem> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Vec::new();
        };

        let query = topic.query(company_name);
        let params = [
            ("engine", "google"),
            ("q", query.as_str()),
            ("api_key", api_key),
            ("num", "5"),
        ];

        match self.search(&params).await {
            Ok(value) => parse_results(&value, "organic_results"),
            Err(err) => {
                tracing::warn!(topic = ?topic, error = %err, "info search failed");
                Vec::new()
            }
        }
    }

    async fn search(&self, params: &[(&str, &str)]) -> Result<serde_json::Value, reqwest::Error> {
        self.client
            .get(&self.base_url)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

fn parse_results(value: &serde_json::Value, field: &str) -> Vec<NewsItem> {
    value
        .get(field)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_news_results() {
        let payload: serde_json::Value = serde_json::from_str(
            r#"{
                "news_results": [
                    {"title": "Apple hits record high", "link": "https://example.com/a",
                     "source": "Reuters", "date": "2 hours ago", "snippet": "Shares rose..."},
                    {"title": "iPhone sales beat estimates", "link": "https://example.com/b"}
                ]
            }"#,
        )
        .unwrap();

        let items = parse_results(&payload, "news_results");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Apple hits record high");
        assert_eq!(items[0].source.as_deref(), Some("Reuters"));
        assert_eq!(items[1].snippet, None);
    }

    #[test]
    fn missing_results_field_is_empty() {
        let payload = serde_json::json!({"search_metadata": {"status": "Success"}});
        assert!(parse_results(&payload, "news_results").is_empty());
    }

    #[tokio::test]
    async fn no_api_key_short_circuits_to_empty() {
        let client = SerpClient::new(None);
        let items = client.search_company_news("Apple Inc.", "AAPL").await;
        assert!(items.is_empty());

        let items = client
            .search_company_info("Apple Inc.", ResearchTopic::Litigation)
            .await;
        assert!(items.is_empty());
    }

    #[test]
    fn research_topics_build_expected_queries() {
        assert_eq!(
            ResearchTopic::Management.query("Apple"),
            "Apple CEO management team leadership"
        );
        assert_eq!(
            ResearchTopic::Esg.query("Apple"),
            "Apple ESG sustainability environmental"
        );
    }
}
