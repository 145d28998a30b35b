use super::{
    check_status, Authors, FetchError, Paper, PaperRecord, PaperSource, SemanticScholarPaper,
};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

const FIELDS: &str = "title,authors,url,abstract,tldr,citationStyles";
const MAX_LIMIT: u32 = 100;

pub struct SemanticScholarClient {
    config: Config,
}

impl SemanticScholarClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.semantic_scholar_api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }
}

/// Zero hits come back as `{"total": 0}` with no `data`; any other body
/// without `data` is an error payload.
#[derive(Deserialize)]
struct S2SearchResponse {
    data: Option<Vec<serde_json::Value>>,
    total: Option<u64>,
    message: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    paper_id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    authors: Vec<S2Author>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    url: Option<String>,
    tldr: Option<S2Tldr>,
    citation_styles: Option<S2CitationStyles>,
}

#[derive(Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(Deserialize)]
struct S2Tldr {
    text: Option<String>,
}

#[derive(Deserialize)]
struct S2CitationStyles {
    bibtex: Option<String>,
}

fn item_to_record(raw: serde_json::Value) -> PaperRecord {
    let p: S2Paper = match serde_json::from_value(raw.clone()) {
        Ok(p) => p,
        Err(e) => return PaperRecord::error(format!("Failed to parse paper data: {}", e)),
    };
    PaperRecord::Paper(Paper::SemanticScholar(SemanticScholarPaper {
        title: p.title,
        abstract_text: p.abstract_text,
        authors: Authors::new(
            p.authors
                .into_iter()
                .map(|a| a.name.unwrap_or_default())
                .collect(),
        ),
        paper_id: p.paper_id,
        url: p.url,
        tldr: p.tldr.and_then(|t| t.text).filter(|t| !t.is_empty()),
        citation: p
            .citation_styles
            .and_then(|c| c.bibtex)
            .filter(|b| !b.is_empty()),
        raw,
    }))
}

fn parse_search_response(body: &str) -> Result<Vec<PaperRecord>, FetchError> {
    let resp: S2SearchResponse = serde_json::from_str(body)?;
    match (resp.data, resp.total) {
        (Some(data), _) => Ok(data.into_iter().map(item_to_record).collect()),
        (None, Some(0)) => Ok(Vec::new()),
        (None, _) => Err(FetchError::Parse(format!(
            "response has no `data` field: {}",
            resp.message
                .or(resp.error)
                .unwrap_or_else(|| "no message".to_string())
        ))),
    }
}

#[async_trait]
impl PaperSource for SemanticScholarClient {
    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    async fn search(
        &self,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<PaperRecord>, FetchError> {
        let url = format!("{}/paper/search", self.config.semantic_scholar_url);
        let limit = limit.unwrap_or(10).min(MAX_LIMIT).to_string();
        let resp = self
            .add_auth(self.config.http_client()?.get(&url).query(&[
                ("query", query),
                ("limit", limit.as_str()),
                ("fields", FIELDS),
            ]))
            .send()
            .await?;
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Semantic Scholar rate limit hit for query {:?}", query);
            return Err(FetchError::RateLimited);
        }
        let body = check_status(resp)?.text().await?;
        parse_search_response(&body)
    }
}
