use super::{check_status, Authors, FetchError, HuggingFacePaper, Paper, PaperRecord, PaperSource};
use crate::config::Config;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub struct HuggingFaceClient {
    config: Config,
}

impl HuggingFaceClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[derive(Deserialize)]
struct HfSearchHit {
    paper: HfPaper,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HfPaper {
    id: String,
    title: String,
    summary: String,
    #[serde(default)]
    upvotes: i64,
    #[serde(default)]
    authors: Vec<HfAuthor>,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct HfAuthor {
    name: Option<String>,
}

fn hit_to_paper(hit: HfSearchHit) -> Paper {
    let p = hit.paper;
    Paper::HuggingFace(HuggingFacePaper {
        url: format!("https://arxiv.org/abs/{}", p.id),
        title: p.title.trim().to_string(),
        summary: p.summary.trim().to_string(),
        arxiv_id: p.id,
        upvotes: p.upvotes,
        authors: Authors::new(p.authors.into_iter().filter_map(|a| a.name).collect()),
        published_at: p.published_at.map(|d| d.date_naive()),
        bibtex: None,
    })
}

/// Parse the search response, keeping at most `top_n` hits.
fn parse_search_response(body: &str, top_n: usize) -> Result<Vec<PaperRecord>, FetchError> {
    let hits: Vec<serde_json::Value> = serde_json::from_str(body)?;
    Ok(hits
        .into_iter()
        .take(top_n)
        .map(|hit| match serde_json::from_value::<HfSearchHit>(hit) {
            Ok(hit) => PaperRecord::Paper(hit_to_paper(hit)),
            Err(e) => PaperRecord::error(format!("Failed to parse paper data: {}", e)),
        })
        .collect())
}

#[async_trait]
impl PaperSource for HuggingFaceClient {
    fn name(&self) -> &str {
        "HuggingFace"
    }

    async fn search(
        &self,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<PaperRecord>, FetchError> {
        let url = format!("{}/papers/search", self.config.huggingface_url);
        let resp = self
            .config
            .http_client()?
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await?;
        let body = check_status(resp)?.text().await?;
        let top_n = limit.map(|n| n as usize).unwrap_or(usize::MAX);
        parse_search_response(&body, top_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE_RESPONSE: &str = r#"[
      {
        "paper": {
          "id": "2501.00001",
          "title": "  Scaling Transformers  ",
          "summary": "We scale transformers.\n",
          "upvotes": 17,
          "publishedAt": "2025-01-02T10:00:00.000Z",
          "authors": [{"_id": "a1", "name": "Ada Lovelace"}, {"_id": "a2", "name": "Alan Turing"}]
        },
        "title": "Scaling Transformers"
      },
      {
        "paper": {
          "id": "2501.00002",
          "title": "Tiny Transformers",
          "summary": "Small ones.",
          "upvotes": 3,
          "authors": []
        }
      }
    ]"#;

    #[test]
    fn test_parse_search_response() {
        let records = parse_search_response(SAMPLE_RESPONSE, 10).unwrap();
        assert_eq!(records.len(), 2);
        match records[0].as_paper() {
            Some(Paper::HuggingFace(p)) => {
                assert_eq!(p.title, "Scaling Transformers");
                assert_eq!(p.arxiv_id, "2501.00001");
                assert_eq!(p.upvotes, 17);
                assert_eq!(p.url, "https://arxiv.org/abs/2501.00001");
                assert_eq!(p.authors.short(), "Ada Lovelace et al.");
                assert_eq!(p.published_at, NaiveDate::from_ymd_opt(2025, 1, 2));
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_truncates_client_side() {
        let records = parse_search_response(SAMPLE_RESPONSE, 1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_paper().unwrap().identifier(), Some("2501.00001"));
    }

    #[test]
    fn test_bad_item_becomes_error_record() {
        let body = r#"[{"paper": {"id": "1", "title": "ok", "summary": "s"}}, {"nope": true}]"#;
        let records = parse_search_response(body, 10).unwrap();
        assert!(records[0].as_paper().is_some());
        assert!(matches!(
            &records[1],
            PaperRecord::Error(e) if e.starts_with("Failed to parse paper data")
        ));
    }

    #[test]
    fn test_non_array_body_is_parse_error() {
        let err = parse_search_response(r#"{"error": "down"}"#, 10).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_search_sends_query_and_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/papers/search"))
            .and(query_param("q", "transformers"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_RESPONSE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/papers/search"))
            .and(query_param("q", "broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new(Config::for_testing(&server.uri()));
        let records = client.search("transformers", Some(5)).await.unwrap();
        assert_eq!(records.len(), 2);

        let err = client.search("broken", Some(5)).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 503));
    }
}
