pub mod arxiv;
pub mod arxiv_txt;
pub mod bibtex;
pub mod huggingface;
pub mod semantic_scholar;

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Ordered author names plus the short form used when citing inline.
///
/// The short form is derived once here and never recomputed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authors {
    names: Vec<String>,
    short: String,
}

impl Authors {
    pub fn new(names: Vec<String>) -> Self {
        let short = match names.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            [first, ..] => format!("{} et al.", first),
        };
        Self { names, short }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn short(&self) -> &str {
        &self.short
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Display for Authors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HuggingFacePaper {
    pub title: String,
    pub summary: String,
    pub arxiv_id: String,
    pub upvotes: i64,
    pub authors: Authors,
    pub published_at: Option<NaiveDate>,
    pub url: String,
    pub bibtex: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArxivPaper {
    pub title: String,
    pub summary: Option<String>,
    pub arxiv_id: String,
    pub authors: Authors,
    pub categories: Vec<String>,
    pub published: Option<NaiveDate>,
    pub doi: Option<String>,
    pub comment: Option<String>,
    pub url: String,
    pub pdf_url: Option<String>,
    pub bibtex: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticScholarPaper {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub authors: Authors,
    pub paper_id: Option<String>,
    pub url: Option<String>,
    pub tldr: Option<String>,
    pub citation: Option<String>,
    /// The untouched search hit, kept for traceability.
    pub raw: serde_json::Value,
}

/// A paper from any of the supported sources.
#[derive(Debug, Clone, PartialEq)]
pub enum Paper {
    HuggingFace(HuggingFacePaper),
    Arxiv(ArxivPaper),
    SemanticScholar(SemanticScholarPaper),
}

impl Paper {
    pub fn title(&self) -> &str {
        match self {
            Paper::HuggingFace(p) => &p.title,
            Paper::Arxiv(p) => &p.title,
            Paper::SemanticScholar(p) => p.title.as_deref().unwrap_or(""),
        }
    }

    pub fn authors(&self) -> &Authors {
        match self {
            Paper::HuggingFace(p) => &p.authors,
            Paper::Arxiv(p) => &p.authors,
            Paper::SemanticScholar(p) => &p.authors,
        }
    }

    /// Source-specific unique key.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Paper::HuggingFace(p) => Some(p.arxiv_id.as_str()),
            Paper::Arxiv(p) => Some(p.arxiv_id.as_str()),
            Paper::SemanticScholar(p) => p.paper_id.as_deref(),
        }
        .filter(|id| !id.is_empty())
    }

    /// The identifier, when it names a paper on arXiv.
    pub fn arxiv_id(&self) -> Option<&str> {
        match self {
            Paper::SemanticScholar(_) => None,
            _ => self.identifier(),
        }
    }

    pub fn citation(&self) -> Option<&str> {
        match self {
            Paper::HuggingFace(p) => p.bibtex.as_deref(),
            Paper::Arxiv(p) => p.bibtex.as_deref(),
            Paper::SemanticScholar(p) => p.citation.as_deref(),
        }
    }

    /// Attach citation text. An already populated citation is kept.
    pub fn with_citation(self, citation: String) -> Self {
        if self.citation().is_some() {
            return self;
        }
        match self {
            Paper::HuggingFace(p) => Paper::HuggingFace(HuggingFacePaper {
                bibtex: Some(citation),
                ..p
            }),
            Paper::Arxiv(p) => Paper::Arxiv(ArxivPaper {
                bibtex: Some(citation),
                ..p
            }),
            Paper::SemanticScholar(p) => Paper::SemanticScholar(SemanticScholarPaper {
                citation: Some(citation),
                ..p
            }),
        }
    }

    /// `"<author_short>: <title>"`, for log lines.
    pub fn label(&self) -> String {
        let authors = self.authors();
        if authors.is_empty() {
            self.title().to_string()
        } else {
            format!("{}: {}", authors.short(), self.title())
        }
    }
}

/// Either a parsed paper or the text of whatever went wrong producing it.
#[derive(Debug, Clone, PartialEq)]
pub enum PaperRecord {
    Paper(Paper),
    Error(String),
}

impl PaperRecord {
    pub fn error(message: impl Into<String>) -> Self {
        PaperRecord::Error(message.into())
    }

    pub fn as_paper(&self) -> Option<&Paper> {
        match self {
            PaperRecord::Paper(p) => Some(p),
            PaperRecord::Error(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),
    #[error("Rate limit exceeded. Try again later.")]
    RateLimited,
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: {0}")]
    Api(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Parse(e.to_string())
    }
}

/// Turn a non-2xx response into a generic HTTP error.
pub(crate) fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(FetchError::Status(status))
    }
}

#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Human readable source name, used in error text.
    fn name(&self) -> &str;

    /// Run one search. `limit` is forwarded to the upstream API or applied
    /// client-side, depending on the source.
    async fn search(&self, query: &str, limit: Option<u32>)
        -> Result<Vec<PaperRecord>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arxiv(id: &str, bibtex: Option<&str>) -> Paper {
        Paper::Arxiv(ArxivPaper {
            title: format!("Paper {}", id),
            summary: None,
            arxiv_id: id.to_string(),
            authors: Authors::default(),
            categories: vec![],
            published: None,
            doi: None,
            comment: None,
            url: format!("https://arxiv.org/abs/{}", id),
            pdf_url: None,
            bibtex: bibtex.map(String::from),
        })
    }

    #[test]
    fn test_author_short() {
        assert_eq!(Authors::new(vec![]).short(), "");
        assert_eq!(Authors::new(vec!["Ada Lovelace".into()]).short(), "Ada Lovelace");
        assert_eq!(
            Authors::new(vec![
                "Ada Lovelace".into(),
                "Alan Turing".into(),
                "Grace Hopper".into(),
            ])
            .short(),
            "Ada Lovelace et al."
        );
    }

    #[test]
    fn test_authors_display_joins_all_names() {
        let authors = Authors::new(vec!["A".into(), "B".into()]);
        assert_eq!(authors.to_string(), "A, B");
        assert_eq!(authors.names().len(), 2);
    }

    #[test]
    fn test_with_citation_keeps_existing() {
        let paper = arxiv("2503.01469", Some("@article{old}"));
        let paper = paper.with_citation("@article{new}".into());
        assert_eq!(paper.citation(), Some("@article{old}"));

        let paper = arxiv("2503.01470", None).with_citation("@article{new}".into());
        assert_eq!(paper.citation(), Some("@article{new}"));
    }

    #[test]
    fn test_semantic_scholar_ids_are_not_arxiv_ids() {
        let paper = Paper::SemanticScholar(SemanticScholarPaper {
            title: Some("T".into()),
            abstract_text: None,
            authors: Authors::default(),
            paper_id: Some("abc123".into()),
            url: None,
            tldr: None,
            citation: None,
            raw: serde_json::Value::Null,
        });
        assert_eq!(paper.identifier(), Some("abc123"));
        assert_eq!(paper.arxiv_id(), None);
    }

    #[test]
    fn test_empty_identifier_is_none() {
        assert_eq!(arxiv("", None).arxiv_id(), None);
    }

    #[test]
    fn test_label_uses_author_short() {
        let paper = Paper::Arxiv(ArxivPaper {
            authors: Authors::new(vec!["A".into(), "B".into()]),
            ..match arxiv("1", None) {
                Paper::Arxiv(p) => p,
                _ => unreachable!(),
            }
        });
        assert_eq!(paper.label(), "A et al.: Paper 1");
    }
}
