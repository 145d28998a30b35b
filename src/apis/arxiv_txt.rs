//! Paper details from arxiv-txt.org, which serves each arXiv abstract page as
//! a small markdown document.

use chrono::{DateTime, NaiveDate};

use super::{check_status, ArxivPaper, Authors, FetchError, Paper, PaperRecord};
use crate::batch::run_batched;
use crate::config::Config;

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Other,
    Title,
    Authors,
    Abstract,
    Categories,
    Details,
    Bibtex,
}

impl Section {
    fn from_heading(heading: &str) -> Self {
        match heading.trim().to_lowercase().as_str() {
            "title" => Section::Title,
            "authors" => Section::Authors,
            "abstract" => Section::Abstract,
            "categories" => Section::Categories,
            "publication details" => Section::Details,
            "bibtex" => Section::Bibtex,
            _ => Section::Other,
        }
    }
}

fn split_list(line: &str) -> impl Iterator<Item = String> + '_ {
    line.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

/// Parse an arxiv-txt document. `requested_id` fills in when the document
/// does not state its own id.
pub(crate) fn parse_arxiv_info(raw: &str, requested_id: &str) -> Result<ArxivPaper, FetchError> {
    let mut section = Section::Other;
    let mut title = String::new();
    let mut authors = Vec::new();
    let mut summary: Vec<&str> = Vec::new();
    let mut categories = Vec::new();
    let mut published = None;
    let mut arxiv_id = String::new();
    let mut bibtex: Vec<&str> = Vec::new();

    for line in raw.lines() {
        // BibTeX keeps its own layout, blank lines and all.
        if section == Section::Bibtex && !line.starts_with("# ") {
            bibtex.push(line);
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(heading) = line.strip_prefix("# ") {
            section = Section::from_heading(heading);
            continue;
        }
        match section {
            Section::Title => title = line.to_string(),
            Section::Authors => authors.extend(split_list(line)),
            Section::Abstract => summary.push(line),
            Section::Categories => categories.extend(split_list(line)),
            Section::Details => {
                let detail = line.trim_start_matches('-').trim();
                if let Some(id) = detail.split("arXiv ID:").nth(1) {
                    arxiv_id = id.trim().to_string();
                } else if let Some(date) = detail.strip_prefix("Published:") {
                    published = parse_date(date);
                }
            }
            Section::Bibtex | Section::Other => {}
        }
    }

    if title.is_empty() {
        return Err(FetchError::Parse("document has no title".to_string()));
    }
    if arxiv_id.is_empty() {
        arxiv_id = requested_id.trim().to_string();
    }
    let summary = summary.join(" ");
    let bibtex = bibtex.join("\n");
    let bibtex = bibtex.trim();

    Ok(ArxivPaper {
        url: format!("https://arxiv.org/abs/{}", arxiv_id),
        title,
        summary: (!summary.is_empty()).then_some(summary),
        arxiv_id,
        authors: Authors::new(authors),
        categories,
        published,
        doi: None,
        comment: None,
        pdf_url: None,
        bibtex: (!bibtex.is_empty()).then(|| bibtex.to_string()),
    })
}

async fn fetch_single(
    client: &reqwest::Client,
    base_url: &str,
    arxiv_id: &str,
) -> Result<ArxivPaper, FetchError> {
    let url = format!("{}/{}", base_url, arxiv_id);
    let resp = client.get(&url).send().await?;
    let body = check_status(resp)?.text().await?;
    parse_arxiv_info(&body, arxiv_id)
}

/// Fetch details for each id, `batch_size` at a time. Each id gets exactly
/// one record in the output, in input order; failures become error records.
pub async fn fetch_paper_details(
    config: &Config,
    arxiv_ids: Vec<String>,
    batch_size: usize,
) -> Vec<PaperRecord> {
    let base_url = config.arxiv_txt_url.as_str();
    run_batched(
        arxiv_ids,
        batch_size,
        || config.http_client().map_err(|e| e.to_string()),
        |client, id| async move {
            let fetched = match client {
                Ok(client) => fetch_single(&client, base_url, &id).await,
                Err(e) => Err(FetchError::Api(format!("HTTP client unavailable: {}", e))),
            };
            match fetched {
                Ok(paper) => PaperRecord::Paper(Paper::Arxiv(paper)),
                Err(e) => {
                    tracing::warn!("Error fetching arXiv info for paper {}: {}", id, e);
                    PaperRecord::error(format!(
                        "Error fetching arXiv info for paper {}: {}",
                        id, e
                    ))
                }
            }
        },
    )
    .await
}
