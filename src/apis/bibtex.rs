//! BibTeX enrichment for arXiv-identified papers.

use std::collections::{HashMap, HashSet};

use super::PaperRecord;
use crate::batch::run_batched;
use crate::config::Config;

/// Fetch the BibTeX for one arXiv id.
///
/// Any failure yields an empty string: a missing citation should never take
/// the paper down with it.
pub async fn fetch_bibtex(client: &reqwest::Client, base_url: &str, arxiv_id: &str) -> String {
    let url = format!("{}/{}", base_url, arxiv_id);
    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to read BibTeX for {}: {}", arxiv_id, e);
                String::new()
            }
        },
        Ok(resp) => {
            tracing::warn!("Failed to fetch BibTeX for {}: {}", arxiv_id, resp.status());
            String::new()
        }
        Err(e) => {
            tracing::warn!("Error fetching BibTeX for {}: {}", arxiv_id, e);
            String::new()
        }
    }
}

/// Fetch BibTeX for many ids, `batch_size` at a time, keyed by id.
pub async fn fetch_bibtex_batch(
    config: &Config,
    arxiv_ids: Vec<String>,
    batch_size: usize,
) -> HashMap<String, String> {
    let base_url = config.arxiv_bibtex_url.as_str();
    run_batched(
        arxiv_ids,
        batch_size,
        || config.http_client().map_err(|e| e.to_string()),
        |client, id| async move {
            let bibtex = match client {
                Ok(client) => fetch_bibtex(&client, base_url, &id).await,
                Err(e) => {
                    tracing::warn!("No HTTP client for BibTeX of {}: {}", id, e);
                    String::new()
                }
            };
            (id, bibtex)
        },
    )
    .await
    .into_iter()
    .collect()
}

/// Return `records` with BibTeX attached to every arXiv-identified paper that
/// has no citation yet. Results are matched back by identifier, never by
/// position; order and count are preserved.
pub async fn add_bibtex_to_papers(
    config: &Config,
    records: Vec<PaperRecord>,
    batch_size: usize,
) -> Vec<PaperRecord> {
    let arxiv_ids: Vec<String> = {
        let mut seen = HashSet::new();
        records
            .iter()
            .filter_map(PaperRecord::as_paper)
            .filter(|p| p.citation().is_none())
            .filter_map(|p| p.arxiv_id())
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect()
    };

    if arxiv_ids.is_empty() {
        return records;
    }

    tracing::info!("Fetching BibTeX for {} papers", arxiv_ids.len());
    let bibtex = fetch_bibtex_batch(config, arxiv_ids, batch_size).await;

    records
        .into_iter()
        .map(|record| match record {
            PaperRecord::Paper(paper) => {
                let found = paper
                    .arxiv_id()
                    .and_then(|id| bibtex.get(id))
                    .filter(|text| !text.trim().is_empty())
                    .cloned();
                match found {
                    Some(text) => PaperRecord::Paper(paper.with_citation(text)),
                    None => {
                        if paper.arxiv_id().is_some() && paper.citation().is_none() {
                            tracing::debug!("No BibTeX for {}", paper.label());
                        }
                        PaperRecord::Paper(paper)
                    }
                }
            }
            error => error,
        })
        .collect()
}
