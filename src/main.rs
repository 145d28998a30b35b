use std::sync::Arc;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters,
    model::*, tool, tool_handler, tool_router,
    transport::stdio, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

mod apis;
mod batch;
mod config;
mod format;

use apis::arxiv::ArxivClient;
use apis::huggingface::HuggingFaceClient;
use apis::semantic_scholar::SemanticScholarClient;
use apis::{FetchError, PaperRecord, PaperSource};
use config::Config;

// ── Parameter structs ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct HuggingFaceSearchParams {
    #[schemars(description = "Query term. Keywords or a natural language question both work.")]
    query: String,
    #[schemars(description = "Number of papers to return (default 10)")]
    top_n: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ArxivSearchParams {
    #[schemars(description = "arXiv query, e.g. 'ti:transformer', 'au:goodfellow', \
        'cat:cs.AI', 'all:neural networks'. Combine with AND, OR, ANDNOT; append \
        '&max_results=10&sortBy=submittedDate&sortOrder=descending' if needed.")]
    search_query: String,
    #[schemars(description = "Fetch BibTeX for each paper (default true)")]
    fetch_bibtex_data: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SemanticScholarSearchParams {
    #[schemars(description = "Query term. Keywords or a natural language question both work.")]
    query: String,
    #[schemars(description = "Number of papers to return (default 10, max 100)")]
    top_n: Option<u32>,
}

/// One id, several ids separated by commas or whitespace, or a list of ids.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(untagged)]
enum ArxivIds {
    One(String),
    Many(Vec<String>),
}

impl ArxivIds {
    fn into_list(self) -> Vec<String> {
        let raw = match self {
            ArxivIds::One(s) => vec![s],
            ArxivIds::Many(v) => v,
        };
        raw.iter()
            .flat_map(|s| s.split(|c: char| c == ',' || c.is_whitespace()))
            .map(|s| s.trim().trim_start_matches("arxiv:").to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PaperDetailsParams {
    #[schemars(description = "arXiv id or list of ids, e.g. [\"2503.01469\", \"2503.01470\"]")]
    arxiv_ids: ArxivIds,
}

// ── Server ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PaperPalServer {
    tool_router: ToolRouter<Self>,
    config: Arc<Config>,
    huggingface: Arc<HuggingFaceClient>,
    arxiv: Arc<ArxivClient>,
    semantic_scholar: Arc<SemanticScholarClient>,
}

#[tool_router]
impl PaperPalServer {
    pub fn create(config: Config) -> Self {
        tracing::info!(
            "Configured batch_size={}, timeout={:?}, semantic_scholar_api_key={}",
            config.batch_size,
            config.timeout,
            config.semantic_scholar_api_key.is_some()
        );
        Self {
            tool_router: Self::tool_router(),
            huggingface: Arc::new(HuggingFaceClient::new(config.clone())),
            arxiv: Arc::new(ArxivClient::new(config.clone())),
            semantic_scholar: Arc::new(SemanticScholarClient::new(config.clone())),
            config: Arc::new(config),
        }
    }

    #[tool(description = "Semantic and keyword search for trending papers on HuggingFace. \
        Try several queries to home in on a topic.")]
    async fn search_papers_on_huggingface(
        &self,
        Parameters(params): Parameters<HuggingFaceSearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .huggingface_text(&params.query, params.top_n.unwrap_or(10))
            .await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Search arXiv with its query syntax (ti:, abs:, au:, cat:, all:). \
        Keep queries simple and refine them rather than building complex expressions.")]
    async fn search_papers_on_arxiv(
        &self,
        Parameters(params): Parameters<ArxivSearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .arxiv_text(&params.search_query, params.fetch_bibtex_data.unwrap_or(true))
            .await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Search for papers on Semantic Scholar. On a rate limit error, \
        wait a few moments and try again.")]
    async fn search_papers_on_semantic_scholar(
        &self,
        Parameters(params): Parameters<SemanticScholarSearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .semantic_scholar_text(&params.query, params.top_n.unwrap_or(10))
            .await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        description = "Get title, authors, abstract, categories and BibTeX for arXiv papers by id"
    )]
    async fn fetch_paper_details_from_arxiv(
        &self,
        Parameters(params): Parameters<PaperDetailsParams>,
    ) -> Result<CallToolResult, McpError> {
        let text = self.paper_details_text(params.arxiv_ids.into_list()).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

impl PaperPalServer {
    /// Run one source search; failures come back as a single error record.
    async fn search_source(
        &self,
        source: &dyn PaperSource,
        query: &str,
        limit: Option<u32>,
    ) -> Vec<PaperRecord> {
        match source.search(query, limit).await {
            Ok(records) => {
                tracing::info!(
                    "{} returned {} records for {:?}",
                    source.name(),
                    records.len(),
                    query
                );
                records
            }
            Err(FetchError::RateLimited) => vec![PaperRecord::error(format!(
                "Rate limit exceeded on {}. Try again later.",
                source.name()
            ))],
            Err(e) => {
                tracing::warn!("Source {} failed: {}", source.name(), e);
                vec![PaperRecord::error(format!(
                    "Failed to fetch papers from {}: {}",
                    source.name(),
                    e
                ))]
            }
        }
    }

    async fn huggingface_text(&self, query: &str, top_n: u32) -> String {
        let records = self
            .search_source(self.huggingface.as_ref(), query, Some(top_n))
            .await;
        format::stringify_papers(&records)
    }

    async fn arxiv_text(&self, search_query: &str, fetch_bibtex: bool) -> String {
        let mut records = self.search_source(self.arxiv.as_ref(), search_query, None).await;
        if fetch_bibtex {
            records =
                apis::bibtex::add_bibtex_to_papers(&self.config, records, self.config.batch_size)
                    .await;
        }
        format::stringify_papers(&records)
    }

    async fn semantic_scholar_text(&self, query: &str, top_n: u32) -> String {
        let records = self
            .search_source(self.semantic_scholar.as_ref(), query, Some(top_n))
            .await;
        format::stringify_papers(&records)
    }

    async fn paper_details_text(&self, arxiv_ids: Vec<String>) -> String {
        if arxiv_ids.is_empty() {
            return format::stringify_papers(&[PaperRecord::error("No arXiv ids given")]);
        }
        let records =
            apis::arxiv_txt::fetch_paper_details(&self.config, arxiv_ids, self.config.batch_size)
                .await;
        format::stringify_papers(&records)
    }
}

#[tool_handler]
impl ServerHandler for PaperPalServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Find research papers. Search trending papers on HuggingFace, \
                 arXiv (with BibTeX) and Semantic Scholar, and fetch arXiv paper \
                 details by id."
                    .into(),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting paperpal MCP server");

    let server = PaperPalServer::create(Config::from_env());
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
