use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "paperpal-app/1.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub user_agent: String,
    pub timeout: Duration,
    pub batch_size: usize,
    pub huggingface_url: String,
    pub arxiv_url: String,
    pub arxiv_bibtex_url: String,
    pub arxiv_txt_url: String,
    pub semantic_scholar_url: String,
    pub semantic_scholar_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
            huggingface_url: "https://huggingface.co/api".to_string(),
            arxiv_url: "https://export.arxiv.org/api/query".to_string(),
            arxiv_bibtex_url: "https://arxiv.org/bibtex".to_string(),
            arxiv_txt_url: "https://www.arxiv-txt.org/raw/abs".to_string(),
            semantic_scholar_url: "https://api.semanticscholar.org/graph/v1".to_string(),
            semantic_scholar_api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let user_agent = std::env::var("PAPERPAL_USER_AGENT").unwrap_or(defaults.user_agent);
        let timeout = Duration::from_secs(parse_var(
            "PAPERPAL_HTTP_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        ));
        let batch_size = parse_var("PAPERPAL_BATCH_SIZE", DEFAULT_BATCH_SIZE).max(1);

        Self {
            user_agent,
            timeout,
            batch_size,
            huggingface_url: url_var("HUGGINGFACE_API_URL", defaults.huggingface_url),
            arxiv_url: url_var("ARXIV_API_URL", defaults.arxiv_url),
            arxiv_bibtex_url: url_var("ARXIV_BIBTEX_URL", defaults.arxiv_bibtex_url),
            arxiv_txt_url: url_var("ARXIV_TXT_URL", defaults.arxiv_txt_url),
            semantic_scholar_url: url_var(
                "SEMANTIC_SCHOLAR_API_URL",
                defaults.semantic_scholar_url,
            ),
            semantic_scholar_api_key: std::env::var("SEMANTIC_SCHOLAR_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
        }
    }

    /// Point every endpoint at a single mock server.
    #[cfg(test)]
    pub fn for_testing(base: &str) -> Self {
        Self {
            timeout: Duration::from_secs(5),
            huggingface_url: format!("{}/api", base),
            arxiv_url: format!("{}/api/query", base),
            arxiv_bibtex_url: format!("{}/bibtex", base),
            arxiv_txt_url: format!("{}/raw/abs", base),
            semantic_scholar_url: format!("{}/graph/v1", base),
            ..Self::default()
        }
    }

    /// Build the HTTP client used for one adapter call or one fetch batch.
    /// Requests always carry the configured user agent and timeout.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .build()
    }
}

fn url_var(name: &str, default: String) -> String {
    std::env::var(name)
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or(default)
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}
