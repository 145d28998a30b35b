use super::{check_status, ArxivPaper, Authors, FetchError, Paper, PaperRecord, PaperSource};
use crate::config::Config;
use async_trait::async_trait;
use chrono::DateTime;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub struct ArxivClient {
    config: Config,
}

impl ArxivClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The query is an arXiv query-language expression and may already carry
    /// `&max_results=..`, `&sortBy=..` and friends, so it is not re-encoded.
    fn query_url(&self, query: &str, limit: Option<u32>) -> String {
        let mut url = format!(
            "{}?search_query={}",
            self.config.arxiv_url,
            query.trim().replace(' ', "+")
        );
        if let Some(n) = limit {
            if !query.contains("max_results=") {
                url.push_str(&format!("&max_results={}", n));
            }
        }
        url
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    fn name(&self) -> &str {
        "arXiv"
    }

    async fn search(
        &self,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<PaperRecord>, FetchError> {
        let url = self.query_url(query, limit);
        tracing::debug!("arXiv query: {}", url);
        let resp = self.config.http_client()?.get(&url).send().await?;
        let body = check_status(resp)?.text().await?;
        parse_atom_feed(&body)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    None,
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
    Doi,
    Comment,
    TotalResults,
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    author_name: String,
    in_author: bool,
    categories: Vec<String>,
    doi: String,
    comment: String,
    abs_url: Option<String>,
    pdf_url: Option<String>,
}

impl EntryBuilder {
    fn text_for(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Id => Some(&mut self.id),
            Field::Title => Some(&mut self.title),
            Field::Summary => Some(&mut self.summary),
            Field::Published => Some(&mut self.published),
            Field::AuthorName => Some(&mut self.author_name),
            Field::Doi => Some(&mut self.doi),
            Field::Comment => Some(&mut self.comment),
            Field::None | Field::TotalResults => None,
        }
    }

    /// Field whose text the element starting here carries.
    fn start(&mut self, tag: &[u8], e: &BytesStart) -> Field {
        match tag {
            b"id" => Field::Id,
            b"title" => Field::Title,
            b"summary" => Field::Summary,
            b"published" => Field::Published,
            b"name" if self.in_author => Field::AuthorName,
            b"arxiv:doi" => Field::Doi,
            b"arxiv:comment" => Field::Comment,
            b"author" => {
                self.in_author = true;
                self.author_name.clear();
                Field::None
            }
            _ => {
                self.read_attributes(e);
                Field::None
            }
        }
    }

    /// `<link>` and `<category>` carry their data in attributes and may be
    /// written either as empty or as start elements.
    fn read_attributes(&mut self, e: &BytesStart) {
        match e.name().as_ref() {
            b"link" => {
                let href = attribute(e, b"href");
                if attribute(e, b"title").as_deref() == Some("pdf") {
                    self.pdf_url = href;
                } else if attribute(e, b"rel").as_deref() == Some("alternate")
                    || self.abs_url.is_none()
                {
                    if let Some(href) = href.filter(|h| h.contains("/abs/")) {
                        self.abs_url = Some(href);
                    }
                }
            }
            b"category" => {
                if let Some(term) = attribute(e, b"term") {
                    if !self.categories.contains(&term) {
                        self.categories.push(term);
                    }
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> Result<PaperRecord, FetchError> {
        let id_url = self.id.trim();
        if id_url.contains("/api/errors") {
            return Err(FetchError::Api(collapse(&self.summary)));
        }
        let arxiv_id = id_url.rsplit('/').next().unwrap_or("").to_string();
        let title = collapse(&self.title);
        if arxiv_id.is_empty() || title.is_empty() {
            return Ok(PaperRecord::error(format!(
                "Failed to parse arXiv entry: missing {}",
                if arxiv_id.is_empty() { "id" } else { "title" }
            )));
        }
        let summary = collapse(&self.summary);
        let published = DateTime::parse_from_rfc3339(self.published.trim())
            .ok()
            .map(|d| d.date_naive());

        Ok(PaperRecord::Paper(Paper::Arxiv(ArxivPaper {
            url: self.abs_url.unwrap_or_else(|| id_url.to_string()),
            title,
            summary: (!summary.is_empty()).then_some(summary),
            arxiv_id,
            authors: Authors::new(self.authors),
            categories: self.categories,
            published,
            doi: non_empty(self.doi),
            comment: non_empty(collapse(&self.comment)),
            pdf_url: self.pdf_url,
            bibtex: None,
        })))
    }
}

fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse an arXiv Atom feed into records, one per `<entry>`.
pub(crate) fn parse_atom_feed(xml: &str) -> Result<Vec<PaperRecord>, FetchError> {
    let mut reader = Reader::from_str(xml);
    let mut records = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut field = Field::None;
    let mut total_results = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let tag = name.as_ref();
                if tag == b"entry" {
                    entry = Some(EntryBuilder::default());
                } else if let Some(current) = entry.as_mut() {
                    field = current.start(tag, &e);
                } else if tag == b"opensearch:totalResults" {
                    field = Field::TotalResults;
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(current) = entry.as_mut() {
                    current.read_attributes(&e);
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| FetchError::Parse(format!("XML parse error: {}", e)))?;
                match entry.as_mut() {
                    Some(current) => {
                        if let Some(target) = current.text_for(field) {
                            target.push_str(&text);
                        }
                    }
                    None if field == Field::TotalResults => total_results.push_str(&text),
                    None => {}
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(target) = entry.as_mut().and_then(|c| c.text_for(field)) {
                    target.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"entry" => {
                        if let Some(done) = entry.take() {
                            records.push(done.finish()?);
                        }
                    }
                    b"author" => {
                        if let Some(current) = entry.as_mut() {
                            current.in_author = false;
                            let name = collapse(&current.author_name);
                            if !name.is_empty() {
                                current.authors.push(name);
                            }
                        }
                    }
                    _ => {}
                }
                field = Field::None;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    tracing::debug!(
        "arXiv feed: {} entries parsed, {} total results",
        records.len(),
        total_results.trim()
    );
    Ok(records)
}
