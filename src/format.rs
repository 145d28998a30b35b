use std::fmt::{self, Display, Write as _};

use crate::apis::{ArxivPaper, HuggingFacePaper, Paper, PaperRecord, SemanticScholarPaper};

const SEPARATOR: &str = "\n---\n";

/// Render records as the text block handed back to the calling agent.
pub fn stringify_papers(records: &[PaperRecord]) -> String {
    let body = records
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(SEPARATOR);
    format!("List of papers:{SEPARATOR}{body}{SEPARATOR}")
}

/// Collects `Label: value` lines, skipping absent values.
struct Fields(String);

impl Fields {
    fn new() -> Self {
        Self(String::new())
    }

    fn line(mut self, label: &str, value: impl Display) -> Self {
        if !self.0.is_empty() {
            self.0.push('\n');
        }
        let _ = write!(self.0, "{}: {}", label, value);
        self
    }

    fn opt<V: Display>(self, label: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.line(label, v),
            None => self,
        }
    }

    fn non_empty(self, label: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self
        } else {
            self.line(label, value)
        }
    }
}

impl Display for PaperRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaperRecord::Paper(p) => p.fmt(f),
            PaperRecord::Error(message) => write!(f, "Error: {}", message),
        }
    }
}

impl Display for Paper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Paper::HuggingFace(p) => p.fmt(f),
            Paper::Arxiv(p) => p.fmt(f),
            Paper::SemanticScholar(p) => p.fmt(f),
        }
    }
}

impl Display for HuggingFacePaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = Fields::new()
            .line("Title", &self.title)
            .non_empty("Authors", &self.authors.to_string())
            .line("Summary", &self.summary)
            .line("ID", &self.arxiv_id)
            .line("Upvotes", self.upvotes)
            .opt("Published", self.published_at)
            .line("URL", &self.url)
            .opt("BibTeX", non_blank(&self.bibtex));
        f.write_str(&fields.0)
    }
}

impl Display for ArxivPaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = Fields::new()
            .line("Title", &self.title)
            .non_empty("Authors", &self.authors.to_string())
            .opt("Summary", self.summary.as_deref())
            .line("ID", &self.arxiv_id)
            .non_empty("Categories", &self.categories.join(", "))
            .opt("Published", self.published)
            .opt("DOI", self.doi.as_deref())
            .opt("Comment", self.comment.as_deref())
            .line("URL", &self.url)
            .opt("PDF", self.pdf_url.as_deref())
            .opt("BibTeX", non_blank(&self.bibtex));
        f.write_str(&fields.0)
    }
}

impl Display for SemanticScholarPaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = Fields::new()
            .opt("Title", self.title.as_deref())
            .non_empty("Authors", &self.authors.to_string())
            .opt("Abstract", self.abstract_text.as_deref())
            .opt("Paper ID", self.paper_id.as_deref())
            .opt("URL", self.url.as_deref())
            .opt("TLDR", self.tldr.as_deref())
            .opt("Citation", non_blank(&self.citation));
        f.write_str(&fields.0)
    }
}

fn non_blank(text: &Option<String>) -> Option<&str> {
    text.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::Authors;

    fn hf() -> Paper {
        Paper::HuggingFace(HuggingFacePaper {
            title: "Attention Is All You Need".into(),
            summary: "Transformers.".into(),
            arxiv_id: "1706.03762".into(),
            upvotes: 42,
            authors: Authors::new(vec!["Ashish Vaswani".into(), "Noam Shazeer".into()]),
            published_at: None,
            url: "https://arxiv.org/abs/1706.03762".into(),
            bibtex: None,
        })
    }

    #[test]
    fn test_stringify_wraps_and_separates() {
        let records = vec![PaperRecord::Paper(hf()), PaperRecord::error("boom")];
        let text = stringify_papers(&records);
        assert!(text.starts_with("List of papers:\n---\nTitle: Attention Is All You Need\n"));
        assert!(text.ends_with("\n---\nError: boom\n---\n"));
        assert_eq!(text.matches("\n---\n").count(), 3);
    }

    #[test]
    fn test_stringify_empty_list() {
        assert_eq!(stringify_papers(&[]), "List of papers:\n---\n\n---\n");
    }

    #[test]
    fn test_huggingface_field_order() {
        let text = hf().to_string();
        assert_eq!(
            text,
            "Title: Attention Is All You Need\n\
             Authors: Ashish Vaswani, Noam Shazeer\n\
             Summary: Transformers.\n\
             ID: 1706.03762\n\
             Upvotes: 42\n\
             URL: https://arxiv.org/abs/1706.03762"
        );
    }

    #[test]
    fn test_error_record_renders_only_error() {
        let text = PaperRecord::error("Rate limit exceeded").to_string();
        assert_eq!(text, "Error: Rate limit exceeded");
    }

    #[test]
    fn test_semantic_scholar_skips_absent_fields() {
        let paper = Paper::SemanticScholar(SemanticScholarPaper {
            title: Some("Deep Residual Learning".into()),
            abstract_text: None,
            authors: Authors::default(),
            paper_id: Some("2c03df8b".into()),
            url: None,
            tldr: Some("Residual connections help.".into()),
            citation: Some("  ".into()),
            raw: serde_json::Value::Null,
        });
        assert_eq!(
            paper.to_string(),
            "Title: Deep Residual Learning\nPaper ID: 2c03df8b\nTLDR: Residual connections help."
        );
    }
}
