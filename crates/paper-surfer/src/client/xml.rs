//! EFetch (`PubmedArticleSet`) XML parsing.
//!
//! A streaming reader with an element stack: capture starts at a target
//! element (chosen by its parent, so reference lists and investigator lists
//! are ignored) and collects all text until that element closes, flattening
//! inline markup such as `<i>` or `<sup>`.

use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;

use crate::config::api;
use crate::error::ClientResult;
use crate::models::MetadataRecord;

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip HTML tags and collapse whitespace.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let stripped = TAGS.replace_all(text, "");
    SPACES.replace_all(&stripped, " ").trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Pmid,
    Title,
    AbstractText { label: Option<String> },
    LastName,
    ForeName,
    CollectiveName,
    Journal,
    Year,
    Month,
    Day,
    MedlineDate,
    ArticleId { kind: String },
    ELocationDoi,
    Keyword,
    Mesh,
    PublicationType,
    Language,
    Grant,
}

struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

#[derive(Default)]
struct AuthorParts {
    last: String,
    fore: String,
    collective: String,
}

impl AuthorParts {
    fn name(self) -> Option<String> {
        if !self.collective.is_empty() {
            return Some(self.collective);
        }
        match (self.fore.is_empty(), self.last.is_empty()) {
            (false, false) => Some(format!("{} {}", self.fore, self.last)),
            (true, false) => Some(self.last),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ArticleBuilder {
    pmid: String,
    title: String,
    abstract_parts: Vec<String>,
    authors: Vec<String>,
    current_author: Option<AuthorParts>,
    journal: String,
    year: String,
    month: String,
    day: String,
    medline_date: String,
    doi: String,
    elocation_doi: String,
    pmc_id: String,
    keywords: Vec<String>,
    mesh_terms: Vec<String>,
    publication_types: Vec<String>,
    language: String,
    grants: Vec<String>,
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

impl ArticleBuilder {
    fn accept(&mut self, field: Field, text: String) {
        match field {
            Field::Pmid => {
                if self.pmid.is_empty() {
                    self.pmid = text;
                }
            }
            Field::Title => self.title = text,
            Field::AbstractText { label } => {
                if text.is_empty() {
                    return;
                }
                match label.filter(|l| !l.trim().is_empty()) {
                    Some(label) => self.abstract_parts.push(format!("{}: {}", label.trim(), text)),
                    None => self.abstract_parts.push(text),
                }
            }
            Field::LastName => {
                if let Some(author) = self.current_author.as_mut() {
                    author.last = text;
                }
            }
            Field::ForeName => {
                if let Some(author) = self.current_author.as_mut() {
                    author.fore = text;
                }
            }
            Field::CollectiveName => {
                if let Some(author) = self.current_author.as_mut() {
                    author.collective = text;
                }
            }
            Field::Journal => self.journal = text,
            Field::Year => self.year = text,
            Field::Month => self.month = text,
            Field::Day => self.day = text,
            Field::MedlineDate => self.medline_date = text,
            Field::ArticleId { kind } => match kind.as_str() {
                "doi" if self.doi.is_empty() => self.doi = text,
                "pmc" if self.pmc_id.is_empty() => self.pmc_id = text,
                _ => {}
            },
            Field::ELocationDoi => {
                if self.elocation_doi.is_empty() {
                    self.elocation_doi = text;
                }
            }
            Field::Keyword => push_non_empty(&mut self.keywords, text),
            Field::Mesh => push_non_empty(&mut self.mesh_terms, text),
            Field::PublicationType => push_non_empty(&mut self.publication_types, text),
            Field::Language => self.language = text,
            Field::Grant => push_non_empty(&mut self.grants, text),
        }
    }

    fn finish_author(&mut self) {
        if let Some(name) = self.current_author.take().and_then(AuthorParts::name) {
            self.authors.push(name);
        }
    }

    fn build(self) -> Option<MetadataRecord> {
        if self.pmid.is_empty() {
            return None;
        }
        let publication_date = normalize_date(&self.year, &self.month, &self.day, &self.medline_date);
        let doi = if self.doi.is_empty() { self.elocation_doi } else { self.doi };
        let url = format!("{}/{}/", api::PUBMED_RECORD_URL, self.pmid);
        Some(MetadataRecord {
            identifier: self.pmid,
            title: non_empty(self.title),
            r#abstract: non_empty(self.abstract_parts.join(" ")),
            journal: non_empty(self.journal),
            authors: self.authors,
            publication_date,
            doi: non_empty(doi),
            pmc_id: non_empty(self.pmc_id),
            url: Some(url),
            keywords: self.keywords,
            mesh_terms: self.mesh_terms,
            publication_types: self.publication_types,
            language: non_empty(self.language),
            grants: self.grants,
        })
    }
}

fn push_non_empty(list: &mut Vec<String>, text: String) {
    if !text.is_empty() {
        list.push(text);
    }
}

fn month_number(month: &str) -> Option<String> {
    let month = month.trim();
    if month.chars().all(|c| c.is_ascii_digit()) {
        let n: u32 = month.parse().ok()?;
        return (1..=12).contains(&n).then(|| format!("{n:02}"));
    }
    const NAMES: [&str; 12] =
        ["jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec"];
    let prefix: String = month.chars().take(3).collect::<String>().to_lowercase();
    NAMES.iter().position(|m| *m == prefix).map(|i| format!("{:02}", i + 1))
}

/// Normalize a `PubDate` into `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
fn normalize_date(year: &str, month: &str, day: &str, medline_date: &str) -> Option<String> {
    let year = if year.trim().len() == 4 {
        year.trim().to_string()
    } else {
        // MedlineDate looks like "2023 Nov-Dec" or "2022-2023"
        medline_date
            .split(|c: char| !c.is_ascii_digit())
            .find(|token| token.len() == 4)?
            .to_string()
    };
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let Some(month) = month_number(month) else {
        return Some(year);
    };
    let day = day.trim();
    match day.parse::<u32>() {
        Ok(d) if (1..=31).contains(&d) => Some(format!("{year}-{month}-{d:02}")),
        _ => Some(format!("{year}-{month}")),
    }
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Decide whether `name` (with the current element stack as context) starts
/// a captured field.
fn target_field(name: &str, element: &BytesStart<'_>, stack: &[String]) -> Option<Field> {
    let parent = stack.last().map(String::as_str).unwrap_or("");
    let grandparent = stack.len().checked_sub(2).map(|i| stack[i].as_str()).unwrap_or("");

    let field = match (name, parent) {
        ("PMID", "MedlineCitation") => Field::Pmid,
        ("ArticleTitle", "Article") => Field::Title,
        ("AbstractText", "Abstract") => Field::AbstractText { label: attribute(element, "Label") },
        ("LastName", "Author") => Field::LastName,
        ("ForeName", "Author") => Field::ForeName,
        ("CollectiveName", "Author") => Field::CollectiveName,
        ("Title", "Journal") => Field::Journal,
        ("Year", "PubDate") => Field::Year,
        ("Month", "PubDate") => Field::Month,
        ("Day", "PubDate") => Field::Day,
        ("MedlineDate", "PubDate") => Field::MedlineDate,
        ("ArticleId", "ArticleIdList") if grandparent == "PubmedData" => {
            Field::ArticleId { kind: attribute(element, "IdType").unwrap_or_default() }
        }
        ("ELocationID", "Article")
            if attribute(element, "EIdType").is_some_and(|t| t.eq_ignore_ascii_case("doi")) =>
        {
            Field::ELocationDoi
        }
        ("Keyword", "KeywordList") => Field::Keyword,
        ("DescriptorName", "MeshHeading") => Field::Mesh,
        ("PublicationType", "PublicationTypeList") => Field::PublicationType,
        ("Language", "Article") => Field::Language,
        ("GrantID", "Grant") => Field::Grant,
        _ => return None,
    };
    Some(field)
}

/// Parse an EFetch response into records.
///
/// Articles without a PMID are dropped with a warning.
pub fn parse_efetch(xml: &str) -> ClientResult<Vec<MetadataRecord>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<String> = Vec::new();
    let mut article: Option<ArticleBuilder> = None;
    let mut capture: Option<Capture> = None;
    let mut records = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                if name == "PubmedArticle" {
                    article = Some(ArticleBuilder::default());
                } else if let Some(builder) = article.as_mut() {
                    let in_article_authors = stack.last().is_some_and(|p| p == "AuthorList")
                        && stack.len() >= 2
                        && stack[stack.len() - 2] == "Article";
                    if name == "Author" && in_article_authors {
                        builder.current_author = Some(AuthorParts::default());
                    } else if capture.is_none() {
                        let author_field = matches!(
                            name.as_str(),
                            "LastName" | "ForeName" | "CollectiveName"
                        );
                        if !author_field || builder.current_author.is_some() {
                            if let Some(field) = target_field(&name, &element, &stack) {
                                capture = Some(Capture { field, depth: stack.len(), text: String::new() });
                            }
                        }
                    }
                }
                stack.push(name);
            }
            Event::Text(text) => {
                if let Some(capture) = capture.as_mut() {
                    let decoded = text
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                    capture.text.push_str(&decoded);
                }
            }
            Event::CData(data) => {
                if let Some(capture) = capture.as_mut() {
                    capture.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                if capture.as_ref().is_some_and(|c| c.depth == stack.len()) {
                    if let (Some(done), Some(builder)) = (capture.take(), article.as_mut()) {
                        builder.accept(done.field, clean_text(&done.text));
                    }
                }
                match name.as_str() {
                    "Author" => {
                        if let Some(builder) = article.as_mut() {
                            builder.finish_author();
                        }
                    }
                    "PubmedArticle" => {
                        if let Some(builder) = article.take() {
                            match builder.build() {
                                Some(record) => records.push(record),
                                None => tracing::warn!("Dropping PubMed article without PMID"),
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}
