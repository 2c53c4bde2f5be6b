//! Minimal arXiv client (Atom feed) with bounded results.
//!
//! Notes:
//! - ArXiv exposes an Atom API at `https://export.arxiv.org/api/query`.
//! - Parsing is deliberately minimal and resilient; entries keep their full
//!   link list so callers can resolve a PDF link themselves.

use crate::fetch::{send_with_retry, RetryPolicy};
use ragrelay_core::{Error, Result};

fn arxiv_api_endpoint() -> Result<reqwest::Url> {
    let s = crate::env("RAGRELAY_ARXIV_ENDPOINT")
        .unwrap_or_else(|| "https://export.arxiv.org/api/query".to_string());
    reqwest::Url::parse(s.trim()).map_err(|e| Error::Fetch(e.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct FeedLink {
    pub rel: Option<String>,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub href: String,
}

#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    /// The entry `<id>`, an `https://arxiv.org/abs/...` URL.
    pub id_url: String,
    pub title: String,
    /// The paper abstract (Atom calls it `<summary>`).
    pub summary: String,
    pub published: Option<String>,
    pub authors: Vec<String>,
    pub links: Vec<FeedLink>,
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

pub fn arxiv_id_from_url(url: &str) -> Option<String> {
    // Examples:
    // - https://arxiv.org/abs/0805.3415
    // - http://arxiv.org/abs/cs/9901001v1
    let u = url.trim();
    let i = u.rfind("/abs/")?;
    let tail = &u[i + "/abs/".len()..];
    let id = tail.trim_matches('/').trim();
    (!id.is_empty()).then_some(id.to_string())
}

/// Canonical `arxiv.org/pdf/<id>.pdf` URL derived from the entry id, used
/// when the feed's own PDF link is missing or dead.
pub fn fallback_pdf_url(entry: &FeedEntry) -> Option<String> {
    arxiv_id_from_url(&entry.id_url).map(|id| format!("https://arxiv.org/pdf/{}.pdf", id.trim()))
}

/// First link whose declared type or URL marks it as a PDF.
pub fn pdf_link(entry: &FeedEntry) -> Option<String> {
    entry
        .links
        .iter()
        .find(|l| {
            l.content_type.as_deref() == Some("application/pdf")
                || l.title.as_deref() == Some("pdf")
                || l.href.contains(".pdf")
        })
        .map(|l| l.href.clone())
}

fn build_search_query(query: &str) -> String {
    // ArXiv query syntax: all:term. Approximate phrase search by quoting
    // when the query has spaces.
    let q = query.trim();
    if q.contains(' ') {
        format!("all:\"{}\"", q.replace('"', ""))
    } else {
        format!("all:{q}")
    }
}

fn link_from_attrs(e: &quick_xml::events::BytesStart<'_>) -> FeedLink {
    let mut link = FeedLink::default();
    for a in e.attributes().flatten() {
        let k = String::from_utf8_lossy(a.key.as_ref()).to_string();
        let v = a
            .unescape_value()
            .map(|v| v.to_string())
            .unwrap_or_default();
        match k.as_str() {
            "rel" => link.rel = Some(v),
            "type" => link.content_type = Some(v),
            "title" => link.title = Some(v),
            "href" => link.href = v,
            _ => {}
        }
    }
    link
}

pub fn parse_atom(body: &str) -> Result<Vec<FeedEntry>> {
    // quick-xml because Atom namespaces make regex parsing brittle.
    let mut reader = quick_xml::Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut entries: Vec<FeedEntry> = Vec::new();
    let mut cur = FeedEntry::default();
    let mut in_entry = false;
    let mut in_author = false;
    let mut cur_text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Eof) => break,
            Ok(quick_xml::events::Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name.ends_with("entry") {
                    cur = FeedEntry::default();
                    in_entry = true;
                    in_author = false;
                    cur_text.clear();
                }
                if in_entry && name.ends_with("author") {
                    in_author = true;
                }
                if in_entry && name.ends_with("link") {
                    let link = link_from_attrs(&e);
                    if !link.href.is_empty() {
                        cur.links.push(link);
                    }
                }
            }
            Ok(quick_xml::events::Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if in_entry && name.ends_with("link") {
                    let link = link_from_attrs(&e);
                    if !link.href.is_empty() {
                        cur.links.push(link);
                    }
                }
            }
            Ok(quick_xml::events::Event::Text(t)) => {
                if in_entry {
                    cur_text.push_str(&t.unescape().map(|t| t.to_string()).unwrap_or_default());
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if in_entry {
                    let txt = normalize_ws(&cur_text);
                    if name.ends_with("id") {
                        cur.id_url = txt;
                    } else if name.ends_with("title") {
                        cur.title = txt;
                    } else if name.ends_with("summary") {
                        cur.summary = txt;
                    } else if name.ends_with("published") {
                        cur.published = (!txt.is_empty()).then_some(txt);
                    } else if in_author && name.ends_with("name") && !txt.is_empty() {
                        cur.authors.push(txt);
                    }
                    cur_text.clear();

                    if name.ends_with("author") {
                        in_author = false;
                    }
                    if name.ends_with("entry") {
                        in_entry = false;
                        entries.push(std::mem::take(&mut cur));
                    }
                }
            }
            Err(e) => {
                if entries.is_empty() {
                    return Err(Error::Feed(e.to_string()));
                }
                tracing::warn!(error = %e, parsed = entries.len(), "atom parse stopped early");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

/// Search arXiv, preserving feed order. Zero entries is an error: callers
/// report "No papers found" rather than an empty success.
pub async fn search(
    http: &reqwest::Client,
    query: &str,
    max_results: usize,
    policy: &RetryPolicy,
) -> Result<Vec<FeedEntry>> {
    let q = query.trim();
    if q.is_empty() {
        return Err(Error::InvalidRequest("query must be non-empty".to_string()));
    }
    let max_results = max_results.clamp(1, 50);

    let mut url = arxiv_api_endpoint()?;
    url.query_pairs_mut()
        .append_pair("search_query", &build_search_query(q))
        .append_pair("start", "0")
        .append_pair("max_results", &max_results.to_string());

    tracing::debug!(%url, "searching arXiv");
    let resp = send_with_retry(http.get(url), policy).await?;
    let body = resp.text().await.map_err(|e| Error::Fetch(e.to_string()))?;

    let entries = parse_atom(&body)?;
    if entries.is_empty() {
        return Err(Error::NoResults);
    }
    Ok(entries)
}
