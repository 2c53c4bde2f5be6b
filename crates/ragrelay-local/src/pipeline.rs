//! One-shot arXiv search -> PDF download/extract -> summarize pipeline.
//!
//! Per-entry failures (missing PDF link, dead link, extraction or summary
//! failure) are logged and skipped; the batch only fails when nothing
//! survives. Entries keep feed order; no re-ranking.

use crate::arxiv::{self, FeedEntry};
use crate::extract;
use crate::fetch::{send_with_retry, RetryPolicy};
use crate::openai_compat::SummaryClient;
use ragrelay_core::{Error, PaperSummary, Result};

/// Rewrite plain-http PDF links to https. Loopback hosts are exempt so
/// local backends stay reachable.
pub(crate) fn force_https(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    if parsed.scheme() != "http" {
        return url.to_string();
    }
    let loopback = match parsed.host() {
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        Some(url::Host::Domain(d)) => d.eq_ignore_ascii_case("localhost"),
        None => true,
    };
    if loopback || parsed.set_scheme("https").is_err() {
        return url.to_string();
    }
    parsed.to_string()
}

async fn download_pdf(
    http: &reqwest::Client,
    entry: &FeedEntry,
    pdf_url: &str,
    policy: &RetryPolicy,
) -> Result<Vec<u8>> {
    let primary = force_https(pdf_url);
    tracing::debug!(url = %primary, "downloading PDF");
    match send_with_retry(http.get(&primary), policy).await {
        Ok(resp) => Ok(resp
            .bytes()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?
            .to_vec()),
        Err(primary_err) => {
            // Canonical fallback for stale or mirrored feed links.
            let Some(fallback) = arxiv::fallback_pdf_url(entry).filter(|f| *f != primary) else {
                return Err(primary_err);
            };
            tracing::warn!(error = %primary_err, url = %fallback, "primary PDF link failed, trying fallback");
            let resp = send_with_retry(http.get(&fallback), policy).await?;
            Ok(resp
                .bytes()
                .await
                .map_err(|e| Error::Fetch(e.to_string()))?
                .to_vec())
        }
    }
}

async fn process_entry(
    http: &reqwest::Client,
    llm: &SummaryClient,
    entry: &FeedEntry,
    pdf_url: &str,
    policy: &RetryPolicy,
) -> Result<PaperSummary> {
    let bytes = download_pdf(http, entry, pdf_url, policy).await?;
    let full_text = extract::pdf_to_text(&bytes)?;
    let summary = llm.summarize(&full_text, policy).await?;

    Ok(PaperSummary {
        title: entry.title.clone(),
        authors: entry.authors.clone(),
        abstract_text: entry.summary.clone(),
        pdf_url: force_https(pdf_url),
        arxiv_url: entry.id_url.clone(),
        published_date: entry.published.clone(),
        full_text,
        summary,
    })
}

/// Search arXiv and summarize each resolvable entry.
pub async fn search_and_summarize(
    http: &reqwest::Client,
    llm: &SummaryClient,
    query: &str,
    max_results: usize,
    policy: &RetryPolicy,
) -> Result<Vec<PaperSummary>> {
    let entries = arxiv::search(http, query, max_results, policy).await?;

    let mut results = Vec::new();
    for entry in &entries {
        let Some(link) = arxiv::pdf_link(entry) else {
            tracing::warn!(title = %entry.title, "no PDF link found for entry");
            continue;
        };
        match process_entry(http, llm, entry, &link, policy).await {
            Ok(paper) => results.push(paper),
            Err(e) => {
                tracing::warn!(title = %entry.title, error = %e, "skipping entry");
            }
        }
    }

    if results.is_empty() {
        return Err(Error::NoneProcessed);
    }
    Ok(results)
}
