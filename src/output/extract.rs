//! Structural statistics extractor
//!
//! Reads the visited log, re-parses every archived page and records heading,
//! paragraph and link statistics alongside a plain-text rendering of the page.
//! The visited log is the only input; rows may come in any order.

use crate::crawler::archive_file_name;
use crate::storage::{PageStatsRecord, Storage, VisitedRecord};
use crate::ArchiverError;
use chrono::{NaiveDate, Utc};
use scraper::{ElementRef, Html, Selector};
use std::path::{Path, PathBuf};
use url::Url;

/// Outcome of one extraction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Pages analyzed and recorded
    pub processed: usize,
    /// Visited records whose archived file was missing or unusable
    pub skipped: usize,
}

/// Statistics and text rendering of one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageAnalysis {
    pub heading_counts: [u32; 6],
    pub paragraph_count: u32,
    pub link_count: u32,
    pub internal_link_count: u32,
    pub external_link_count: u32,
    pub paragraph_character_count: u64,
    pub average_title_length: f64,
    /// Headings as `#` lines, paragraphs and `[text](href)` links, in document order
    pub text: String,
}

/// Name of the text file for `url` extracted on `date`
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use site_archiver::output::text_file_name;
///
/// let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
/// assert_eq!(text_file_name(date, "https://site.test/about"), "2026-10-18_site.test_about.txt");
/// ```
pub fn text_file_name(date: NaiveDate, url: &str) -> String {
    let archive_name = archive_file_name(url);
    let stem = archive_name.strip_suffix(".html").unwrap_or(&archive_name);
    format!("{}_{}.txt", date.format("%Y-%m-%d"), stem)
}

/// Text of an element with each text node trimmed and joined without separator
fn stripped_text(element: &ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

fn host_and_port(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

/// Whether an href points to another page at all
fn is_page_link(href: &str) -> bool {
    !(href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:"))
}

/// Analyzes the body of an archived page
///
/// Every element under `<body>` is visited in document order, nested ones
/// included. A link is internal when it resolves to the page's own host (or
/// has no host), external otherwise.
pub fn analyze_page(page_url: &str, html: &str) -> PageAnalysis {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let base_host = base.as_ref().map(host_and_port).unwrap_or_default();

    let mut analysis = PageAnalysis::default();
    let mut lines: Vec<String> = Vec::new();
    let mut title_lengths: Vec<usize> = Vec::new();

    let Ok(body_selector) = Selector::parse("body") else {
        return analysis;
    };
    let Some(body) = document.select(&body_selector).next() else {
        return analysis;
    };

    for element in body.descendants().filter_map(ElementRef::wrap) {
        let name = element.value().name();

        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = (name.as_bytes()[1] - b'0') as usize;
                let text = stripped_text(&element);
                lines.push(format!("{} {}\n", "#".repeat(level), text));
                analysis.heading_counts[level - 1] += 1;
                title_lengths.push(text.chars().count());
            }
            "p" => {
                let text = stripped_text(&element);
                analysis.paragraph_count += 1;
                analysis.paragraph_character_count += text.chars().count() as u64;
                lines.push(format!("\n{}\n", text));
            }
            "a" => {
                let Some(href) = element.value().attr("href").map(str::trim) else {
                    continue;
                };
                if !is_page_link(href) {
                    continue;
                }

                lines.push(format!("[{}]({})\n", stripped_text(&element), href));
                analysis.link_count += 1;

                let link_host = match &base {
                    Some(base) => base.join(href).map(|u| host_and_port(&u)).unwrap_or_default(),
                    None => Url::parse(href).map(|u| host_and_port(&u)).unwrap_or_default(),
                };

                if link_host.is_empty() || link_host == base_host {
                    analysis.internal_link_count += 1;
                } else {
                    analysis.external_link_count += 1;
                }
            }
            _ => {}
        }
    }

    analysis.average_title_length = if title_lengths.is_empty() {
        0.0
    } else {
        title_lengths.iter().sum::<usize>() as f64 / title_lengths.len() as f64
    };
    analysis.text = lines.join("\n");
    analysis
}

/// Runs the extractor with today's date in the file names
pub fn run_extraction<S: Storage + ?Sized>(
    storage: &mut S,
    text_dir: &Path,
) -> Result<ExtractionSummary, ArchiverError> {
    extract_statistics(storage, text_dir, Utc::now().date_naive())
}

/// Extracts statistics for every record of the visited log
///
/// Missing or unreadable archives are skipped with a warning. Failing to
/// create `text_dir` or to record statistics aborts the pass.
pub fn extract_statistics<S: Storage + ?Sized>(
    storage: &mut S,
    text_dir: &Path,
    date: NaiveDate,
) -> Result<ExtractionSummary, ArchiverError> {
    std::fs::create_dir_all(text_dir)?;

    let records = storage.load_visited()?;
    tracing::info!("Extracting statistics from {} archived pages", records.len());

    let mut summary = ExtractionSummary::default();

    for record in records {
        match extract_one(&record, text_dir, date) {
            Some(stats) => {
                storage.upsert_page_stats(&stats)?;
                summary.processed += 1;
            }
            None => summary.skipped += 1,
        }
    }

    tracing::info!(
        "Extraction complete: {} processed, {} skipped",
        summary.processed,
        summary.skipped
    );
    Ok(summary)
}

fn extract_one(record: &VisitedRecord, text_dir: &Path, date: NaiveDate) -> Option<PageStatsRecord> {
    let html_path = Path::new(&record.html_file_path);
    if record.html_file_path.is_empty() || !html_path.exists() {
        tracing::warn!("Archived HTML missing for {}", record.url);
        return None;
    }

    let html = match std::fs::read_to_string(html_path) {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", html_path.display(), e);
            return None;
        }
    };

    let analysis = analyze_page(&record.url, &html);

    let text_path: PathBuf = text_dir.join(text_file_name(date, &record.url));
    if let Err(e) = std::fs::write(&text_path, analysis.text.as_bytes()) {
        tracing::warn!("Failed to write {}: {}", text_path.display(), e);
        return None;
    }

    Some(PageStatsRecord {
        url: record.url.clone(),
        text_file_path: text_path.display().to_string(),
        heading_counts: analysis.heading_counts,
        paragraph_count: analysis.paragraph_count,
        link_count: analysis.link_count,
        internal_link_count: analysis.internal_link_count,
        external_link_count: analysis.external_link_count,
        paragraph_character_count: analysis.paragraph_character_count,
        average_title_length: analysis.average_title_length,
    })
}
