//! Statistics over a crawl's page file
//!
//! Statistics are computed from the pages themselves rather than from the
//! checkpoint, so any `.json`/`.jsonl` output can be analysed after the fact.

use crate::crawler::Page;
use crate::output::{read_pages, OutputResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const RULE_WIDTH: usize = 60;
const TOP_DOMAINS: usize = 10;
const SUMMARY_DOMAINS: usize = 5;
const MAX_BAR: usize = 50;

/// Page count for one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: u64,
}

/// Aggregate statistics for a set of pages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_pages: u64,
    pub total_links: u64,
    pub total_text_size: u64,
    pub total_html_size: u64,
    pub avg_links_per_page: f64,
    pub avg_text_size: f64,
    pub avg_html_size: f64,
    pub max_depth: u32,
    pub pages_by_depth: BTreeMap<u32, u64>,
    pub unique_domains: u64,
    pub top_domains: Vec<DomainCount>,
    pub status_codes: BTreeMap<u16, u64>,
    pub pages_with_text: u64,
    pub pages_with_title: u64,
    pub pages_with_metadata: u64,
    pub text_length_min: u64,
    pub text_length_median: u64,
    pub text_length_max: u64,
}

/// Analyzer over a set of crawled pages
#[derive(Debug, Clone)]
pub struct CrawlStats {
    pages: Vec<Page>,
}

impl CrawlStats {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    /// Loads pages from a `.json` or `.jsonl` file
    pub fn from_file(path: &Path) -> OutputResult<Self> {
        let pages = read_pages(path)?;
        tracing::info!("Loaded {} pages from {}", pages.len(), path.display());
        Ok(Self::new(pages))
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn compute(&self) -> StatsSummary {
        let total = self.pages.len() as u64;
        if total == 0 {
            return StatsSummary::default();
        }

        let total_links: u64 = self.pages.iter().map(|p| p.links.len() as u64).sum();
        let total_text_size: u64 = self.pages.iter().map(|p| p.text_len() as u64).sum();
        let total_html_size: u64 = self
            .pages
            .iter()
            .map(|p| p.html.as_deref().map_or(0, |h| h.chars().count()) as u64)
            .sum();

        let mut pages_by_depth = BTreeMap::new();
        let mut status_codes = BTreeMap::new();
        let mut domains: HashMap<String, u64> = HashMap::new();
        for page in &self.pages {
            *pages_by_depth.entry(page.depth).or_insert(0) += 1;
            *status_codes.entry(page.status_code).or_insert(0) += 1;
            *domains.entry(netloc(&page.url)).or_insert(0) += 1;
        }

        let unique_domains = domains.len() as u64;
        let mut top_domains: Vec<DomainCount> = domains
            .into_iter()
            .map(|(domain, count)| DomainCount { domain, count })
            .collect();
        top_domains.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.domain.cmp(&b.domain)));
        top_domains.truncate(TOP_DOMAINS);

        let mut text_lengths: Vec<u64> = self
            .pages
            .iter()
            .filter(|p| p.text.as_deref().is_some_and(|t| !t.is_empty()))
            .map(|p| p.text_len() as u64)
            .collect();
        text_lengths.sort_unstable();

        StatsSummary {
            total_pages: total,
            total_links,
            total_text_size,
            total_html_size,
            avg_links_per_page: round2(total_links as f64 / total as f64),
            avg_text_size: round2(total_text_size as f64 / total as f64),
            avg_html_size: round2(total_html_size as f64 / total as f64),
            max_depth: pages_by_depth.keys().next_back().copied().unwrap_or(0),
            pages_by_depth,
            unique_domains,
            top_domains,
            status_codes,
            pages_with_text: text_lengths.len() as u64,
            pages_with_title: self
                .pages
                .iter()
                .filter(|p| p.title.as_deref().is_some_and(|t| !t.is_empty()))
                .count() as u64,
            pages_with_metadata: self.pages.iter().filter(|p| !p.metadata.is_empty()).count()
                as u64,
            text_length_min: text_lengths.first().copied().unwrap_or(0),
            text_length_median: text_lengths
                .get(text_lengths.len() / 2)
                .copied()
                .unwrap_or(0),
            text_length_max: text_lengths.last().copied().unwrap_or(0),
        }
    }

    /// Human-readable report
    pub fn format_summary(&self) -> String {
        let stats = self.compute();
        if stats.total_pages == 0 {
            return "No pages found.".to_string();
        }

        let rule = "=".repeat(RULE_WIDTH);
        let percent = |n: u64| n as f64 / stats.total_pages as f64 * 100.0;
        let mut lines = vec![
            rule.clone(),
            "YOINK Crawl Statistics".to_string(),
            rule.clone(),
            String::new(),
            format!("Total Pages: {}", group_thousands(stats.total_pages)),
            format!("Total Links: {}", group_thousands(stats.total_links)),
            format!("Avg Links/Page: {}", stats.avg_links_per_page),
            String::new(),
            "Content Size:".to_string(),
            format!("  Total Text: {}", format_bytes(stats.total_text_size as f64)),
            format!("  Avg Text/Page: {}", format_bytes(stats.avg_text_size)),
        ];

        if stats.total_html_size > 0 {
            lines.push(format!(
                "  Total HTML: {}",
                format_bytes(stats.total_html_size as f64)
            ));
        }

        lines.push(String::new());
        lines.push("Domains:".to_string());
        lines.push(format!("  Unique Domains: {}", stats.unique_domains));
        lines.push("  Top Domains:".to_string());
        for item in stats.top_domains.iter().take(SUMMARY_DOMAINS) {
            lines.push(format!("    - {}: {} pages", item.domain, item.count));
        }

        lines.push(String::new());
        lines.push("Depth Distribution:".to_string());
        for (depth, count) in &stats.pages_by_depth {
            let bar = "#".repeat((*count as usize).min(MAX_BAR));
            lines.push(format!("  Depth {}: {:>4} {}", depth, count, bar));
        }

        lines.push(String::new());
        lines.push("Content Quality:".to_string());
        for (label, count) in [
            ("Text", stats.pages_with_text),
            ("Title", stats.pages_with_title),
            ("Metadata", stats.pages_with_metadata),
        ] {
            lines.push(format!(
                "  Pages with {}: {} ({:.1}%)",
                label,
                count,
                percent(count)
            ));
        }

        lines.push(String::new());
        lines.push("Text Length:".to_string());
        lines.push(format!("  Min: {} chars", group_thousands(stats.text_length_min)));
        lines.push(format!(
            "  Median: {} chars",
            group_thousands(stats.text_length_median)
        ));
        lines.push(format!("  Max: {} chars", group_thousands(stats.text_length_max)));
        lines.push(String::new());
        lines.push(rule);

        lines.join("\n")
    }

    /// Writes headline metrics and top domains as CSV
    pub fn export_csv(&self, path: &Path) -> OutputResult<()> {
        let stats = self.compute();
        let mut out = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(BufWriter::new(File::create(path)?));

        out.write_record(["Metric", "Value"])?;
        let rows = [
            ("Total Pages", stats.total_pages.to_string()),
            ("Total Links", stats.total_links.to_string()),
            ("Avg Links per Page", stats.avg_links_per_page.to_string()),
            ("Total Text Size (bytes)", stats.total_text_size.to_string()),
            ("Unique Domains", stats.unique_domains.to_string()),
            ("Max Depth", stats.max_depth.to_string()),
        ];
        for (metric, value) in &rows {
            out.write_record([*metric, value.as_str()])?;
        }

        // blank separator line; the csv writer would quote an empty record
        out.flush()?;
        let mut inner = out.into_inner().map_err(|e| e.into_error())?;
        inner.write_all(b"\n")?;
        let mut out = csv::WriterBuilder::new().flexible(true).from_writer(inner);

        out.write_record(["Top Domains", "Count"])?;
        for item in &stats.top_domains {
            out.serialize((&item.domain, item.count))?;
        }
        out.flush()?;

        tracing::info!("Exported statistics to {}", path.display());
        Ok(())
    }
}

/// Formats a byte count with binary units and two decimals
pub fn format_bytes(size: f64) -> String {
    let mut size = size;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} TB", size)
}

/// Host plus explicit port, or the raw string when it does not parse
fn netloc(url: &str) -> String {
    match ::url::Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        },
        Err(_) => url.to_string(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
