use crate::paths::{normalize_path, page_path_of};
use anyhow::{anyhow, Result};
use scraper::{ElementRef, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// One navigation entry of the book, as listed by the site's toctree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
    pub children: Vec<TocEntry>,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
            children: Vec::new(),
        }
    }

    pub fn page_path(&self) -> String {
        page_path_of(&self.href)
    }
}

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| anyhow!("Invalid selector '{}': {}", s, e))
}

/// Read the two-level toctree markup Sphinx renders into the index page.
pub fn parse_toc(block: ElementRef<'_>) -> Result<Vec<TocEntry>> {
    let l1_items = selector("li.toctree-l1")?;
    let l1_link = selector("li.toctree-l1 > a")?;
    let l2_links = selector("li.toctree-l2 > a")?;

    let mut entries = Vec::new();
    for item in block.select(&l1_items) {
        let Some(link) = item.select(&l1_link).next() else {
            continue;
        };
        let Some(mut entry) = entry_from_link(link) else {
            continue;
        };
        entry.children = item.select(&l2_links).filter_map(entry_from_link).collect();
        entries.push(entry);
    }
    Ok(entries)
}

fn entry_from_link(link: ElementRef<'_>) -> Option<TocEntry> {
    let href = link.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }
    let title = collapse_whitespace(&link.text().collect::<String>());
    Some(TocEntry::new(title, href))
}

/// Resolve hrefs against the page the TOC was read from, so they become site
/// paths. Entries leading off the site are dropped together with their
/// children.
pub fn rebase_entries(entries: Vec<TocEntry>, page_url: &Url, site_url: &Url) -> Vec<TocEntry> {
    entries
        .into_iter()
        .filter_map(|mut entry| {
            let Some(href) = site_href(&entry.href, page_url, site_url) else {
                debug!("Skipping off-site TOC entry {}", entry.href);
                return None;
            };
            entry.href = href;
            entry.children = rebase_entries(entry.children, page_url, site_url);
            Some(entry)
        })
        .collect()
}

fn site_href(href: &str, page_url: &Url, site_url: &Url) -> Option<String> {
    let url = page_url.join(href).ok()?;
    let mut page = url.clone();
    page.set_query(None);
    page.set_fragment(None);
    let path = normalize_path(page.as_str().strip_prefix(site_url.as_str())?);
    if path.is_empty() {
        return None;
    }
    Some(match url.fragment() {
        Some(fragment) => format!("{}#{}", path, fragment),
        None => path,
    })
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pages the entries point at, in reading order and without repeats.
pub fn child_pages(entries: &[TocEntry]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut pages = Vec::new();
    for entry in entries {
        for href in std::iter::once(entry).chain(entry.children.iter()) {
            let page = href.page_path();
            if !page.is_empty() && seen.insert(page.clone()) {
                pages.push(page);
            }
        }
    }
    pages
}

pub fn render_outline(entries: &[TocEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("{} ({})\n", entry.title, entry.href));
        for child in &entry.children {
            out.push_str(&format!("    {} ({})\n", child.title, child.href));
        }
    }
    out
}
