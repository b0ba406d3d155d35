use crate::config::SiteConfig;
use crate::filters::ElementFilter;
use crate::resources::{resolve, ResourceKind};
use crate::toc::{collapse_whitespace, parse_toc, rebase_entries, TocEntry};
use crate::xhtml::{self, Rewrites};
use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// A resource some page depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub path: String,
    pub url: Url,
}

/// Everything the downloader needs from a page, detached from the parsed DOM.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub path: String,
    pub xhtml: String,
    pub title: Option<String>,
    pub resources: Vec<ResourceRef>,
    /// Only set for the index page.
    pub toc: Option<Vec<TocEntry>>,
}

pub struct PageExtractor {
    site_url: Url,
    language: String,
    filter: ElementFilter,
    main: Selector,
    toc: Selector,
    stylesheets: Selector,
    head_scripts: Selector,
    body_scripts: Selector,
    images: Selector,
    heading: Selector,
    title: Selector,
}

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| anyhow!("Invalid selector '{}': {}", s, e))
}

impl PageExtractor {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            site_url: config.site_url()?,
            language: config.language.clone(),
            filter: ElementFilter::from_config(config),
            main: selector(&config.main_selector)?,
            toc: selector(&config.toc_selector)?,
            stylesheets: selector(&config.stylesheet_selector)?,
            head_scripts: selector("head script")?,
            body_scripts: selector("body script")?,
            images: selector("img")?,
            heading: selector("h1")?,
            title: selector("title")?,
        })
    }

    pub fn extract(&self, html: &str, page_path: &str, is_index: bool) -> Result<ExtractedPage> {
        let document = Html::parse_document(html);

        let main = document
            .select(&self.main)
            .next()
            .ok_or_else(|| anyhow!("No main document container found in {}", page_path))?;

        let stylesheets: Vec<ElementRef> = document
            .select(&self.stylesheets)
            .filter(|link| self.filter.keep_stylesheet(link.value().attr("href").unwrap_or("")))
            .collect();
        let head_scripts: Vec<ElementRef> = document.select(&self.head_scripts).collect();
        // kept scripts inside main are serialised with it, the rest trail the body
        let mut script_resources = Vec::new();
        let mut body_scripts = Vec::new();
        let mut blocked = Vec::new();
        for script in document.select(&self.body_scripts) {
            let inline: String = script.text().collect();
            if !self.filter.keep_script(script.value().attr("src"), &inline) {
                blocked.push(script);
                continue;
            }
            script_resources.push(script);
            if !script.ancestors().any(|node| node.id() == main.id()) {
                body_scripts.push(script);
            }
        }
        let images: Vec<ElementRef> = main.select(&self.images).collect();

        let mut rewrites = Rewrites::new();
        let mut seen = HashSet::new();
        let mut resources = Vec::new();
        let groups = [
            (ResourceKind::Stylesheet, &stylesheets),
            (ResourceKind::Script, &head_scripts),
            (ResourceKind::Script, &script_resources),
            (ResourceKind::Image, &images),
        ];
        for (kind, elements) in groups {
            let attribute = kind.attribute();
            for element in elements {
                let Some(value) = element.value().attr(attribute) else {
                    continue;
                };
                let Some(resolved) = resolve(value, page_path, &self.site_url) else {
                    continue;
                };
                if let Some(rewritten) = resolved.rewritten {
                    rewrites.insert(attribute, value, rewritten);
                }
                if seen.insert(resolved.path.clone()) {
                    resources.push(ResourceRef {
                        kind,
                        path: resolved.path,
                        url: resolved.url,
                    });
                }
            }
        }
        debug!(
            "{}: {} resources, {} rewritten references",
            page_path,
            resources.len(),
            rewrites.len()
        );

        let title = document
            .select(&self.heading)
            .next()
            .map(|h1| clean_heading(&h1.text().collect::<String>()))
            .filter(|t| !t.is_empty());

        let toc = if is_index {
            match main.select(&self.toc).next() {
                Some(block) => {
                    let page_url = self
                        .site_url
                        .join(page_path)
                        .map_err(|e| anyhow!("Invalid page path '{}': {}", page_path, e))?;
                    Some(rebase_entries(parse_toc(block)?, &page_url, &self.site_url))
                }
                None => {
                    warn!("No table of contents block found in {}", page_path);
                    Some(Vec::new())
                }
            }
        } else {
            None
        };

        let title = if is_index {
            title.or_else(|| {
                document
                    .select(&self.title)
                    .next()
                    .map(|t| collapse_whitespace(&t.text().collect::<String>()))
                    .filter(|t| !t.is_empty())
            })
        } else {
            title
        };

        let head = format!(
            "{}{}",
            xhtml::elements_to_xhtml(stylesheets.iter().copied(), &rewrites),
            xhtml::elements_to_xhtml(head_scripts.iter().copied(), &rewrites)
        );
        let body = format!(
            "{}{}",
            xhtml::to_xhtml(main, &rewrites, &blocked),
            xhtml::elements_to_xhtml(body_scripts.iter().copied(), &rewrites)
        );
        let xhtml = xhtml::document(&self.language, title.as_deref(), &head, &body);

        Ok(ExtractedPage {
            path: page_path.to_string(),
            xhtml,
            title,
            resources,
            toc,
        })
    }
}

/// Heading text without the `¶` permalink Sphinx appends to it.
fn clean_heading(text: &str) -> String {
    collapse_whitespace(text.trim().trim_end_matches('¶'))
}
