use anyhow::{Context, Result};
use colored::*;
use tracing::{info, warn};
use url::Url;

use crate::book::{Book, Page, Resource};
use crate::config::SiteConfig;
use crate::fetcher::Fetch;
use crate::page::{ExtractedPage, PageExtractor};
use crate::paths::normalize_path;
use crate::resources::{is_local_host, media_type};
use crate::toc::{child_pages, TocEntry};

/// Walks the index page and the pages its table of contents lists,
/// collecting everything into a [`Book`].
pub struct Downloader {
    config: SiteConfig,
    site_url: Url,
    extractor: PageExtractor,
    fetcher: Box<dyn Fetch>,
    book: Book,
}

impl Downloader {
    pub fn new(config: SiteConfig, fetcher: Box<dyn Fetch>) -> Result<Self> {
        config.validate()?;
        let site_url = config.site_url()?;
        let extractor = PageExtractor::new(&config)?;
        let book = Book::new(config.language.clone());
        Ok(Self {
            config,
            site_url,
            extractor,
            fetcher,
            book,
        })
    }

    pub async fn run(mut self) -> Result<Book> {
        let result = self.run_internal().await;
        if let Err(e) = self.fetcher.close().await {
            warn!("Failed to shut down fetcher: {}", e);
        }
        result?;
        Ok(self.book)
    }

    async fn run_internal(&mut self) -> Result<()> {
        info!("Visiting \"{}\"", self.site_url.as_str().green());

        let index_path = normalize_path(&self.config.index_page);
        let index = self
            .download_page(&index_path, true)
            .await
            .with_context(|| format!("Failed to download index page {}", index_path))?;

        let title = index.title.clone().unwrap_or_else(|| "Untitled".to_string());
        info!("Book title: {}", title.blue());
        self.book.set_metadata(title, self.config.author.clone());

        let toc = index.toc.unwrap_or_default();
        let children = child_pages(&toc);
        info!("Table of contents lists {} pages", children.len());
        self.book.set_toc(toc);

        for child in children {
            if self.book.contains(&child) {
                continue;
            }
            if let Err(e) = self.download_page(&child, false).await {
                warn!("Skipping page {}: {:#}", child.yellow(), e);
            }
        }

        let assets_dir = self.config.assets_dir.clone();
        let added = self
            .book
            .bundle_local_assets(&assets_dir, &self.config.local_hosts)?;
        info!("Bundled {} local resources", added);

        Ok(())
    }

    /// Fetch only the index page and report the book title and outline.
    pub async fn outline(self) -> Result<(String, Vec<TocEntry>)> {
        let index_path = normalize_path(&self.config.index_page);
        let url = self.page_url(&index_path)?;
        let result = async {
            let html = self.fetcher.fetch_page(&url).await?;
            self.extractor.extract(&html, &index_path, true)
        }
        .await;
        if let Err(e) = self.fetcher.close().await {
            warn!("Failed to shut down fetcher: {}", e);
        }
        let index = result?;
        Ok((
            index.title.unwrap_or_else(|| "Untitled".to_string()),
            index.toc.unwrap_or_default(),
        ))
    }

    fn page_url(&self, page_path: &str) -> Result<Url> {
        self.site_url
            .join(page_path)
            .with_context(|| format!("Failed to join {} onto {}", page_path, self.site_url))
    }

    async fn download_page(&mut self, page_path: &str, is_index: bool) -> Result<ExtractedPage> {
        let url = self.page_url(page_path)?;
        let html = self.fetcher.fetch_page(&url).await?;
        let extracted = self.extractor.extract(&html, page_path, is_index)?;

        for reference in &extracted.resources {
            if self.book.contains(&reference.path) {
                continue;
            }
            if is_local_host(&reference.path, &self.config.local_hosts) {
                continue;
            }
            match self.fetcher.fetch_bytes(&reference.url).await {
                Ok(data) => {
                    self.book.add_resource(Resource {
                        path: reference.path.clone(),
                        media_type: media_type(&reference.path, Some(reference.kind)).to_string(),
                        data,
                    });
                }
                Err(e) => warn!("Failed to download {}: {:#}", reference.url.as_str().yellow(), e),
            }
        }

        self.book.add_page(Page {
            path: extracted.path.clone(),
            title: extracted.title.clone(),
            xhtml: extracted.xhtml.clone(),
        });

        Ok(extracted)
    }
}
