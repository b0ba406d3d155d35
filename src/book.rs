//! In-memory model of the e-book and its EPUB packaging.
//!
//! Pages and resources keep the paths they have on the site, so the relative
//! links between them resolve the same way inside the archive. `epub-builder`
//! takes care of the OPF manifest, the NCX and navigation documents and the
//! ZIP layout.

use crate::resources::guess_media_type;
use crate::toc::TocEntry;
use anyhow::{anyhow, Context, Result};
use colored::*;
use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ReferenceType, TocElement, ZipLibrary};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct Page {
    pub path: String,
    pub title: Option<String>,
    pub xhtml: String,
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub path: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Book {
    title: Option<String>,
    language: String,
    author: Option<String>,
    pages: Vec<Page>,
    resources: Vec<Resource>,
    paths: HashSet<String>,
    toc: Vec<TocEntry>,
}

/// A titled page in the navigation document, with the entries nested under it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NavSlot {
    title: String,
    children: Vec<TocEntry>,
}

impl Book {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Default::default()
        }
    }

    pub fn set_metadata(&mut self, title: impl Into<String>, author: Option<String>) {
        self.title = Some(title.into());
        self.author = author;
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Append a page to the spine. Returns false when the path is taken.
    pub fn add_page(&mut self, page: Page) -> bool {
        if !self.paths.insert(page.path.clone()) {
            debug!("Skipping duplicate page {}", page.path);
            return false;
        }
        self.pages.push(page);
        true
    }

    pub fn add_resource(&mut self, resource: Resource) -> bool {
        if !self.paths.insert(resource.path.clone()) {
            debug!("Skipping duplicate resource {}", resource.path);
            return false;
        }
        self.resources.push(resource);
        true
    }

    pub fn page(&self, path: &str) -> Option<&Page> {
        self.pages.iter().find(|page| page.path == path)
    }

    pub fn resource(&self, path: &str) -> Option<&Resource> {
        self.resources.iter().find(|resource| resource.path == path)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn set_toc(&mut self, toc: Vec<TocEntry>) {
        self.toc = toc;
    }

    pub fn toc(&self) -> &[TocEntry] {
        &self.toc
    }

    /// Add every file under `root/<host>` for each local host. Returns the
    /// number of files added.
    pub fn bundle_local_assets(&mut self, root: &Path, hosts: &[String]) -> Result<usize> {
        let mut added = 0;
        for host in hosts {
            let dir = root.join(host);
            if !dir.is_dir() {
                warn!(
                    "Local asset directory {} not found, skipping",
                    dir.display().to_string().yellow()
                );
                continue;
            }
            info!("Adding local resources from {}", dir.display().to_string().blue());

            for entry in WalkDir::new(&dir).sort_by_file_name() {
                let entry = entry
                    .with_context(|| format!("Failed to walk {}", dir.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry
                    .path()
                    .strip_prefix(root)
                    .with_context(|| format!("{} is outside {}", entry.path().display(), root.display()))?;
                let item_path = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let data = std::fs::read(entry.path())
                    .with_context(|| format!("Failed to read {}", entry.path().display()))?;
                let media_type = guess_media_type(&item_path).to_string();
                if self.add_resource(Resource {
                    path: item_path,
                    media_type,
                    data,
                }) {
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    /// Decide which pages get a navigation title, and what nests under each,
    /// keeping the order of the TOC.
    fn nav_slots(&self) -> HashMap<String, NavSlot> {
        let mut slots: HashMap<String, NavSlot> = HashMap::new();

        if let (Some(index), Some(title)) = (self.pages.first(), self.title.as_ref()) {
            slots.insert(
                index.path.clone(),
                NavSlot {
                    title: title.clone(),
                    children: Vec::new(),
                },
            );
        }
        for entry in &self.toc {
            self.place(entry, &mut slots);
        }
        slots
    }

    fn place(&self, entry: &TocEntry, slots: &mut HashMap<String, NavSlot>) {
        let page = entry.page_path();
        if !self.paths.contains(&page) {
            // the section page is gone, its entries stand on their own
            for child in &entry.children {
                self.place(child, slots);
            }
            return;
        }
        let entry = self.prune(entry);
        match slots.get_mut(&page) {
            Some(slot) => slot.children.push(entry),
            None => {
                slots.insert(
                    page,
                    NavSlot {
                        title: entry.title,
                        children: entry.children,
                    },
                );
            }
        }
    }

    /// The entry without children pointing at pages the book does not have.
    fn prune(&self, entry: &TocEntry) -> TocEntry {
        TocEntry {
            title: entry.title.clone(),
            href: entry.href.clone(),
            children: entry
                .children
                .iter()
                .filter(|child| self.paths.contains(&child.page_path()))
                .map(|child| self.prune(child))
                .collect(),
        }
    }

    pub fn write_epub(&self, path: &Path, inline_toc: bool) -> Result<()> {
        let zip = ZipLibrary::new()
            .map_err(|e| anyhow!("Failed to create ZIP library for EPUB: {}", e))?;
        let mut builder =
            EpubBuilder::new(zip).map_err(|e| anyhow!("Failed to create EPUB builder: {}", e))?;
        builder.epub_version(EpubVersion::V30);

        let title = self.title.as_deref().unwrap_or("Untitled");
        builder
            .metadata("title", title)
            .map_err(|e| anyhow!("Failed to set title metadata: {}", e))?;
        builder
            .metadata("lang", &self.language)
            .map_err(|e| anyhow!("Failed to set language metadata: {}", e))?;
        builder
            .metadata("generator", "doc2epub")
            .map_err(|e| anyhow!("Failed to set generator metadata: {}", e))?;
        if let Some(author) = &self.author {
            builder
                .metadata("author", author)
                .map_err(|e| anyhow!("Failed to set author metadata: {}", e))?;
        }

        for resource in &self.resources {
            builder
                .add_resource(
                    resource.path.as_str(),
                    resource.data.as_slice(),
                    resource.media_type.as_str(),
                )
                .map_err(|e| anyhow!("Failed to add resource {}: {}", resource.path, e))?;
        }

        // pages without a slot stay out of the navigation, they are reached
        // through the entries nested under their section
        let slots = self.nav_slots();
        for (i, page) in self.pages.iter().enumerate() {
            let mut content = EpubContent::new(page.path.as_str(), page.xhtml.as_bytes());
            if let Some(slot) = slots.get(&page.path) {
                content = content.title(slot.title.as_str()).level(1);
                for child in &slot.children {
                    content = content.child(toc_element(child, 2));
                }
            }
            if i == 0 {
                content = content.reftype(ReferenceType::Text);
            }
            builder
                .add_content(content)
                .map_err(|e| anyhow!("Failed to add page {}: {}", page.path, e))?;
        }

        if inline_toc {
            builder.inline_toc();
        }

        let output_file = File::create(path)
            .with_context(|| format!("Failed to create EPUB file: {}", path.display()))?;
        let writer = BufWriter::new(output_file);
        builder
            .generate(writer)
            .map_err(|e| anyhow!("Failed to generate EPUB file: {}", e))?;

        info!(
            "Wrote {} pages and {} resources to {}",
            self.pages.len(),
            self.resources.len(),
            path.display().to_string().green()
        );
        Ok(())
    }
}

fn toc_element(entry: &TocEntry, level: i32) -> TocElement {
    entry
        .children
        .iter()
        .fold(
            TocElement::new(entry.href.as_str(), entry.title.as_str()).level(level),
            |element, child| element.child(toc_element(child, level + 1)),
        )
}
