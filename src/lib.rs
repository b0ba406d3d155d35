//! # doc2epub
//!
//! A CLI utility to turn Sphinx documentation websites into self-contained
//! EPUB books.
//!
//! ## Current Features
//!
//! - Index and table-of-contents driven crawl of a documentation site
//! - Stylesheet, script and image rewriting so pages work offline
//! - Bundling of pre-downloaded CDN assets from a local directory
//! - Optional headless Chromium rendering of pages
//!
//! ## Usage
//!
//! ```bash
//! doc2epub build https://zh.gluon.ai/ -o gluon_tutorials_zh.epub
//! ```

mod book;
mod config;
mod downloader;
mod fetcher;
mod filters;
mod page;
mod paths;
mod resources;
mod toc;
mod xhtml;

pub use book::{Book, Page, Resource};
pub use config::SiteConfig;
pub use downloader::Downloader;
pub use fetcher::{BrowserFetcher, Fetch, HttpFetcher};
pub use toc::{render_outline, TocEntry};
