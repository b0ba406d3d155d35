use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use doc2epub::{render_outline, BrowserFetcher, Downloader, Fetch, HttpFetcher, SiteConfig};
use slug::slugify;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc2epub")]
#[command(about = "CLI utility to turn a Sphinx documentation website into an EPUB for offline reading")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the documentation website and write the EPUB
    Build {
        #[command(flatten)]
        site: SiteArgs,

        /// Output EPUB file (defaults to a slug of the book title)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Language of the book (BCP 47 tag)
        #[arg(short = 'l', long = "lang")]
        language: Option<String>,

        /// Directory holding pre-downloaded assets for local hosts
        #[arg(short = 'a', long = "assets-dir")]
        assets_dir: Option<PathBuf>,

        /// Add a visible table of contents page to the book
        #[arg(long = "inline-toc")]
        inline_toc: bool,
    },
    /// Print the table of contents of the documentation website
    Toc {
        #[command(flatten)]
        site: SiteArgs,
    },
}

#[derive(Args)]
struct SiteArgs {
    /// Root URL of the documentation website
    url: Option<String>,

    /// JSON file with site settings
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Render pages in headless Chromium instead of plain HTTP
    #[arg(short = 'r', long = "render")]
    render: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long = "timeout", value_parser = parse_timeout)]
    timeout: Option<f64>,
}

fn parse_timeout(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|_| "Not a number.")?;
    if !value.is_finite() || value < 0.0 {
        return Err("Must be zero or positive number.".to_string());
    }
    Ok(value)
}

impl SiteArgs {
    fn load_config(&self) -> Result<SiteConfig> {
        let mut config = match &self.config {
            Some(path) => SiteConfig::load(path)?,
            None => SiteConfig::default(),
        };
        if let Some(url) = &self.url {
            config.site_url = url.clone();
        }
        if self.render {
            config.render = true;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        config.validate()?;
        Ok(config)
    }
}

async fn make_fetcher(config: &SiteConfig) -> Result<Box<dyn Fetch>> {
    if config.render {
        let fetcher = BrowserFetcher::launch(config.timeout_secs, &config.user_agent).await?;
        Ok(Box::new(fetcher))
    } else {
        let fetcher = HttpFetcher::new(config.timeout_secs, &config.user_agent)?;
        Ok(Box::new(fetcher))
    }
}

async fn build(
    site: SiteArgs,
    output: Option<PathBuf>,
    language: Option<String>,
    assets_dir: Option<PathBuf>,
    inline_toc: bool,
) -> Result<()> {
    let mut config = site.load_config()?;
    if let Some(language) = language {
        config.language = language;
    }
    if let Some(assets_dir) = assets_dir {
        config.assets_dir = assets_dir;
    }
    let inline_toc = inline_toc || config.inline_toc;
    let configured_output = output.or_else(|| config.output.clone());

    let fetcher = make_fetcher(&config).await?;
    let book = Downloader::new(config, fetcher)?.run().await?;

    let output = configured_output.unwrap_or_else(|| {
        let slug = slugify(book.title().unwrap_or("book"));
        let slug = if slug.is_empty() { "book".to_string() } else { slug };
        PathBuf::from(format!("{}.epub", slug))
    });
    book.write_epub(&output, inline_toc)?;

    info!("EPUB saved to: {}", output.display().to_string().green());
    Ok(())
}

async fn print_toc(site: SiteArgs) -> Result<()> {
    let config = site.load_config()?;
    let fetcher = make_fetcher(&config).await?;
    let (title, toc) = Downloader::new(config, fetcher)?.outline().await?;
    println!("{}", title.bold());
    print!("{}", render_outline(&toc));
    Ok(())
}

#[tokio::main]
async fn main() {
    // Chromium protocol noise stays off unless RUST_LOG asks for it
    let filter = EnvFilter::from_default_env()
        .add_directive("chromiumoxide::conn=off".parse().unwrap())
        .add_directive("chromiumoxide::handler=off".parse().unwrap())
        .add_directive("doc2epub=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            site,
            output,
            language,
            assets_dir,
            inline_toc,
        } => build(site, output, language, assets_dir, inline_toc).await,
        Commands::Toc { site } => print_toc(site).await,
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {:#}", e).red());
        process::exit(1);
    }
}
