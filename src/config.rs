use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Everything that ties the crawler to one particular documentation site.
///
/// The defaults describe the Sphinx build of the Gluon tutorials; a JSON file
/// passed with `--config` may override any subset of the fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub site_url: String,
    pub index_page: String,
    pub output: Option<PathBuf>,
    pub language: String,
    pub author: Option<String>,
    pub main_selector: String,
    pub toc_selector: String,
    pub stylesheet_selector: String,
    pub excluded_stylesheets: Vec<String>,
    pub blocked_script_sources: Vec<String>,
    pub blocked_inline_scripts: Vec<String>,
    pub local_hosts: Vec<String>,
    pub assets_dir: PathBuf,
    pub timeout_secs: f64,
    pub user_agent: String,
    pub render: bool,
    pub inline_toc: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_url: "https://zh.gluon.ai/".to_string(),
            index_page: "index.html".to_string(),
            output: None,
            language: "zh-CN".to_string(),
            author: None,
            main_selector: r#"div[role="main"]"#.to_string(),
            toc_selector: "div.toctree-wrapper, .compound".to_string(),
            stylesheet_selector: r#"link[type="text/css"], link[rel="stylesheet"]"#.to_string(),
            excluded_stylesheets: vec!["_static/css/theme.css".to_string()],
            blocked_script_sources: vec![
                "baidu_tongji".to_string(),
                "google_analytics".to_string(),
            ],
            blocked_inline_scripts: vec!["SphinxRtdTheme.Navigation".to_string()],
            local_hosts: vec!["cdnjs.cloudflare.com".to_string()],
            assets_dir: PathBuf::from("."),
            timeout_secs: 30.0,
            user_agent: format!("doc2epub/{}", env!("CARGO_PKG_VERSION")),
            render: false,
            inline_toc: false,
        }
    }
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: SiteConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// The site root, always ending in `/` so relative joins stay inside it.
    pub fn site_url(&self) -> Result<Url> {
        let mut raw = self.site_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw).map_err(|e| anyhow!("Invalid site URL '{}': {}", raw, e))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(anyhow!("Unsupported URL scheme '{}' in {}", other, raw)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.site_url()?;
        if self.index_page.trim().is_empty() {
            bail!("Index page must not be empty");
        }
        for (name, value) in [
            ("main_selector", &self.main_selector),
            ("toc_selector", &self.toc_selector),
            ("stylesheet_selector", &self.stylesheet_selector),
        ] {
            if value.trim().is_empty() {
                bail!("Selector '{}' must not be empty", name);
            }
        }
        if !self.timeout_secs.is_finite() || self.timeout_secs < 0.0 {
            bail!("Timeout must be zero or a positive number of seconds");
        }
        Ok(())
    }
}
