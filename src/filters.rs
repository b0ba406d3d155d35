use crate::config::SiteConfig;

/// Drops theme stylesheets and tracking or navigation scripts that make no
/// sense inside an e-book.
#[derive(Debug, Clone, Default)]
pub struct ElementFilter {
    excluded_stylesheets: Vec<String>,
    blocked_script_sources: Vec<String>,
    blocked_inline_scripts: Vec<String>,
}

impl ElementFilter {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            excluded_stylesheets: config.excluded_stylesheets.clone(),
            blocked_script_sources: config.blocked_script_sources.clone(),
            blocked_inline_scripts: config.blocked_inline_scripts.clone(),
        }
    }

    pub fn keep_stylesheet(&self, href: &str) -> bool {
        !self
            .excluded_stylesheets
            .iter()
            .any(|pattern| href.contains(pattern.as_str()))
    }

    pub fn keep_script(&self, src: Option<&str>, inline_text: &str) -> bool {
        match src {
            Some(src) => !self
                .blocked_script_sources
                .iter()
                .any(|pattern| src.contains(pattern.as_str())),
            None => !self
                .blocked_inline_scripts
                .iter()
                .any(|pattern| inline_text.contains(pattern.as_str())),
        }
    }
}
