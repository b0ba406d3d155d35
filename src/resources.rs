use crate::paths::{normalize_path, page_base, root_prefix, strip_query, strip_scheme};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Stylesheet,
    Script,
    Image,
}

impl ResourceKind {
    /// The attribute carrying the resource location.
    pub fn attribute(self) -> &'static str {
        match self {
            ResourceKind::Stylesheet => "href",
            ResourceKind::Script | ResourceKind::Image => "src",
        }
    }
}

/// Where a referenced resource lives in the book and where to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: String,
    pub url: Url,
    /// New attribute value, when the original would not resolve inside the book.
    pub rewritten: Option<String>,
}

/// Resolve an attribute value found on `page_path` against the site root.
pub fn resolve(value: &str, page_path: &str, site_url: &Url) -> Option<Resolved> {
    let value = value.trim();
    if value.is_empty() || value.starts_with('#') {
        return None;
    }
    let lower = value.to_ascii_lowercase();
    if ["data:", "javascript:", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(value.to_string())
    } else if value.starts_with("//") {
        Some(format!("https:{}", value))
    } else {
        None
    };

    if let Some(absolute) = absolute {
        let url = Url::parse(&absolute).ok()?;
        let path = normalize_path(strip_query(strip_scheme(&absolute)));
        if path.is_empty() {
            return None;
        }
        let rewritten = Some(format!("{}{}", root_prefix(page_path), path));
        return Some(Resolved {
            path,
            url,
            rewritten,
        });
    }

    if let Some(rooted) = value.strip_prefix('/') {
        let path = normalize_path(strip_query(rooted));
        if path.is_empty() {
            return None;
        }
        let url = site_url.join(rooted).ok()?;
        let rewritten = Some(format!("{}{}", root_prefix(page_path), path));
        return Some(Resolved {
            path,
            url,
            rewritten,
        });
    }

    let joined = format!("{}{}", page_base(page_path), value);
    let path = normalize_path(strip_query(&joined));
    if path.is_empty() {
        return None;
    }
    let url = site_url.join(&joined).ok()?;
    // the stored item has no query, so the reference must not carry one either
    let rewritten = value.split_once('?').map(|(before, rest)| match rest.find('#') {
        Some(index) => format!("{}{}", before, &rest[index..]),
        None => before.to_string(),
    });
    Some(Resolved {
        path,
        url,
        rewritten,
    })
}

pub fn is_local_host(path: &str, hosts: &[String]) -> bool {
    hosts.iter().any(|host| {
        path.strip_prefix(host.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Media type recorded in the package manifest for a resource.
pub fn media_type(path: &str, kind: Option<ResourceKind>) -> &'static str {
    match kind {
        Some(ResourceKind::Stylesheet) => "text/css",
        Some(ResourceKind::Script) => "application/javascript",
        _ => guess_media_type(path),
    }
}

pub fn guess_media_type(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/vnd.microsoft.icon",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("html" | "htm" | "xhtml") => "application/xhtml+xml",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("eot") => "application/vnd.ms-fontobject",
        _ => "application/octet-stream",
    }
}
