//! Helpers over site-relative, `/`-separated paths.
//!
//! Every page and resource in the book is addressed by the path it has on the
//! site, so the relative links inside a page keep working once packaged.

/// Resolve `.` and `..` segments. A `..` that would leave the site root is
/// dropped, the same way URL resolution treats it.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Directory part of a page path, including the trailing slash.
pub fn page_base(page_path: &str) -> &str {
    match page_path.rfind('/') {
        Some(index) => &page_path[..=index],
        None => "",
    }
}

/// `../` once per directory level, leading from the page back to the root.
pub fn root_prefix(page_path: &str) -> String {
    "../".repeat(page_base(page_path).matches('/').count())
}

pub fn strip_scheme(url: &str) -> &str {
    match url.find("://") {
        Some(index) => &url[index + 3..],
        None => url,
    }
}

pub fn strip_query(path: &str) -> &str {
    match path.find(['?', '#']) {
        Some(index) => &path[..index],
        None => path,
    }
}

/// The page an href points at, without its fragment.
pub fn page_path_of(href: &str) -> String {
    normalize_path(strip_query(href))
}
