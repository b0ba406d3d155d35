//! XHTML serialisation of scraped HTML fragments.
//!
//! E-book readers parse content documents as XML, so the HTML pulled off the
//! site has to be re-emitted with self-closing void elements, escaped text
//! and no attributes an XML parser would choke on.

use scraper::{ElementRef, Node};
use std::collections::HashMap;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Attribute values to replace while serialising, keyed by attribute name and
/// original value.
#[derive(Debug, Clone, Default)]
pub struct Rewrites {
    values: HashMap<(String, String), String>,
}

impl Rewrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attribute: &str, original: &str, replacement: String) {
        self.values
            .insert((attribute.to_string(), original.to_string()), replacement);
    }

    pub fn get(&self, attribute: &str, original: &str) -> Option<&str> {
        self.values
            .get(&(attribute.to_string(), original.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Serialise `element`, leaving out any descendant listed in `skip`.
pub fn to_xhtml(element: ElementRef<'_>, rewrites: &Rewrites, skip: &[ElementRef<'_>]) -> String {
    let mut out = String::new();
    write_element(element, rewrites, skip, XHTML_NS, &mut out);
    out
}

pub fn elements_to_xhtml<'a>(
    elements: impl IntoIterator<Item = ElementRef<'a>>,
    rewrites: &Rewrites,
) -> String {
    let mut out = String::new();
    for element in elements {
        write_element(element, rewrites, &[], XHTML_NS, &mut out);
    }
    out
}

/// Wrap serialised head and body fragments in a complete EPUB content document.
pub fn document(language: &str, title: Option<&str>, head: &str, body: &str) -> String {
    let language = html_escape::encode_double_quoted_attribute(language);
    let title = title
        .map(|t| format!("<title>{}</title>", html_escape::encode_text(t)))
        .unwrap_or_default();
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            "\n<!DOCTYPE html>\n",
            r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">"#,
            "\n<head>\n",
            r#"<meta charset="utf-8"/>"#,
            "{title}{head}\n</head>\n<body>\n{body}\n</body>\n</html>\n"
        ),
        lang = language,
        title = title,
        head = head,
        body = body,
    )
}

fn write_element(
    element: ElementRef<'_>,
    rewrites: &Rewrites,
    skip: &[ElementRef<'_>],
    parent_ns: &str,
    out: &mut String,
) {
    let value = element.value();
    let name = value.name();
    let ns: &str = &value.name.ns;
    let in_svg = ns == SVG_NS;

    out.push('<');
    out.push_str(name);
    // inline SVG and MathML keep their namespaces once re-parsed as XML
    if ns != parent_ns && !ns.is_empty() {
        out.push_str(" xmlns=\"");
        out.push_str(ns);
        out.push('"');
        if in_svg {
            out.push_str(" xmlns:xlink=\"");
            out.push_str(XLINK_NS);
            out.push('"');
        }
    }
    for (attr, original) in value.attrs() {
        // namespace declarations are written above, never copied
        if !is_xml_name(attr) || attr == "xmlns" || (in_svg && attr == "xlink") {
            continue;
        }
        let attr_value = rewrites.get(attr, original).unwrap_or(original);
        out.push(' ');
        if in_svg && attr == "href" {
            out.push_str("xlink:");
        }
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(attr_value));
        out.push('"');
    }

    if VOID_ELEMENTS.contains(&name) && ns == XHTML_NS {
        out.push_str("/>");
        return;
    }
    out.push('>');

    if name == "script" || name == "style" {
        let raw: String = element.text().collect();
        write_raw_text(name, &raw, out);
    } else {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => out.push_str(&html_escape::encode_text(&**text)),
                Node::Element(_) => {
                    if skip.iter().any(|skipped| skipped.id() == child.id()) {
                        continue;
                    }
                    if let Some(child) = ElementRef::wrap(child) {
                        write_element(child, rewrites, skip, ns, out);
                    }
                }
                _ => {}
            }
        }
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Script and style bodies stay unescaped so they still run; markup-like
/// characters get a CDATA section hidden behind language comments.
fn write_raw_text(name: &str, raw: &str, out: &mut String) {
    if !raw.contains(['<', '&']) {
        out.push_str(raw);
        return;
    }
    let body = raw.replace("]]>", "]]]]><![CDATA[>");
    if name == "script" {
        out.push_str("\n//<![CDATA[\n");
        out.push_str(&body);
        out.push_str("\n//]]>\n");
    } else {
        out.push_str("/*<![CDATA[*/\n");
        out.push_str(&body);
        out.push_str("\n/*]]>*/");
    }
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}
