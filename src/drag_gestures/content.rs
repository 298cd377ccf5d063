use super::geometry::Point;
use super::page::{NodeId, PageDom, TextSelection};

const ELLIPSIS: &str = "...";
const MAX_ANCESTOR_DEPTH: usize = 256;

/// What a drag carries. Payloads are never blank.
#[derive(Debug, Clone, PartialEq)]
pub enum DragContent {
    Text { full: String, preview: String },
    Image { src_url: String, alt_text: String },
    Link { href: String, label: String },
}

impl DragContent {
    pub fn kind(&self) -> &'static str {
        match self {
            DragContent::Text { .. } => "text",
            DragContent::Image { .. } => "image",
            DragContent::Link { .. } => "link",
        }
    }

    /// Hint shown next to the pointer while dragging.
    pub fn tooltip(&self, max_chars: usize) -> String {
        match self {
            DragContent::Text { full, .. } => format!("Search: {}", truncate_chars(full, max_chars)),
            DragContent::Image { .. } => "Open image in new tab".to_string(),
            DragContent::Link { .. } => "Open link in new tab".to_string(),
        }
    }
}

/// Cut `text` to `max_chars` characters, appending `...` when shortened.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{}", &text[..idx], ELLIPSIS),
        None => text.to_string(),
    }
}

fn is_tag(dom: &dyn PageDom, node: NodeId, tag: &str) -> bool {
    dom.tag_name(node)
        .map(|t| t.eq_ignore_ascii_case(tag))
        .unwrap_or(false)
}

fn closest_link(dom: &dyn PageDom, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    for _ in 0..MAX_ANCESTOR_DEPTH {
        let n = current?;
        if is_tag(dom, n, "a") {
            return Some(n);
        }
        current = dom.parent(n);
    }
    None
}

/// Resolve a raw attribute against the document base URL.
fn resolve_url(dom: &dyn PageDom, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let resolved = match dom.base_url() {
        Some(base) => base.join(raw).map(|u| u.to_string()).ok(),
        None => url::Url::parse(raw).map(|u| u.to_string()).ok(),
    };
    Some(resolved.unwrap_or_else(|| raw.to_string()))
}

/// Classify what a press on `origin` at `press` would drag.
///
/// Precedence: a selection whose rectangles contain the press point, then an
/// image, then the nearest enclosing link. Anything else yields `None`.
pub fn classify(
    dom: &dyn PageDom,
    origin: NodeId,
    selection: Option<&TextSelection>,
    press: Point,
    preview_max_chars: usize,
) -> Option<DragContent> {
    if let Some(selection) = selection {
        let full = selection.text.trim();
        if !full.is_empty() && selection.contains(press) {
            return Some(DragContent::Text {
                full: full.to_string(),
                preview: truncate_chars(full, preview_max_chars),
            });
        }
    }

    // Stale handle.
    dom.tag_name(origin)?;

    if is_tag(dom, origin, "img") {
        if let Some(src_url) = dom
            .attribute(origin, "src")
            .and_then(|src| resolve_url(dom, &src))
        {
            let alt_text = dom
                .attribute(origin, "alt")
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| "image".to_string());
            return Some(DragContent::Image { src_url, alt_text });
        }
    }

    let link = closest_link(dom, origin)?;
    let href = dom
        .attribute(link, "href")
        .and_then(|href| resolve_url(dom, &href))?;
    let text = dom
        .text_content(link)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    let label = if text.is_empty() {
        href.clone()
    } else {
        truncate_chars(&text, preview_max_chars)
    };
    Some(DragContent::Link { href, label })
}
