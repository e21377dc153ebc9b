//! Sitemap XML parsing.
//!
//! Classifies a document by its root element and collects the `<loc>` of each
//! entry. Element names are matched by local name, so documents with or
//! without the sitemaps.org namespace parse the same way.

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

/// A parsed sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapNode {
    /// `<sitemapindex>`: locations of further sitemap documents.
    Index(Vec<String>),
    /// `<urlset>`: locations of pages.
    UrlSet(Vec<String>),
}

impl SitemapNode {
    /// Every `<loc>` in document order.
    #[must_use]
    pub fn locs(&self) -> &[String] {
        match self {
            Self::Index(children) => children,
            Self::UrlSet(pages) => pages,
        }
    }

    /// Consumes the node, returning its locations.
    #[must_use]
    pub fn into_locs(self) -> Vec<String> {
        match self {
            Self::Index(children) => children,
            Self::UrlSet(pages) => pages,
        }
    }
}

/// Errors from parsing a sitemap document.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// The XML is not well formed.
    #[error("malformed sitemap XML: {0}")]
    Malformed(String),

    /// Well-formed XML whose root is neither `sitemapindex` nor `urlset`.
    #[error("unsupported sitemap root element <{0}>")]
    UnsupportedRoot(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    Index,
    UrlSet,
}

impl Root {
    fn classify(name: &str) -> Result<Self, SitemapError> {
        match name {
            "sitemapindex" => Ok(Self::Index),
            "urlset" => Ok(Self::UrlSet),
            other => Err(SitemapError::UnsupportedRoot(other.to_string())),
        }
    }

    fn entry_name(self) -> &'static str {
        match self {
            Self::Index => "sitemap",
            Self::UrlSet => "url",
        }
    }
}

/// Parses a sitemap or sitemap index document.
///
/// # Errors
///
/// - [`SitemapError::Malformed`] for broken XML, unclosed elements, a second
///   root element, or an empty document
/// - [`SitemapError::UnsupportedRoot`] for any other root element
pub fn parse_sitemap(xml: &str) -> Result<SitemapNode, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root: Option<Root> = None;
    let mut depth = 0usize;
    let mut in_entry = false;
    let mut in_loc = false;
    let mut current = String::new();
    let mut locs = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                depth += 1;
                match depth {
                    1 => root = Some(open_root(root, &name)?),
                    2 => in_entry = root.is_some_and(|r| r.entry_name() == name),
                    3 if in_entry && name == "loc" => {
                        in_loc = true;
                        current.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) if depth == 0 => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                root = Some(open_root(root, &name)?);
            }
            Ok(Event::Text(ref e)) if in_loc => {
                let text = e
                    .unescape()
                    .map_err(|err| SitemapError::Malformed(err.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::CData(ref e)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::End(_)) => {
                if depth == 3 && in_loc {
                    let loc = current.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                    in_loc = false;
                }
                if depth == 2 {
                    in_entry = false;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SitemapError::Malformed(e.to_string())),
            Ok(_) => {}
        }
    }

    if depth != 0 {
        return Err(SitemapError::Malformed(
            "document ended inside an open element".to_string(),
        ));
    }

    match root {
        Some(Root::Index) => Ok(SitemapNode::Index(locs)),
        Some(Root::UrlSet) => Ok(SitemapNode::UrlSet(locs)),
        None => Err(SitemapError::Malformed("no root element".to_string())),
    }
}

fn open_root(existing: Option<Root>, name: &str) -> Result<Root, SitemapError> {
    if existing.is_some() {
        return Err(SitemapError::Malformed(format!(
            "second root element <{name}>"
        )));
    }
    Root::classify(name)
}
