//! Template data shapes.
//!
//! The rendering engine accepts exactly three data shapes, modeled as a
//! closed tagged enum: a single page, a listing (page + members + pagination
//! links), and a redirect stub. Page fields are flattened so templates read
//! `{{ title }}`, `{{ content }}`, `{{ prev }}` directly.

use crate::config::SiteConfig;
use crate::content::Page;
use serde::Serialize;
use tera::Context;

/// The fields every template sees for a page.
#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    pub title: String,
    pub description: String,
    /// RFC 3339 publish timestamp, empty when the page has no date
    pub date: String,
    /// Publish timestamp in milliseconds since the epoch (0 when unset)
    pub timestamp: i64,
    pub draft: bool,
    pub taxonomies: std::collections::HashMap<String, Vec<String>>,
    /// Rendered body HTML; templates must pipe it through `| safe`
    pub content: String,
    pub summary: String,
    /// Rendered path, e.g. `blog/first-post`
    pub path: String,
    /// Canonical `/`-wrapped path, e.g. `/blog/first-post/`
    pub root_path: String,
    /// Absolute URL
    pub permalink: String,
}

impl PageContext {
    pub fn new(page: &Page, config: &SiteConfig) -> Self {
        let root_path = page.root_path();
        Self {
            title: page.front.title.clone(),
            description: page.front.description.clone(),
            date: page.date.map(|d| d.to_rfc3339()).unwrap_or_default(),
            timestamp: page.date_ms(),
            draft: page.front.draft,
            taxonomies: page.front.taxonomies.clone(),
            content: page.html.clone(),
            summary: page.summary.clone(),
            path: page.rendered_path(),
            permalink: config.full_url(&root_path),
            root_path,
        }
    }
}

/// A leaf page plus its sibling navigation.
///
/// `prev`/`next` are canonical URLs, empty when absent (the first/last
/// sibling), mirroring what templates expect for optional links.
#[derive(Debug, Clone, Serialize)]
pub struct PageData {
    #[serde(flatten)]
    pub page: PageContext,
    pub prev: String,
    pub next: String,
    pub prev_page: Option<PageContext>,
    pub next_page: Option<PageContext>,
}

impl PageData {
    /// A page rendered without navigational context.
    pub fn bare(page: PageContext) -> Self {
        Self {
            page,
            prev: String::new(),
            next: String::new(),
            prev_page: None,
            next_page: None,
        }
    }
}

/// One pagination group of a listing page.
#[derive(Debug, Clone, Serialize)]
pub struct ListingData {
    #[serde(flatten)]
    pub page: PageContext,
    /// The members of this group
    pub pages: Vec<PageContext>,
    pub prev: String,
    pub next: String,
    /// 1-based
    pub current_page: usize,
    pub total_pages: usize,
}

/// A stub page that redirects to the canonical listing URL.
#[derive(Debug, Clone, Serialize)]
pub struct RedirectData {
    pub target: String,
}

/// The closed set of shapes the template engine renders.
#[derive(Debug, Clone)]
pub enum TemplateData {
    Page(PageData),
    Listing(ListingData),
    Redirect(RedirectData),
}

impl TemplateData {
    pub fn to_context(&self) -> tera::Result<Context> {
        match self {
            Self::Page(data) => Context::from_serialize(data),
            Self::Listing(data) => Context::from_serialize(data),
            Self::Redirect(data) => Context::from_serialize(data),
        }
    }

    /// The rendered path this data describes, for log output.
    pub fn path(&self) -> &str {
        match self {
            Self::Page(data) => &data.page.path,
            Self::Listing(data) => &data.page.path,
            Self::Redirect(data) => &data.target,
        }
    }
}
