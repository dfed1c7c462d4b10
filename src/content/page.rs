//! Content documents: TOML frontmatter + markdown body.
//!
//! A [`Page`] is one ingested document. Its `source_path` is relative to the
//! content root and keeps its extension; the derived `rendered_path` drops
//! the extension and decides where the page lands in the output tree.

use crate::markdown::{first_paragraph, render_markdown};
use crate::utils::root_path;
use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// The index descriptor: present only on listing and taxonomy-root pages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndexMeta {
    /// Sort key for children. Only `"date"` (publish date, descending) has
    /// defined behavior; other values are accepted without distinct effect.
    pub sort_by: String,
    /// Template for the listing page itself
    pub template: String,
    /// Template applied to child pages and synthesized per-term pages
    pub page_template: String,
    /// Page size for pagination; `<= 0` collapses to a single group
    pub paginate_by: i64,
    /// Non-empty marks this page as the named taxonomy's root
    pub taxonomy: String,
}

/// TOML frontmatter of a content document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: String,
    pub description: String,
    pub(crate) date: Option<DateField>,
    pub draft: bool,
    pub summary: String,
    /// taxonomy name → terms, e.g. `tags = ["rust", "testing"]`
    pub taxonomies: HashMap<String, Vec<String>>,
    /// Template override for this page
    pub template: String,
    pub index: Option<IndexMeta>,
}

/// A frontmatter date: either a native TOML datetime or a quoted string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum DateField {
    Toml(toml::value::Datetime),
    Text(String),
}

impl DateField {
    /// Resolve to a concrete datetime. Date-only values become midnight UTC;
    /// naive datetimes are taken as UTC.
    fn resolve(&self) -> Result<DateTime<FixedOffset>> {
        let text = match self {
            Self::Toml(dt) => dt.to_string(),
            Self::Text(s) => s.trim().to_owned(),
        };

        DateTime::parse_from_rfc3339(&text)
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc().fixed_offset())
            })
            .or_else(|| {
                NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc().fixed_offset())
            })
            .ok_or_else(|| anyhow!("invalid date: {text}"))
    }
}

/// One ingested content document.
#[derive(Debug, Clone)]
pub struct Page {
    pub front: FrontMatter,
    /// Publish timestamp resolved from the frontmatter (or the build clock
    /// for synthesized term pages)
    pub date: Option<DateTime<FixedOffset>>,
    /// Rendered body HTML, opaque to the pipeline
    pub html: String,
    /// Path relative to the content root, extension included
    pub source_path: String,
    /// Pre-rendered summary HTML (explicit summary > description > first
    /// paragraph of the body)
    pub summary: String,
}

impl Page {
    /// Parse a markdown document with optional TOML frontmatter.
    ///
    /// `source_path` must be relative to the content root and use `/`
    /// separators. Malformed frontmatter is a fatal parse error.
    pub fn parse(source_path: &str, raw: &str, smart_punctuation: bool) -> Result<Self> {
        let (fm_raw, body) = split_front_matter(raw)?;

        let front: FrontMatter = match fm_raw {
            Some(text) => toml::from_str(text)
                .with_context(|| format!("invalid frontmatter in {source_path}"))?,
            None => FrontMatter::default(),
        };

        let date = front
            .date
            .as_ref()
            .map(DateField::resolve)
            .transpose()
            .with_context(|| format!("invalid frontmatter in {source_path}"))?;

        let html = render_markdown(body, smart_punctuation);
        let summary = compute_summary(&front, &html, smart_punctuation);

        Ok(Self {
            front,
            date,
            html,
            source_path: source_path.to_owned(),
            summary,
        })
    }

    /// The output-identifying path: `source_path` with its extension removed.
    ///
    /// One exact-string special case: the content root's own `index.md` maps
    /// to the empty string (the site root). A nested `foo/index.md` does NOT
    /// collapse to `foo`; it keeps its stripped name `foo/index`.
    pub fn rendered_path(&self) -> String {
        if self.source_path == "index.md" {
            return String::new();
        }

        match Path::new(&self.source_path).extension() {
            Some(ext) => {
                let stripped = self.source_path.len() - ext.len() - 1;
                self.source_path[..stripped].to_owned()
            }
            None => self.source_path.clone(),
        }
    }

    /// The canonical `/`-wrapped URL path of this page.
    pub fn root_path(&self) -> String {
        root_path(&self.rendered_path())
    }

    /// Publish timestamp in milliseconds, 0 when no date is set.
    ///
    /// Used as the descending sort key everywhere.
    pub fn date_ms(&self) -> i64 {
        self.date.map(|d| d.timestamp_millis()).unwrap_or(0)
    }

    pub fn is_draft(&self) -> bool {
        self.front.draft
    }

    /// A page with an index descriptor lists its children (or a taxonomy).
    pub fn is_listing(&self) -> bool {
        self.front.index.is_some()
    }

    /// The taxonomy this page is the root of, if any.
    pub fn taxonomy(&self) -> Option<&str> {
        self.front
            .index
            .as_ref()
            .map(|i| i.taxonomy.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Summary precedence: explicit frontmatter summary, then description, then
/// the first paragraph of the rendered body.
fn compute_summary(front: &FrontMatter, body_html: &str, smart_punctuation: bool) -> String {
    let explicit = [front.summary.as_str(), front.description.as_str()]
        .into_iter()
        .map(str::trim)
        .find(|s| !s.is_empty());

    match explicit {
        Some(text) => render_markdown(text, smart_punctuation).trim().to_owned(),
        None => first_paragraph(body_html),
    }
}

/// Split a raw document into its TOML frontmatter and markdown body.
///
/// Frontmatter is delimited by `+++` lines at the very start of the file.
/// A document without a leading `+++` has no frontmatter; an opening
/// delimiter without a closing one is an error.
pub fn split_front_matter(raw: &str) -> Result<(Option<&str>, &str)> {
    let Some(rest) = raw.strip_prefix("+++") else {
        return Ok((None, raw));
    };
    let rest = rest.strip_prefix('\r').unwrap_or(rest);
    let Some(rest) = rest.strip_prefix('\n') else {
        // "+++something" on the first line is just content
        return Ok((None, raw));
    };

    // empty frontmatter: the closing delimiter is the very next line
    if let Some(body) = rest.strip_prefix("+++") {
        let body = body.strip_prefix('\r').unwrap_or(body);
        let body = body.strip_prefix('\n').unwrap_or(body);
        return Ok((Some(""), body));
    }

    match rest.find("\n+++") {
        Some(end) => {
            let fm = &rest[..end + 1];
            let body = &rest[end + 4..];
            let body = body.strip_prefix('\r').unwrap_or(body);
            let body = body.strip_prefix('\n').unwrap_or(body);
            Ok((Some(fm), body))
        }
        None => bail!("unclosed frontmatter delimiter"),
    }
}
