//! Atom feed generation.
//!
//! Builds `atom.xml` from the hierarchy's date-descending page list. Listing
//! pages, taxonomy roots, and drafts (unless drafts are included) never
//! become entries. Short entries carry their full body inline; longer ones
//! fall back to the summary so the feed stays reasonably sized.

use crate::generator::sitemap::escape_xml;
use crate::{config::SiteConfig, content::ContentHierarchy, log};
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use std::fs;

/// XML namespace for Atom
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Bodies up to this many bytes are inlined as entry content; anything
/// larger uses the summary instead.
const INLINE_CONTENT_LIMIT: usize = 500;

/// Build atom.xml from the finalized hierarchy, if enabled.
pub fn build_feed(config: &'static SiteConfig, hierarchy: &ContentHierarchy) -> Result<()> {
    if !config.generate_feed {
        return Ok(());
    }

    let feed = Feed::from_hierarchy(config, hierarchy, Utc::now().fixed_offset());
    feed.write(config)
}

/// Atom feed data structure
struct Feed {
    title: String,
    subtitle: String,
    author: String,
    /// Feed id and self-link
    atom_url: String,
    site_url: String,
    updated: DateTime<FixedOffset>,
    entries: Vec<Entry>,
}

/// One feed entry
struct Entry {
    title: String,
    permalink: String,
    published: String,
    /// Body HTML when it fits the inline limit
    content: Option<String>,
    /// Summary HTML when the body is too long
    summary: Option<String>,
}

impl Feed {
    fn from_hierarchy(
        config: &SiteConfig,
        hierarchy: &ContentHierarchy,
        now: DateTime<FixedOffset>,
    ) -> Self {
        let mut entries = Vec::new();
        for page in hierarchy.pages_by_date() {
            if page.is_listing() {
                continue;
            }
            if page.is_draft() && !config.include_drafts {
                continue;
            }
            if config.feed_limit > 0 && entries.len() >= config.feed_limit {
                break;
            }

            let (content, summary) = if page.html.len() > INLINE_CONTENT_LIMIT {
                (None, Some(page.summary.clone()))
            } else {
                (Some(page.html.trim().to_owned()), None)
            };

            entries.push(Entry {
                title: page.front.title.clone(),
                permalink: config.full_url(&page.root_path()),
                published: page.date.unwrap_or(now).to_rfc3339(),
                content,
                summary,
            });
        }

        Self {
            title: config.title.clone(),
            subtitle: config.description.clone(),
            author: config.author.clone(),
            atom_url: config.full_url("atom.xml"),
            site_url: config.site_url().to_owned(),
            updated: now,
            entries,
        }
    }

    fn into_xml(self) -> String {
        let mut xml = String::with_capacity(8192);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<feed xmlns="{ATOM_NS}" xml:lang="en">"#));
        xml.push('\n');
        xml.push_str(&format!("  <title>{}</title>\n", escape_xml(&self.title)));
        if !self.subtitle.is_empty() {
            xml.push_str(&format!(
                "  <subtitle>{}</subtitle>\n",
                escape_xml(&self.subtitle)
            ));
        }
        xml.push_str(&format!(
            r#"  <link rel="self" type="application/atom+xml" href="{}"/>"#,
            escape_xml(&self.atom_url)
        ));
        xml.push('\n');
        xml.push_str(&format!(
            r#"  <link rel="alternate" type="text/html" href="{}"/>"#,
            escape_xml(&self.site_url)
        ));
        xml.push('\n');
        xml.push_str("  <generator>stanza</generator>\n");
        xml.push_str(&format!("  <updated>{}</updated>\n", self.updated.to_rfc3339()));
        xml.push_str(&format!("  <id>{}</id>\n", escape_xml(&self.atom_url)));

        for entry in self.entries {
            xml.push_str("  <entry xml:lang=\"en\">\n");
            xml.push_str(&format!("    <title>{}</title>\n", escape_xml(&entry.title)));
            xml.push_str(&format!("    <published>{}</published>\n", entry.published));
            xml.push_str(&format!("    <updated>{}</updated>\n", entry.published));
            if !self.author.is_empty() {
                xml.push_str(&format!(
                    "    <author><name>{}</name></author>\n",
                    escape_xml(&self.author)
                ));
            }
            xml.push_str(&format!(
                r#"    <link rel="alternate" type="text/html" href="{}"/>"#,
                escape_xml(&entry.permalink)
            ));
            xml.push('\n');
            xml.push_str(&format!("    <id>{}</id>\n", escape_xml(&entry.permalink)));
            if let Some(content) = entry.content {
                xml.push_str(&format!(
                    "    <content type=\"html\" xml:base=\"{}\">{}</content>\n",
                    escape_xml(&entry.permalink),
                    escape_xml(&content)
                ));
            } else if let Some(summary) = entry.summary {
                xml.push_str(&format!(
                    "    <summary type=\"html\">{}</summary>\n",
                    escape_xml(&summary)
                ));
            }
            xml.push_str("  </entry>\n");
        }

        xml.push_str("</feed>\n");
        xml
    }

    fn write(self, config: &SiteConfig) -> Result<()> {
        let path = config.output_dir().join("atom.xml");
        let xml = self.into_xml();

        fs::write(&path, xml)
            .with_context(|| format!("failed to write feed to {}", path.display()))?;

        log!("build"; "atom.xml");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Page;
    use tempfile::TempDir;

    fn config() -> SiteConfig {
        SiteConfig {
            base_url: "https://example.com".to_owned(),
            title: "Example".to_owned(),
            description: "An example site".to_owned(),
            author: "Jo".to_owned(),
            ..Default::default()
        }
    }

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-06-01T00:00:00+00:00").unwrap()
    }

    fn hierarchy(pages: &[(&str, &str)]) -> ContentHierarchy {
        let mut h = ContentHierarchy::new();
        for (path, raw) in pages {
            h.add_page(Page::parse(path, raw, false).unwrap());
        }
        h.finalize();
        h
    }

    #[test]
    fn test_entries_date_descending_and_filtered() {
        let h = hierarchy(&[
            ("old.md", "+++\ntitle = \"Old\"\ndate = 2024-01-01\n+++\nOld."),
            ("new.md", "+++\ntitle = \"New\"\ndate = 2024-03-01\n+++\nNew."),
            (
                "blog.md",
                "+++\ntitle = \"Blog\"\n[index]\nsort_by = \"date\"\n+++\n",
            ),
            (
                "hidden.md",
                "+++\ntitle = \"Hidden\"\ndraft = true\ndate = 2024-05-01\n+++\nShh.",
            ),
        ]);

        let xml = Feed::from_hierarchy(&config(), &h, now()).into_xml();

        assert!(xml.contains("<title>Example</title>"));
        assert!(xml.contains("<subtitle>An example site</subtitle>"));
        assert!(xml.contains("<author><name>Jo</name></author>"));
        let new = xml.find("<title>New</title>").unwrap();
        let old = xml.find("<title>Old</title>").unwrap();
        assert!(new < old);
        // listings and drafts never become entries
        assert!(!xml.contains("<title>Blog</title>"));
        assert!(!xml.contains("Hidden"));
    }

    #[test]
    fn test_drafts_included_when_configured() {
        let h = hierarchy(&[(
            "hidden.md",
            "+++\ntitle = \"Hidden\"\ndraft = true\n+++\nShh.",
        )]);
        let config = SiteConfig {
            include_drafts: true,
            ..config()
        };

        let xml = Feed::from_hierarchy(&config, &h, now()).into_xml();
        assert!(xml.contains("<title>Hidden</title>"));
    }

    #[test]
    fn test_short_body_inlined_long_body_summarized() {
        let long_body = "word ".repeat(200);
        let h = hierarchy(&[
            ("short.md", "+++\ntitle = \"Short\"\ndate = 2024-02-01\n+++\nTiny."),
            (
                "long.md",
                &format!(
                    "+++\ntitle = \"Long\"\ndate = 2024-01-01\n\
summary = \"In brief.\"\n+++\n{long_body}"
                ),
            ),
        ]);

        let xml = Feed::from_hierarchy(&config(), &h, now()).into_xml();

        assert!(xml.contains("&lt;p&gt;Tiny.&lt;/p&gt;"));
        assert!(xml.contains("<summary type=\"html\">"));
        assert!(!xml.contains("word word word"));
    }

    #[test]
    fn test_feed_limit_truncates() {
        let h = hierarchy(&[
            ("a.md", "+++\ntitle = \"A\"\ndate = 2024-03-01\n+++\nA."),
            ("b.md", "+++\ntitle = \"B\"\ndate = 2024-02-01\n+++\nB."),
            ("c.md", "+++\ntitle = \"C\"\ndate = 2024-01-01\n+++\nC."),
        ]);
        let config = SiteConfig {
            feed_limit: 2,
            ..config()
        };

        let xml = Feed::from_hierarchy(&config, &h, now()).into_xml();
        assert_eq!(xml.matches("<entry").count(), 2);
        assert!(xml.contains("<title>A</title>"));
        assert!(xml.contains("<title>B</title>"));
        assert!(!xml.contains("<title>C</title>"));
    }

    #[test]
    fn test_build_feed_writes_file() {
        let dir = TempDir::new().unwrap();
        let mut config = config();
        config.override_output(dir.path().to_path_buf());
        let config: &'static SiteConfig = Box::leak(Box::new(config));

        let h = hierarchy(&[("a.md", "+++\ntitle = \"A\"\n+++\nA.")]);
        build_feed(config, &h).unwrap();

        let xml = std::fs::read_to_string(dir.path().join("atom.xml")).unwrap();
        assert!(xml.contains("<feed xmlns="));
        assert!(xml.contains("<id>https://example.com/a/</id>"));
    }

    #[test]
    fn test_build_feed_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = config();
        config.generate_feed = false;
        config.override_output(dir.path().to_path_buf());
        let config: &'static SiteConfig = Box::leak(Box::new(config));

        build_feed(config, &ContentHierarchy::new()).unwrap();
        assert!(!dir.path().join("atom.xml").exists());
    }
}
