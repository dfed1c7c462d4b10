//! Sitemap generation.
//!
//! Generates a sitemap.xml file listing every canonically rendered page for
//! search engine indexing. The input is the generator's rendered-path
//! registry, so drafts and redirect stubs never appear.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/</loc>
//!   </url>
//! </urlset>
//! ```

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result};
use std::fs;

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Build sitemap.xml from the canonical path registry, if enabled.
pub fn build_sitemap(config: &'static SiteConfig, rendered_paths: &[String]) -> Result<()> {
    if !config.sitemap {
        return Ok(());
    }

    let sitemap = Sitemap::from_paths(config, rendered_paths);
    sitemap.write(config)
}

/// Sitemap data structure
struct Sitemap {
    /// Full URLs, alphabetically sorted
    urls: Vec<String>,
}

impl Sitemap {
    fn from_paths(config: &SiteConfig, rendered_paths: &[String]) -> Self {
        let mut urls: Vec<String> = rendered_paths
            .iter()
            .map(|path| config.full_url(path))
            .collect();
        urls.sort();
        Self { urls }
    }

    fn into_xml(self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
        xml.push('\n');

        for url in self.urls {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&url)));
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }

    fn write(self, config: &SiteConfig) -> Result<()> {
        let path = config.output_dir().join("sitemap.xml");
        let xml = self.into_xml();

        fs::write(&path, xml)
            .with_context(|| format!("failed to write sitemap to {}", path.display()))?;

        log!("build"; "sitemap.xml");
        Ok(())
    }
}

/// Escape special XML characters.
pub(super) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(out: Option<&TempDir>) -> &'static SiteConfig {
        let mut config = SiteConfig {
            base_url: "https://example.com".to_owned(),
            ..Default::default()
        };
        if let Some(dir) = out {
            config.override_output(dir.path().to_path_buf());
        }
        Box::leak(Box::new(config))
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("hello"), "hello");
        assert_eq!(escape_xml("<test>"), "&lt;test&gt;");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(escape_xml("it's"), "it&apos;s");
    }

    #[test]
    fn test_sitemap_empty() {
        let sitemap = Sitemap::from_paths(config(None), &[]);
        let xml = sitemap.into_xml();

        assert!(xml.contains(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#)));
        assert!(xml.contains("</urlset>"));
        assert!(!xml.contains("<url>"));
    }

    #[test]
    fn test_sitemap_sorted_alphabetically() {
        let paths = vec![
            "/zebra/".to_owned(),
            "/".to_owned(),
            "/blog/page/2/".to_owned(),
            "/blog/".to_owned(),
        ];
        let xml = Sitemap::from_paths(config(None), &paths).into_xml();

        let root = xml.find("<loc>https://example.com/</loc>").unwrap();
        let blog = xml.find("<loc>https://example.com/blog/</loc>").unwrap();
        let page2 = xml
            .find("<loc>https://example.com/blog/page/2/</loc>")
            .unwrap();
        let zebra = xml.find("<loc>https://example.com/zebra/</loc>").unwrap();
        assert!(root < blog && blog < page2 && page2 < zebra);
        assert_eq!(xml.matches("<url>").count(), 4);
    }

    #[test]
    fn test_sitemap_escapes_special_chars() {
        let paths = vec!["/search?q=a&b=c".to_owned()];
        let xml = Sitemap::from_paths(config(None), &paths).into_xml();

        assert!(xml.contains("<loc>https://example.com/search?q=a&amp;b=c</loc>"));
    }

    #[test]
    fn test_build_sitemap_writes_file() {
        let dir = TempDir::new().unwrap();
        let config = config(Some(&dir));

        build_sitemap(config, &["/".to_owned()]).unwrap();

        let xml = std::fs::read_to_string(dir.path().join("sitemap.xml")).unwrap();
        assert!(xml.contains("<loc>https://example.com/</loc>"));
    }

    #[test]
    fn test_build_sitemap_disabled() {
        let dir = TempDir::new().unwrap();
        let mut disabled = SiteConfig {
            base_url: "https://example.com".to_owned(),
            sitemap: false,
            ..Default::default()
        };
        disabled.override_output(dir.path().to_path_buf());
        let disabled: &'static SiteConfig = Box::leak(Box::new(disabled));

        build_sitemap(disabled, &["/".to_owned()]).unwrap();
        assert!(!dir.path().join("sitemap.xml").exists());
    }
}
