//! Full site build.
//!
//! One `build_site` call is one complete rebuild: clear the output
//! directory, harvest the content tree, finalize the hierarchy, generate
//! every page, mirror static files, then emit the feed and sitemap. Nothing
//! is incremental; a failed build may leave the cleared output incomplete.

use crate::config::SiteConfig;
use crate::content::{ContentHierarchy, Page};
use crate::generator::Generator;
use crate::generator::feed::build_feed;
use crate::generator::sitemap::build_sitemap;
use crate::generator::taxonomy::TaxonomyViews;
use crate::templates::Templates;
use crate::{log, vlog};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

pub fn build_site(config: &'static SiteConfig) -> Result<()> {
    let started = Instant::now();
    log!("build"; "building {}", config.content_dir().display());

    clear_output(&config.output_dir())?;

    let hierarchy = Arc::new(harvest(config)?);
    if hierarchy.is_empty() {
        log!("build"; "no content found in {}", config.content_dir().display());
    }
    vlog!("build"; "harvested {} pages", hierarchy.len());

    let views = Arc::new(TaxonomyViews::new(Arc::clone(&hierarchy), config));
    let templates = Templates::load(
        &config.templates_dir(),
        config,
        Arc::clone(&hierarchy),
        views,
    )?;

    let rendered_paths = Generator::new(hierarchy.as_ref(), config, &templates).run()?;

    copy_static_files(config, &hierarchy)?;
    build_feed(config, &hierarchy)?;
    build_sitemap(config, &rendered_paths)?;

    log!(
        "build";
        "generated {} pages in {:.2?}",
        rendered_paths.len(),
        started.elapsed()
    );
    Ok(())
}

/// Empty the output directory without removing the directory itself.
fn clear_output(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        return Ok(());
    }

    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?
    {
        let path = entry?.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.with_context(|| format!("failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Walk the content tree into a finalized hierarchy.
///
/// Markdown files become pages; everything else is recorded for static
/// passthrough. Dot-directories (and dotfiles) are skipped entirely.
fn harvest(config: &SiteConfig) -> Result<ContentHierarchy> {
    let content_dir = config.content_dir();
    let mut hierarchy = ContentHierarchy::new();

    let walker = WalkDir::new(&content_dir)
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(&content_dir)
            .with_context(|| format!("path escapes content dir: {}", entry.path().display()))?;
        // rendered paths are /-separated regardless of platform
        let relative: String = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.path().extension().is_some_and(|ext| ext == "md") {
            vlog!("content"; "{relative}");
            let raw = fs::read_to_string(entry.path())
                .with_context(|| format!("failed to read {}", entry.path().display()))?;
            hierarchy.add_page(Page::parse(&relative, &raw, config.smart_punctuation)?);
        } else {
            hierarchy.add_static_file(relative, entry.path().to_path_buf());
        }
    }

    hierarchy.finalize();
    Ok(hierarchy)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Mirror non-markdown content files into the output tree.
fn copy_static_files(config: &SiteConfig, hierarchy: &ContentHierarchy) -> Result<()> {
    let output = config.output_dir();
    for (relative, source) in hierarchy.static_files() {
        let dest = output.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::copy(source, &dest)
            .with_context(|| format!("failed to copy {} to {}", source.display(), dest.display()))?;
        vlog!("build"; "copied {relative}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn site_config(root: &Path) -> &'static SiteConfig {
        let mut config = SiteConfig {
            base_url: "https://example.com".to_owned(),
            ..Default::default()
        };
        config.set_root(root);
        Box::leak(Box::new(config))
    }

    fn scaffold(dir: &TempDir) {
        write(
            dir.path(),
            "templates/default.html",
            "<h1>{{ title }}</h1>",
        );
        write(
            dir.path(),
            "templates/list.html",
            "{% for p in pages %}[{{ p.title }}]{% endfor %}|prev={{ prev }}",
        );
        write(dir.path(), "content/index.md", "+++\ntitle = \"Home\"\n+++\nHi.");
        write(
            dir.path(),
            "content/blog.md",
            "+++\ntitle = \"Blog\"\ntemplate = \"list.html\"\n\
[index]\nsort_by = \"date\"\npaginate_by = 1\n+++\n",
        );
        write(
            dir.path(),
            "content/blog/a.md",
            "+++\ntitle = \"A\"\ndate = 2024-02-01\n+++\nA.",
        );
        write(
            dir.path(),
            "content/blog/b.md",
            "+++\ntitle = \"B\"\ndate = 2024-01-01\n+++\nB.",
        );
        write(dir.path(), "content/css/style.css", "body { margin: 0 }");
    }

    #[test]
    fn test_build_site_end_to_end() {
        let dir = TempDir::new().unwrap();
        scaffold(&dir);
        let config = site_config(dir.path());

        build_site(config).unwrap();

        let out = dir.path().join("public");
        assert!(out.join("index.html").is_file());
        assert_eq!(
            fs::read_to_string(out.join("blog/index.html")).unwrap(),
            "[A]|prev="
        );
        assert!(
            fs::read_to_string(out.join("blog/page/1/index.html"))
                .unwrap()
                .contains("url=https://example.com/blog/")
        );
        assert_eq!(
            fs::read_to_string(out.join("blog/page/2/index.html")).unwrap(),
            "[B]|prev=/blog/"
        );
        assert!(out.join("blog/a/index.html").is_file());

        // static passthrough
        assert_eq!(
            fs::read_to_string(out.join("css/style.css")).unwrap(),
            "body { margin: 0 }"
        );

        // feed and sitemap
        let feed = fs::read_to_string(out.join("atom.xml")).unwrap();
        assert!(feed.contains("<title>A</title>"));
        assert!(!feed.contains("<title>Blog</title>"));

        let sitemap = fs::read_to_string(out.join("sitemap.xml")).unwrap();
        assert!(sitemap.contains("<loc>https://example.com/blog/page/2/</loc>"));
        assert!(!sitemap.contains("<loc>https://example.com/blog/page/1/</loc>"));
    }

    #[test]
    fn test_build_clears_stale_output() {
        let dir = TempDir::new().unwrap();
        scaffold(&dir);
        write(dir.path(), "public/stale/index.html", "old");
        write(dir.path(), "public/stale.txt", "old");
        let config = site_config(dir.path());

        build_site(config).unwrap();

        let out = dir.path().join("public");
        assert!(!out.join("stale").exists());
        assert!(!out.join("stale.txt").exists());
        assert!(out.join("index.html").is_file());
    }

    #[test]
    fn test_harvest_skips_dot_directories() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "content/post.md", "+++\ntitle = \"P\"\n+++\n");
        write(dir.path(), "content/.obsidian/cache.md", "+++\n+++\n");
        write(dir.path(), "content/.DS_Store", "junk");
        let config = site_config(dir.path());

        let hierarchy = harvest(config).unwrap();
        assert_eq!(hierarchy.len(), 1);
        assert!(hierarchy.static_files().is_empty());
    }

    #[test]
    fn test_harvest_parse_error_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "content/bad.md", "+++\ntitle = not quoted\n+++\n");
        let config = site_config(dir.path());

        let err = harvest(config).unwrap_err();
        assert!(format!("{err:#}").contains("bad.md"));
    }
}
