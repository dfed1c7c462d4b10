//! Template engine wrapper around tera.
//!
//! Loads every `.html` file under the templates directory, injects the
//! always-present built-in redirect template, and registers the helper
//! functions templates use to reach back into the hierarchy
//! (`section_pages`, `section_index`, `taxonomy_terms`, `page_taxonomy`,
//! `feed_url`). Helper lookup misses are non-fatal: they return an empty
//! result and surface a diagnostic, leaving the decision to the template.

use crate::config::SiteConfig;
use crate::content::ContentHierarchy;
use crate::generator::context::{PageContext, TemplateData};
use crate::generator::taxonomy::TaxonomyViews;
use crate::log;
use anyhow::{Context as _, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tera::{Tera, Value};

/// Name of the built-in redirect template; always resolves.
pub const REDIRECT_TEMPLATE: &str = "_redirect.html";

/// Default template when neither the page nor its parent names one.
pub const DEFAULT_TEMPLATE: &str = "default.html";

const REDIRECT_SOURCE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <link rel="canonical" href="{{ target }}">
    <meta http-equiv="refresh" content="0; url={{ target }}">
    <title>Redirect</title>
  </head>
  <body>
    <p><a href="{{ target }}">Click here</a> if you are not redirected.</p>
  </body>
</html>
"#;

/// The loaded template set.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Load all `.html` templates from `dir` and register helper functions.
    ///
    /// A missing templates directory yields an engine that only knows the
    /// built-in redirect template.
    pub fn load(
        dir: &Path,
        config: &'static SiteConfig,
        hierarchy: Arc<ContentHierarchy>,
        views: Arc<TaxonomyViews>,
    ) -> Result<Self> {
        let mut tera = if dir.is_dir() {
            let glob = format!("{}/**/*.html", dir.display());
            Tera::new(&glob)
                .with_context(|| format!("failed to load templates from {}", dir.display()))?
        } else {
            Tera::default()
        };

        // Bodies arrive pre-rendered and every path/URL field is generated,
        // not user input; entity-escaping them would mangle links.
        tera.autoescape_on(Vec::new());

        tera.add_raw_template(REDIRECT_TEMPLATE, REDIRECT_SOURCE)
            .context("failed to register built-in redirect template")?;

        register_helpers(&mut tera, config, hierarchy, views);

        Ok(Self { tera })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a template to a writer. Any failure is fatal to the build.
    pub fn render(
        &self,
        name: &str,
        data: &TemplateData,
        writer: impl Write,
    ) -> Result<()> {
        let context = data
            .to_context()
            .with_context(|| format!("failed to build context for \"{name}\""))?;
        self.tera
            .render_to(name, &context, writer)
            .with_context(|| format!("failed to render template \"{name}\""))?;
        Ok(())
    }
}

/// Register the hierarchy-querying helper functions.
fn register_helpers(
    tera: &mut Tera,
    config: &'static SiteConfig,
    hierarchy: Arc<ContentHierarchy>,
    views: Arc<TaxonomyViews>,
) {
    let h = Arc::clone(&hierarchy);
    tera.register_function(
        "section_pages",
        move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let path = required_str(args, "path", "section_pages")?;
            let offset = optional_usize(args, "offset")?.unwrap_or(0);
            let max = optional_usize(args, "max")?.unwrap_or(usize::MAX);

            if h.get(&path).is_none() {
                log!("warn"; "unable to find section \"{path}\"");
                return Ok(Value::Array(Vec::new()));
            }

            let pages: Vec<PageContext> = h
                .children_of(&path)
                .into_iter()
                .skip(offset)
                .take(max)
                .map(|page| PageContext::new(page, config))
                .collect();
            Ok(serde_json::to_value(pages)?)
        },
    );

    let h = Arc::clone(&hierarchy);
    tera.register_function(
        "section_index",
        move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let path = required_str(args, "path", "section_index")?;
            match h.get(&path) {
                Some(page) => Ok(serde_json::to_value(PageContext::new(page, config))?),
                None => {
                    log!("warn"; "unable to find page \"{path}\"");
                    Ok(Value::Null)
                }
            }
        },
    );

    let v = Arc::clone(&views);
    tera.register_function(
        "taxonomy_terms",
        move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let taxonomy = required_str(args, "taxonomy", "taxonomy_terms")?;
            Ok(serde_json::to_value(v.all_terms(&taxonomy))?)
        },
    );

    let v = Arc::clone(&views);
    tera.register_function(
        "page_taxonomy",
        move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let path = required_str(args, "path", "page_taxonomy")?;
            let taxonomy = required_str(args, "taxonomy", "page_taxonomy")?;
            Ok(serde_json::to_value(v.terms_for_page(&path, &taxonomy))?)
        },
    );

    tera.register_function(
        "feed_url",
        move |_args: &HashMap<String, Value>| -> tera::Result<Value> {
            Ok(Value::String(config.full_url("atom.xml")))
        },
    );
}

fn required_str(
    args: &HashMap<String, Value>,
    name: &str,
    function: &str,
) -> tera::Result<String> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            tera::Error::msg(format!("`{function}` requires a string `{name}` argument"))
        })
}

fn optional_usize(args: &HashMap<String, Value>, name: &str) -> tera::Result<Option<usize>> {
    match args.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| tera::Error::msg(format!("`{name}` must be a non-negative integer"))),
    }
}
