//! Taxonomy view cache.
//!
//! Translates the hierarchy's raw term → members index into
//! presentation-ready term summaries. Built lazily per taxonomy and reused
//! for the whole build — template helpers may query these arbitrarily often.

use crate::config::SiteConfig;
use crate::content::ContentHierarchy;
use crate::log;
use crate::utils::{dash_spaces, join_path, root_path};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// One term of a taxonomy, ready for templates.
#[derive(Debug, Clone, Serialize)]
pub struct TermSummary {
    /// Display form, spaces intact
    pub term: String,
    pub page_count: usize,
    /// Canonical `/`-wrapped path below the taxonomy root (spaces dashed)
    pub root_path: String,
    pub permalink: String,
}

/// Lazily-populated per-taxonomy term summaries.
pub struct TaxonomyViews {
    hierarchy: Arc<ContentHierarchy>,
    config: &'static SiteConfig,
    cache: RwLock<HashMap<String, Arc<BTreeMap<String, TermSummary>>>>,
}

impl TaxonomyViews {
    pub fn new(hierarchy: Arc<ContentHierarchy>, config: &'static SiteConfig) -> Self {
        Self {
            hierarchy,
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// All terms of a taxonomy, alphabetically.
    pub fn all_terms(&self, taxonomy: &str) -> Vec<TermSummary> {
        self.summaries(taxonomy).values().cloned().collect()
    }

    /// The terms assigned to one page for one taxonomy, alphabetically.
    ///
    /// Unknown page paths are a lookup miss: empty result plus a diagnostic.
    pub fn terms_for_page(&self, path: &str, taxonomy: &str) -> Vec<TermSummary> {
        let Some(page) = self.hierarchy.get(path) else {
            log!("warn"; "unable to find page \"{path}\"");
            return Vec::new();
        };

        let summaries = self.summaries(taxonomy);
        let mut terms: Vec<TermSummary> = page
            .front
            .taxonomies
            .get(taxonomy)
            .map(|terms| {
                terms
                    .iter()
                    .filter_map(|t| summaries.get(t).cloned())
                    .collect()
            })
            .unwrap_or_default();
        terms.sort_by(|a, b| a.term.cmp(&b.term));
        terms.dedup_by(|a, b| a.term == b.term);
        terms
    }

    /// Build (once) and return the term summaries of a taxonomy.
    fn summaries(&self, taxonomy: &str) -> Arc<BTreeMap<String, TermSummary>> {
        if let Some(cached) = self.cache.read().get(taxonomy) {
            return Arc::clone(cached);
        }

        let built = Arc::new(self.build_summaries(taxonomy));
        self.cache
            .write()
            .entry(taxonomy.to_owned())
            .or_insert(built)
            .clone()
    }

    fn build_summaries(&self, taxonomy: &str) -> BTreeMap<String, TermSummary> {
        let Some(terms) = self.hierarchy.terms_of(taxonomy) else {
            return BTreeMap::new();
        };
        let Some(root) = self.hierarchy.taxonomy_root_of(taxonomy) else {
            log!("warn"; "taxonomy \"{taxonomy}\" has terms but no root page");
            return BTreeMap::new();
        };

        let root_rendered = root.rendered_path();
        terms
            .iter()
            .map(|(term, members)| {
                let term_path =
                    root_path(&join_path([root_rendered.as_str(), &dash_spaces(term)]));
                let summary = TermSummary {
                    term: term.clone(),
                    page_count: members.len(),
                    permalink: self.config.full_url(&term_path),
                    root_path: term_path,
                };
                (term.clone(), summary)
            })
            .collect()
    }
}
