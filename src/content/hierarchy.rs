//! The content hierarchy: every ingested page, its parent linkage, and the
//! taxonomy index.
//!
//! Built fresh for each build: register all pages first, then [`finalize`]
//! computes parent links in a single pass (ingestion order is walkdir order
//! and must not affect the result) and fixes the date-descending sort orders
//! that feed and sitemap generation rely on. After `finalize` the hierarchy
//! is read-only apart from the lazily-filled children cache, and is discarded
//! with the build.
//!
//! [`finalize`]: ContentHierarchy::finalize

use crate::content::page::Page;
use crate::log;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

/// One registered page plus its computed parent path.
#[derive(Debug)]
struct Node {
    page: Page,
    /// Rendered path of the parent node; `None` until `finalize`, and for
    /// pages whose stripped-parent path has no registered node
    parent: Option<String>,
}

/// The full set of ingested content, keyed by rendered path.
#[derive(Debug, Default)]
pub struct ContentHierarchy {
    nodes: HashMap<String, Node>,
    /// Rendered paths in ingestion order; the stable tie-breaker for all
    /// date-descending sorts
    order: Vec<String>,
    /// Rendered paths sorted by descending publish date (set by `finalize`)
    by_date: Vec<String>,
    /// taxonomy name → term → member rendered paths (date-sorted by
    /// `finalize`)
    taxonomies: HashMap<String, BTreeMap<String, Vec<String>>>,
    /// taxonomy name → rendered path of its root page (last one wins)
    roots: HashMap<String, String>,
    /// Non-markdown files mirrored into the output: (relative, absolute)
    static_files: Vec<(String, PathBuf)>,
    /// Memoized children lists, filled on first lookup per path
    children: RwLock<HashMap<String, Arc<Vec<String>>>>,
}

impl ContentHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page under its rendered path and index its taxonomy terms.
    ///
    /// Two source documents resolving to the same rendered path is a content
    /// misconfiguration; the later registration wins and a warning is
    /// surfaced.
    pub fn add_page(&mut self, page: Page) {
        let rendered = page.rendered_path();

        if let Some(taxonomy) = page.taxonomy() {
            self.roots.insert(taxonomy.to_owned(), rendered.clone());
        }

        for (taxonomy, terms) in &page.front.taxonomies {
            let term_map = self.taxonomies.entry(taxonomy.clone()).or_default();
            for term in terms {
                term_map.entry(term.clone()).or_default().push(rendered.clone());
            }
        }

        let node = Node { page, parent: None };
        if let Some(previous) = self.nodes.insert(rendered.clone(), node) {
            log!(
                "warn";
                "duplicate rendered path \"{}\": \"{}\" overwrites an earlier page",
                rendered,
                previous.page.source_path
            );
        } else {
            self.order.push(rendered);
        }
    }

    /// Record a non-markdown file to mirror into the output tree.
    pub fn add_static_file(&mut self, relative: String, absolute: PathBuf) {
        self.static_files.push((relative, absolute));
    }

    pub fn static_files(&self) -> &[(String, PathBuf)] {
        &self.static_files
    }

    /// Compute every node's parent and fix all date-descending sort orders.
    ///
    /// A node's parent is the node registered at its own rendered path with
    /// the final segment removed — only if such a node exists; physical
    /// directory nesting alone never creates a parent.
    pub fn finalize(&mut self) {
        let links: Vec<(String, Option<String>)> = self
            .order
            .iter()
            .map(|path| {
                let candidate = parent_path(path);
                let parent = candidate.filter(|c| self.nodes.contains_key(c.as_str()));
                (path.clone(), parent)
            })
            .collect();
        for (path, parent) in links {
            if let Some(node) = self.nodes.get_mut(&path) {
                node.parent = parent;
            }
        }

        let mut by_date = self.order.clone();
        self.sort_by_date(&mut by_date);
        self.by_date = by_date;

        let sorted_terms: Vec<(String, String, Vec<String>)> = self
            .taxonomies
            .iter()
            .flat_map(|(taxonomy, terms)| {
                terms.iter().map(|(term, members)| {
                    let mut members = members.clone();
                    self.sort_by_date(&mut members);
                    (taxonomy.clone(), term.clone(), members)
                })
            })
            .collect();
        for (taxonomy, term, members) in sorted_terms {
            if let Some(term_map) = self.taxonomies.get_mut(&taxonomy) {
                term_map.insert(term, members);
            }
        }
    }

    /// Stable sort of rendered paths by descending publish date.
    ///
    /// Input order is the tie-breaker, so callers must pass paths in
    /// ingestion (or previously stable-sorted) order.
    fn sort_by_date(&self, paths: &mut [String]) {
        paths.sort_by_key(|p| {
            std::cmp::Reverse(self.nodes.get(p).map(|n| n.page.date_ms()).unwrap_or(0))
        });
    }

    pub fn get(&self, path: &str) -> Option<&Page> {
        self.nodes.get(path).map(|n| &n.page)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All pages in ingestion order; the deterministic generation walk.
    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.order.iter().filter_map(|p| self.get(p))
    }

    /// All pages sorted by descending publish date, stable. Feed and sitemap
    /// ordering depends on this.
    pub fn pages_by_date(&self) -> Vec<&Page> {
        self.by_date.iter().filter_map(|p| self.get(p)).collect()
    }

    pub fn parent_of(&self, path: &str) -> Option<&Page> {
        let parent = self.nodes.get(path)?.parent.as_ref()?;
        self.get(parent)
    }

    /// Memoized date-descending list of pages whose computed parent is
    /// `path`. First call computes and caches; the cache lives as long as
    /// the hierarchy.
    pub fn children_of(&self, path: &str) -> Vec<&Page> {
        let cached = self.children.read().get(path).cloned();
        let paths = match cached {
            Some(paths) => paths,
            None => {
                let mut child_paths: Vec<String> = self
                    .order
                    .iter()
                    .filter(|p| {
                        self.nodes
                            .get(p.as_str())
                            .is_some_and(|n| n.parent.as_deref() == Some(path))
                    })
                    .cloned()
                    .collect();
                self.sort_by_date(&mut child_paths);
                let child_paths = Arc::new(child_paths);
                self.children
                    .write()
                    .insert(path.to_owned(), Arc::clone(&child_paths));
                child_paths
            }
        };

        paths.iter().filter_map(|p| self.get(p)).collect()
    }

    /// The sibling after `path` in the parent's date-descending order.
    pub fn next_sibling(&self, parent: &str, path: &str) -> Option<&Page> {
        self.sibling_at(parent, path, 1)
    }

    /// The sibling before `path` in the parent's date-descending order.
    pub fn previous_sibling(&self, parent: &str, path: &str) -> Option<&Page> {
        self.sibling_at(parent, path, -1)
    }

    fn sibling_at(&self, parent: &str, path: &str, offset: isize) -> Option<&Page> {
        let children = self.children_of(parent);
        let index = children
            .iter()
            .position(|c| c.rendered_path() == path)? as isize;
        let sibling = index + offset;
        if sibling < 0 {
            return None;
        }
        children.get(sibling as usize).copied()
    }

    /// term → member paths for a taxonomy, alphabetical by term.
    pub fn terms_of(&self, taxonomy: &str) -> Option<&BTreeMap<String, Vec<String>>> {
        self.taxonomies.get(taxonomy)
    }

    /// Member pages of one term, date-descending.
    pub fn pages_for_term(&self, taxonomy: &str, term: &str) -> Vec<&Page> {
        self.taxonomies
            .get(taxonomy)
            .and_then(|terms| terms.get(term))
            .map(|paths| paths.iter().filter_map(|p| self.get(p)).collect())
            .unwrap_or_default()
    }

    /// The page marked as this taxonomy's root, if any.
    pub fn taxonomy_root_of(&self, taxonomy: &str) -> Option<&Page> {
        self.roots.get(taxonomy).and_then(|p| self.get(p))
    }
}

/// The parent candidate: the rendered path with its final segment removed.
///
/// Top-level pages resolve to the empty path (the site root); the root
/// itself has no candidate.
fn parent_path(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    match path.rsplit_once('/') {
        Some((dir, _)) => Some(dir.to_owned()),
        None => Some(String::new()),
    }
}
