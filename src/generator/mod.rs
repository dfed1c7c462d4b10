//! The page generator.
//!
//! Walks every page of a finalized [`ContentHierarchy`] and drives one of
//! three generation strategies:
//!
//! - **leaf** — a plain page, rendered once with sibling navigation when it
//!   has a parent;
//! - **listing** — a page with an index descriptor, expanded into pagination
//!   groups plus a redirect stub at `page/1/` when more than one group
//!   exists;
//! - **taxonomy root** — a listing whose descriptor names a taxonomy; the
//!   root renders as an overview page, then every term gets a synthesized
//!   ephemeral listing below it.
//!
//! Drafts are skipped entirely unless drafts are included. Every canonical
//! render registers its URL path; the collected list feeds the sitemap.
//! Redirect stubs never register. Any render failure aborts the build.

pub mod context;
pub mod feed;
pub mod paginate;
pub mod sitemap;
pub mod taxonomy;

use crate::config::SiteConfig;
use crate::content::{ContentHierarchy, FrontMatter, IndexMeta, Page};
use crate::generator::context::{
    ListingData, PageContext, PageData, RedirectData, TemplateData,
};
use crate::generator::paginate::{paginate_transform, single_group};
use crate::templates::{DEFAULT_TEMPLATE, REDIRECT_TEMPLATE, Templates};
use crate::utils::{dash_spaces, join_path, root_path, singularize, title_case};
use crate::vlog;
use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, FixedOffset, Utc};
use std::fs;
use std::path::PathBuf;

pub struct Generator<'a> {
    hierarchy: &'a ContentHierarchy,
    config: &'static SiteConfig,
    templates: &'a Templates,
    output: PathBuf,
    /// Build clock; the publish timestamp of synthesized term pages
    now: DateTime<FixedOffset>,
    /// Canonical `/`-wrapped paths of every non-redirect render, in emission
    /// order
    rendered_paths: Vec<String>,
}

impl<'a> Generator<'a> {
    pub fn new(
        hierarchy: &'a ContentHierarchy,
        config: &'static SiteConfig,
        templates: &'a Templates,
    ) -> Self {
        Self {
            hierarchy,
            config,
            templates,
            output: config.output_dir(),
            now: Utc::now().fixed_offset(),
            rendered_paths: Vec::new(),
        }
    }

    /// Generate every page, returning the canonical path registry for the
    /// sitemap.
    pub fn run(mut self) -> Result<Vec<String>> {
        for page in self.hierarchy.iter() {
            self.generate_page(page)?;
        }
        Ok(self.rendered_paths)
    }

    fn generate_page(&mut self, page: &Page) -> Result<()> {
        if page.is_draft() && !self.config.include_drafts {
            vlog!("build"; "skipping draft \"{}\"", page.source_path);
            return Ok(());
        }

        let template = self.resolve_template(page);
        if !self.templates.exists(&template) {
            bail!(
                "the template \"{template}\" for the page \"{}\" does not exist",
                page.source_path
            );
        }
        vlog!("build"; "generating \"{}\" with \"{template}\"", page.source_path);

        if let Some(taxonomy) = page.taxonomy() {
            let taxonomy = taxonomy.to_owned();
            self.generate_taxonomy_root(page, &taxonomy, &template)
        } else if page.is_listing() {
            let groups = self.child_groups(page);
            self.generate_listing(page, groups, &template)
        } else {
            self.generate_leaf(page, &template)
        }
    }

    /// Template precedence: the page's own override, then the parent index
    /// descriptor's child-page template, then the fixed default.
    fn resolve_template(&self, page: &Page) -> String {
        if !page.front.template.is_empty() {
            return page.front.template.clone();
        }

        if let Some(parent) = self.hierarchy.parent_of(&page.rendered_path()) {
            if let Some(index) = &parent.front.index {
                if !index.page_template.is_empty() {
                    return index.page_template.clone();
                }
            }
        }

        DEFAULT_TEMPLATE.to_owned()
    }

    fn generate_leaf(&mut self, page: &Page, template: &str) -> Result<()> {
        let rendered = page.rendered_path();
        let context = PageContext::new(page, self.config);

        let data = match self.hierarchy.parent_of(&rendered) {
            Some(parent) => {
                let parent_path = parent.rendered_path();
                let prev = self.hierarchy.previous_sibling(&parent_path, &rendered);
                let next = self.hierarchy.next_sibling(&parent_path, &rendered);
                PageData {
                    page: context,
                    prev: prev.map(Page::root_path).unwrap_or_default(),
                    next: next.map(Page::root_path).unwrap_or_default(),
                    prev_page: prev.map(|p| PageContext::new(p, self.config)),
                    next_page: next.map(|p| PageContext::new(p, self.config)),
                }
            }
            None => PageData::bare(context),
        };

        self.render(&TemplateData::Page(data), &rendered, template, true)
    }

    /// Pagination groups of a listing's children.
    fn child_groups(&self, page: &Page) -> Vec<Vec<PageContext>> {
        let children = self.hierarchy.children_of(&page.rendered_path());
        let paginate_by = page
            .front
            .index
            .as_ref()
            .map(|i| i.paginate_by)
            .unwrap_or(0);
        self.member_groups(&children, paginate_by)
    }

    /// No page size means one group holding everything, never zero groups.
    fn member_groups(&self, members: &[&Page], paginate_by: i64) -> Vec<Vec<PageContext>> {
        if paginate_by > 0 {
            paginate_transform(members, paginate_by, |p| PageContext::new(p, self.config))
        } else {
            single_group(members, |p| PageContext::new(p, self.config))
        }
    }

    /// Render a listing as its pagination groups.
    ///
    /// Group 1 lands at the listing's own path, group `k` at
    /// `<path>/page/<k>/`. When more than one group exists a redirect stub
    /// at `<path>/page/1/` points back at the canonical first page; the stub
    /// never registers for the sitemap.
    fn generate_listing(
        &mut self,
        page: &Page,
        groups: Vec<Vec<PageContext>>,
        template: &str,
    ) -> Result<()> {
        let listing_path = page.rendered_path();
        let listing_root = page.root_path();
        let total = groups.len();

        if total > 1 {
            let stub = join_path([listing_path.as_str(), "page", "1"]);
            let data = TemplateData::Redirect(RedirectData {
                target: self.config.full_url(&listing_root),
            });
            self.render(&data, &stub, REDIRECT_TEMPLATE, false)?;
        }

        let base = PageContext::new(page, self.config);
        for (index, pages) in groups.into_iter().enumerate() {
            let number = index + 1;
            let dest = if number == 1 {
                listing_path.clone()
            } else {
                join_path([listing_path.as_str(), "page", &number.to_string()])
            };

            let prev = match number {
                1 => String::new(),
                2 => listing_root.clone(),
                _ => format!("{listing_root}page/{}/", number - 1),
            };
            let next = if number < total {
                format!("{listing_root}page/{}/", number + 1)
            } else {
                String::new()
            };

            let data = TemplateData::Listing(ListingData {
                page: base.clone(),
                pages,
                prev,
                next,
                current_page: number,
                total_pages: total,
            });
            self.render(&data, &dest, template, true)?;
        }

        Ok(())
    }

    /// Render the root's overview page, then a synthesized listing per term.
    fn generate_taxonomy_root(
        &mut self,
        page: &Page,
        taxonomy: &str,
        template: &str,
    ) -> Result<()> {
        let overview = TemplateData::Page(PageData::bare(PageContext::new(page, self.config)));
        self.render(&overview, &page.rendered_path(), template, true)?;

        let Some(descriptor) = page.front.index.clone() else {
            return Ok(());
        };
        let Some(terms) = self.hierarchy.terms_of(taxonomy) else {
            return Ok(());
        };

        let singular = singularize(&title_case(taxonomy));
        let term_names: Vec<String> = terms.keys().cloned().collect();
        for term in &term_names {
            let members = self.hierarchy.pages_for_term(taxonomy, term);
            let term_page = self.synthesize_term_page(page, &descriptor, &singular, term);

            let term_template = self.resolve_template(&term_page);
            if !self.templates.exists(&term_template) {
                bail!(
                    "the template \"{term_template}\" for the page \"{}\" does not exist",
                    term_page.source_path
                );
            }

            let groups = self.member_groups(&members, descriptor.paginate_by);
            self.generate_listing(&term_page, groups, &term_template)?;
        }

        Ok(())
    }

    /// Build the ephemeral listing page for one taxonomy term.
    ///
    /// Title-cased term, a `"Tag: Rust"`-style description, the root's own
    /// descriptor, and the build clock as its date. It never joins the
    /// hierarchy; it exists only to drive listing generation.
    fn synthesize_term_page(
        &self,
        root: &Page,
        descriptor: &IndexMeta,
        taxonomy_singular: &str,
        term: &str,
    ) -> Page {
        let title = title_case(term);
        let front = FrontMatter {
            description: format!("{taxonomy_singular}: {title}"),
            title,
            template: descriptor.page_template.clone(),
            index: Some(descriptor.clone()),
            ..Default::default()
        };
        let summary = front.description.clone();

        Page {
            front,
            date: Some(self.now),
            html: String::new(),
            source_path: format!(
                "{}.md",
                join_path([root.rendered_path().as_str(), &dash_spaces(term)])
            ),
            summary,
        }
    }

    /// Render one output page at `<output>/<dest>/index.html`.
    ///
    /// Canonical renders register their `/`-wrapped path for the sitemap.
    fn render(
        &mut self,
        data: &TemplateData,
        dest: &str,
        template: &str,
        canonical: bool,
    ) -> Result<()> {
        let dir = self.output.join(dest);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let mut html = Vec::new();
        self.templates.render(template, data, &mut html)?;

        let file = dir.join("index.html");
        vlog!("build"; "writing \"{}\" to {}", data.path(), file.display());
        fs::write(&file, html)
            .with_context(|| format!("failed to write {}", file.display()))?;

        if canonical {
            self.rendered_paths.push(root_path(dest));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::taxonomy::TaxonomyViews;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    const LIST_TEMPLATE: &str = "{{ title }}|\
{% for p in pages %}[{{ p.title }}]{% endfor %}|\
prev={{ prev }}|next={{ next }}|{{ current_page }}/{{ total_pages }}";

    const LEAF_TEMPLATE: &str = "<h1>{{ title }}</h1>|prev={{ prev }}|next={{ next }}";

    #[derive(Debug)]
    struct Site {
        dir: TempDir,
        rendered: Vec<String>,
    }

    impl Site {
        fn out(&self, rel: &str) -> String {
            let path = self.dir.path().join("public").join(rel).join("index.html");
            std::fs::read_to_string(&path)
                .unwrap_or_else(|_| panic!("missing output {}", path.display()))
        }

        fn exists(&self, rel: &str) -> bool {
            self.dir
                .path()
                .join("public")
                .join(rel)
                .join("index.html")
                .is_file()
        }
    }

    fn build(pages: &[(&str, &str)], templates: &[(&str, &str)], drafts: bool) -> Result<Site> {
        let dir = TempDir::new().unwrap();
        let tpl_dir = dir.path().join("templates");
        std::fs::create_dir(&tpl_dir).unwrap();
        for (name, body) in templates {
            std::fs::write(tpl_dir.join(name), body).unwrap();
        }

        let mut config = SiteConfig {
            base_url: "https://example.com".to_owned(),
            include_drafts: drafts,
            ..Default::default()
        };
        config.override_output(dir.path().join("public"));
        let config: &'static SiteConfig = Box::leak(Box::new(config));

        let mut hierarchy = ContentHierarchy::new();
        for (path, raw) in pages {
            hierarchy.add_page(Page::parse(path, raw, false)?);
        }
        hierarchy.finalize();
        let hierarchy = Arc::new(hierarchy);

        let views = Arc::new(TaxonomyViews::new(Arc::clone(&hierarchy), config));
        let templates =
            Templates::load(&tpl_dir, config, Arc::clone(&hierarchy), views)?;

        let rendered =
            Generator::new(hierarchy.as_ref(), config, &templates).run()?;
        Ok(Site { dir, rendered })
    }

    fn default_templates() -> Vec<(&'static str, &'static str)> {
        vec![("default.html", LEAF_TEMPLATE), ("list.html", LIST_TEMPLATE)]
    }

    #[test]
    fn test_paginated_section_end_to_end() {
        let site = build(
            &[
                ("index.md", "+++\ntitle = \"Home\"\n+++\nWelcome."),
                (
                    "blog.md",
                    "+++\ntitle = \"Blog\"\ntemplate = \"list.html\"\n\
[index]\nsort_by = \"date\"\npaginate_by = 1\n+++\n",
                ),
                ("blog/a.md", "+++\ntitle = \"A\"\ndate = 2024-02-01\n+++\nA."),
                ("blog/b.md", "+++\ntitle = \"B\"\ndate = 2024-01-01\n+++\nB."),
            ],
            &default_templates(),
            false,
        )
        .unwrap();

        // root leaf
        assert!(site.out("").contains("<h1>Home</h1>"));

        // group 1 at the listing's own path: newest child, no prev
        let page1 = site.out("blog");
        assert!(page1.contains("[A]"));
        assert!(page1.contains("prev=|"));
        assert!(page1.contains("next=/blog/page/2/"));
        assert!(page1.contains("1/2"));

        // page/1 is a redirect back to the canonical listing URL
        let stub = site.out("blog/page/1");
        assert!(stub.contains("url=https://example.com/blog/"));

        // group 2: older child, prev is the listing's canonical URL
        let page2 = site.out("blog/page/2");
        assert!(page2.contains("[B]"));
        assert!(page2.contains("prev=/blog/"));
        assert!(page2.contains("next=|"));
        assert!(page2.contains("2/2"));

        // leaf navigation follows the date-descending sibling order
        assert!(site.out("blog/a").contains("next=/blog/b/"));
        assert!(site.out("blog/b").contains("prev=/blog/a/"));

        // the redirect stub never registers for the sitemap
        assert_eq!(
            site.rendered,
            vec!["/", "/blog/", "/blog/page/2/", "/blog/a/", "/blog/b/"]
        );
    }

    #[test]
    fn test_unpaginated_listing_is_single_group() {
        let site = build(
            &[
                (
                    "notes.md",
                    "+++\ntitle = \"Notes\"\ntemplate = \"list.html\"\n\
[index]\nsort_by = \"date\"\n+++\n",
                ),
                ("notes/x.md", "+++\ntitle = \"X\"\ndate = 2024-01-02\n+++\n"),
                ("notes/y.md", "+++\ntitle = \"Y\"\ndate = 2024-01-01\n+++\n"),
            ],
            &default_templates(),
            false,
        )
        .unwrap();

        let listing = site.out("notes");
        assert!(listing.contains("[X][Y]"));
        assert!(listing.contains("1/1"));
        assert!(!site.exists("notes/page/1"));
        assert!(!site.exists("notes/page/2"));
    }

    #[test]
    fn test_taxonomy_term_pagination() {
        let root = "+++\ntitle = \"Tags\"\n[index]\nsort_by = \"date\"\n\
paginate_by = 2\npage_template = \"list.html\"\ntaxonomy = \"tags\"\n+++\n";
        let tagged = |title: &str, date: &str| {
            format!(
                "+++\ntitle = \"{title}\"\ndate = {date}\n\
[taxonomies]\ntags = [\"rust\"]\n+++\nBody."
            )
        };

        let site = build(
            &[
                ("tags.md", root),
                ("one.md", &tagged("One", "2024-03-01")),
                ("two.md", &tagged("Two", "2024-02-01")),
                ("three.md", &tagged("Three", "2024-01-01")),
            ],
            &default_templates(),
            false,
        )
        .unwrap();

        // overview page renders as a plain page with the default template
        assert!(site.out("tags").contains("<h1>Tags</h1>"));

        // three members at page size two: two groups plus the redirect stub
        let first = site.out("tags/rust");
        assert!(first.contains("Rust|"));
        assert!(first.contains("[One][Two]"));
        assert!(first.contains("next=/tags/rust/page/2/"));

        assert!(site.out("tags/rust/page/1").contains("url=https://example.com/tags/rust/"));

        let second = site.out("tags/rust/page/2");
        assert!(second.contains("[Three]"));
        assert!(second.contains("prev=/tags/rust/"));
        assert!(second.contains("next=|"));

        assert!(site.rendered.contains(&"/tags/rust/".to_owned()));
        assert!(!site.rendered.contains(&"/tags/rust/page/1/".to_owned()));
    }

    #[test]
    fn test_synthesized_term_page_fields() {
        let root = "+++\n[index]\nsort_by = \"date\"\npage_template = \"x.html\"\n\
taxonomy = \"categories\"\n+++\n";
        let page = Page::parse("categories.md", root, false).unwrap();
        let descriptor = page.front.index.clone().unwrap();

        let config: &'static SiteConfig = Box::leak(Box::new(SiteConfig::default()));
        let hierarchy = ContentHierarchy::new();
        let views = Arc::new(TaxonomyViews::new(Arc::new(ContentHierarchy::new()), config));
        let templates = Templates::load(
            Path::new("/nonexistent"),
            config,
            Arc::new(ContentHierarchy::new()),
            views,
        )
        .unwrap();
        let generator = Generator::new(&hierarchy, config, &templates);

        let term = generator.synthesize_term_page(&page, &descriptor, "Category", "web dev");
        assert_eq!(term.front.title, "Web Dev");
        assert_eq!(term.front.description, "Category: Web Dev");
        assert_eq!(term.front.template, "x.html");
        assert_eq!(term.source_path, "categories/web-dev.md");
        assert_eq!(term.rendered_path(), "categories/web-dev");
        assert!(term.date.is_some());
    }

    #[test]
    fn test_drafts_skipped_unless_included() {
        let pages = [
            ("post.md", "+++\ntitle = \"Post\"\n+++\nBody."),
            ("secret.md", "+++\ntitle = \"Secret\"\ndraft = true\n+++\nShh."),
        ];

        let site = build(&pages, &default_templates(), false).unwrap();
        assert!(site.exists("post"));
        assert!(!site.exists("secret"));
        assert_eq!(site.rendered, vec!["/post/"]);

        let site = build(&pages, &default_templates(), true).unwrap();
        assert!(site.exists("secret"));
        assert!(site.rendered.contains(&"/secret/".to_owned()));
    }

    #[test]
    fn test_missing_template_is_fatal() {
        let err = build(
            &[("post.md", "+++\ntemplate = \"nope.html\"\n+++\n")],
            &default_templates(),
            false,
        )
        .unwrap_err();

        let message = format!("{err}");
        assert!(message.contains("\"nope.html\""));
        assert!(message.contains("\"post.md\""));
    }

    #[test]
    fn test_template_resolution_precedence() {
        let site = build(
            &[
                (
                    "blog.md",
                    "+++\ntemplate = \"list.html\"\n[index]\nsort_by = \"date\"\n\
page_template = \"post.html\"\n+++\n",
                ),
                ("blog/plain.md", "+++\ntitle = \"Plain\"\ndate = 2024-01-02\n+++\n"),
                (
                    "blog/special.md",
                    "+++\ntitle = \"Special\"\ndate = 2024-01-01\n\
template = \"special.html\"\n+++\n",
                ),
                ("orphan.md", "+++\ntitle = \"Orphan\"\n+++\n"),
            ],
            &[
                ("default.html", "default:{{ title }}"),
                ("list.html", "list:{{ pages | length }}"),
                ("post.html", "post:{{ title }}"),
                ("special.html", "special:{{ title }}"),
            ],
            false,
        )
        .unwrap();

        // parent's page_template applies to children without an override
        assert_eq!(site.out("blog/plain"), "post:Plain");
        // a page's own override wins over the parent's page_template
        assert_eq!(site.out("blog/special"), "special:Special");
        // no parent, no override: the fixed default
        assert_eq!(site.out("orphan"), "default:Orphan");
    }

    #[test]
    fn test_root_index_lands_at_output_root() {
        let site = build(
            &[("index.md", "+++\ntitle = \"Home\"\n+++\n")],
            &default_templates(),
            false,
        )
        .unwrap();

        assert!(site.exists(""));
        assert_eq!(site.rendered, vec!["/"]);
    }
}
