//! stanza — a markdown static site generator.
//!
//! Content lives as markdown files with TOML frontmatter; sections,
//! taxonomies, feeds, and a sitemap fall out of the directory structure.
//! `build` renders the whole site into the output directory; `serve` runs a
//! dev server with watch-and-rebuild over a temp output.

mod build;
mod cli;
mod config;
mod content;
mod generator;
mod logger;
mod markdown;
mod serve;
mod templates;
mod utils;
mod watch;

use crate::cli::{Cli, Commands};
use crate::config::SiteConfig;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::{env, process};

fn main() {
    if let Err(err) = run() {
        log!("error"; "{err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logger::set_verbose(cli.verbose);

    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Build { .. } => build::build_site(config),
        Commands::Serve { .. } => serve::serve_site(config),
    }
}

/// Load `stanza.toml` from the site root, layer CLI overrides, and leak to
/// `&'static` so template helper closures can capture the config.
fn load_config(cli: &Cli) -> Result<&'static SiteConfig> {
    let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("."));
    let path = root.join(&cli.config);

    let mut config = SiteConfig::from_path(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    config.set_root(&root);
    config.update_with_cli(cli);
    config.validate()?;

    if cli.is_serve() {
        // serve never touches the configured output directory
        let temp = env::temp_dir().join(format!("stanza-{}", process::id()));
        config.override_output(temp);
    }

    Ok(Box::leak(Box::new(config)))
}
