//! Development server with live reload support.
//!
//! A lightweight HTTP server over the build output, built on `tiny_http`:
//!
//! - static file serving from a per-process temp output directory
//! - automatic `index.html` resolution for directories
//! - a reload counter at `/__stanza/reload`, polled by clients and bumped
//!   by the watcher after each successful rebuild
//! - graceful shutdown on Ctrl+C, removing the temp output
//!
//! The watcher runs on its own thread (`watch` module); rebuilds that finish
//! before the server is accepting requests never bump the counter.

use crate::{build::build_site, config::SiteConfig, log, watch::watch_for_changes_blocking};
use anyhow::{Context, Result};
use std::{
    fs,
    net::SocketAddr,
    path::{Component, Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Endpoint clients poll for the rebuild counter.
const RELOAD_ENDPOINT: &str = "/__stanza/reload";

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Reload State
// ============================================================================

/// Rebuild notification state shared between the server and the watcher.
///
/// The counter only moves once the server is marked live, so rebuilds racing
/// server startup cannot trigger a client reload of a half-served site.
pub struct ReloadState {
    started: AtomicBool,
    stopping: AtomicBool,
    counter: AtomicUsize,
}

impl ReloadState {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            counter: AtomicUsize::new(0),
        }
    }

    /// Mark the server as accepting requests.
    pub fn mark_started(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    /// Ask the watcher loop to exit.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Record a successful rebuild. No-op until the server is live.
    pub fn notify(&self) {
        if self.started.load(Ordering::SeqCst) {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn counter(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Default for ReloadState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Server Entry Point
// ============================================================================

/// Build the site, start the watcher, and serve until Ctrl+C.
///
/// Expects the config's output already overridden to the temp directory by
/// `main`; the directory is removed on shutdown.
pub fn serve_site(config: &'static SiteConfig) -> Result<()> {
    build_site(config)?;

    let reload = Arc::new(ReloadState::new());

    let watcher_reload = Arc::clone(&reload);
    let watcher = std::thread::spawn(move || {
        if let Err(err) = watch_for_changes_blocking(config, watcher_reload) {
            log!("watch"; "{err:#}");
        }
    });

    let interface: std::net::IpAddr = config
        .serve
        .interface
        .parse()
        .with_context(|| format!("invalid interface {}", config.serve.interface))?;
    let (server, addr) = try_bind_port(interface, config.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    let reload_for_signal = Arc::clone(&reload);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        reload_for_signal.stop();
        server_for_signal.unblock();
    })
    .context("failed to set Ctrl+C handler")?;

    log!("serve"; "http://{addr}");
    reload.mark_started();

    let serve_root = config.output_dir();
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &serve_root, &reload) {
            log!("serve"; "request error: {e}");
        }
    }

    // Let any in-flight rebuild finish before its output is removed.
    reload.stop();
    watcher.join().ok();
    fs::remove_dir_all(&serve_root).ok();
    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(
    interface: std::net::IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(Server, SocketAddr)> {
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {base_port} in use, using {port} instead");
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < max_retries => {
                continue;
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to bind after {max_retries} attempts (ports {base_port}-{port}): {e}"
                ));
            }
        }
    }
    unreachable!()
}

// ============================================================================
// Request Handling
// ============================================================================

/// Handle a single HTTP request.
///
/// Resolution order: reload endpoint → exact file → directory `index.html`
/// → 404.
fn handle_request(request: Request, serve_root: &Path, reload: &ReloadState) -> Result<()> {
    if request.url().starts_with(RELOAD_ENDPOINT) {
        let response = Response::from_string(reload.counter().to_string())
            .with_header(Header::from_bytes("Content-Type", "text/plain").unwrap());
        request.respond(response)?;
        return Ok(());
    }

    match resolve_path(serve_root, request.url()) {
        Some(path) => serve_file(request, &path),
        None => serve_not_found(request),
    }
}

/// Map a request URL to a file under the serve root.
///
/// URL-encoded characters are decoded and the query string stripped before
/// resolving; directories resolve to their `index.html`.
fn resolve_path(serve_root: &Path, url: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(url)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    let without_query = decoded.split('?').next().unwrap_or(&decoded);
    let request_path = without_query.trim_matches('/');

    // Reject anything that could escape the serve root.
    let relative = Path::new(request_path);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let local = serve_root.join(relative);
    if local.is_file() {
        return Some(local);
    }
    if local.is_dir() {
        let index = local.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }
    None
}

// ============================================================================
// Response Helpers
// ============================================================================

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let content_type = guess_content_type(path);

    let response = Response::from_data(content)
        .with_header(Header::from_bytes("Content-Type", content_type).unwrap());

    request.respond(response)?;
    Ok(())
}

/// Serve 404 Not Found response.
fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::from_string("404 Not Found")
        .with_status_code(StatusCode(404))
        .with_header(Header::from_bytes("Content-Type", "text/plain").unwrap());
    request.respond(response)?;
    Ok(())
}

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",

        _ => "application/octet-stream",
    }
}
