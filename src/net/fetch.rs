//! HTTP fetch of boundaries, route data and the map style.
//!
//! Uses channel-based communication to bridge async fetches with egui's
//! synchronous update loop: requests run on a worker thread (native) or a
//! spawned future (WASM) and their results are drained with `try_recv`.

use eframe::egui;
use std::sync::mpsc::{channel, Receiver, Sender};
use thiserror::Error;

/// Errors raised by a fetch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {status_text}")]
    Status { status: u16, status_text: String },
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid URL '{0}'")]
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    InvalidUrl(String),
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Request(e.to_string())
    }
}

/// What a fetch was for, so the app knows how to decode the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Boundaries,
    Routes,
    Style,
}

impl FetchKind {
    pub fn label(&self) -> &'static str {
        match self {
            FetchKind::Boundaries => "boundaries",
            FetchKind::Routes => "routes",
            FetchKind::Style => "map style",
        }
    }
}

/// Completed fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub kind: FetchKind,
    pub url: String,
    pub body: Result<String, FetchError>,
}

/// Channel-based fetcher.
pub struct FetchChannel {
    sender: Sender<FetchResult>,
    receiver: Receiver<FetchResult>,
    in_flight: usize,
}

impl Default for FetchChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchChannel {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Fetches the static boundaries file.
    pub fn fetch_boundaries(&mut self, ctx: &egui::Context, url: &str) {
        self.spawn(ctx, FetchKind::Boundaries, url);
    }

    /// Fetches route records from a route endpoint.
    pub fn fetch_routes(&mut self, ctx: &egui::Context, url: &str) {
        self.spawn(ctx, FetchKind::Routes, url);
    }

    /// Fetches the map style document.
    pub fn fetch_style(&mut self, ctx: &egui::Context, url: &str) {
        self.spawn(ctx, FetchKind::Style, url);
    }

    /// Number of fetches that have not been received yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Non-blocking check for a completed fetch.
    pub fn try_recv(&mut self) -> Option<FetchResult> {
        let result = self.receiver.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(result)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn(&mut self, ctx: &egui::Context, kind: FetchKind, url: &str) {
        log::info!("Fetching {} from {}", kind.label(), url);
        self.in_flight += 1;

        let sender = self.sender.clone();
        let ctx = ctx.clone();
        let url = url.to_string();

        std::thread::spawn(move || {
            let body = fetch_text_blocking(&url);
            let _ = sender.send(FetchResult { kind, url, body });
            ctx.request_repaint();
        });
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn(&mut self, ctx: &egui::Context, kind: FetchKind, url: &str) {
        log::info!("Fetching {} from {}", kind.label(), url);
        self.in_flight += 1;

        let sender = self.sender.clone();
        let ctx = ctx.clone();
        let url = url.to_string();

        wasm_bindgen_futures::spawn_local(async move {
            let body = fetch_text(&url).await;
            let _ = sender.send(FetchResult { kind, url, body });
            ctx.request_repaint();
        });
    }
}

/// True for URLs that need HTTP rather than a local read.
pub fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Resolves `url` against `base` when it is relative.
#[cfg(any(target_arch = "wasm32", test))]
pub fn resolve_url(base: Option<&str>, url: &str) -> Result<String, FetchError> {
    if is_remote(url) {
        return Ok(url.to_string());
    }

    let base = base.ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;
    reqwest::Url::parse(base)
        .and_then(|b| b.join(url))
        .map(|u| u.to_string())
        .map_err(|_| FetchError::InvalidUrl(url.to_string()))
}

/// Maps a non-success status to an error carrying its reason phrase.
pub fn check_status(status: reqwest::StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    Err(FetchError::Status {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
    })
}

/// Fetches text over HTTP, or reads a local file for non-URL paths.
#[cfg(not(target_arch = "wasm32"))]
pub fn fetch_text_blocking(url: &str) -> Result<String, FetchError> {
    if !is_remote(url) {
        return std::fs::read_to_string(url).map_err(|e| FetchError::Io {
            path: url.to_string(),
            message: e.to_string(),
        });
    }

    let response = reqwest::blocking::get(url)?;
    check_status(response.status())?;
    let text = response.text()?;
    log::info!("Fetched {} bytes from {}", text.len(), url);
    Ok(text)
}

/// Fetches text over HTTP from the browser, resolving relative URLs
/// against the page location.
#[cfg(target_arch = "wasm32")]
pub async fn fetch_text(url: &str) -> Result<String, FetchError> {
    let base = web_sys::window().and_then(|w| w.location().href().ok());
    let resolved = resolve_url(base.as_deref(), url)?;

    let response = reqwest::get(&resolved).await?;
    check_status(response.status())?;
    let text = response.text().await?;
    log::info!("Fetched {} bytes from {}", text.len(), resolved);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status() {
        assert!(check_status(reqwest::StatusCode::OK).is_ok());
        assert_eq!(
            check_status(reqwest::StatusCode::NOT_FOUND),
            Err(FetchError::Status {
                status: 404,
                status_text: "Not Found".to_string()
            })
        );
        let err = check_status(reqwest::StatusCode::SERVICE_UNAVAILABLE).unwrap_err();
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url(None, "https://example.com/a.json").unwrap(),
            "https://example.com/a.json"
        );
        assert_eq!(
            resolve_url(Some("https://example.com/app/index.html"), "data/b.geojson").unwrap(),
            "https://example.com/app/data/b.geojson"
        );
        assert_eq!(
            resolve_url(Some("https://example.com/app/"), "/data/b.geojson").unwrap(),
            "https://example.com/data/b.geojson"
        );
        assert!(matches!(
            resolve_url(None, "data/b.geojson"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_reads_local_files() {
        let path = std::env::temp_dir().join("transit-map-viewer-fetch-test.json");
        std::fs::write(&path, "[]").unwrap();
        let text = fetch_text_blocking(path.to_str().unwrap()).unwrap();
        assert_eq!(text, "[]");
        let _ = std::fs::remove_file(&path);

        assert!(matches!(
            fetch_text_blocking("/definitely/not/here.geojson"),
            Err(FetchError::Io { .. })
        ));
    }
}
