#![warn(clippy::all)]

//! Transit Map Viewer - A web-based transit route and boundary map viewer.
//!
//! This application draws bus/transit routes and administrative boundaries
//! on an interactive map. Routes live in an in-memory registry and are pushed
//! to the map's route source shortly after every change. Boundaries come from
//! a static GeoJSON file (reprojected from Statistics Canada Lambert when
//! needed) or an imported shapefile.

mod config;
mod file_ops;
mod geo;
mod map;
mod net;
mod routes;
mod state;
mod ui;

use config::AppConfig;
use eframe::egui;
use file_ops::{FilePickerChannel, ImportRequest, PickedFile};
use geo::BoundaryLayerSet;
use map::{MapStyle, RouteSource, SourceSync, SyncOutcome};
use net::{FetchChannel, FetchKind, FetchResult};
use routes::{parse_routes_payload, sample_routes, RoutePayloadError};
use state::AppState;
use std::time::Duration;
use web_time::Instant;

/// Layer name for the configured boundaries file.
const BOUNDARIES_LAYER: &str = "boundaries";

// Native entry point
#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    env_logger::init();

    let native_options = eframe::NativeOptions::default();

    eframe::run_native(
        "Transit Map Viewer",
        native_options,
        Box::new(|cc| Ok(Box::new(TransitMapApp::new(cc)))),
    )
}

// WASM entry point - main is not called on wasm32
#[cfg(target_arch = "wasm32")]
fn main() {}

/// Entry point for the WASM application.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub async fn start() {
    use eframe::wasm_bindgen::JsCast as _;

    // Redirect `log` messages to `console.log`:
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    let web_options = eframe::WebOptions::default();

    wasm_bindgen_futures::spawn_local(async {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document to attach to");
            return;
        };

        let Some(canvas) = document
            .get_element_by_id("app_canvas")
            .and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok())
        else {
            log::error!("Failed to find app_canvas");
            return;
        };

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(TransitMapApp::new(cc)))),
            )
            .await;

        // Remove the loading text once the app has loaded:
        if let Some(loading_text) = document.get_element_by_id("loading_text") {
            match start_result {
                Ok(_) => {
                    loading_text.remove();
                }
                Err(e) => {
                    loading_text.set_inner_html(
                        "<p>The app has crashed. See the developer console for details.</p>",
                    );
                    log::error!("Failed to start eframe: {e:?}");
                }
            }
        }
    });
}

/// Main application state and logic.
pub struct TransitMapApp {
    config: AppConfig,

    /// Application state containing all sub-states
    state: AppState,

    /// Channel for async file picker operations
    file_picker: FilePickerChannel,

    /// Channel for boundary, route and style fetches
    fetch_channel: FetchChannel,

    /// Boundary layers drawn under the routes
    boundaries: BoundaryLayerSet,

    /// The map's route data source, fed by `sync`
    route_source: RouteSource,

    /// Deferred registry-to-source push
    sync: SourceSync,

    style: MapStyle,

    /// Route to select once it shows up in the registry (from the URL)
    pending_selection: Option<String>,

    /// Last query string pushed to the URL
    last_url_query: String,

    /// Monotonic instant of last URL push (for throttling to ~1/sec).
    last_url_push: Instant,
}

impl TransitMapApp {
    /// Creates a new TransitMapApp instance and starts the initial fetches.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = AppConfig::from_env();
        let mut state = AppState::new();

        // Apply URL parameters (lat/lon/zoom, selected route)
        let url_params = state::url_state::parse_from_url();
        if let (Some(lat), Some(lon)) = (url_params.lat, url_params.lon) {
            state
                .view
                .recenter(lon, lat, url_params.zoom.unwrap_or(state.view.zoom));
        } else if let Some(zoom) = url_params.zoom {
            state.view.zoom = zoom.clamp(geo::MIN_ZOOM, geo::MAX_ZOOM);
        }

        let mut fetch_channel = FetchChannel::new();
        fetch_channel.fetch_style(&cc.egui_ctx, &config.style_url);
        fetch_channel.fetch_boundaries(&cc.egui_ctx, &config.boundaries_url);

        match config.routes_url.as_deref() {
            Some(url) => fetch_channel.fetch_routes(&cc.egui_ctx, url),
            None => {
                if let Err(e) = state.replace_routes(sample_routes()) {
                    log::error!("Sample routes rejected: {}", e);
                }
            }
        }

        let mut app = Self {
            style: MapStyle::placeholder(config.style_url.clone()),
            sync: SourceSync::new(config.sync_timing),
            config,
            state,
            file_picker: FilePickerChannel::new(),
            fetch_channel,
            boundaries: BoundaryLayerSet::new(),
            route_source: RouteSource::new(),
            pending_selection: url_params.route,
            last_url_query: String::new(),
            last_url_push: Instant::now(),
        };
        app.apply_pending_selection();
        app
    }

    fn apply_pending_selection(&mut self) {
        let Some(id) = self.pending_selection.as_deref() else {
            return;
        };
        if self.state.registry.contains(id) {
            self.state.select_route(self.pending_selection.take());
        }
    }

    fn handle_fetch_result(&mut self, result: FetchResult) {
        let FetchResult { kind, url, body } = result;

        let text = match body {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to fetch {} from {}: {}", kind.label(), url, e);
                if kind != FetchKind::Style {
                    self.state.status_message = format!("Failed to load {}: {}", kind.label(), e);
                }
                return;
            }
        };

        match kind {
            FetchKind::Style => match MapStyle::from_json(url, &text) {
                Ok(style) => {
                    log::info!("Map style loaded: {}", style.display_name());
                    self.style = style;
                }
                Err(e) => log::warn!("Map style is not valid JSON, keeping defaults: {}", e),
            },
            FetchKind::Boundaries => {
                match self.boundaries.load_geojson_layer(
                    BOUNDARIES_LAYER,
                    &text,
                    self.config.boundaries_crs,
                ) {
                    Ok(count) => {
                        log::info!("Loaded {} boundary feature(s) from {}", count, url);
                        self.state.status_message = format!("Loaded {} boundaries", count);
                    }
                    Err(e) => {
                        log::error!("Failed to load boundaries from {}: {}", url, e);
                        self.state.status_message = format!("Bad boundaries file: {}", e);
                    }
                }
            }
            FetchKind::Routes => {
                let result = parse_routes_payload(&text)
                    .map_err(|e| e.to_string())
                    .and_then(|routes| {
                        self.state
                            .replace_routes(routes)
                            .map_err(|e| e.to_string())
                    });
                match result {
                    Ok(()) => {
                        log::info!(
                            "Loaded {} route(s) from {}",
                            self.state.registry.len(),
                            url
                        );
                        self.state.status_message =
                            format!("Loaded {} routes", self.state.registry.len());
                        self.apply_pending_selection();
                    }
                    Err(e) => {
                        log::error!("Rejected route payload from {}: {}", url, e);
                        self.state.status_message = format!("Bad route data: {}", e);
                    }
                }
            }
        }
    }

    fn handle_picked_files(&mut self, files: Vec<PickedFile>) {
        let request = match file_ops::classify_files(&files, self.config.boundaries_crs) {
            Ok(request) => request,
            Err(e) => {
                self.state.status_message = e;
                return;
            }
        };

        match request {
            ImportRequest::Json { name, text } => self.import_json(name, &text),
            ImportRequest::Shapefile {
                name,
                shp,
                dbf,
                crs,
            } => match self
                .boundaries
                .load_shapefile_layer(layer_name(name), shp, dbf, crs)
            {
                Ok(count) => {
                    log::info!("Imported {} feature(s) from {} ({})", count, name, crs.label());
                    self.state.status_message = format!("Imported {} boundaries", count);
                    if let Some(bounds) = self
                        .boundaries
                        .get(layer_name(name))
                        .and_then(|l| l.bounds())
                    {
                        self.state.view.request_fit(bounds);
                    }
                }
                Err(e) => {
                    log::error!("Failed to import {}: {}", name, e);
                    self.state.status_message = format!("Failed to import {}: {}", name, e);
                }
            },
        }
    }

    /// Imports a JSON file as routes when it parses as routes, otherwise as
    /// a boundary layer.
    fn import_json(&mut self, name: &str, text: &str) {
        match parse_routes_payload(text) {
            Ok(routes) if !routes.is_empty() => {
                let incoming = routes.len();
                match self.state.upsert_routes(routes) {
                    Ok(added) => {
                        log::info!(
                            "Imported {} route(s) from {} ({} new)",
                            incoming,
                            name,
                            added
                        );
                        self.state.status_message =
                            format!("Imported {} routes ({} new)", incoming, added);
                        if let Some(bounds) = self.state.registry.bounds() {
                            self.state.view.request_fit(bounds);
                        }
                    }
                    Err(e) => {
                        log::error!("Rejected routes in {}: {}", name, e);
                        self.state.status_message = format!("Rejected {}: {}", name, e);
                    }
                }
                return;
            }
            Err(RoutePayloadError::Json(e)) => {
                self.state.status_message = format!("{} is not valid JSON: {}", name, e);
                return;
            }
            _ => {}
        }

        let layer = layer_name(name);
        match self
            .boundaries
            .load_geojson_layer(layer, text, self.config.boundaries_crs)
        {
            Ok(count) => {
                log::info!("Imported {} boundary feature(s) from {}", count, name);
                self.state.status_message = format!("Imported {} boundaries", count);
                if let Some(bounds) = self.boundaries.get(layer).and_then(|l| l.bounds()) {
                    self.state.view.request_fit(bounds);
                }
            }
            Err(e) => {
                log::error!("Failed to import {}: {}", name, e);
                self.state.status_message = format!("Failed to import {}: {}", name, e);
            }
        }
    }

    fn drive_sync(&mut self, ctx: &egui::Context) {
        let now = Instant::now();

        if self.state.take_routes_dirty() {
            self.sync.schedule(now);
        }

        match self
            .sync
            .poll(now, &self.state.registry, &mut self.route_source)
        {
            SyncOutcome::GaveUp => {
                self.state.status_message = "Map is not ready; route changes not shown".to_string();
            }
            SyncOutcome::Idle
            | SyncOutcome::Waiting
            | SyncOutcome::Pushed { .. }
            | SyncOutcome::Retrying { .. } => {}
        }

        if let Some(deadline) = self.sync.next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }
    }

    fn push_url_state(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_url_push) < Duration::from_secs(1) {
            return;
        }
        let Some(rect) = self.state.view.screen_rect else {
            return;
        };

        let (lon, lat) = self.state.view.visible_center(rect);
        let zoom = self.state.view.zoom;
        let route = self.state.selected_route.as_deref();
        let query = state::url_state::format_query(lat, lon, zoom, route);
        if query != self.last_url_query {
            self.last_url_push = now;
            state::url_state::push_to_url(lat, lon, zoom, route);
            self.last_url_query = query;
        }
    }
}

/// File name without its extension, used as the layer name.
fn layer_name(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(file_name)
}

impl eframe::App for TransitMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for completed fetches
        while let Some(result) = self.fetch_channel.try_recv() {
            self.handle_fetch_result(result);
        }

        // Check for completed file pick operations
        if let Some(result) = self.file_picker.try_recv() {
            self.state.import_in_progress = false;
            match result {
                Some(files) if !files.is_empty() => self.handle_picked_files(files),
                _ => {
                    self.state.status_message = "File selection cancelled".to_string();
                }
            }
        }

        if std::mem::take(&mut self.state.reload_requested) {
            if let Some(url) = self.config.routes_url.clone() {
                self.fetch_channel.fetch_routes(ctx, &url);
                self.state.status_message = "Reloading routes...".to_string();
            }
        }

        // Render UI panels in the correct order for egui layout
        // Side and top/bottom panels must be rendered before CentralPanel
        ui::render_top_bar(
            ctx,
            &self.state,
            &self.style,
            self.fetch_channel.in_flight() > 0,
        );
        ui::render_left_panel(
            ctx,
            &mut self.state,
            &self.file_picker,
            self.config.routes_url.is_some(),
        );
        ui::render_right_panel(ctx, &mut self.state, &mut self.boundaries);
        ui::render_canvas(
            ctx,
            &mut self.state,
            &self.style,
            &self.boundaries,
            &mut self.route_source,
        );

        // Push after the canvas has attached the source this frame
        self.drive_sync(ctx);

        self.push_url_state();
    }
}
