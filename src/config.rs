//! Application configuration from the environment.
//!
//! Native builds read the process environment at start-up. WASM builds have
//! no process environment, so the same variables are baked in at compile
//! time with `option_env!`.

use crate::geo::Crs;
use crate::map::SyncTiming;
use std::time::Duration;

/// Public MapLibre demo style, used when no style URL is configured.
pub const DEFAULT_STYLE_URL: &str = "https://demotiles.maplibre.org/style.json";

/// Static boundaries file served alongside the app.
pub const DEFAULT_BOUNDARIES_URL: &str = "data/boundaries.geojson";

const STYLE_URL_VAR: &str = "TRANSIT_MAP_STYLE_URL";
const BOUNDARIES_URL_VAR: &str = "TRANSIT_MAP_BOUNDARIES_URL";
const BOUNDARIES_CRS_VAR: &str = "TRANSIT_MAP_BOUNDARIES_CRS";
const ROUTES_URL_VAR: &str = "TRANSIT_MAP_ROUTES_URL";
const SYNC_DELAY_VAR: &str = "TRANSIT_MAP_SYNC_DELAY_MS";
const SYNC_RETRY_VAR: &str = "TRANSIT_MAP_SYNC_RETRY_MS";

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Map style document URL
    pub style_url: String,
    /// Boundaries GeoJSON URL (or file path on native)
    pub boundaries_url: String,
    /// Forces the boundaries CRS instead of reading it from the file
    pub boundaries_crs: Option<Crs>,
    /// Route endpoint; sample routes are shown when unset
    pub routes_url: Option<String>,
    /// Timing for pushing route updates to the map
    pub sync_timing: SyncTiming,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            style_url: DEFAULT_STYLE_URL.to_string(),
            boundaries_url: DEFAULT_BOUNDARIES_URL.to_string(),
            boundaries_crs: None,
            routes_url: None,
            sync_timing: SyncTiming::default(),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from the environment.
    pub fn from_env() -> Self {
        let config = Self::from_lookup(env_lookup);
        log::info!(
            "Config: style={} boundaries={} routes={}",
            config.style_url,
            config.boundaries_url,
            config.routes_url.as_deref().unwrap_or("<sample data>")
        );
        config
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = SyncTiming::default();
        let millis = |name: &str, default: Duration| match get(name) {
            Some(v) => match v.parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    log::warn!("Ignoring {}={:?}: not a number of milliseconds", name, v);
                    default
                }
            },
            None => default,
        };

        let boundaries_crs = get(BOUNDARIES_CRS_VAR).and_then(|name| {
            let crs = Crs::from_name(&name);
            if crs.is_none() {
                log::warn!("Ignoring unknown {}={:?}", BOUNDARIES_CRS_VAR, name);
            }
            crs
        });

        Self {
            style_url: get(STYLE_URL_VAR).unwrap_or_else(|| DEFAULT_STYLE_URL.to_string()),
            boundaries_url: get(BOUNDARIES_URL_VAR)
                .unwrap_or_else(|| DEFAULT_BOUNDARIES_URL.to_string()),
            boundaries_crs,
            routes_url: get(ROUTES_URL_VAR),
            sync_timing: SyncTiming {
                update_delay: millis(SYNC_DELAY_VAR, defaults.update_delay),
                retry_delay: millis(SYNC_RETRY_VAR, defaults.retry_delay),
                max_retries: defaults.max_retries,
            },
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().or_else(|| compile_time_value(name))
}

#[cfg(target_arch = "wasm32")]
fn env_lookup(name: &str) -> Option<String> {
    compile_time_value(name)
}

fn compile_time_value(name: &str) -> Option<String> {
    let value = match name {
        STYLE_URL_VAR => option_env!("TRANSIT_MAP_STYLE_URL"),
        BOUNDARIES_URL_VAR => option_env!("TRANSIT_MAP_BOUNDARIES_URL"),
        BOUNDARIES_CRS_VAR => option_env!("TRANSIT_MAP_BOUNDARIES_CRS"),
        ROUTES_URL_VAR => option_env!("TRANSIT_MAP_ROUTES_URL"),
        SYNC_DELAY_VAR => option_env!("TRANSIT_MAP_SYNC_DELAY_MS"),
        SYNC_RETRY_VAR => option_env!("TRANSIT_MAP_SYNC_RETRY_MS"),
        _ => None,
    };
    value.map(str::to_string)
}
