//! Viewer settings.
//!
//! Settings are persisted to localStorage so they survive page reloads.

use serde::{Deserialize, Serialize};

/// Layer visibility and label preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Show boundary outlines
    pub show_boundaries: bool,
    /// Show transit routes
    pub show_routes: bool,
    /// Show boundary labels
    pub boundary_labels: bool,
    /// Show route names next to every route, not just the selected one
    pub route_labels: bool,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            show_boundaries: true,
            show_routes: true,
            boundary_labels: false,
            route_labels: false,
        }
    }
}

impl ViewerSettings {
    /// localStorage key for persisting settings.
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "transit_map_viewer_settings";

    /// Parses stored settings, falling back to defaults on bad input.
    #[cfg(any(target_arch = "wasm32", test))]
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to parse viewer settings: {}", e);
                Self::default()
            }
        }
    }

    /// Load settings from localStorage.
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten())
        else {
            return Self::default();
        };

        match storage.get_item(Self::STORAGE_KEY) {
            Ok(Some(json)) => {
                log::info!("Loaded viewer settings from localStorage");
                Self::from_json(&json)
            }
            _ => Self::default(),
        }
    }

    /// Native builds have no localStorage; settings last for the session.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    /// Save settings to localStorage.
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten())
        else {
            return;
        };

        let json = match serde_json::to_string(self) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Failed to serialize viewer settings: {}", e);
                return;
            }
        };

        if let Err(e) = storage.set_item(Self::STORAGE_KEY, &json) {
            log::warn!("Failed to save viewer settings: {:?}", e);
        } else {
            log::debug!("Saved viewer settings to localStorage");
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        log::debug!("Viewer settings changed: {:?}", self);
    }
}
