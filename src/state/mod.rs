//! Application state management.
//!
//! This module contains all state structures used throughout the application.
//! State is organized into logical groupings that correspond to different
//! areas of functionality.

mod route_form;
mod settings;
pub mod url_state;
mod view;

pub use route_form::{RouteEditor, RouteForm};
pub use settings::ViewerSettings;
pub use view::ViewState;

use crate::routes::{Route, RoutePatch, RouteRegistry, RouteResult};

/// Root application state containing all sub-states.
#[derive(Default)]
pub struct AppState {
    /// Routes known to the app; the map is fed from here
    pub registry: RouteRegistry,

    /// Currently selected route id
    pub selected_route: Option<String>,

    /// Canvas view (center, zoom, pan)
    pub view: ViewState,

    /// Persisted layer and label preferences
    pub settings: ViewerSettings,

    /// "Add route" form fields
    pub route_form: RouteForm,

    /// Edit buffer for the selected route
    pub route_editor: Option<RouteEditor>,

    /// Application status message displayed in top bar
    pub status_message: String,

    /// Set when the file picker is open
    pub import_in_progress: bool,

    /// Set by the UI; consumed by the app update loop
    pub reload_requested: bool,

    /// Set on every registry mutation until the app schedules a map push
    routes_dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            settings: ViewerSettings::load(),
            status_message: "Ready".to_string(),
            ..Default::default()
        }
    }

    /// Adds a route and selects it.
    pub fn add_route(&mut self, route: Route) -> RouteResult<()> {
        let id = route.id.clone();
        self.registry.add_route(route)?;
        self.routes_dirty = true;
        self.select_route(Some(id));
        Ok(())
    }

    pub fn update_route(&mut self, id: &str, patch: RoutePatch) -> RouteResult<()> {
        self.registry.update_route(id, patch)?;
        self.routes_dirty = true;
        self.refresh_editor();
        Ok(())
    }

    pub fn remove_route(&mut self, id: &str) -> RouteResult<Route> {
        let removed = self.registry.remove_route(id)?;
        self.routes_dirty = true;
        if self.selected_route.as_deref() == Some(id) {
            self.select_route(None);
        }
        Ok(removed)
    }

    /// Replaces every route, keeping the selection when it survives.
    pub fn replace_routes(&mut self, routes: Vec<Route>) -> RouteResult<()> {
        self.registry.replace_all(routes)?;
        self.routes_dirty = true;
        let keep = self
            .selected_route
            .as_deref()
            .is_some_and(|id| self.registry.contains(id));
        if !keep {
            self.select_route(None);
        } else {
            self.refresh_editor();
        }
        Ok(())
    }

    /// Merges imported routes into the registry. Returns how many were new.
    pub fn upsert_routes(&mut self, routes: Vec<Route>) -> RouteResult<usize> {
        let added = self.registry.upsert_all(routes)?;
        self.routes_dirty = true;
        self.refresh_editor();
        Ok(added)
    }

    /// Changes the selection and loads the editor for it.
    pub fn select_route(&mut self, id: Option<String>) {
        self.selected_route = id.filter(|id| self.registry.contains(id));
        self.refresh_editor();
    }

    /// Returns whether the registry changed since the last call.
    pub fn take_routes_dirty(&mut self) -> bool {
        std::mem::take(&mut self.routes_dirty)
    }

    fn refresh_editor(&mut self) {
        self.route_editor = self
            .selected_route
            .as_deref()
            .and_then(|id| self.registry.get_route(id))
            .map(RouteEditor::for_route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::sample_routes;

    fn state() -> AppState {
        let mut state = AppState::default();
        state.replace_routes(sample_routes()).unwrap();
        state.take_routes_dirty();
        state
    }

    #[test]
    fn test_mutations_mark_routes_dirty() {
        let mut state = state();
        assert!(!state.take_routes_dirty());

        let route = Route::new("r3", "Third", vec![[-75.7, 45.4], [-75.6, 45.5]]);
        state.add_route(route).unwrap();
        assert!(state.take_routes_dirty());
        assert!(!state.take_routes_dirty());

        state.remove_route("r3").unwrap();
        assert!(state.take_routes_dirty());
    }

    #[test]
    fn test_failed_mutation_is_not_dirty() {
        let mut state = state();
        assert!(state.remove_route("missing").is_err());
        assert!(!state.take_routes_dirty());
    }

    #[test]
    fn test_selection_follows_registry() {
        let mut state = state();
        state.select_route(Some("route-1".to_string()));
        assert_eq!(
            state.route_editor.as_ref().map(|e| e.route_id.as_str()),
            Some("route-1")
        );

        state.select_route(Some("nope".to_string()));
        assert!(state.selected_route.is_none());
        assert!(state.route_editor.is_none());

        state.select_route(Some("route-2".to_string()));
        state.remove_route("route-2").unwrap();
        assert!(state.selected_route.is_none());
    }

    #[test]
    fn test_update_refreshes_editor() {
        let mut state = state();
        state.select_route(Some("route-1".to_string()));
        let patch = RoutePatch {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        state.update_route("route-1", patch).unwrap();
        assert_eq!(state.route_editor.as_ref().unwrap().name, "Renamed");
        assert_eq!(state.registry.get_route("route-1").unwrap().id, "route-1");
    }
}
