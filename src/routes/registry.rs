//! In-memory route registry.
//!
//! Routes are keyed by id with uniqueness enforced on insert. Insertion
//! order is kept because it is also the draw order on the map (later
//! routes are painted on top).

use super::types::{bounds_of, parse_hex_color, Route, RoutePatch};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors raised by registry operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("route id must not be empty")]
    MissingId,
    #[error("route '{0}' already exists")]
    DuplicateId(String),
    #[error("route '{0}' not found")]
    NotFound(String),
    #[error("route '{id}' needs at least 2 points, got {count}")]
    TooFewPoints { id: String, count: usize },
    #[error("route '{id}' has invalid coordinate at index {index}: ({lon}, {lat})")]
    InvalidCoordinate {
        id: String,
        index: usize,
        lon: f64,
        lat: f64,
    },
    #[error("route '{id}' has invalid color '{color}'")]
    InvalidColor { id: String, color: String },
    #[error("route '{id}' has invalid line width {width}")]
    InvalidLineWidth { id: String, width: f64 },
}

pub type RouteResult<T> = Result<T, RouteError>;

/// Checks a route against the registry's invariants.
pub fn validate_route(route: &Route) -> RouteResult<()> {
    if route.id.trim().is_empty() {
        return Err(RouteError::MissingId);
    }

    if route.coordinates.len() < 2 {
        return Err(RouteError::TooFewPoints {
            id: route.id.clone(),
            count: route.coordinates.len(),
        });
    }

    for (index, &[lon, lat]) in route.coordinates.iter().enumerate() {
        if !is_valid_lon_lat(lon, lat) {
            return Err(RouteError::InvalidCoordinate {
                id: route.id.clone(),
                index,
                lon,
                lat,
            });
        }
    }

    if let Some(color) = &route.color {
        if parse_hex_color(color).is_none() {
            return Err(RouteError::InvalidColor {
                id: route.id.clone(),
                color: color.clone(),
            });
        }
    }

    if let Some(width) = route.line_width {
        if !width.is_finite() || width <= 0.0 {
            return Err(RouteError::InvalidLineWidth {
                id: route.id.clone(),
                width,
            });
        }
    }

    Ok(())
}

/// True for a finite WGS84 position.
pub fn is_valid_lon_lat(lon: f64, lat: f64) -> bool {
    lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat)
}

/// Keyed collection of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: HashMap<String, Route>,
    /// Ids in insertion order
    order: Vec<String>,
    /// Bumped on every successful mutation
    revision: u64,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new route. Fails if it is invalid or its id is taken.
    pub fn add_route(&mut self, route: Route) -> RouteResult<()> {
        validate_route(&route)?;

        if self.routes.contains_key(&route.id) {
            return Err(RouteError::DuplicateId(route.id));
        }

        log::debug!(
            "Adding route {} ({} points)",
            route.id,
            route.coordinates.len()
        );
        self.order.push(route.id.clone());
        self.routes.insert(route.id.clone(), route);
        self.revision += 1;
        Ok(())
    }

    /// Applies `patch` to an existing route. The id is preserved.
    pub fn update_route(&mut self, id: &str, patch: RoutePatch) -> RouteResult<&Route> {
        let current = self
            .routes
            .get(id)
            .ok_or_else(|| RouteError::NotFound(id.to_string()))?;

        let updated = patch.apply_to(current);
        validate_route(&updated)?;

        log::debug!("Updating route {}", id);
        self.revision += 1;
        let slot = self
            .routes
            .get_mut(id)
            .ok_or_else(|| RouteError::NotFound(id.to_string()))?;
        *slot = updated;
        Ok(slot)
    }

    /// Removes a route and returns it.
    pub fn remove_route(&mut self, id: &str) -> RouteResult<Route> {
        let route = self
            .routes
            .remove(id)
            .ok_or_else(|| RouteError::NotFound(id.to_string()))?;

        self.order.retain(|existing| existing != id);
        self.revision += 1;
        log::debug!("Removed route {}", id);
        Ok(route)
    }

    /// Replaces the whole registry with `routes`.
    ///
    /// The batch is validated up front; on error the registry is unchanged.
    pub fn replace_all(&mut self, routes: Vec<Route>) -> RouteResult<()> {
        let mut seen = HashSet::with_capacity(routes.len());
        for route in &routes {
            validate_route(route)?;
            if !seen.insert(route.id.as_str()) {
                return Err(RouteError::DuplicateId(route.id.clone()));
            }
        }

        self.order = routes.iter().map(|r| r.id.clone()).collect();
        self.routes = routes.into_iter().map(|r| (r.id.clone(), r)).collect();
        self.revision += 1;
        log::info!("Route registry replaced with {} route(s)", self.order.len());
        Ok(())
    }

    /// Adds new routes and overwrites existing ones with the same id,
    /// keeping their position. All-or-nothing, like [`Self::replace_all`].
    ///
    /// Returns how many of `routes` were new.
    pub fn upsert_all(&mut self, routes: Vec<Route>) -> RouteResult<usize> {
        let mut seen = HashSet::with_capacity(routes.len());
        for route in &routes {
            if !seen.insert(route.id.as_str()) {
                return Err(RouteError::DuplicateId(route.id.clone()));
            }
        }

        let mut merged: Vec<Route> = self.routes().cloned().collect();
        let mut added = 0;

        for route in routes {
            match merged.iter_mut().find(|r| r.id == route.id) {
                Some(slot) => *slot = route,
                None => {
                    merged.push(route);
                    added += 1;
                }
            }
        }

        self.replace_all(merged)?;
        Ok(added)
    }

    pub fn get_route(&self, id: &str) -> Option<&Route> {
        self.routes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.routes.contains_key(id)
    }

    /// Iterates routes in insertion order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.order.iter().filter_map(|id| self.routes.get(id))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn clear(&mut self) {
        if self.routes.is_empty() {
            return;
        }
        self.routes.clear();
        self.order.clear();
        self.revision += 1;
    }

    /// Mutation counter, used to detect when the map source is stale.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bounding box of every route as (min_lon, min_lat, max_lon, max_lat).
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        bounds_of(self.routes().flat_map(|r| r.coordinates.iter()))
    }
}
