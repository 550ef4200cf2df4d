//! UI modules for the transit map viewer.
//!
//! The UI is split into distinct panels:
//! - Top bar: Title, map style and status
//! - Left panel: Route list, add-route form, import and reload
//! - Central canvas: Boundaries and routes
//! - Right panel: Layer toggles and the selected route

mod canvas;
mod left_panel;
mod right_panel;
mod top_bar;

pub use canvas::render_canvas;
pub use left_panel::render_left_panel;
pub use right_panel::render_right_panel;
pub use top_bar::render_top_bar;
