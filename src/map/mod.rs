//! Map-side plumbing: the route data source, the deferred sync that feeds
//! it, and the base map style.

mod source;
mod style;
mod sync;

pub use source::{RenderRoute, RouteSource};
pub use style::MapStyle;
pub use sync::{SourceSync, SyncOutcome, SyncTiming};
