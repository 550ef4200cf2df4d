//! Network access for boundary, route and style data.

mod fetch;

pub use fetch::{FetchChannel, FetchKind, FetchResult};
