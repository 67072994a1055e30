// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod events;
pub mod feed;
pub mod overlay;
pub mod reading;
pub mod state;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::Config;
pub use crate::feed::Feed;
pub use crate::reading::OuReading;
