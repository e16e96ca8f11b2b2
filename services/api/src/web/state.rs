//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::feed::SolutionFeed;
use crate::config::Config;
use askpix_core::flows::Flows;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub flows: Arc<Flows>,
    /// Saved solutions, with live per-user updates.
    pub solutions: Arc<SolutionFeed>,
}
