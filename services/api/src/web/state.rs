//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use sis_core::ports::RegistryStore;
use std::sync::Arc;

/// The name of the cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "sid";

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RegistryStore>,
    pub config: Arc<Config>,
}
