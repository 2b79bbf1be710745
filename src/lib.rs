//! Omen - streaming candlestick analysis with rate-limited prediction triggers

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, Result};
pub use services::SessionHandle;
pub use types::*;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionHandle,
}
