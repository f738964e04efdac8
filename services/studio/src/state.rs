//! Application state shared across handlers

use common::session::StudioSession;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: StudioSession,
}
