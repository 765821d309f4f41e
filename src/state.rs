use std::sync::Arc;

use crate::gateway::TextProvider;
use crate::rooms::RoomRegistry;

/// Shared application state
pub struct AppState {
    pub rooms: RoomRegistry,
    /// Configured text provider; `None` when neither GEMINI_URL nor
    /// GEMINI_API_KEY is set, in which case passage fetches fail but the
    /// broker keeps running.
    pub gateway: Option<Arc<dyn TextProvider>>,
}

impl AppState {
    pub fn new(gateway: Option<Arc<dyn TextProvider>>) -> Self {
        Self {
            rooms: RoomRegistry::new(),
            gateway,
        }
    }
}
