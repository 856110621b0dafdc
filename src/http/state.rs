use std::sync::Arc;

use crate::surface::{MaintenanceSurface, VoiceChatSurface, WalkthroughSurface};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<VoiceChatSurface>,
    pub maintenance: Arc<MaintenanceSurface>,
    pub walkthrough: Arc<WalkthroughSurface>,
}

impl AppState {
    pub fn new(
        chat: Arc<VoiceChatSurface>,
        maintenance: Arc<MaintenanceSurface>,
        walkthrough: Arc<WalkthroughSurface>,
    ) -> Self {
        Self {
            chat,
            maintenance,
            walkthrough,
        }
    }
}
