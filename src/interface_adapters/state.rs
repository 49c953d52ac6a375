use crate::use_cases::SessionRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Registry of live sessions; owns the set of active world tasks.
    pub session_registry: Arc<SessionRegistry>,
}
