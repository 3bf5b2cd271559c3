use std::sync::Arc;

use crate::chat::ChatService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
}
