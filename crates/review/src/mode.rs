use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use {async_trait::async_trait, folio_common::Mode};

/// Per-conversation mode setting.
#[async_trait]
pub trait ModeStore: Send + Sync {
    /// The mode chosen for `conversation`, if any.
    async fn get(&self, conversation: &str) -> Option<Mode>;
    async fn set(&self, conversation: &str, mode: Mode);
}

/// Process-local [`ModeStore`]. Choices are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryModeStore {
    modes: RwLock<HashMap<String, Mode>>,
}

#[async_trait]
impl ModeStore for InMemoryModeStore {
    async fn get(&self, conversation: &str) -> Option<Mode> {
        let modes = self.modes.read().unwrap_or_else(PoisonError::into_inner);
        modes.get(conversation).copied()
    }

    async fn set(&self, conversation: &str, mode: Mode) {
        let mut modes = self.modes.write().unwrap_or_else(PoisonError::into_inner);
        modes.insert(conversation.to_string(), mode);
    }
}
