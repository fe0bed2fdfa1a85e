use std::sync::{Arc, Mutex};

/// Page identities seen by one crawl session
///
/// Clones share the same underlying set, so every dispatcher in a
/// recursive crawl tree observes the others' visits. The set only grows.
#[derive(Debug, Clone, Default)]
pub struct VisitedPages {
    ids: Arc<Mutex<Vec<String>>>,
}

impl VisitedPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id`; returns false if it was already present
    pub fn insert(&self, id: &str) -> bool {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        if ids.iter().any(|seen| seen == id) {
            return false;
        }
        ids.push(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|seen| seen == id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identities in visiting order
    pub fn snapshot(&self) -> Vec<String> {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
