//! Per-field lifecycle across one page session.
//!
//! `Discovered → Dispatched → {Filled | Failed} → Cleared`

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use fieldfill_shared::{FieldFillError, FieldId, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldState {
    Discovered,
    Dispatched,
    Filled,
    Failed,
    /// Visual feedback has been reset; the value is untouched.
    Cleared,
}

impl FieldState {
    fn can_become(self, next: FieldState) -> bool {
        use FieldState::*;
        matches!(
            (self, next),
            (Discovered, Dispatched)
                | (Dispatched, Filled)
                | (Dispatched, Failed)
                | (Filled, Cleared)
                | (Failed, Cleared)
        )
    }
}

impl fmt::Display for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Discovered => "discovered",
            Self::Dispatched => "dispatched",
            Self::Filled => "filled",
            Self::Failed => "failed",
            Self::Cleared => "cleared",
        };
        f.write_str(s)
    }
}

/// Shared state table, cloned into deferred resets.
#[derive(Debug, Clone, Default)]
pub struct FieldTracker {
    states: Arc<Mutex<HashMap<FieldId, FieldState>>>,
}

impl FieldTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<FieldId, FieldState>> {
        self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, id: &FieldId) -> Option<FieldState> {
        self.lock().get(id).copied()
    }

    /// Record a freshly scanned field. Rescanning restarts its lifecycle.
    pub fn discover(&self, id: &FieldId) {
        self.lock().insert(id.clone(), FieldState::Discovered);
    }

    /// Move `id` to `next`, rejecting transitions outside the lifecycle.
    pub fn advance(&self, id: &FieldId, next: FieldState) -> Result<()> {
        let mut states = self.lock();
        let current = states
            .get(id)
            .copied()
            .ok_or_else(|| FieldFillError::validation(format!("unknown field {id}")))?;
        if !current.can_become(next) {
            return Err(FieldFillError::validation(format!(
                "field {id} cannot go from {current} to {next}"
            )));
        }
        states.insert(id.clone(), next);
        Ok(())
    }
}
