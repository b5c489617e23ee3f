//! Per-mission request guard
//!
//! At most one streaming request (huddle answer or document rewrite) may run
//! against a mission at a time. The guard is released when dropped, including
//! when the owning future is abandoned mid-stream.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::{Error, Result};

/// Registry of missions with a request in flight
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    active: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `mission_id`, failing with `Error::Busy` if it is already claimed
    pub fn try_acquire(&self, mission_id: &str) -> Result<InFlightGuard> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(mission_id.to_string()) {
            debug!(mission_id = %mission_id, "Rejected concurrent request");
            return Err(Error::Busy(mission_id.to_string()));
        }

        Ok(InFlightGuard {
            active: Arc::clone(&self.active),
            mission_id: mission_id.to_string(),
        })
    }

    /// Whether a request is running for `mission_id`
    pub fn is_busy(&self, mission_id: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(mission_id)
    }
}

/// Releases the mission claim on drop
#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<String>>>,
    mission_id: String,
}

impl InFlightGuard {
    /// The claimed mission
    pub fn mission_id(&self) -> &str {
        &self.mission_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.mission_id);
    }
}
