//! Persistable machine snapshots
//!
//! A snapshot is `{ statePath, context }` plus the current fetch ticket.
//! Persisted values are untrusted: [`DetourSnapshot::validate`] must accept
//! a value before it is handed to [`crate::machine::DetourMachine::restore`].

use crate::error::SnapshotError;
use crate::event::FetchTicket;
use crate::machine::check_consistency;
use crate::state::DetourState;
use crate::types::DetourContext;
use serde::{Deserialize, Serialize};

/// Serializable capture of a running machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetourSnapshot {
    /// Names from the root to the leaf state
    pub state_path: Vec<String>,
    /// Context at capture time
    pub context: DetourContext,
    /// Ticket of the last `Pick Route ID` entry
    #[serde(default)]
    pub fetch_ticket: FetchTicket,
}

impl DetourSnapshot {
    /// Validate an arbitrary persisted value
    ///
    /// # Errors
    /// - `SnapshotError::NotAnObject` if `value` is not a JSON object
    /// - `SnapshotError::RejectedByMachine` if it does not describe a
    ///   state the machine can be in
    pub fn validate(value: &serde_json::Value) -> Result<Self, SnapshotError> {
        if !value.is_object() {
            return Err(SnapshotError::NotAnObject);
        }
        let snapshot = Self::deserialize(value)
            .map_err(|err| SnapshotError::RejectedByMachine(err.to_string()))?;
        snapshot.resolve_state()?;
        Ok(snapshot)
    }

    /// Parse and validate a JSON document
    ///
    /// # Errors
    /// Same as [`DetourSnapshot::validate`]; unparseable text is rejected
    /// by the machine.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|err| SnapshotError::RejectedByMachine(err.to_string()))?;
        Self::validate(&value)
    }

    /// Convert to a JSON value
    ///
    /// # Errors
    /// Propagates `serde_json` failures.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Resolve the state path and check the context against it
    ///
    /// # Errors
    /// `SnapshotError::RejectedByMachine` describing the mismatch.
    pub fn resolve_state(&self) -> Result<DetourState, SnapshotError> {
        let state = DetourState::from_path(self.state_path.as_slice()).ok_or_else(|| {
            SnapshotError::RejectedByMachine(format!(
                "unknown state path {:?}",
                self.state_path
            ))
        })?;
        check_consistency(state, &self.context).map_err(SnapshotError::RejectedByMachine)?;
        Ok(state)
    }
}
