//! Notifications emitted after a committed operation.
//!
//! Events are a side channel for off-core indexers. They are never read back
//! by the registry itself.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Address, RecordId};

/// A registry notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A record was committed by a batch registration.
    RecordRegistered {
        record_id: RecordId,
        student_address: Address,
        institution_address: Address,
        timestamp: i64,
    },

    /// A student granted a visitor access to a record.
    AccessGranted {
        record_id: RecordId,
        student_address: Address,
        visitor_address: Address,
    },

    /// A student revoked a visitor's access to a record.
    AccessRevoked {
        record_id: RecordId,
        student_address: Address,
        visitor_address: Address,
    },
}

impl RegistryEvent {
    /// The record this event concerns.
    pub fn record_id(&self) -> &RecordId {
        match self {
            RegistryEvent::RecordRegistered { record_id, .. }
            | RegistryEvent::AccessGranted { record_id, .. }
            | RegistryEvent::AccessRevoked { record_id, .. } => record_id,
        }
    }

    /// The student owning the record.
    pub fn student_address(&self) -> &Address {
        match self {
            RegistryEvent::RecordRegistered {
                student_address, ..
            }
            | RegistryEvent::AccessGranted {
                student_address, ..
            }
            | RegistryEvent::AccessRevoked {
                student_address, ..
            } => student_address,
        }
    }

    /// Short event name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::RecordRegistered { .. } => "record_registered",
            RegistryEvent::AccessGranted { .. } => "access_granted",
            RegistryEvent::AccessRevoked { .. } => "access_revoked",
        }
    }

    /// Serialize to a JSON line for indexers.
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Parse from JSON.
    pub fn from_json(s: &str) -> Result<Self, CoreError> {
        serde_json::from_str(s).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}
