//! One polling cycle: mappings update, decode, reconstruct
//!
//! Records are handled independently; a rejected record is logged and dropped
//! without affecting the rest of the cycle.

use tracing::{debug, warn};

use super::reconstruct::{reconstruct, Reconstruction, Rejection};
use crate::feed::schema::SyncedPayload;
use crate::feed::wire;
use crate::mapping::{MappingStore, MappingUpdate};
use crate::models::SportEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub event_id: String,
    pub reason: Rejection,
}

/// Everything one cycle produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub mapping_update: MappingUpdate,
    /// Records that survived wire decoding
    pub decoded: usize,
    pub events: Vec<SportEvent>,
    pub rejected: Vec<RejectedRecord>,
}

pub struct EventProcessor {
    mappings: MappingStore,
}

impl Default for EventProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl EventProcessor {
    pub fn new() -> Self {
        Self {
            mappings: MappingStore::new(),
        }
    }

    /// Read access to the mapping store; mutation only happens in `process`
    pub fn mappings(&self) -> &MappingStore {
        &self.mappings
    }

    pub fn process(&self, payload: &SyncedPayload) -> CycleReport {
        // Newest labels first, so this cycle resolves against them
        let mapping_update = self.mappings.replace_from_payload(&payload.mappings.mappings);
        let table = self.mappings.snapshot();

        let records = wire::parse_state(&payload.state.odds);
        let decoded = records.len();

        let mut events = Vec::with_capacity(decoded);
        let mut rejected = Vec::new();

        for record in &records {
            let validation = table.validate_required(&record.required_ids());
            if !validation.all_present {
                warn!(
                    event_id = %record.id,
                    missing = %validation.missing.join(", "),
                    "[MAPPING ERROR] Event skipped due to missing mappings"
                );
            }

            match reconstruct(record, &table) {
                Reconstruction::Resolved(event) => events.push(event),
                Reconstruction::Rejected(reason) => {
                    if !matches!(reason, Rejection::UnresolvedMapping { .. }) {
                        warn!(event_id = %record.id, reason = %reason, "Failed to create sport event");
                    }
                    rejected.push(RejectedRecord {
                        event_id: record.id.clone(),
                        reason,
                    });
                }
            }
        }

        debug!(
            decoded,
            accepted = events.len(),
            rejected = rejected.len(),
            "Cycle processed"
        );

        CycleReport {
            mapping_update,
            decoded,
            events,
            rejected,
        }
    }
}
