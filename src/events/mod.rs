pub mod processor; // Per-cycle orchestration
pub mod reconstruct; // Raw record -> SportEvent
pub mod snapshot; // Current-events snapshot with tombstones

pub use processor::{CycleReport, EventProcessor, RejectedRecord};
pub use reconstruct::{reconstruct, Reconstruction, Rejection};
pub use snapshot::{ReconcileReport, ScoreChange, SnapshotReconciler, SnapshotView, StatusChange};
