//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Backend)
//! but are themselves concrete structs, not traits.

mod drafts;
mod equipment;
mod upload;

pub use drafts::DraftStore;
pub use equipment::{EquipmentService, SubmitOutcome};
pub use upload::{AssetSlot, UploadFailure, UploadReport, UploadService};
