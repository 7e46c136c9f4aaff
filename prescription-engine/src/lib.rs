//! Prescription rules for the clinic engine
//!
//! Everything here works on prescriptions that were already loaded from the
//! database; nothing in this crate performs I/O. The server maps its rows
//! into [`PrescriptionSnapshot`]s and persists whatever these functions
//! return.
//!
//! - [`finalize`]: draft to active, rejecting duplicated medications
//! - [`build_timeline`]: versioned history of a patient's prescriptions
//! - [`suggest_next`]: next prescription proposed from the latest one
//! - [`resolve_draft_items`]: draft item inputs to persisted item shape
//! - [`diff`]: added / removed / changed items between two prescriptions
//! - [`select_for_reuse`]: pick items of an old prescription for a new draft
//!
//! ```rust
//! use prescription_engine::{finalize, PrescriptionStatus};
//!
//! let status = finalize(PrescriptionStatus::Draft, &[]).unwrap();
//! assert_eq!(status, PrescriptionStatus::Active);
//! ```

pub mod diff;
pub mod error;
pub mod generate;
pub mod interactions;
pub mod lifecycle;
pub mod models;
pub mod reuse;
pub mod timeline;

pub use diff::{diff, item_key, ItemChange, PrescriptionDiff};
pub use error::{PrescriptionError, PrescriptionResult};
pub use generate::{
    draft_duration, resolve_draft_items, suggest_next, DraftItem, DraftItemInput,
    GenerateNextOptions, NextSuggestion, SuggestedItem,
};
pub use interactions::{
    DrugInteractionChecker, InteractionSeverity, InteractionWarning, NoopInteractionChecker,
    SampleInteractionChecker,
};
pub use lifecycle::finalize;
pub use models::{ItemSnapshot, PrescriptionSnapshot, PrescriptionStatus};
pub use reuse::select_for_reuse;
pub use timeline::{build_timeline, TimelineEntry};
