//! Repositories and integrations used by the handlers

pub mod google;
pub mod prescriptions;
pub mod users;

pub use prescriptions::{
    NewDraft, NewItem, NewPrescription, PrescriptionChanges, PrescriptionRecord,
    PrescriptionResponse, PrescriptionStore,
};
pub use users::{PgUserDirectory, UserDirectory, UserProfile, UserRecord};
