//! HTTP handlers, one module per resource

pub mod allergies;
pub mod appointments;
pub mod auth;
pub mod calendar;
pub mod consultations;
pub mod drug_interactions;
pub mod google;
pub mod health;
pub mod medications;
pub mod patient_prescriptions;
pub mod patients;
pub mod prescriptions;
pub mod records;
