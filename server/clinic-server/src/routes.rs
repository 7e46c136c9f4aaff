pub mod paths;

use crate::{
    handlers::{
        allergies, appointments, auth, calendar, consultations, drug_interactions, google, health,
        medications, patient_prescriptions, patients, prescriptions, records,
    },
    openapi,
    server::AppState,
};
use axum::{
    routing::{delete, get, patch, post},
    Router,
};

/// Health check routes (no authentication required)
pub fn health_routes() -> Router<AppState> {
    Router::new().route(paths::HEALTH, get(health::health_check))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(paths::auth::LOGIN, post(auth::login))
        .route(paths::auth::ME, get(auth::me))
        .route(paths::auth::USERS_ME, get(auth::current_profile))
}

/// Patients and everything nested under a patient
pub fn patient_routes() -> Router<AppState> {
    use paths::patients::*;

    Router::new()
        .route(
            PATIENTS,
            post(patients::create_patient).get(patients::list_patients),
        )
        .route(
            PATIENT_BY_ID,
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route(
            RECORDS,
            post(records::create_record).get(records::list_patient_records),
        )
        .route(
            ALLERGIES,
            get(allergies::list_allergies).post(allergies::create_allergy),
        )
        .route(ALLERGY_BY_ID, delete(allergies::delete_allergy))
        .route(
            PRESCRIPTIONS,
            get(patient_prescriptions::list_patient_prescriptions),
        )
        .route(
            PRESCRIPTIONS_TIMELINE,
            get(patient_prescriptions::patient_timeline),
        )
        .route(PRESCRIPTION_DRAFT, post(patient_prescriptions::create_draft))
        .route(
            PRESCRIPTION_GENERATE_NEXT,
            post(patient_prescriptions::generate_next),
        )
        .route(
            PRESCRIPTION_BY_ID,
            get(patient_prescriptions::get_patient_prescription),
        )
        .route(
            PRESCRIPTION_FINALIZE,
            post(patient_prescriptions::finalize_prescription),
        )
        .route(
            PRESCRIPTION_DIFF,
            get(patient_prescriptions::diff_prescriptions),
        )
        .route(
            PRESCRIPTION_REUSE,
            post(patient_prescriptions::reuse_prescription),
        )
}

pub fn medication_routes() -> Router<AppState> {
    use paths::medications::*;

    Router::new()
        .route(
            MEDICATIONS,
            post(medications::create_medication).get(medications::list_medications),
        )
        .route(
            MEDICATION_BY_ID,
            get(medications::get_medication)
                .put(medications::update_medication)
                .delete(medications::delete_medication),
        )
}

pub fn appointment_routes() -> Router<AppState> {
    use paths::appointments::*;

    Router::new()
        .route(
            APPOINTMENTS,
            post(appointments::create_appointment).get(appointments::list_appointments),
        )
        .route(
            APPOINTMENT_BY_ID,
            get(appointments::get_appointment)
                .put(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
}

pub fn prescription_routes() -> Router<AppState> {
    use paths::prescriptions::*;

    Router::new()
        .route(
            PRESCRIPTIONS,
            post(prescriptions::create_prescription).get(prescriptions::list_prescriptions),
        )
        .route(
            PRESCRIPTION_BY_ID,
            get(prescriptions::get_prescription)
                .put(prescriptions::update_prescription)
                .delete(prescriptions::delete_prescription),
        )
        .route(BY_PATIENT, get(prescriptions::list_by_patient))
        .route(TIMELINE_BY_PATIENT, get(prescriptions::timeline_by_patient))
}

/// Consultations, medical records and the interaction check
pub fn clinical_routes() -> Router<AppState> {
    Router::new()
        .route(
            paths::consultations::CONSULTATIONS,
            post(consultations::create_consultation).get(consultations::list_consultations),
        )
        .route(
            paths::consultations::CONSULTATION_BY_ID,
            get(consultations::get_consultation),
        )
        .route(
            paths::consultations::BY_PATIENT,
            get(consultations::list_patient_consultations),
        )
        .route(
            paths::records::RECORD_BY_ID,
            get(records::get_record)
                .put(records::update_record)
                .delete(records::delete_record),
        )
        .route(
            paths::DRUG_INTERACTIONS,
            post(drug_interactions::check_interactions),
        )
}

pub fn google_routes() -> Router<AppState> {
    Router::new()
        .route(paths::google::AUTHORIZE, get(google::authorize))
        .route(paths::google::CALLBACK, get(google::callback))
        .route(paths::google::STATUS, get(google::status))
        .route(paths::calendar::EVENTS, get(calendar::list_events))
        .route(paths::calendar::EVENT_BY_ID, patch(calendar::update_event))
}

/// Every route of the API; Swagger UI is mounted when `enable_swagger` is set
pub fn create_routes(enable_swagger: bool) -> Router<AppState> {
    let router = Router::new()
        .merge(health_routes())
        .merge(auth_routes())
        .merge(patient_routes())
        .merge(medication_routes())
        .merge(appointment_routes())
        .merge(prescription_routes())
        .merge(clinical_routes())
        .merge(google_routes());

    if enable_swagger {
        router.merge(openapi::create_docs_routes())
    } else {
        router
    }
}
