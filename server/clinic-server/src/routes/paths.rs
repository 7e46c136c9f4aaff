//! Route path constants
//!
//! utoipa `#[utoipa::path]` attributes need string literals, so the paths
//! there are written in `{param}` form and must match these constants.

pub const HEALTH: &str = "/health";

pub mod auth {
    pub const LOGIN: &str = "/api/auth/login";
    pub const ME: &str = "/api/auth/me";
    pub const USERS_ME: &str = "/api/users/me";
}

pub mod patients {
    pub const PATIENTS: &str = "/api/patients";
    pub const PATIENT_BY_ID: &str = "/api/patients/:patient_id";
    pub const RECORDS: &str = "/api/patients/:patient_id/records";
    pub const ALLERGIES: &str = "/api/patients/:patient_id/allergies";
    pub const ALLERGY_BY_ID: &str = "/api/patients/:patient_id/allergies/:id";
    pub const PRESCRIPTIONS: &str = "/api/patients/:patient_id/prescriptions";
    pub const PRESCRIPTIONS_TIMELINE: &str = "/api/patients/:patient_id/prescriptions/timeline";
    pub const PRESCRIPTION_DRAFT: &str = "/api/patients/:patient_id/prescriptions/draft";
    pub const PRESCRIPTION_GENERATE_NEXT: &str =
        "/api/patients/:patient_id/prescriptions/generate-next";
    pub const PRESCRIPTION_BY_ID: &str = "/api/patients/:patient_id/prescriptions/:id";
    pub const PRESCRIPTION_FINALIZE: &str = "/api/patients/:patient_id/prescriptions/:id/finalize";
    pub const PRESCRIPTION_DIFF: &str =
        "/api/patients/:patient_id/prescriptions/:id/diff/:other_id";
    pub const PRESCRIPTION_REUSE: &str = "/api/patients/:patient_id/prescriptions/:id/reuse";
}

pub mod medications {
    pub const MEDICATIONS: &str = "/api/medications";
    pub const MEDICATION_BY_ID: &str = "/api/medications/:id";
}

pub mod appointments {
    pub const APPOINTMENTS: &str = "/api/appointments";
    pub const APPOINTMENT_BY_ID: &str = "/api/appointments/:id";
}

pub mod prescriptions {
    pub const PRESCRIPTIONS: &str = "/api/prescriptions";
    pub const PRESCRIPTION_BY_ID: &str = "/api/prescriptions/:id";
    pub const BY_PATIENT: &str = "/api/prescriptions/patient/:patient_id";
    pub const TIMELINE_BY_PATIENT: &str = "/api/prescriptions/patient/:patient_id/timeline";
}

pub mod consultations {
    pub const CONSULTATIONS: &str = "/api/consultations";
    pub const CONSULTATION_BY_ID: &str = "/api/consultations/:id";
    pub const BY_PATIENT: &str = "/api/consultations/patient/:patient_id";
}

pub mod records {
    pub const RECORD_BY_ID: &str = "/api/records/:id";
}

pub const DRUG_INTERACTIONS: &str = "/api/drug-interactions";

pub mod google {
    pub const AUTHORIZE: &str = "/api/google/authorize";
    pub const CALLBACK: &str = "/api/google/callback";
    pub const STATUS: &str = "/api/google/status";
}

pub mod calendar {
    pub const EVENTS: &str = "/api/calendar/events";
    pub const EVENT_BY_ID: &str = "/api/calendar/events/:google_event_id";
}
