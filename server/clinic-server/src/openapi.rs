use crate::server::AppState;
use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Main OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health and authentication
        crate::handlers::health::health_check,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::current_profile,

        // Patients
        crate::handlers::patients::create_patient,
        crate::handlers::patients::list_patients,
        crate::handlers::patients::get_patient,
        crate::handlers::patients::update_patient,
        crate::handlers::patients::delete_patient,

        // Medications
        crate::handlers::medications::create_medication,
        crate::handlers::medications::list_medications,
        crate::handlers::medications::get_medication,
        crate::handlers::medications::update_medication,
        crate::handlers::medications::delete_medication,

        // Appointments
        crate::handlers::appointments::create_appointment,
        crate::handlers::appointments::list_appointments,
        crate::handlers::appointments::get_appointment,
        crate::handlers::appointments::update_appointment,
        crate::handlers::appointments::delete_appointment,

        // Prescriptions
        crate::handlers::prescriptions::create_prescription,
        crate::handlers::prescriptions::list_prescriptions,
        crate::handlers::prescriptions::get_prescription,
        crate::handlers::prescriptions::update_prescription,
        crate::handlers::prescriptions::delete_prescription,
        crate::handlers::prescriptions::list_by_patient,
        crate::handlers::prescriptions::timeline_by_patient,
        crate::handlers::patient_prescriptions::list_patient_prescriptions,
        crate::handlers::patient_prescriptions::patient_timeline,
        crate::handlers::patient_prescriptions::create_draft,
        crate::handlers::patient_prescriptions::generate_next,
        crate::handlers::patient_prescriptions::finalize_prescription,
        crate::handlers::patient_prescriptions::diff_prescriptions,
        crate::handlers::patient_prescriptions::reuse_prescription,
        crate::handlers::patient_prescriptions::get_patient_prescription,

        // Clinical notes
        crate::handlers::consultations::create_consultation,
        crate::handlers::consultations::list_consultations,
        crate::handlers::consultations::get_consultation,
        crate::handlers::consultations::list_patient_consultations,
        crate::handlers::records::create_record,
        crate::handlers::records::list_patient_records,
        crate::handlers::records::get_record,
        crate::handlers::records::update_record,
        crate::handlers::records::delete_record,
        crate::handlers::allergies::list_allergies,
        crate::handlers::allergies::create_allergy,
        crate::handlers::allergies::delete_allergy,
        crate::handlers::drug_interactions::check_interactions,

        // Google Calendar
        crate::handlers::google::authorize,
        crate::handlers::google::callback,
        crate::handlers::google::status,
        crate::handlers::calendar::list_events,
        crate::handlers::calendar::update_event,
    ),
    components(
        schemas(
            crate::handlers::health::HealthResponse,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::AuthResponse,
            crate::auth::Role,
            crate::auth::IssuedToken,
            crate::services::UserProfile,

            crate::handlers::patients::Patient,
            crate::handlers::patients::Address,
            crate::handlers::patients::EmergencyContact,
            crate::handlers::patients::CreatePatientRequest,
            crate::handlers::patients::UpdatePatientRequest,

            crate::handlers::medications::Medication,
            crate::handlers::medications::CreateMedicationRequest,
            crate::handlers::medications::UpdateMedicationRequest,

            crate::handlers::appointments::Appointment,
            crate::handlers::appointments::AppointmentStatus,
            crate::handlers::appointments::CreateAppointmentRequest,
            crate::handlers::appointments::UpdateAppointmentRequest,

            crate::services::PrescriptionResponse,
            crate::services::prescriptions::PrescriptionItemResponse,
            crate::services::prescriptions::MedicationSummary,
            crate::services::prescriptions::PatientSummary,
            crate::handlers::prescriptions::PrescriptionItemRequest,
            crate::handlers::prescriptions::CreatePrescriptionRequest,
            crate::handlers::prescriptions::UpdatePrescriptionRequest,
            crate::handlers::patient_prescriptions::CreateDraftRequest,
            crate::handlers::patient_prescriptions::GeneratedDraftResponse,
            crate::handlers::patient_prescriptions::TimelineResponse,
            crate::handlers::patient_prescriptions::ReuseItemsRequest,
            prescription_engine::PrescriptionStatus,
            prescription_engine::GenerateNextOptions,
            prescription_engine::NextSuggestion,
            prescription_engine::SuggestedItem,
            prescription_engine::DraftItemInput,
            prescription_engine::PrescriptionDiff,
            prescription_engine::ItemChange,
            prescription_engine::ItemSnapshot,
            prescription_engine::TimelineEntry,
            prescription_engine::InteractionWarning,
            prescription_engine::InteractionSeverity,

            crate::handlers::consultations::Consultation,
            crate::handlers::consultations::CreateConsultationRequest,
            crate::handlers::records::MedicalRecord,
            crate::handlers::records::RecordAuthor,
            crate::handlers::records::CreateRecordRequest,
            crate::handlers::records::UpdateRecordRequest,
            crate::handlers::allergies::Allergy,
            crate::handlers::allergies::AllergySeverity,
            crate::handlers::allergies::CreateAllergyRequest,
            crate::handlers::drug_interactions::CheckInteractionsRequest,
            crate::handlers::drug_interactions::CheckInteractionsResponse,

            crate::handlers::google::AuthorizeResponse,
            crate::handlers::google::CallbackResponse,
            crate::handlers::google::StatusResponse,
            crate::handlers::calendar::EventsResponse,
            crate::handlers::calendar::EventsMeta,
            crate::handlers::calendar::UpdateEventRequest,
            crate::services::google::CachedEvent,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Login and token refresh"),
        (name = "users", description = "Current user profile"),
        (name = "patients", description = "Patient registry"),
        (name = "medications", description = "Medication catalogue"),
        (name = "appointments", description = "Appointment scheduling"),
        (name = "prescriptions", description = "Prescriptions, drafts, timeline and diff"),
        (name = "consultations", description = "Recorded consultations"),
        (name = "records", description = "Medical records"),
        (name = "allergies", description = "Patient allergies"),
        (name = "drug-interactions", description = "Drug interaction check"),
        (name = "google", description = "Google account connection"),
        (name = "calendar", description = "Cached Google Calendar events"),
    ),
    info(
        title = "Clinic Server API",
        version = "1.0.0",
        description = "Clinic records API: patients, appointments, prescriptions, medical records and Google Calendar sync.",
    ),
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` JWT scheme referenced by the handlers
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Swagger UI at `/docs`, document at `/api-docs/openapi.json`
pub fn create_docs_routes() -> Router<AppState> {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_document_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/patients/{patientId}/prescriptions/generate-next"));
        assert!(doc.paths.paths.contains_key("/api/google/callback"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
