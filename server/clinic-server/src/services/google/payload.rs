//! Google Calendar event bodies and parsing of events returned by Google

use super::store::EventUpsert;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

pub const CALENDAR_TIME_ZONE: &str = "America/Sao_Paulo";
pub const UNTITLED_EVENT: &str = "Evento sem título";

/// What an appointment contributes to its calendar event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentEvent {
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
    pub doctor_name: String,
    pub notes: Option<String>,
    pub date_time: DateTime<Utc>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn timed(at: DateTime<Utc>) -> Value {
    json!({
        "dateTime": at.to_rfc3339(),
        "timeZone": CALENDAR_TIME_ZONE,
    })
}

/// One-hour event with email and popup reminders
pub fn appointment_event_body(appointment: &AppointmentEvent) -> Value {
    let patient = non_empty(&appointment.patient_name).unwrap_or("Paciente");
    let contact = non_empty(&appointment.patient_phone)
        .or_else(|| non_empty(&appointment.patient_email))
        .unwrap_or("");
    let notes = non_empty(&appointment.notes).unwrap_or("Consulta médica");

    let description = format!(
        "Médico: {}\nPaciente: {}\nContato: {}\nObservações: {}",
        appointment.doctor_name, patient, contact, notes
    );

    json!({
        "summary": format!("Consulta - {}", patient),
        "description": description,
        "start": timed(appointment.date_time),
        "end": timed(appointment.date_time + Duration::hours(1)),
        "reminders": {
            "useDefault": false,
            "overrides": [
                { "method": "email", "minutes": 60 },
                { "method": "popup", "minutes": 30 },
            ],
        },
    })
}

/// Body for patching a cached event on Google
pub fn event_patch_body(
    summary: &str,
    description: Option<&str>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Value {
    let mut body = json!({
        "summary": summary,
        "start": timed(start),
        "end": timed(end),
    });
    if let (Some(description), Some(map)) = (description, body.as_object_mut()) {
        map.insert("description".to_string(), json!(description));
    }
    body
}

/// `dateTime` of a start/end object, or its all-day `date` at UTC midnight
fn event_instant(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(date_time) = value.get("dateTime").and_then(Value::as_str) {
        return DateTime::parse_from_rfc3339(date_time)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }

    value
        .get("date")
        .and_then(Value::as_str)
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Cache row for an event listed by Google. Events without an id or a
/// usable start and end are skipped.
pub fn parse_event(user_id: Uuid, event: &Value, now: DateTime<Utc>) -> Option<EventUpsert> {
    let google_event_id = event.get("id").and_then(Value::as_str)?;
    let start_time = event_instant(event.get("start")?)?;
    let end_time = event_instant(event.get("end")?)?;

    let updated_at_google = event
        .get("updated")
        .and_then(Value::as_str)
        .and_then(|u| DateTime::parse_from_rfc3339(u).ok())
        .map(|u| u.with_timezone(&Utc))
        .unwrap_or(now);

    Some(EventUpsert {
        user_id,
        google_event_id: google_event_id.to_string(),
        summary: event
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or(UNTITLED_EVENT)
            .to_string(),
        description: event
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        start_time,
        end_time,
        updated_at_google,
        raw_payload: event.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_appointment_body() {
        let body = appointment_event_body(&AppointmentEvent {
            patient_name: Some("João Silva".to_string()),
            patient_phone: Some("11 99999-0000".to_string()),
            patient_email: Some("joao@mail.com".to_string()),
            doctor_name: "Dra. Helena".to_string(),
            notes: None,
            date_time: at(14),
        });

        assert_eq!(body["summary"], "Consulta - João Silva");
        assert_eq!(
            body["description"],
            "Médico: Dra. Helena\nPaciente: João Silva\nContato: 11 99999-0000\nObservações: Consulta médica"
        );
        assert_eq!(body["start"]["timeZone"], CALENDAR_TIME_ZONE);
        assert_eq!(body["start"]["dateTime"], at(14).to_rfc3339());
        assert_eq!(body["end"]["dateTime"], at(15).to_rfc3339());
        assert_eq!(body["reminders"]["useDefault"], false);
        assert_eq!(body["reminders"]["overrides"][0]["minutes"], 60);
        assert_eq!(body["reminders"]["overrides"][1]["method"], "popup");
    }

    #[test]
    fn test_appointment_body_fallbacks() {
        let body = appointment_event_body(&AppointmentEvent {
            patient_email: Some("ana@mail.com".to_string()),
            doctor_name: "Dr. Paulo".to_string(),
            notes: Some("Retorno".to_string()),
            date_time: at(9),
            ..AppointmentEvent::default()
        });

        assert_eq!(body["summary"], "Consulta - Paciente");
        let description = body["description"].as_str().unwrap();
        assert!(description.contains("Contato: ana@mail.com"));
        assert!(description.ends_with("Observações: Retorno"));
    }

    #[test]
    fn test_parse_timed_event() {
        let user = Uuid::new_v4();
        let event = json!({
            "id": "evt-1",
            "summary": "Reunião",
            "start": { "dateTime": "2024-05-10T14:00:00-03:00" },
            "end": { "dateTime": "2024-05-10T15:00:00-03:00" },
            "updated": "2024-05-01T10:00:00Z",
        });

        let parsed = parse_event(user, &event, at(0)).unwrap();
        assert_eq!(parsed.google_event_id, "evt-1");
        assert_eq!(parsed.start_time, at(17));
        assert_eq!(parsed.end_time, at(18));
        assert_eq!(parsed.updated_at_google, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        assert_eq!(parsed.raw_payload, event);
    }

    #[test]
    fn test_parse_all_day_event_defaults() {
        let now = at(12);
        let event = json!({
            "id": "evt-2",
            "start": { "date": "2024-05-10" },
            "end": { "date": "2024-05-11" },
        });

        let parsed = parse_event(Uuid::new_v4(), &event, now).unwrap();
        assert_eq!(parsed.summary, UNTITLED_EVENT);
        assert_eq!(parsed.start_time, at(0));
        assert_eq!(parsed.end_time, at(0) + Duration::days(1));
        assert_eq!(parsed.updated_at_google, now);
        assert_eq!(parsed.description, None);
    }

    #[test]
    fn test_parse_skips_incomplete_events() {
        let user = Uuid::new_v4();
        let start = json!({ "date": "2024-05-10" });

        assert!(parse_event(user, &json!({ "start": start, "end": start }), at(0)).is_none());
        assert!(parse_event(user, &json!({ "id": "x", "end": start }), at(0)).is_none());
        assert!(parse_event(user, &json!({ "id": "x", "start": start, "end": {} }), at(0)).is_none());
    }

    #[test]
    fn test_patch_body() {
        let body = event_patch_body("Consulta", None, at(8), at(9));

        assert_eq!(body["summary"], "Consulta");
        assert!(body.get("description").is_none());
        assert_eq!(body["end"]["timeZone"], CALENDAR_TIME_ZONE);

        let body = event_patch_body("Consulta", Some("sala 2"), at(8), at(9));
        assert_eq!(body["description"], "sala 2");
    }
}
