//! Prescription persistence
//!
//! Loads prescriptions with their items (and the medication and patient
//! data shown next to them) and turns them into engine snapshots or API
//! responses. All writes that touch items run in one transaction.

use crate::error::{ApiError, ApiResult};
use crate::utils::ListQuery;
use chrono::{DateTime, NaiveDate, Utc};
use prescription_engine::{
    finalize, resolve_draft_items, DraftItem, DraftItemInput, ItemSnapshot, PrescriptionSnapshot,
    PrescriptionStatus,
};
use serde::Serialize;
use sqlx::{Executor, FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

const SELECT_PRESCRIPTION: &str = "SELECT p.id, p.patient_id, p.prescriber_id, u.name AS prescriber_name, \
     p.status, p.notes, p.valid_from, p.valid_until, p.created_at, p.updated_at, \
     pt.full_name AS patient_full_name, pt.document_id AS patient_document_id, \
     pt.birth_date AS patient_birth_date, pt.phone AS patient_phone, pt.email AS patient_email";

pub const PRESCRIPTION_FROM: &str = "FROM prescriptions p \
     LEFT JOIN users u ON u.id = p.prescriber_id \
     LEFT JOIN patients pt ON pt.id = p.patient_id";

#[derive(Debug, Clone, FromRow)]
pub struct PrescriptionRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub prescriber_id: Option<Uuid>,
    pub prescriber_name: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub patient_full_name: Option<String>,
    pub patient_document_id: Option<String>,
    pub patient_birth_date: Option<NaiveDate>,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: Uuid,
    pub prescription_id: Uuid,
    pub medication_id: Uuid,
    pub medication_name: Option<String>,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
    pub quantity: Option<i32>,
    pub route: Option<String>,
    pub duration_days: Option<i32>,
    pub is_chronic: bool,
    pub is_prn: bool,
    pub medication_generic_name: Option<String>,
    pub medication_concentration: Option<String>,
    pub medication_form: Option<String>,
}

/// A prescription row with its items in prescription order
#[derive(Debug, Clone)]
pub struct PrescriptionRecord {
    pub row: PrescriptionRow,
    pub items: Vec<ItemRow>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicationSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub concentration: Option<String>,
    pub form: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: Uuid,
    pub full_name: String,
    pub document_id: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionItemResponse {
    pub id: Uuid,
    pub prescription_id: Uuid,
    pub medication_id: Uuid,
    pub medication_name: Option<String>,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
    pub quantity: Option<i32>,
    pub route: Option<String>,
    pub duration_days: Option<i32>,
    pub is_chronic: bool,
    pub is_prn: bool,
    pub medication: MedicationSummary,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionResponse {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub prescriber_id: Option<Uuid>,
    pub prescriber_name: Option<String>,
    pub status: PrescriptionStatus,
    pub notes: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientSummary>,
    pub items: Vec<PrescriptionItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub medication_id: Uuid,
    pub medication_name: Option<String>,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
    pub quantity: Option<i32>,
    pub route: Option<String>,
    pub duration_days: Option<i32>,
    pub is_chronic: bool,
    pub is_prn: bool,
}

impl From<DraftItem> for NewItem {
    fn from(item: DraftItem) -> Self {
        Self {
            medication_id: item.medication_id,
            medication_name: None,
            dosage: item.dosage,
            frequency: item.frequency,
            duration: item.duration,
            instructions: item.instructions,
            quantity: None,
            route: item.route,
            duration_days: item.duration_days,
            is_chronic: item.is_chronic,
            is_prn: item.is_prn,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPrescription {
    pub patient_id: Uuid,
    pub prescriber_id: Option<Uuid>,
    pub status: PrescriptionStatus,
    pub notes: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub items: Vec<NewItem>,
}

/// Draft whose items may reference medications by name only
#[derive(Debug, Clone)]
pub struct NewDraft {
    pub patient_id: Uuid,
    pub prescriber_id: Option<Uuid>,
    pub status: PrescriptionStatus,
    pub notes: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub items: Vec<DraftItemInput>,
}

/// Names of inputs that carry no medication id
pub fn unresolved_names(inputs: &[DraftItemInput]) -> Vec<String> {
    let mut names: Vec<String> = inputs
        .iter()
        .filter(|input| input.medication_id.is_none())
        .filter_map(|input| input.medication_name.clone())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

#[derive(Debug, Clone, Default)]
pub struct PrescriptionChanges {
    pub patient_id: Option<Uuid>,
    pub status: Option<PrescriptionStatus>,
    pub notes: Option<String>,
    /// Replaces every item when present
    pub items: Option<Vec<NewItem>>,
}

impl ItemRow {
    fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            id: self.id,
            medication_id: self.medication_id,
            medication_name: self.medication_name.clone(),
            dosage: self.dosage.clone(),
            frequency: self.frequency.clone(),
            duration: self.duration.clone(),
            instructions: self.instructions.clone(),
            quantity: self.quantity,
            route: self.route.clone(),
            duration_days: self.duration_days,
            is_chronic: self.is_chronic,
            is_prn: self.is_prn,
        }
    }

    fn response(self) -> PrescriptionItemResponse {
        PrescriptionItemResponse {
            medication: MedicationSummary {
                id: self.medication_id,
                name: self.medication_name.clone(),
                generic_name: self.medication_generic_name,
                concentration: self.medication_concentration,
                form: self.medication_form,
            },
            id: self.id,
            prescription_id: self.prescription_id,
            medication_id: self.medication_id,
            medication_name: self.medication_name,
            dosage: self.dosage,
            frequency: self.frequency,
            duration: self.duration,
            instructions: self.instructions,
            quantity: self.quantity,
            route: self.route,
            duration_days: self.duration_days,
            is_chronic: self.is_chronic,
            is_prn: self.is_prn,
        }
    }
}

fn parse_status(status: &str) -> ApiResult<PrescriptionStatus> {
    status
        .parse()
        .map_err(|_| ApiError::internal(format!("Unexpected prescription status {}", status)))
}

impl PrescriptionRecord {
    pub fn status(&self) -> ApiResult<PrescriptionStatus> {
        parse_status(&self.row.status)
    }

    pub fn belongs_to(&self, patient_id: Uuid) -> bool {
        self.row.patient_id == patient_id
    }

    pub fn snapshot(&self) -> ApiResult<PrescriptionSnapshot> {
        Ok(PrescriptionSnapshot {
            id: self.row.id,
            patient_id: self.row.patient_id,
            status: self.status()?,
            notes: self.row.notes.clone(),
            created_at: self.row.created_at,
            valid_from: self.row.valid_from,
            valid_until: self.row.valid_until,
            prescriber_name: self.row.prescriber_name.clone(),
            items: self.items.iter().map(ItemRow::snapshot).collect(),
        })
    }

    pub fn item_snapshots(&self) -> Vec<ItemSnapshot> {
        self.items.iter().map(ItemRow::snapshot).collect()
    }

    pub fn into_response(self) -> ApiResult<PrescriptionResponse> {
        let status = self.status()?;
        let row = self.row;

        let patient = row.patient_full_name.map(|full_name| PatientSummary {
            id: row.patient_id,
            full_name,
            document_id: row.patient_document_id,
            birth_date: row.patient_birth_date,
            phone: row.patient_phone,
            email: row.patient_email,
        });

        Ok(PrescriptionResponse {
            id: row.id,
            patient_id: row.patient_id,
            prescriber_id: row.prescriber_id,
            prescriber_name: row.prescriber_name,
            status,
            notes: row.notes,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            patient,
            items: self.items.into_iter().map(ItemRow::response).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Status after finalizing a prescription holding `items`
fn finalized_status(current: PrescriptionStatus, items: &[ItemRow]) -> ApiResult<PrescriptionStatus> {
    let snapshots: Vec<ItemSnapshot> = items.iter().map(ItemRow::snapshot).collect();
    Ok(finalize(current, &snapshots)?)
}

/// Attach items to their prescriptions, keeping the row order.
pub fn assemble(rows: Vec<PrescriptionRow>, items: Vec<ItemRow>) -> Vec<PrescriptionRecord> {
    let mut by_prescription: HashMap<Uuid, Vec<ItemRow>> = HashMap::new();
    for item in items {
        by_prescription
            .entry(item.prescription_id)
            .or_default()
            .push(item);
    }

    rows.into_iter()
        .map(|row| {
            let items = by_prescription.remove(&row.id).unwrap_or_default();
            PrescriptionRecord { row, items }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct PrescriptionStore {
    pool: PgPool,
}

impl PrescriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, prescription_ids: &[Uuid]) -> ApiResult<Vec<ItemRow>> {
        if prescription_ids.is_empty() {
            return Ok(Vec::new());
        }
        Self::fetch_items(&self.pool, prescription_ids).await
    }

    async fn fetch_items<'e, E>(executor: E, prescription_ids: &[Uuid]) -> ApiResult<Vec<ItemRow>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT pi.id, pi.prescription_id, pi.medication_id,
                   COALESCE(pi.medication_name, m.name) AS medication_name,
                   pi.dosage, pi.frequency, pi.duration, pi.instructions, pi.quantity,
                   pi.route, pi.duration_days, pi.is_chronic, pi.is_prn,
                   m.generic_name AS medication_generic_name,
                   m.concentration AS medication_concentration,
                   m.form AS medication_form
            FROM prescription_items pi
            LEFT JOIN medications m ON m.id = pi.medication_id
            WHERE pi.prescription_id = ANY($1)
            ORDER BY pi.position ASC, pi.id ASC
            "#,
        )
        .bind(prescription_ids)
        .fetch_all(executor)
        .await?;

        Ok(items)
    }

    async fn with_items(&self, rows: Vec<PrescriptionRow>) -> ApiResult<Vec<PrescriptionRecord>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = self.load_items(&ids).await?;
        Ok(assemble(rows, items))
    }

    /// One page of prescriptions matching `query`, plus the total count
    pub async fn list(
        &self,
        query: &ListQuery,
        limit: u32,
        offset: i64,
    ) -> ApiResult<(Vec<PrescriptionRecord>, i64)> {
        let total = query.count(&self.pool).await?;
        let rows: Vec<PrescriptionRow> = query
            .fetch_page(&self.pool, SELECT_PRESCRIPTION, limit, offset)
            .await?;

        Ok((self.with_items(rows).await?, total))
    }

    pub async fn find(&self, id: Uuid) -> ApiResult<Option<PrescriptionRecord>> {
        let mut query = ListQuery::new(PRESCRIPTION_FROM);
        query.filter_eq("p.id", Some(id));
        let rows: Vec<PrescriptionRow> = query.fetch_all(&self.pool, SELECT_PRESCRIPTION).await?;

        Ok(self.with_items(rows).await?.into_iter().next())
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<PrescriptionRecord> {
        self.find(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Prescription"))
    }

    /// Every prescription of a patient, newest first
    pub async fn history(&self, patient_id: Uuid) -> ApiResult<Vec<PrescriptionRecord>> {
        let mut query = ListQuery::new(PRESCRIPTION_FROM);
        query
            .filter_eq("p.patient_id", Some(patient_id))
            .order_by("p.created_at DESC, p.id DESC");
        let rows: Vec<PrescriptionRow> = query.fetch_all(&self.pool, SELECT_PRESCRIPTION).await?;

        self.with_items(rows).await
    }

    /// Medication ids by exact name, for draft items that only carry a name
    pub async fn medication_ids_by_name(&self, names: &[String]) -> ApiResult<HashMap<String, Uuid>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, Uuid)> = sqlx::query_as(
            "SELECT name, id FROM medications WHERE name = ANY($1) ORDER BY created_at ASC",
        )
        .bind(names)
        .fetch_all(&self.pool)
        .await?;

        let mut ids = HashMap::with_capacity(rows.len());
        for (name, id) in rows {
            ids.entry(name).or_insert(id);
        }
        Ok(ids)
    }

    async fn insert_items(
        tx: &mut Transaction<'static, Postgres>,
        prescription_id: Uuid,
        items: &[NewItem],
    ) -> ApiResult<()> {
        for (position, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO prescription_items (
                    prescription_id, medication_id, medication_name, dosage, frequency,
                    duration, instructions, quantity, route, duration_days,
                    is_chronic, is_prn, position
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(prescription_id)
            .bind(item.medication_id)
            .bind(&item.medication_name)
            .bind(&item.dosage)
            .bind(&item.frequency)
            .bind(&item.duration)
            .bind(&item.instructions)
            .bind(item.quantity)
            .bind(&item.route)
            .bind(item.duration_days)
            .bind(item.is_chronic)
            .bind(item.is_prn)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    pub async fn create(&self, new: NewPrescription) -> ApiResult<PrescriptionRecord> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO prescriptions (patient_id, prescriber_id, status, notes, valid_from, valid_until)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(new.patient_id)
        .bind(new.prescriber_id)
        .bind(new.status.as_str())
        .bind(&new.notes)
        .bind(new.valid_from)
        .bind(new.valid_until)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_items(&mut tx, id, &new.items).await?;
        tx.commit().await?;

        tracing::info!(prescription_id = %id, patient_id = %new.patient_id, items = new.items.len(), "Prescription created");
        self.get(id).await
    }

    /// Create a draft, resolving medication names to ids first. Items whose
    /// medication is unknown are left out.
    pub async fn create_draft(&self, draft: NewDraft) -> ApiResult<PrescriptionRecord> {
        let ids = self
            .medication_ids_by_name(&unresolved_names(&draft.items))
            .await?;
        let items = resolve_draft_items(&draft.items, |name| ids.get(name).copied());

        if items.len() < draft.items.len() {
            tracing::info!(
                patient_id = %draft.patient_id,
                skipped = draft.items.len() - items.len(),
                "Draft items without a known medication were skipped"
            );
        }

        self.create(NewPrescription {
            patient_id: draft.patient_id,
            prescriber_id: draft.prescriber_id,
            status: draft.status,
            notes: draft.notes,
            valid_from: draft.valid_from,
            valid_until: draft.valid_until,
            items: items.into_iter().map(NewItem::from).collect(),
        })
        .await
    }

    pub async fn update(&self, id: Uuid, changes: PrescriptionChanges) -> ApiResult<PrescriptionRecord> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE prescriptions SET
                patient_id = COALESCE($2, patient_id),
                status = COALESCE($3, status),
                notes = COALESCE($4, notes),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.patient_id)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(&changes.notes)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::not_found("Prescription"));
        }

        if let Some(items) = &changes.items {
            sqlx::query("DELETE FROM prescription_items WHERE prescription_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::insert_items(&mut tx, id, items).await?;
        }

        tx.commit().await?;
        self.get(id).await
    }

    /// Finalize a prescription of `patient_id`.
    ///
    /// The prescription row stays locked from the item read to the status
    /// change, so an item rewrite through `update` cannot slip a duplicate
    /// past the check. `None` when the prescription does not exist or
    /// belongs to another patient.
    pub async fn finalize_draft(
        &self,
        id: Uuid,
        patient_id: Uuid,
    ) -> ApiResult<Option<PrescriptionRecord>> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> = sqlx::query_scalar(
            "SELECT status FROM prescriptions WHERE id = $1 AND patient_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(patient_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(status) = status else {
            return Ok(None);
        };

        let current = parse_status(&status)?;
        let items = Self::fetch_items(&mut *tx, &[id]).await?;
        let next = finalized_status(current, &items)?;

        if next != current {
            sqlx::query(
                "UPDATE prescriptions SET status = $2, updated_at = NOW() \
                 WHERE id = $1 AND status = $3",
            )
            .bind(id)
            .bind(next.as_str())
            .bind(current.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.find(id).await
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let deleted = sqlx::query("DELETE FROM prescriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(ApiError::not_found("Prescription"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Uuid, with_patient: bool) -> PrescriptionRow {
        PrescriptionRow {
            id,
            patient_id: Uuid::nil(),
            prescriber_id: None,
            prescriber_name: Some("Dra. Helena".to_string()),
            status: "draft".to_string(),
            notes: None,
            valid_from: None,
            valid_until: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            patient_full_name: with_patient.then(|| "João Silva".to_string()),
            patient_document_id: Some("123".to_string()),
            patient_birth_date: None,
            patient_phone: None,
            patient_email: None,
        }
    }

    fn item(prescription_id: Uuid, name: &str) -> ItemRow {
        ItemRow {
            id: Uuid::new_v4(),
            prescription_id,
            medication_id: Uuid::new_v4(),
            medication_name: Some(name.to_string()),
            dosage: "50mg".to_string(),
            frequency: "1x/dia".to_string(),
            duration: "30 dias".to_string(),
            instructions: None,
            quantity: Some(30),
            route: None,
            duration_days: Some(30),
            is_chronic: true,
            is_prn: false,
            medication_generic_name: Some("losartana potássica".to_string()),
            medication_concentration: Some("50mg".to_string()),
            medication_form: Some("tablet".to_string()),
        }
    }

    #[test]
    fn test_assemble_keeps_row_and_item_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let items = vec![
            item(second, "Metformina"),
            item(first, "Losartana"),
            item(second, "AAS"),
        ];

        let records = assemble(vec![row(first, true), row(second, true)], items);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row.id, first);
        assert_eq!(records[0].items.len(), 1);
        let names: Vec<_> = records[1]
            .items
            .iter()
            .filter_map(|i| i.medication_name.as_deref())
            .collect();
        assert_eq!(names, vec!["Metformina", "AAS"]);
    }

    #[test]
    fn test_belongs_to_patient() {
        let id = Uuid::new_v4();
        let record = PrescriptionRecord {
            row: row(id, true),
            items: vec![],
        };

        assert!(record.belongs_to(Uuid::nil()));
        assert!(!record.belongs_to(Uuid::new_v4()));
    }

    #[test]
    fn test_finalized_status() {
        let id = Uuid::new_v4();
        let items = vec![item(id, "Losartana"), item(id, "Metformina")];

        assert_eq!(
            finalized_status(PrescriptionStatus::Draft, &items).unwrap(),
            PrescriptionStatus::Active
        );
    }

    #[test]
    fn test_finalized_status_rejects_duplicates() {
        let id = Uuid::new_v4();
        let first = item(id, "Losartana");
        let mut again = item(id, "Losartana");
        again.medication_id = first.medication_id;

        let err = finalized_status(PrescriptionStatus::Draft, &[first, again]).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Itens duplicados"));
    }

    #[test]
    fn test_snapshot_conversion() {
        let id = Uuid::new_v4();
        let record = PrescriptionRecord {
            row: row(id, true),
            items: vec![item(id, "Losartana")],
        };

        let snapshot = record.snapshot().unwrap();
        assert_eq!(snapshot.status, PrescriptionStatus::Draft);
        assert_eq!(snapshot.prescriber_name.as_deref(), Some("Dra. Helena"));
        assert!(snapshot.items[0].is_chronic);
        assert_eq!(snapshot.items[0].duration_days, Some(30));
    }

    #[test]
    fn test_response_embeds_patient_and_medication() {
        let id = Uuid::new_v4();
        let record = PrescriptionRecord {
            row: row(id, true),
            items: vec![item(id, "Losartana")],
        };

        let json = serde_json::to_value(record.into_response().unwrap()).unwrap();
        assert_eq!(json["status"], "draft");
        assert_eq!(json["patient"]["fullName"], "João Silva");
        assert_eq!(json["items"][0]["medication"]["genericName"], "losartana potássica");
        assert_eq!(json["items"][0]["prescriptionId"], id.to_string());
    }

    #[test]
    fn test_response_without_patient_omits_field() {
        let record = PrescriptionRecord {
            row: row(Uuid::new_v4(), false),
            items: Vec::new(),
        };

        let json = serde_json::to_value(record.into_response().unwrap()).unwrap();
        assert!(json.get("patient").is_none());
    }

    #[test]
    fn test_unknown_status_is_internal() {
        let mut r = row(Uuid::new_v4(), false);
        r.status = "archived".to_string();
        let record = PrescriptionRecord { row: r, items: Vec::new() };

        assert!(record.snapshot().is_err());
    }

    #[test]
    fn test_unresolved_names() {
        let input = |id: Option<Uuid>, name: Option<&str>| DraftItemInput {
            medication_id: id,
            medication_name: name.map(str::to_string),
            dosage: "1cp".to_string(),
            frequency: "1x/dia".to_string(),
            route: None,
            duration_days: None,
            notes: None,
            is_chronic: false,
            is_prn: false,
        };

        let names = unresolved_names(&[
            input(None, Some("Losartana")),
            input(Some(Uuid::new_v4()), Some("Metformina")),
            input(None, Some("")),
            input(None, None),
            input(None, Some("Losartana")),
            input(None, Some("AAS")),
        ]);

        assert_eq!(names, vec!["AAS".to_string(), "Losartana".to_string()]);
    }

    #[test]
    fn test_draft_item_conversion() {
        let draft = DraftItem {
            medication_id: Uuid::new_v4(),
            dosage: "1g".to_string(),
            frequency: "6/6h".to_string(),
            duration: "5 dias".to_string(),
            instructions: Some("se dor".to_string()),
            route: Some("oral".to_string()),
            duration_days: Some(5),
            is_chronic: false,
            is_prn: true,
        };

        let item = NewItem::from(draft.clone());
        assert_eq!(item.medication_id, draft.medication_id);
        assert_eq!(item.instructions.as_deref(), Some("se dor"));
        assert!(item.is_prn);
        assert_eq!(item.quantity, None);
    }
}
