use crate::error::{PrescriptionError, PrescriptionResult};
use crate::models::{ItemSnapshot, PrescriptionStatus};
use std::collections::{BTreeSet, HashSet};

/// Validate a prescription for finalization and return its new status.
///
/// A medication may appear only once. Drafts become active; every other
/// status is returned unchanged so finalizing twice is harmless.
pub fn finalize(
    status: PrescriptionStatus,
    items: &[ItemSnapshot],
) -> PrescriptionResult<PrescriptionStatus> {
    let mut seen = HashSet::new();
    let duplicates: BTreeSet<String> = items
        .iter()
        .filter(|item| !seen.insert(item.medication_id))
        .map(|item| item.medication_id.to_string())
        .collect();

    if !duplicates.is_empty() {
        return Err(PrescriptionError::DuplicateItems(
            duplicates.into_iter().collect(),
        ));
    }

    Ok(match status {
        PrescriptionStatus::Draft => PrescriptionStatus::Active,
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::item;

    #[test]
    fn test_draft_becomes_active() {
        let items = vec![item("Losartana", "50mg"), item("Metformina", "850mg")];

        assert_eq!(
            finalize(PrescriptionStatus::Draft, &items).unwrap(),
            PrescriptionStatus::Active
        );
    }

    #[test]
    fn test_other_statuses_unchanged() {
        for status in [
            PrescriptionStatus::Active,
            PrescriptionStatus::Completed,
            PrescriptionStatus::Cancelled,
        ] {
            assert_eq!(finalize(status, &[]).unwrap(), status);
        }
    }

    #[test]
    fn test_duplicates_rejected_sorted_once() {
        let a = item("Losartana", "50mg");
        let mut a2 = item("Losartana", "100mg");
        a2.medication_id = a.medication_id;
        let mut a3 = item("Losartana", "25mg");
        a3.medication_id = a.medication_id;
        let b = item("Metformina", "850mg");
        let mut b2 = item("Glifage", "850mg");
        b2.medication_id = b.medication_id;

        let err = finalize(PrescriptionStatus::Draft, &[a.clone(), b.clone(), a2, b2, a3]).unwrap_err();

        let mut expected = vec![a.medication_id.to_string(), b.medication_id.to_string()];
        expected.sort();
        assert_eq!(err, PrescriptionError::DuplicateItems(expected.clone()));
        assert_eq!(err.to_string(), format!("Itens duplicados: {}", expected.join(", ")));
    }

    #[test]
    fn test_same_name_different_ids_allowed() {
        let items = vec![item("Dipirona", "500mg"), item("Dipirona", "1g")];

        assert!(finalize(PrescriptionStatus::Draft, &items).is_ok());
    }
}
