use crate::error::{PrescriptionError, PrescriptionResult};
use crate::generate::DraftItemInput;
use crate::models::ItemSnapshot;
use uuid::Uuid;

/// Pick the items of an earlier prescription to copy into a new draft.
///
/// Prescription order is preserved regardless of the order of `item_ids`;
/// ids that do not belong to the prescription are ignored.
pub fn select_for_reuse(
    items: &[ItemSnapshot],
    item_ids: &[Uuid],
) -> PrescriptionResult<Vec<DraftItemInput>> {
    let selected: Vec<DraftItemInput> = items
        .iter()
        .filter(|item| item_ids.contains(&item.id))
        .map(DraftItemInput::from)
        .collect();

    if selected.is_empty() {
        return Err(PrescriptionError::NothingSelected);
    }

    Ok(selected)
}

impl From<&ItemSnapshot> for DraftItemInput {
    fn from(item: &ItemSnapshot) -> Self {
        DraftItemInput {
            medication_id: Some(item.medication_id),
            medication_name: item.medication_name.clone(),
            dosage: item.dosage.clone(),
            frequency: item.frequency.clone(),
            route: item.route.clone(),
            duration_days: item.duration_days,
            notes: item.instructions.clone(),
            is_chronic: item.is_chronic,
            is_prn: item.is_prn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::item;

    #[test]
    fn test_selection_keeps_prescription_order() {
        let a = item("Losartana", "50mg");
        let b = item("Metformina", "850mg");
        let c = item("AAS", "100mg");
        let items = vec![a.clone(), b, c.clone()];

        let selected = select_for_reuse(&items, &[c.id, a.id]).unwrap();

        let ids: Vec<_> = selected.iter().filter_map(|i| i.medication_id).collect();
        assert_eq!(ids, vec![a.medication_id, c.medication_id]);
        assert_eq!(selected[0].dosage, "50mg");
    }

    #[test]
    fn test_nothing_selected() {
        let items = vec![item("Losartana", "50mg")];

        assert_eq!(
            select_for_reuse(&items, &[Uuid::new_v4()]),
            Err(PrescriptionError::NothingSelected)
        );
        assert_eq!(
            select_for_reuse(&items, &[]).unwrap_err().to_string(),
            "Nenhum item selecionado"
        );
    }

    #[test]
    fn test_instructions_become_notes() {
        let mut it = item("Omeprazol", "20mg");
        it.instructions = Some("em jejum".to_string());
        it.duration_days = Some(14);

        let selected = select_for_reuse(&[it.clone()], &[it.id]).unwrap();

        assert_eq!(selected[0].notes.as_deref(), Some("em jejum"));
        assert_eq!(selected[0].duration_days, Some(14));
    }
}
