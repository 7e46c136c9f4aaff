use crate::models::ItemSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemChange {
    pub before: ItemSnapshot,
    pub after: ItemSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionDiff {
    pub added: Vec<ItemSnapshot>,
    pub removed: Vec<ItemSnapshot>,
    pub changed: Vec<ItemChange>,
}

impl PrescriptionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Number of lines that differ in any way
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }
}

/// Comparison key of an item: lowercased medication name, or the medication
/// id when the name is unknown.
pub fn item_key(item: &ItemSnapshot) -> String {
    match item.medication_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_lowercase(),
        _ => item.medication_id.to_string(),
    }
}

/// Items keyed in first-seen order; a later item with the same key replaces
/// the earlier one in place.
fn keyed(items: &[ItemSnapshot]) -> (Vec<(String, &ItemSnapshot)>, HashMap<String, usize>) {
    let mut ordered: Vec<(String, &ItemSnapshot)> = Vec::with_capacity(items.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(items.len());

    for item in items {
        let key = item_key(item);
        match positions.get(&key) {
            Some(&pos) => {
                if let Some(slot) = ordered.get_mut(pos) {
                    slot.1 = item;
                }
            }
            None => {
                positions.insert(key.clone(), ordered.len());
                ordered.push((key, item));
            }
        }
    }

    (ordered, positions)
}

fn differs(a: &ItemSnapshot, b: &ItemSnapshot) -> bool {
    a.dosage != b.dosage || a.frequency != b.frequency || a.duration != b.duration
}

/// Compare prescription `a` (before) with `b` (after).
pub fn diff(a: &[ItemSnapshot], b: &[ItemSnapshot]) -> PrescriptionDiff {
    let (ordered_a, positions_a) = keyed(a);
    let (ordered_b, positions_b) = keyed(b);

    let mut result = PrescriptionDiff::default();

    for (key, after) in &ordered_b {
        let before = positions_a
            .get(key)
            .and_then(|&pos| ordered_a.get(pos))
            .map(|(_, item)| *item);

        match before {
            None => result.added.push((*after).clone()),
            Some(before) if differs(before, after) => result.changed.push(ItemChange {
                before: before.clone(),
                after: (*after).clone(),
            }),
            Some(_) => {}
        }
    }

    for (key, before) in &ordered_a {
        if !positions_b.contains_key(key) {
            result.removed.push((*before).clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::item;

    #[test]
    fn test_added_removed_changed() {
        let losartana = item("Losartana", "50mg");
        let metformina = item("Metformina", "850mg");
        let aas = item("AAS", "100mg");

        let mut losartana_up = losartana.clone();
        losartana_up.dosage = "100mg".to_string();
        let sinvastatina = item("Sinvastatina", "20mg");

        let a = vec![losartana.clone(), metformina.clone(), aas.clone()];
        let b = vec![losartana_up.clone(), aas.clone(), sinvastatina.clone()];

        let d = diff(&a, &b);

        assert_eq!(d.added, vec![sinvastatina]);
        assert_eq!(d.removed, vec![metformina]);
        assert_eq!(
            d.changed,
            vec![ItemChange {
                before: losartana,
                after: losartana_up
            }]
        );
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn test_name_match_is_case_insensitive() {
        let a = vec![item("Dipirona", "500mg")];
        let b = vec![item("DIPIRONA", "500mg")];

        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn test_frequency_and_duration_changes() {
        let before = item("Amoxicilina", "500mg");
        let mut freq = before.clone();
        freq.frequency = "12/12h".to_string();
        let mut dur = before.clone();
        dur.duration = "10 dias".to_string();

        assert_eq!(diff(&[before.clone()], &[freq]).changed.len(), 1);
        assert_eq!(diff(&[before], &[dur]).changed.len(), 1);
    }

    #[test]
    fn test_instructions_do_not_count_as_change() {
        let before = item("Omeprazol", "20mg");
        let mut after = before.clone();
        after.instructions = Some("em jejum".to_string());

        assert!(diff(&[before], &[after]).is_empty());
    }

    #[test]
    fn test_falls_back_to_medication_id() {
        let mut a = item("x", "1mg");
        a.medication_name = None;
        let mut b = a.clone();
        b.id = uuid::Uuid::new_v4();

        assert!(diff(&[a.clone()], &[b]).is_empty());
        assert_eq!(item_key(&a), a.medication_id.to_string());
    }

    #[test]
    fn test_later_duplicate_overrides_earlier() {
        let first = item("Paracetamol", "500mg");
        let second = item("Paracetamol", "750mg");

        let d = diff(&[item("Paracetamol", "750mg")], &[first, second]);

        assert!(d.is_empty());
    }

    #[test]
    fn test_diff_serializes_shape() {
        let d = diff(&[], &[item("Losartana", "50mg")]);
        let json = serde_json::to_value(&d).unwrap();

        assert_eq!(json["added"].as_array().map(Vec::len), Some(1));
        assert!(json["removed"].as_array().is_some());
        assert!(json["changed"].as_array().is_some());
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::models::fixtures::item;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn items_strategy() -> impl Strategy<Value = Vec<ItemSnapshot>> {
        prop::collection::vec(
            ("[a-e]", prop::sample::select(vec!["5mg", "10mg", "20mg"])),
            0..8,
        )
        .prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(name, dose)| item(&name, dose))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn diff_with_self_is_empty(items in items_strategy()) {
            prop_assert!(diff(&items, &items).is_empty());
        }

        #[test]
        fn added_and_removed_follow_key_sets(a in items_strategy(), b in items_strategy()) {
            let keys_a: HashSet<String> = a.iter().map(item_key).collect();
            let keys_b: HashSet<String> = b.iter().map(item_key).collect();
            let d = diff(&a, &b);

            prop_assert_eq!(d.added.len(), keys_b.difference(&keys_a).count());
            prop_assert_eq!(d.removed.len(), keys_a.difference(&keys_b).count());
            prop_assert!(d.changed.len() <= keys_a.intersection(&keys_b).count());
        }

        #[test]
        fn reversed_diff_swaps_sides(a in items_strategy(), b in items_strategy()) {
            let forward = diff(&a, &b);
            let backward = diff(&b, &a);

            prop_assert_eq!(forward.added.len(), backward.removed.len());
            prop_assert_eq!(forward.removed.len(), backward.added.len());
            prop_assert_eq!(forward.changed.len(), backward.changed.len());
        }
    }
}
