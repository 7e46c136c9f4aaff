use crate::diff::diff;
use crate::models::{PrescriptionSnapshot, PrescriptionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: Uuid,
    pub version: usize,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub prescriber_name: Option<String>,
    pub total_items: usize,
    pub chronic_count: usize,
    pub prn_count: usize,
    /// Lines added, removed or changed relative to the previous version
    pub changed_count: usize,
}

/// Build a patient's prescription timeline, newest first.
///
/// The newest prescription carries the highest version number and the
/// oldest is version 1. Ties on `created_at` are broken by id so the result
/// does not depend on input order.
pub fn build_timeline(mut prescriptions: Vec<PrescriptionSnapshot>) -> Vec<TimelineEntry> {
    prescriptions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    let total = prescriptions.len();

    prescriptions
        .iter()
        .enumerate()
        .map(|(idx, current)| {
            let changed_count = prescriptions
                .get(idx + 1)
                .map(|older| diff(&older.items, &current.items).len())
                .unwrap_or(0);

            TimelineEntry {
                id: current.id,
                version: total - idx,
                status: current.status,
                created_at: current.created_at,
                valid_from: current.valid_from,
                valid_until: current.valid_until,
                prescriber_name: current.prescriber_name.clone(),
                total_items: current.items.len(),
                chronic_count: current.items.iter().filter(|i| i.is_chronic).count(),
                prn_count: current.items.iter().filter(|i| i.is_prn).count(),
                changed_count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{item, prescription};

    #[test]
    fn test_empty_history() {
        assert!(build_timeline(Vec::new()).is_empty());
    }

    #[test]
    fn test_versions_and_order() {
        let oldest = prescription(1, vec![item("Losartana", "50mg")]);
        let middle = prescription(5, vec![item("Losartana", "50mg")]);
        let newest = prescription(9, vec![]);

        let timeline = build_timeline(vec![middle.clone(), newest.clone(), oldest.clone()]);

        let ids: Vec<Uuid> = timeline.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);
        let versions: Vec<usize> = timeline.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![3, 2, 1]);
    }

    #[test]
    fn test_counts() {
        let mut chronic = item("Losartana", "50mg");
        chronic.is_chronic = true;
        let mut prn = item("Dipirona", "500mg");
        prn.is_prn = true;
        let plain = item("Amoxicilina", "500mg");

        let older = prescription(1, vec![chronic.clone(), plain.clone()]);
        let mut chronic_up = chronic.clone();
        chronic_up.dosage = "100mg".to_string();
        let newer = prescription(2, vec![chronic_up, prn.clone()]);

        let timeline = build_timeline(vec![older, newer]);
        let latest = &timeline[0];

        assert_eq!(latest.total_items, 2);
        assert_eq!(latest.chronic_count, 1);
        assert_eq!(latest.prn_count, 1);
        // one changed, one added, one removed
        assert_eq!(latest.changed_count, 3);
        assert_eq!(timeline[1].changed_count, 0);
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::models::fixtures::prescription;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn versions_are_a_descending_sequence(days in prop::collection::vec(1u32..28, 0..12)) {
            let input: Vec<_> = days.iter().map(|&d| prescription(d, vec![])).collect();
            let timeline = build_timeline(input);

            let versions: Vec<usize> = timeline.iter().map(|e| e.version).collect();
            let expected: Vec<usize> = (1..=days.len()).rev().collect();
            prop_assert_eq!(versions, expected);
            prop_assert!(timeline.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        }
    }
}
