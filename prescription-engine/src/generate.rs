//! Next-prescription suggestion and draft item resolution.

use crate::models::{ItemSnapshot, PrescriptionSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

fn enabled() -> bool {
    true
}

/// Switches accepted by the generate-next endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateNextOptions {
    /// Keep medications flagged as continuous use
    #[serde(default = "enabled")]
    pub carry_chronics: bool,
    /// Drop non-continuous medications that had a fixed course length
    #[serde(default = "enabled")]
    pub skip_time_limited: bool,
    #[serde(default)]
    pub copy_notes: bool,
    /// Carry each item's course length into the new draft
    #[serde(default = "enabled")]
    pub adjust_end_dates: bool,
    #[serde(default = "enabled")]
    pub exclude_duplicates: bool,
}

impl Default for GenerateNextOptions {
    fn default() -> Self {
        Self {
            carry_chronics: true,
            skip_time_limited: true,
            copy_notes: false,
            adjust_end_dates: true,
            exclude_duplicates: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedItem {
    pub medication_id: Uuid,
    pub medication_name: Option<String>,
    pub dosage: String,
    pub frequency: String,
    pub route: Option<String>,
    pub duration_days: Option<i32>,
    pub is_chronic: bool,
    pub is_prn: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextSuggestion {
    pub notes: Option<String>,
    pub items: Vec<SuggestedItem>,
    pub warnings: Vec<String>,
}

impl NextSuggestion {
    /// Draft inputs for the suggested items. Course lengths are kept only
    /// when `adjust_end_dates` is set.
    pub fn draft_inputs(&self, options: &GenerateNextOptions) -> Vec<DraftItemInput> {
        self.items
            .iter()
            .map(|item| DraftItemInput {
                medication_id: Some(item.medication_id),
                medication_name: item.medication_name.clone(),
                dosage: item.dosage.clone(),
                frequency: item.frequency.clone(),
                route: item.route.clone(),
                duration_days: if options.adjust_end_dates {
                    item.duration_days
                } else {
                    None
                },
                notes: None,
                is_chronic: item.is_chronic,
                is_prn: item.is_prn,
            })
            .collect()
    }
}

fn display_name(item: &ItemSnapshot) -> String {
    item.medication_name
        .clone()
        .unwrap_or_else(|| item.medication_id.to_string())
}

/// Propose the next prescription from the patient's latest one.
pub fn suggest_next(
    latest: Option<&PrescriptionSnapshot>,
    options: &GenerateNextOptions,
) -> NextSuggestion {
    let Some(base) = latest else {
        return NextSuggestion::default();
    };

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(base.items.len());
    let mut warnings = Vec::new();

    for item in &base.items {
        if options.exclude_duplicates && !seen.insert(item.medication_id) {
            debug!(medication_id = %item.medication_id, "Skipping duplicated medication");
            continue;
        }

        if item.is_chronic && !options.carry_chronics {
            continue;
        }

        if options.skip_time_limited && !item.is_chronic {
            if let Some(days) = item.duration_days.filter(|d| *d > 0) {
                warnings.push(format!(
                    "{}: tratamento de {} dias não foi repetido",
                    display_name(item),
                    days
                ));
                continue;
            }
        }

        items.push(SuggestedItem {
            medication_id: item.medication_id,
            medication_name: item.medication_name.clone(),
            dosage: item.dosage.clone(),
            frequency: item.frequency.clone(),
            route: item.route.clone(),
            duration_days: item.duration_days,
            is_chronic: item.is_chronic,
            is_prn: item.is_prn,
        });
    }

    NextSuggestion {
        notes: if options.copy_notes {
            base.notes.clone()
        } else {
            None
        },
        items,
        warnings,
    }
}

/// Item of a draft as submitted by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftItemInput {
    pub medication_id: Option<Uuid>,
    pub medication_name: Option<String>,
    pub dosage: String,
    pub frequency: String,
    pub route: Option<String>,
    pub duration_days: Option<i32>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_chronic: bool,
    #[serde(default)]
    pub is_prn: bool,
}

/// Item ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftItem {
    pub medication_id: Uuid,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
    pub route: Option<String>,
    pub duration_days: Option<i32>,
    pub is_chronic: bool,
    pub is_prn: bool,
}

/// Human readable duration stored on draft items
pub fn draft_duration(duration_days: Option<i32>) -> String {
    match duration_days {
        Some(days) if days > 0 => format!("{} dias", days),
        _ => "uso conforme orientação".to_string(),
    }
}

/// Resolve each input to a medication and shape it for storage.
///
/// `lookup` maps a medication name to its id. Inputs that resolve to no
/// medication are skipped.
pub fn resolve_draft_items<F>(inputs: &[DraftItemInput], mut lookup: F) -> Vec<DraftItem>
where
    F: FnMut(&str) -> Option<Uuid>,
{
    inputs
        .iter()
        .filter_map(|input| {
            let medication_id = input.medication_id.or_else(|| {
                input
                    .medication_name
                    .as_deref()
                    .filter(|name| !name.is_empty())
                    .and_then(&mut lookup)
            });

            let Some(medication_id) = medication_id else {
                debug!(name = ?input.medication_name, "Draft item without a known medication skipped");
                return None;
            };

            Some(DraftItem {
                medication_id,
                dosage: input.dosage.clone(),
                frequency: input.frequency.clone(),
                duration: draft_duration(input.duration_days),
                instructions: input.notes.clone(),
                route: input.route.clone(),
                duration_days: input.duration_days,
                is_chronic: input.is_chronic,
                is_prn: input.is_prn,
            })
        })
        .collect()
}
