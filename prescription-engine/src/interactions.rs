//! Drug interaction checking.
//!
//! Only a deterministic sample checker ships today; a real interaction
//! database would implement [`DrugInteractionChecker`] as well.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InteractionSeverity {
    Minor,
    Moderate,
    Major,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InteractionWarning {
    pub severity: InteractionSeverity,
    pub description: String,
    pub medications: Vec<String>,
}

impl InteractionWarning {
    /// One-line text used for the clinical warnings of a generated draft
    pub fn summary(&self) -> String {
        format!("{}: {}", self.medications.join(" + "), self.description)
    }
}

#[async_trait]
pub trait DrugInteractionChecker: Send + Sync {
    async fn check(&self, medication_names: &[String]) -> Vec<InteractionWarning>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInteractionChecker;

#[async_trait]
impl DrugInteractionChecker for NoopInteractionChecker {
    async fn check(&self, _medication_names: &[String]) -> Vec<InteractionWarning> {
        Vec::new()
    }
}

/// Fixed sample answers keyed only on how many medications are checked
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleInteractionChecker;

#[async_trait]
impl DrugInteractionChecker for SampleInteractionChecker {
    async fn check(&self, medication_names: &[String]) -> Vec<InteractionWarning> {
        let mut warnings = Vec::new();

        if medication_names.len() >= 2 {
            warnings.push(InteractionWarning {
                severity: InteractionSeverity::Moderate,
                description: "Aumento do risco de sangramento quando usado concomitantemente"
                    .to_string(),
                medications: vec!["Aspirina".to_string(), "Warfarina".to_string()],
            });
        }

        if medication_names.len() >= 3 {
            warnings.push(InteractionWarning {
                severity: InteractionSeverity::Major,
                description: "Interação grave: risco de depressão respiratória".to_string(),
                medications: vec![
                    "Morfina".to_string(),
                    "Diazepam".to_string(),
                    "Álcool".to_string(),
                ],
            });
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("med-{}", i)).collect()
    }

    #[tokio::test]
    async fn test_noop_checker() {
        assert!(NoopInteractionChecker.check(&names(5)).await.is_empty());
    }

    #[tokio::test]
    async fn test_sample_checker_thresholds() {
        let checker = SampleInteractionChecker;

        assert!(checker.check(&names(1)).await.is_empty());

        let two = checker.check(&names(2)).await;
        assert_eq!(two.len(), 1);
        assert_eq!(two[0].severity, InteractionSeverity::Moderate);

        let three = checker.check(&names(3)).await;
        assert_eq!(three.len(), 2);
        assert_eq!(three[1].severity, InteractionSeverity::Major);
        assert_eq!(three[1].medications.len(), 3);
    }

    #[tokio::test]
    async fn test_sample_checker_is_deterministic() {
        let checker = SampleInteractionChecker;

        for _ in 0..20 {
            assert_eq!(checker.check(&names(4)).await.len(), 2);
        }
    }

    #[test]
    fn test_summary_and_serde() {
        let warning = InteractionWarning {
            severity: InteractionSeverity::Moderate,
            description: "risco".to_string(),
            medications: vec!["A".to_string(), "B".to_string()],
        };

        assert_eq!(warning.summary(), "A + B: risco");
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["severity"], "moderate");
    }
}
