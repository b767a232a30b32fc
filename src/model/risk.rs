//! The five risk categories and the assessment built from a prediction.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const RISK_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskKind {
    #[serde(rename = "CVD Risk")]
    Cardiovascular,
    #[serde(rename = "Diabetes Risk")]
    Diabetes,
    #[serde(rename = "Obesity Risk")]
    Obesity,
    #[serde(rename = "Respiratory Risk")]
    Respiratory,
    #[serde(rename = "Mental Health Risk")]
    MentalHealth,
}

impl RiskKind {
    /// Model output order.
    pub const ALL: [RiskKind; RISK_COUNT] = [
        RiskKind::Cardiovascular,
        RiskKind::Diabetes,
        RiskKind::Obesity,
        RiskKind::Respiratory,
        RiskKind::MentalHealth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RiskKind::Cardiovascular => "CVD Risk",
            RiskKind::Diabetes => "Diabetes Risk",
            RiskKind::Obesity => "Obesity Risk",
            RiskKind::Respiratory => "Respiratory Risk",
            RiskKind::MentalHealth => "Mental Health Risk",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Dataset column holding this target.
    pub fn target_column(self) -> &'static str {
        match self {
            RiskKind::Cardiovascular => "CVD_Risk_Percentage",
            RiskKind::Diabetes => "Diabetes_Risk_Percentage",
            RiskKind::Obesity => "Obesity_Risk_Percentage",
            RiskKind::Respiratory => "Respiratory_Risk_Percentage",
            RiskKind::MentalHealth => "Mental_Health_Risk_Percentage",
        }
    }

    pub fn causes(self) -> &'static str {
        match self {
            RiskKind::Cardiovascular => {
                "Possible causes: High BP, High LDL, Low HDL, Smoking, Obesity, Poor diet, Low physical activity."
            }
            RiskKind::Diabetes => {
                "Possible causes: High BMI, High blood glucose, Family history, Sedentary lifestyle, High sugar intake."
            }
            RiskKind::Obesity => {
                "Possible causes: High BMI, Poor diet, Low activity, Stress, Poor sleep, Family history."
            }
            RiskKind::Respiratory => {
                "Possible causes: Smoking, Air pollution, Chronic cough, Shortness of breath, Family history."
            }
            RiskKind::MentalHealth => {
                "Possible causes: High stress, Poor sleep, Anxiety, Mood swings, Family history."
            }
        }
    }

    pub fn recovery(self) -> &'static str {
        match self {
            RiskKind::Cardiovascular => {
                "How to recover: Quit smoking, Exercise, Balanced diet, Control BP/Cholesterol, Manage stress."
            }
            RiskKind::Diabetes => {
                "How to recover: Weight management, Regular exercise, Balanced diet, Monitor blood sugar, Adequate sleep."
            }
            RiskKind::Obesity => {
                "How to recover: Reduce calorie intake, Increase physical activity, Stress management, Sleep hygiene."
            }
            RiskKind::Respiratory => {
                "How to recover: Quit smoking, Reduce pollution exposure, Breathing exercises, Medical checkup."
            }
            RiskKind::MentalHealth => {
                "How to recover: Stress reduction techniques, Mindfulness, Adequate sleep, Social support, Therapy."
            }
        }
    }
}

impl std::fmt::Display for RiskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Rounded risk percentages plus the category with the largest value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Percentages in [`RiskKind::ALL`] order, rounded to two decimals.
    pub risks: IndexMap<RiskKind, f64>,
    pub highest: RiskKind,
}

impl RiskAssessment {
    /// Ties go to the category that comes first in model output order.
    pub fn from_prediction(raw: [f64; RISK_COUNT]) -> Self {
        let risks: IndexMap<RiskKind, f64> = RiskKind::ALL
            .into_iter()
            .zip(raw)
            .map(|(kind, value)| (kind, round2(value)))
            .collect();

        let mut highest = RiskKind::ALL[0];
        let mut highest_value = f64::NEG_INFINITY;
        for (&kind, &value) in &risks {
            if value > highest_value {
                highest = kind;
                highest_value = value;
            }
        }

        Self { risks, highest }
    }

    pub fn get(&self, kind: RiskKind) -> f64 {
        self.risks.get(&kind).copied().unwrap_or_default()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
