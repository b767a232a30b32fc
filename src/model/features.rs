//! Health metric inputs and their numeric encoding.
//!
//! [`HealthMetrics`] is the typed form of one questionnaire submission. The
//! same encoding is used at training time (CSV rows) and at prediction time
//! (HTML form / JSON body), so the model always sees identical feature codes.

use serde::{Deserialize, Serialize};

/// Number of model input features.
pub const FEATURE_COUNT: usize = 37;

/// Feature column names, in model input order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Age",
    "Gender",
    "Family_History_CVD",
    "Family_History_Diabetes",
    "Family_History_Obesity",
    "Family_History_Respiratory",
    "Family_History_Mental",
    "Smoking",
    "Alcohol_Consumption",
    "BMI",
    "Systolic_BP",
    "Diastolic_BP",
    "Blood_Glucose",
    "LDL",
    "HDL",
    "Heart_Rate",
    "Physical_Activity_Hours_Per_Week",
    "Sleep_Hours_Per_Day",
    "Water_Intake_Liters_Per_Day",
    "Screen_Time_Hours_Per_Day",
    "Chest_Pain",
    "Shortness_of_Breath",
    "Fatigue",
    "Chronic_Cough",
    "Mood_Swings",
    "Frequent_Urination",
    "Increased_Thirst",
    "Sudden_Weight_Change",
    "Poor_Concentration",
    "Anxiety_Level",
    "Allergy_History",
    "Appetite_Changes",
    "Diet_Type",
    "Air_Pollution_Exposure",
    "Noise_Exposure",
    "Sleep_Quality",
    "Stress_Level",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeatureError {
    #[error("missing field '{field}'")]
    Missing { field: &'static str },
    #[error("field '{field}' has invalid number '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field '{field}' has unknown value '{value}' (expected one of: {expected})")]
    UnknownCategory {
        field: &'static str,
        value: String,
        expected: String,
    },
}

/// Generate a categorical input enum with its display labels and integer codes.
///
/// Produces serde (de)serialization by label, `ALL`, `label()`, `code()` and
/// `from_label()`.
macro_rules! categorical {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $label:literal => $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn code(self) -> u8 {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            pub fn from_label(label: &str) -> Option<Self> {
                match label {
                    $($label => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn labels() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.label()).collect()
            }
        }
    };
}

categorical!(Gender { Male = "Male" => 0, Female = "Female" => 1 });

categorical!(YesNo { No = "No" => 0, Yes = "Yes" => 1 });

categorical!(Alcohol {
    None = "None" => 0,
    Moderate = "Moderate" => 1,
    High = "High" => 2,
});

categorical!(Diet {
    HighSugar = "High-Sugar" => 0,
    HighProtein = "High-Protein" => 1,
    Balanced = "Balanced" => 2,
});

categorical!(
    /// Shared scale for pollution, noise and stress exposure.
    Level {
        Low = "Low" => 0,
        Medium = "Medium" => 1,
        High = "High" => 2,
    }
);

/// How a questionnaire field is entered and parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Decimal,
    Choice(&'static [&'static str]),
}

/// Questionnaire field description used to render the input form.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

const GENDER: &[&str] = &["Male", "Female"];
const YES_NO: &[&str] = &["No", "Yes"];
const ALCOHOL: &[&str] = &["None", "Moderate", "High"];
const DIET: &[&str] = &["High-Sugar", "High-Protein", "Balanced"];
const LEVEL: &[&str] = &["Low", "Medium", "High"];

const fn spec(name: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, label, kind }
}

/// All questionnaire fields in model input order.
pub const FIELDS: [FieldSpec; FEATURE_COUNT] = {
    use FieldKind::*;
    [
        spec("Age", "Age", Integer),
        spec("Gender", "Gender", Choice(GENDER)),
        spec("Family_History_CVD", "Family history of heart disease", Choice(YES_NO)),
        spec("Family_History_Diabetes", "Family history of diabetes", Choice(YES_NO)),
        spec("Family_History_Obesity", "Family history of obesity", Choice(YES_NO)),
        spec("Family_History_Respiratory", "Family history of respiratory disease", Choice(YES_NO)),
        spec("Family_History_Mental", "Family history of mental illness", Choice(YES_NO)),
        spec("Smoking", "Smoking", Choice(YES_NO)),
        spec("Alcohol_Consumption", "Alcohol consumption", Choice(ALCOHOL)),
        spec("BMI", "BMI", Decimal),
        spec("Systolic_BP", "Systolic blood pressure", Decimal),
        spec("Diastolic_BP", "Diastolic blood pressure", Decimal),
        spec("Blood_Glucose", "Blood glucose", Decimal),
        spec("LDL", "LDL cholesterol", Decimal),
        spec("HDL", "HDL cholesterol", Decimal),
        spec("Heart_Rate", "Resting heart rate", Decimal),
        spec("Physical_Activity_Hours_Per_Week", "Physical activity (hours/week)", Decimal),
        spec("Sleep_Hours_Per_Day", "Sleep (hours/day)", Decimal),
        spec("Water_Intake_Liters_Per_Day", "Water intake (liters/day)", Decimal),
        spec("Screen_Time_Hours_Per_Day", "Screen time (hours/day)", Decimal),
        spec("Chest_Pain", "Chest pain", Integer),
        spec("Shortness_of_Breath", "Shortness of breath", Integer),
        spec("Fatigue", "Fatigue", Integer),
        spec("Chronic_Cough", "Chronic cough", Integer),
        spec("Mood_Swings", "Mood swings", Integer),
        spec("Frequent_Urination", "Frequent urination", Integer),
        spec("Increased_Thirst", "Increased thirst", Integer),
        spec("Sudden_Weight_Change", "Sudden weight change", Integer),
        spec("Poor_Concentration", "Poor concentration", Integer),
        spec("Anxiety_Level", "Anxiety level", Integer),
        spec("Allergy_History", "Allergy history", Integer),
        spec("Appetite_Changes", "Appetite changes", Integer),
        spec("Diet_Type", "Diet type", Choice(DIET)),
        spec("Air_Pollution_Exposure", "Air pollution exposure", Choice(LEVEL)),
        spec("Noise_Exposure", "Noise exposure", Choice(LEVEL)),
        spec("Sleep_Quality", "Sleep quality", Integer),
        spec("Stress_Level", "Stress level", Choice(LEVEL)),
    ]
};

/// One questionnaire submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "Gender")]
    pub gender: Gender,
    #[serde(rename = "Family_History_CVD")]
    pub family_history_cvd: YesNo,
    #[serde(rename = "Family_History_Diabetes")]
    pub family_history_diabetes: YesNo,
    #[serde(rename = "Family_History_Obesity")]
    pub family_history_obesity: YesNo,
    #[serde(rename = "Family_History_Respiratory")]
    pub family_history_respiratory: YesNo,
    #[serde(rename = "Family_History_Mental")]
    pub family_history_mental: YesNo,
    #[serde(rename = "Smoking")]
    pub smoking: YesNo,
    #[serde(rename = "Alcohol_Consumption")]
    pub alcohol_consumption: Alcohol,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "Systolic_BP")]
    pub systolic_bp: f64,
    #[serde(rename = "Diastolic_BP")]
    pub diastolic_bp: f64,
    #[serde(rename = "Blood_Glucose")]
    pub blood_glucose: f64,
    #[serde(rename = "LDL")]
    pub ldl: f64,
    #[serde(rename = "HDL")]
    pub hdl: f64,
    #[serde(rename = "Heart_Rate")]
    pub heart_rate: f64,
    #[serde(rename = "Physical_Activity_Hours_Per_Week")]
    pub physical_activity_hours_per_week: f64,
    #[serde(rename = "Sleep_Hours_Per_Day")]
    pub sleep_hours_per_day: f64,
    #[serde(rename = "Water_Intake_Liters_Per_Day")]
    pub water_intake_liters_per_day: f64,
    #[serde(rename = "Screen_Time_Hours_Per_Day")]
    pub screen_time_hours_per_day: f64,
    #[serde(rename = "Chest_Pain")]
    pub chest_pain: i64,
    #[serde(rename = "Shortness_of_Breath")]
    pub shortness_of_breath: i64,
    #[serde(rename = "Fatigue")]
    pub fatigue: i64,
    #[serde(rename = "Chronic_Cough")]
    pub chronic_cough: i64,
    #[serde(rename = "Mood_Swings")]
    pub mood_swings: i64,
    #[serde(rename = "Frequent_Urination")]
    pub frequent_urination: i64,
    #[serde(rename = "Increased_Thirst")]
    pub increased_thirst: i64,
    #[serde(rename = "Sudden_Weight_Change")]
    pub sudden_weight_change: i64,
    #[serde(rename = "Poor_Concentration")]
    pub poor_concentration: i64,
    #[serde(rename = "Anxiety_Level")]
    pub anxiety_level: i64,
    #[serde(rename = "Allergy_History")]
    pub allergy_history: i64,
    #[serde(rename = "Appetite_Changes")]
    pub appetite_changes: i64,
    #[serde(rename = "Diet_Type")]
    pub diet_type: Diet,
    #[serde(rename = "Air_Pollution_Exposure")]
    pub air_pollution_exposure: Level,
    #[serde(rename = "Noise_Exposure")]
    pub noise_exposure: Level,
    #[serde(rename = "Sleep_Quality")]
    pub sleep_quality: i64,
    #[serde(rename = "Stress_Level")]
    pub stress_level: Level,
}

/// Field reader over any string-keyed source (form map, CSV record).
struct Fields<F> {
    lookup: F,
}

impl<'a, F> Fields<F>
where
    F: Fn(&str) -> Option<&'a str>,
{
    fn raw(&self, field: &'static str) -> Result<&'a str, FeatureError> {
        (self.lookup)(field)
            .map(str::trim)
            .ok_or(FeatureError::Missing { field })
    }

    fn int(&self, field: &'static str) -> Result<i64, FeatureError> {
        let value = self.raw(field)?;
        value.parse().map_err(|_| FeatureError::InvalidNumber {
            field,
            value: value.to_string(),
        })
    }

    fn float(&self, field: &'static str) -> Result<f64, FeatureError> {
        let value = self.raw(field)?;
        match value.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(FeatureError::InvalidNumber {
                field,
                value: value.to_string(),
            }),
        }
    }

    fn choice<T>(
        &self,
        field: &'static str,
        parse: fn(&str) -> Option<T>,
        labels: fn() -> Vec<&'static str>,
    ) -> Result<T, FeatureError> {
        let value = self.raw(field)?;
        parse(value).ok_or_else(|| FeatureError::UnknownCategory {
            field,
            value: value.to_string(),
            expected: labels().join(", "),
        })
    }
}

impl HealthMetrics {
    /// Build from a lookup of field name to raw text value.
    ///
    /// Values are trimmed; categorical labels must match exactly.
    pub fn from_lookup<'a, F>(lookup: F) -> Result<Self, FeatureError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let f = Fields { lookup };
        let yes_no = |name| f.choice(name, YesNo::from_label, YesNo::labels);
        let level = |name| f.choice(name, Level::from_label, Level::labels);

        Ok(Self {
            age: f.int("Age")?,
            gender: f.choice("Gender", Gender::from_label, Gender::labels)?,
            family_history_cvd: yes_no("Family_History_CVD")?,
            family_history_diabetes: yes_no("Family_History_Diabetes")?,
            family_history_obesity: yes_no("Family_History_Obesity")?,
            family_history_respiratory: yes_no("Family_History_Respiratory")?,
            family_history_mental: yes_no("Family_History_Mental")?,
            smoking: yes_no("Smoking")?,
            alcohol_consumption: f.choice(
                "Alcohol_Consumption",
                Alcohol::from_label,
                Alcohol::labels,
            )?,
            bmi: f.float("BMI")?,
            systolic_bp: f.float("Systolic_BP")?,
            diastolic_bp: f.float("Diastolic_BP")?,
            blood_glucose: f.float("Blood_Glucose")?,
            ldl: f.float("LDL")?,
            hdl: f.float("HDL")?,
            heart_rate: f.float("Heart_Rate")?,
            physical_activity_hours_per_week: f.float("Physical_Activity_Hours_Per_Week")?,
            sleep_hours_per_day: f.float("Sleep_Hours_Per_Day")?,
            water_intake_liters_per_day: f.float("Water_Intake_Liters_Per_Day")?,
            screen_time_hours_per_day: f.float("Screen_Time_Hours_Per_Day")?,
            chest_pain: f.int("Chest_Pain")?,
            shortness_of_breath: f.int("Shortness_of_Breath")?,
            fatigue: f.int("Fatigue")?,
            chronic_cough: f.int("Chronic_Cough")?,
            mood_swings: f.int("Mood_Swings")?,
            frequent_urination: f.int("Frequent_Urination")?,
            increased_thirst: f.int("Increased_Thirst")?,
            sudden_weight_change: f.int("Sudden_Weight_Change")?,
            poor_concentration: f.int("Poor_Concentration")?,
            anxiety_level: f.int("Anxiety_Level")?,
            allergy_history: f.int("Allergy_History")?,
            appetite_changes: f.int("Appetite_Changes")?,
            diet_type: f.choice("Diet_Type", Diet::from_label, Diet::labels)?,
            air_pollution_exposure: level("Air_Pollution_Exposure")?,
            noise_exposure: level("Noise_Exposure")?,
            sleep_quality: f.int("Sleep_Quality")?,
            stress_level: level("Stress_Level")?,
        })
    }

    /// Encode into the model input vector (order matches [`FEATURE_NAMES`]).
    pub fn to_features(&self) -> [f64; FEATURE_COUNT] {
        let c = |code: u8| f64::from(code);
        [
            self.age as f64,
            c(self.gender.code()),
            c(self.family_history_cvd.code()),
            c(self.family_history_diabetes.code()),
            c(self.family_history_obesity.code()),
            c(self.family_history_respiratory.code()),
            c(self.family_history_mental.code()),
            c(self.smoking.code()),
            c(self.alcohol_consumption.code()),
            self.bmi,
            self.systolic_bp,
            self.diastolic_bp,
            self.blood_glucose,
            self.ldl,
            self.hdl,
            self.heart_rate,
            self.physical_activity_hours_per_week,
            self.sleep_hours_per_day,
            self.water_intake_liters_per_day,
            self.screen_time_hours_per_day,
            self.chest_pain as f64,
            self.shortness_of_breath as f64,
            self.fatigue as f64,
            self.chronic_cough as f64,
            self.mood_swings as f64,
            self.frequent_urination as f64,
            self.increased_thirst as f64,
            self.sudden_weight_change as f64,
            self.poor_concentration as f64,
            self.anxiety_level as f64,
            self.allergy_history as f64,
            self.appetite_changes as f64,
            c(self.diet_type.code()),
            c(self.air_pollution_exposure.code()),
            c(self.noise_exposure.code()),
            self.sleep_quality as f64,
            c(self.stress_level.code()),
        ]
    }
}
