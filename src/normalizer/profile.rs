// src/normalizer/profile.rs
use super::{ParseError, enum_or_default, parse_model_output, truthy};
use crate::models::{ProfileEstimate, SurveyProfile};
use serde_json::Value;

pub fn parse_profile(content: &str) -> Result<ProfileEstimate, ParseError> {
    parse_model_output(content).map(|value| normalize_profile(&value))
}

/// Unrecognized values fall back to `20s`, `female`, `unknown` and `medium`.
pub fn normalize_profile(data: &Value) -> ProfileEstimate {
    ProfileEstimate {
        age_band: enum_or_default(&data["age_band"]),
        gender: enum_or_default(&data["gender"]),
        skin_type_preference: enum_or_default(&data["skin_type_preference"]),
        sensitivity_level: enum_or_default(&data["sensitivity_level"]),
    }
}

/// Normalizes the optional `survey` form field. Absent or unparseable input
/// gives the default survey rather than an error.
pub fn normalize_survey(raw: Option<&str>) -> SurveyProfile {
    let data = raw
        .and_then(|text| serde_json::from_str::<Value>(text).ok())
        .filter(Value::is_object)
        .unwrap_or(Value::Null);

    SurveyProfile {
        profile: normalize_profile(&data),
        sensitive_skin: truthy(&data["sensitive_skin"]),
        recent_trouble_increase: truthy(&data["recent_trouble_increase"]),
        irregular_sleep: truthy(&data["irregular_sleep"]),
    }
}
