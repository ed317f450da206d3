// src/normalizer/precheck.rs
use super::{ParseError, enum_or_default, numeric, parse_model_output, string_list, truthy};
use crate::models::{Level, PrecheckResult};
use serde_json::Value;

const MAX_ISSUES: usize = 10;

pub const PASS_DETAIL: &str = "사진 검증 통과";
const GENERIC_REJECT_DETAIL: &str =
    "업로드 조건을 충족하지 못했습니다. 정면 실사 얼굴 사진으로 다시 시도해 주세요.";

/// Local eligibility rules, checked on top of the upstream verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecheckRule {
    NotRealPhoto,
    FaceCount,
    NotFrontal,
    HeavyOcclusion,
    Blurry,
    PoorLighting,
}

impl PrecheckRule {
    pub fn message(&self) -> &'static str {
        match self {
            PrecheckRule::NotRealPhoto => "실제 인물 사진이 아닙니다 (애니/캐릭터/일러스트 불가)",
            PrecheckRule::FaceCount => "얼굴이 정확히 1명만 보여야 합니다",
            PrecheckRule::NotFrontal => "정면 얼굴 사진이 필요합니다",
            PrecheckRule::HeavyOcclusion => "얼굴 가림이 심합니다 (마스크/손/머리카락/소품)",
            PrecheckRule::Blurry => "사진이 흐릿합니다",
            PrecheckRule::PoorLighting => "조명이 어둡거나 그림자가 심합니다",
        }
    }
}

pub fn parse_precheck(content: &str) -> Result<PrecheckResult, ParseError> {
    parse_model_output(content).map(|value| normalize_precheck(&value))
}

/// Builds the final verdict: the upstream `pass` flag AND every local rule.
pub fn normalize_precheck(data: &Value) -> PrecheckResult {
    let mut result = PrecheckResult {
        pass: truthy(&data["pass"]),
        is_real_human_photo: truthy(&data["is_real_human_photo"]),
        looks_like_anime_or_character: truthy(&data["looks_like_anime_or_character"]),
        face_count: face_count(&data["face_count"]),
        frontal_face: truthy(&data["frontal_face"]),
        occlusion_level: enum_or_default(&data["occlusion_level"]),
        blur_level: enum_or_default(&data["blur_level"]),
        lighting_quality: enum_or_default(&data["lighting_quality"]),
        issues: string_list(&data["issues"], MAX_ISSUES),
        detail: String::new(),
    };

    let failed = failed_rules(&result);
    result.pass = result.pass && failed.is_empty();
    result.detail = if result.pass {
        PASS_DETAIL.to_string()
    } else {
        reject_message(&failed)
    };
    result
}

pub fn failed_rules(result: &PrecheckResult) -> Vec<PrecheckRule> {
    let checks = [
        (
            !result.is_real_human_photo || result.looks_like_anime_or_character,
            PrecheckRule::NotRealPhoto,
        ),
        (result.face_count != 1, PrecheckRule::FaceCount),
        (!result.frontal_face, PrecheckRule::NotFrontal),
        (result.occlusion_level == Level::High, PrecheckRule::HeavyOcclusion),
        (result.blur_level == Level::High, PrecheckRule::Blurry),
        (result.lighting_quality == Level::Low, PrecheckRule::PoorLighting),
    ];
    checks
        .into_iter()
        .filter_map(|(failed, rule)| failed.then_some(rule))
        .collect()
}

fn reject_message(failed: &[PrecheckRule]) -> String {
    if failed.is_empty() {
        return GENERIC_REJECT_DETAIL.to_string();
    }
    let reasons: Vec<&str> = failed.iter().map(PrecheckRule::message).collect();
    format!("업로드 조건 미충족: {}", reasons.join(", "))
}

// Fractional or non-numeric counts are treated as no usable face.
fn face_count(value: &Value) -> i64 {
    match numeric(value) {
        Some(n) if n.is_finite() && n.fract() == 0.0 => n as i64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn good_photo() -> Value {
        json!({
            "pass": true,
            "is_real_human_photo": true,
            "looks_like_anime_or_character": false,
            "face_count": 1,
            "frontal_face": true,
            "occlusion_level": "low",
            "blur_level": "low",
            "lighting_quality": "high",
            "issues": []
        })
    }

    #[test]
    fn clean_photo_passes() {
        let result = normalize_precheck(&good_photo());
        assert!(result.pass);
        assert_eq!(result.detail, PASS_DETAIL);
        assert_eq!(result.face_count, 1);
    }

    #[test]
    fn each_local_rule_overrides_upstream_pass() {
        let overrides = [
            ("is_real_human_photo", json!(false), PrecheckRule::NotRealPhoto),
            ("looks_like_anime_or_character", json!(true), PrecheckRule::NotRealPhoto),
            ("face_count", json!(2), PrecheckRule::FaceCount),
            ("face_count", json!(0), PrecheckRule::FaceCount),
            ("frontal_face", json!(false), PrecheckRule::NotFrontal),
            ("occlusion_level", json!("high"), PrecheckRule::HeavyOcclusion),
            ("blur_level", json!("HIGH"), PrecheckRule::Blurry),
            ("lighting_quality", json!("low"), PrecheckRule::PoorLighting),
        ];
        for (field, value, rule) in overrides {
            let mut data = good_photo();
            data[field] = value;
            let result = normalize_precheck(&data);
            assert!(!result.pass, "{field} should fail");
            assert_eq!(failed_rules(&result), vec![rule]);
            assert!(result.detail.starts_with("업로드 조건 미충족: "));
            assert!(result.detail.contains(rule.message()));
        }
    }

    #[test]
    fn upstream_rejection_alone_still_fails_with_generic_detail() {
        let mut data = good_photo();
        data["pass"] = json!(false);
        let result = normalize_precheck(&data);
        assert!(!result.pass);
        assert_eq!(result.detail, GENERIC_REJECT_DETAIL);
    }

    #[test]
    fn missing_fields_fail_closed() {
        let result = normalize_precheck(&json!({ "pass": true }));
        assert!(!result.pass);
        assert_eq!(result.occlusion_level, Level::Medium);
        assert_eq!(result.face_count, 0);
        assert_eq!(
            failed_rules(&result),
            vec![
                PrecheckRule::NotRealPhoto,
                PrecheckRule::FaceCount,
                PrecheckRule::NotFrontal
            ]
        );
        assert_eq!(
            result.detail,
            "업로드 조건 미충족: 실제 인물 사진이 아닙니다 (애니/캐릭터/일러스트 불가), \
             얼굴이 정확히 1명만 보여야 합니다, 정면 얼굴 사진이 필요합니다"
        );
    }

    #[test]
    fn loose_field_values_are_coerced() {
        let mut data = good_photo();
        data["face_count"] = json!("1");
        data["blur_level"] = json!("extreme");
        data["issues"] = json!(["slight shadow", "", null]);
        let result = normalize_precheck(&data);
        assert!(result.pass);
        assert_eq!(result.blur_level, Level::Medium);
        assert_eq!(result.issues, vec!["slight shadow"]);

        data["face_count"] = json!(1.5);
        assert!(!normalize_precheck(&data).pass);
    }
}
