// src/normalizer/analysis.rs
use super::{
    ParseError, clamp_score, numeric, parse_model_output, required_text, sanitize_list,
    sanitize_text, string_list,
};
use crate::models::*;
use serde_json::Value;
use std::collections::HashSet;

const DEFAULT_SCORE: u8 = 50;
const DEFAULT_CONFIDENCE: u8 = 60;

const MAX_FOCUS_PRIORITY: usize = 3;
const MAX_TIMELINE: usize = 4;
const MAX_GUIDE_INGREDIENTS: usize = 5;
const MAX_ROUTINE: usize = 6;
const MAX_CARE_SECTIONS: usize = 3;
const MAX_SECTION_DETAILS: usize = 6;
const MAX_SECTION_INGREDIENTS: usize = 4;
const MAX_VIDEO_LINKS: usize = 3;
const MAX_PROCEDURES: usize = 4;

pub fn parse_analysis(content: &str) -> Result<AnalysisResult, ParseError> {
    parse_model_output(content).map(|value| normalize_analysis(&value))
}

pub fn normalize_analysis(data: &Value) -> AnalysisResult {
    AnalysisResult {
        acne_score: clamp_score(&data["acne_score"], DEFAULT_SCORE),
        pore_score: clamp_score(&data["pore_score"], DEFAULT_SCORE),
        redness_score: clamp_score(&data["redness_score"], DEFAULT_SCORE),
        dark_circle_score: clamp_score(&data["dark_circle_score"], DEFAULT_SCORE),
        wrinkle_eye_score: wrinkle_eye_score(data),
        symmetry_score: clamp_score(&data["symmetry_score"], DEFAULT_SCORE),
        skin_type: normalize_skin_type(&data["skin_type"]),
        skin_type_description: sanitize_text(&data["skin_type_description"]),
        analysis_summary: sanitize_text(&data["analysis_summary"]),
        focus_priority: focus_priority(&data["focus_priority"]),
        progress_timeline: sanitize_list(&data["progress_timeline"], MAX_TIMELINE, |_, item| {
            timeline_entry(item)
        }),
        ingredient_guide: ingredient_guide(&data["ingredient_guide"]),
        confidence: clamp_score(&data["confidence"], DEFAULT_CONFIDENCE),
        reason: normalize_reasons(&data["reason"]),
        care_plan: PerFocus::from_fn(|area| care_entry(&data["care_plan"][area.as_key()])),
        procedure_recommendations: PerFocus::from_fn(|area| {
            sanitize_list(
                &data["procedure_recommendations"][area.as_key()],
                MAX_PROCEDURES,
                |_, item| procedure_item(item),
            )
        }),
    }
}

/// An explicit `null` marks the eye area as not measurable; a missing field
/// gets the usual neutral fallback.
fn wrinkle_eye_score(data: &Value) -> Option<u8> {
    let field = match data.get("wrinkle_eye_score") {
        Some(Value::Null) | None => data.get("wrinkle_eye"),
        present => present,
    };
    match field {
        Some(Value::Null) => None,
        Some(value) => Some(clamp_score(value, DEFAULT_SCORE)),
        None if data.get("wrinkle_eye_score").is_some() => None,
        None => Some(DEFAULT_SCORE),
    }
}

/// Maps English or Korean skin-type tokens onto the Korean canonical label.
pub fn normalize_skin_type(value: &Value) -> SkinType {
    let text = sanitize_text(value).to_lowercase();
    match text.as_str() {
        "dry" | "건성" => SkinType::Dry,
        "oily" | "지성" => SkinType::Oily,
        "combination" | "복합성" => SkinType::Combination,
        "sensitive" | "민감성" => SkinType::Sensitive,
        _ => SkinType::Neutral,
    }
}

pub fn normalize_reasons(value: &Value) -> Reasons {
    Reasons {
        acne: sanitize_text(&value["acne"]),
        pores: sanitize_text(&value["pores"]),
        redness: sanitize_text(&value["redness"]),
        dark_circle: sanitize_text(&value["dark_circle"]),
        wrinkle_eye: sanitize_text(&value["wrinkle_eye"]),
        symmetry: sanitize_text(&value["symmetry"]),
    }
}

fn focus_priority(value: &Value) -> Vec<FocusArea> {
    let mut seen = HashSet::new();
    sanitize_list(value, MAX_FOCUS_PRIORITY, |_, item| {
        let area = FocusArea::from_key(item.as_str()?.trim())?;
        seen.insert(area).then_some(area)
    })
}

fn timeline_entry(item: &Value) -> Option<TimelineEntry> {
    Some(TimelineEntry {
        phase: required_text(&item["phase"])?,
        expectation: required_text(&item["expectation"])?,
        focus: sanitize_text(&item["focus"]),
    })
}

fn ingredient_guide(value: &Value) -> IngredientGuide {
    IngredientGuide {
        recommended: string_list(&value["recommended"], MAX_GUIDE_INGREDIENTS),
        avoid: string_list(&value["avoid"], MAX_GUIDE_INGREDIENTS),
        note: sanitize_text(&value["note"]),
    }
}

fn care_entry(value: &Value) -> CarePlanEntry {
    CarePlanEntry {
        routine: string_list(&value["routine"], MAX_ROUTINE),
        care_details: sanitize_list(&value["care_details"], MAX_CARE_SECTIONS, care_section),
    }
}

fn care_section(idx: usize, section: &Value) -> Option<CareSection> {
    let title = required_text(&section["title"])?;
    Some(CareSection {
        id: required_text(&section["id"]).unwrap_or_else(|| format!("section_{}", idx + 1)),
        title,
        summary: sanitize_text(&section["summary"]),
        period: sanitize_text(&section["period"]),
        expected: sanitize_text(&section["expected"]),
        lifestyle_tip: sanitize_text(&section["lifestyle_tip"]),
        focus_ingredients: string_list(&section["focus_ingredients"], MAX_SECTION_INGREDIENTS),
        avoid_ingredients: string_list(&section["avoid_ingredients"], MAX_SECTION_INGREDIENTS),
        video_links: sanitize_list(&section["video_links"], MAX_VIDEO_LINKS, |_, item| {
            video_link(item)
        }),
        details: string_list(&section["details"], MAX_SECTION_DETAILS),
    })
}

fn video_link(item: &Value) -> Option<VideoLink> {
    let title = required_text(&item["title"])?;
    let url = required_text(&item["url"])?;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return None;
    }
    Some(VideoLink { title, url })
}

fn procedure_item(item: &Value) -> Option<ProcedureItem> {
    Some(ProcedureItem {
        name: required_text(&item["name"])?,
        target: required_text(&item["target"])?,
        reason: sanitize_text(&item["reason"]),
        sessions: sanitize_text(&item["sessions"]),
        interval: sanitize_text(&item["interval"]),
        downtime: sanitize_text(&item["downtime"]),
        price_krw_min: price(&item["price_krw_min"]),
        price_krw_max: price(&item["price_krw_max"]),
        price_note: sanitize_text(&item["price_note"]),
    })
}

fn price(value: &Value) -> Option<u64> {
    numeric(value)
        .filter(|n| n.is_finite() && *n > 0.0)
        .map(|n| n.round() as u64)
}
