// src/services/prompt_builder.rs
use crate::models::{EyeState, FocusArea, Reasons};

/// Upper bound the image-edit endpoint accepts for `prompt`, before the ellipsis.
pub const MAX_PROMPT_CHARS: usize = 980;
const MAX_SUMMARY_CHARS: usize = 160;
const MAX_REASON_CHARS: usize = 80;
const ELLIPSIS: &str = "...";

const LEAD_DIRECTIVES: &[&str] = &[
    "Edit this exact same person photo into a cleaner skin AFTER version.",
    "Keep identity unchanged.",
];

const PRESERVE_DIRECTIVES: &[&str] = &[
    "Keep face shape, expression, eyes, eyebrows, nose, lips, hair, angle, and background unchanged.",
    "Important: if eyes are closed in input, keep eyes closed in output. Do not change eye openness.",
];

const SKIN_DIRECTIVES: &[&str] = &[
    "Only improve skin condition; do not alter facial features.",
    "Do not add blush or new redness anywhere on face.",
    "Do not increase red saturation. Skin tone should stay close to input tone.",
    "Any existing redness should decrease, not increase.",
    "Keep white balance and overall color tone consistent with input.",
    "No text, no watermark, no split image, no duplicate face.",
    "Natural detail should remain.",
];

fn focus_clause(area: FocusArea) -> &'static str {
    match area {
        FocusArea::Acne => {
            "Clean up acne, red spots, and post-acne marks on skin areas only. Redness must be reduced, never increased."
        }
        FocusArea::DarkCircle => {
            "Reduce under-eye darkness naturally while keeping the same person. Do not add any cheek redness."
        }
        FocusArea::Texture => {
            "Improve skin texture and reduce visible pore roughness on skin areas only. Keep natural skin tone unchanged."
        }
    }
}

fn eye_clause(eye_state: EyeState) -> &'static str {
    match eye_state {
        EyeState::Closed => "Eyes must remain closed exactly as in input.",
        EyeState::Open => "Eyes must remain open exactly as in input.",
        EyeState::Unknown => "Keep eye openness unchanged from input.",
    }
}

/// Assembles the instruction for the after-image edit. The result never
/// exceeds `MAX_PROMPT_CHARS` plus a trailing `...` marker.
pub fn build_edit_prompt(
    area: FocusArea,
    summary: &str,
    reasons: &Reasons,
    eye_state: EyeState,
) -> String {
    let summary_line = format!("Summary: {}", truncate_chars(summary, MAX_SUMMARY_CHARS));
    let hints_line = format!(
        "Hints: acne={}; pores={}; redness={}; dark={};",
        truncate_chars(&reasons.acne, MAX_REASON_CHARS),
        truncate_chars(&reasons.pores, MAX_REASON_CHARS),
        truncate_chars(&reasons.redness, MAX_REASON_CHARS),
        truncate_chars(&reasons.dark_circle, MAX_REASON_CHARS),
    );

    let mut parts: Vec<&str> = Vec::with_capacity(16);
    parts.extend_from_slice(LEAD_DIRECTIVES);
    parts.push(focus_clause(area));
    parts.extend_from_slice(PRESERVE_DIRECTIVES);
    parts.push(eye_clause(eye_state));
    parts.extend_from_slice(SKIN_DIRECTIVES);
    parts.push(&summary_line);
    parts.push(&hints_line);

    let prompt = parts.join(" ");
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        format!("{}{}", truncate_chars(&prompt, MAX_PROMPT_CHARS), ELLIPSIS)
    } else {
        prompt
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
