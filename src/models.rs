// src/models.rs
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// One of the three improvement categories that drive prompts, masks and
/// per-tab recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FocusArea {
    #[serde(rename = "acne")]
    Acne,
    #[serde(rename = "darkCircle")]
    DarkCircle,
    #[serde(rename = "texture")]
    Texture,
}

impl FocusArea {
    pub const ALL: [FocusArea; 3] = [FocusArea::Acne, FocusArea::DarkCircle, FocusArea::Texture];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "acne" => Some(FocusArea::Acne),
            "darkCircle" => Some(FocusArea::DarkCircle),
            "texture" => Some(FocusArea::Texture),
            _ => None,
        }
    }

    /// Resolves a client-provided tab selector, falling back to `texture`.
    pub fn from_selector(selector: &str) -> Self {
        Self::from_key(selector.trim()).unwrap_or(FocusArea::Texture)
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            FocusArea::Acne => "acne",
            FocusArea::DarkCircle => "darkCircle",
            FocusArea::Texture => "texture",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeState {
    Open,
    Closed,
    Unknown,
}

/// Three-step rating shared by precheck quality fields and survey sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Level::Low),
            "medium" => Ok(Level::Medium),
            "high" => Ok(Level::High),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgeBand {
    #[serde(rename = "10s")]
    Teens,
    #[default]
    #[serde(rename = "20s")]
    Twenties,
    #[serde(rename = "30s")]
    Thirties,
    #[serde(rename = "40s")]
    Forties,
    #[serde(rename = "50s")]
    Fifties,
}

impl FromStr for AgeBand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "10s" => Ok(AgeBand::Teens),
            "20s" => Ok(AgeBand::Twenties),
            "30s" => Ok(AgeBand::Thirties),
            "40s" => Ok(AgeBand::Forties),
            "50s" => Ok(AgeBand::Fifties),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Female,
    Male,
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "female" => Ok(Gender::Female),
            "male" => Ok(Gender::Male),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinTypePreference {
    Dry,
    Oily,
    Combination,
    #[default]
    Unknown,
}

impl FromStr for SkinTypePreference {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dry" => Ok(SkinTypePreference::Dry),
            "oily" => Ok(SkinTypePreference::Oily),
            "combination" => Ok(SkinTypePreference::Combination),
            "unknown" => Ok(SkinTypePreference::Unknown),
            _ => Err(()),
        }
    }
}

/// Canonical skin type, serialized with its Korean label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkinType {
    #[serde(rename = "건성")]
    Dry,
    #[serde(rename = "지성")]
    Oily,
    #[serde(rename = "복합성")]
    Combination,
    #[serde(rename = "민감성")]
    Sensitive,
    #[default]
    #[serde(rename = "중성")]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileEstimate {
    pub age_band: AgeBand,
    pub gender: Gender,
    pub skin_type_preference: SkinTypePreference,
    pub sensitivity_level: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurveyProfile {
    #[serde(flatten)]
    pub profile: ProfileEstimate,
    pub sensitive_skin: bool,
    pub recent_trouble_increase: bool,
    pub irregular_sleep: bool,
}

/// Image bytes as received from the client form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Bytes,
    pub mime_type: String,
}

impl UploadedImage {
    pub fn data_url(&self) -> String {
        data_url(&self.mime_type, &self.bytes)
    }
}

pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub id: Uuid,
    pub image: UploadedImage,
    pub survey: SurveyProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecheckResult {
    pub pass: bool,
    pub is_real_human_photo: bool,
    pub looks_like_anime_or_character: bool,
    pub face_count: i64,
    pub frontal_face: bool,
    pub occlusion_level: Level,
    pub blur_level: Level,
    pub lighting_quality: Level,
    pub issues: Vec<String>,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reasons {
    pub acne: String,
    pub pores: String,
    pub redness: String,
    pub dark_circle: String,
    pub wrinkle_eye: String,
    pub symmetry: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub phase: String,
    pub expectation: String,
    pub focus: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientGuide {
    pub recommended: Vec<String>,
    pub avoid: Vec<String>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareSection {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub period: String,
    pub expected: String,
    pub lifestyle_tip: String,
    pub focus_ingredients: Vec<String>,
    pub avoid_ingredients: Vec<String>,
    pub video_links: Vec<VideoLink>,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarePlanEntry {
    pub routine: Vec<String>,
    pub care_details: Vec<CareSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureItem {
    pub name: String,
    pub target: String,
    pub reason: String,
    pub sessions: String,
    pub interval: String,
    pub downtime: String,
    pub price_krw_min: Option<u64>,
    pub price_krw_max: Option<u64>,
    pub price_note: String,
}

/// One value per focus area. Every key is always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerFocus<T> {
    pub acne: T,
    #[serde(rename = "darkCircle")]
    pub dark_circle: T,
    pub texture: T,
}

impl<T> PerFocus<T> {
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(FocusArea) -> T,
    {
        Self {
            acne: f(FocusArea::Acne),
            dark_circle: f(FocusArea::DarkCircle),
            texture: f(FocusArea::Texture),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub acne_score: u8,
    pub pore_score: u8,
    pub redness_score: u8,
    pub dark_circle_score: u8,
    /// `None` when the upstream marked the eye area as not measurable.
    pub wrinkle_eye_score: Option<u8>,
    pub symmetry_score: u8,
    pub skin_type: SkinType,
    pub skin_type_description: String,
    pub analysis_summary: String,
    pub focus_priority: Vec<FocusArea>,
    pub progress_timeline: Vec<TimelineEntry>,
    pub ingredient_guide: IngredientGuide,
    pub confidence: u8,
    pub reason: Reasons,
    pub care_plan: PerFocus<CarePlanEntry>,
    pub procedure_recommendations: PerFocus<Vec<ProcedureItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditedImage {
    ImageDataUrl(String),
    ImageUrl(String),
}

#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub prompt: String,
    pub mask_png: Vec<u8>,
    pub edited: EditedImage,
}
