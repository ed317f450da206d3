// src/services/llm_service.rs
use crate::config::Config;
use crate::errors::SkinError;
use crate::models::*;
use crate::normalizer::{self, ParseError};
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// Image model every image-edit deployment accepts.
pub const FALLBACK_IMAGE_MODEL: &str = "dall-e-2";

const MISSING_KEY_DETAIL: &str = "OPENAI_API_KEY is missing";
const REJECTED_MODEL_MARKER: &str = "Value must be 'dall-e-2'";

const PRECHECK_UPSTREAM_DETAIL: &str =
    "사진 판별 중 일시적 오류가 발생했습니다. 잠시 후 다시 시도해 주세요.";
const PRECHECK_PARSE_DETAIL: &str =
    "사진 판별 결과를 처리하지 못했습니다. 다른 사진으로 다시 시도해 주세요.";

pub struct LLMService {
    api_key: Option<String>,
    api_base: String,
    vision_model: String,
    image_model: String,
    client: Client,
}

/// A 2xx chat completion: the whole body plus the first choice's text.
struct ChatReply {
    raw: Value,
    content: String,
}

/// One image-edit attempt, kept whole so the fallback check can inspect it.
struct EditAttempt {
    status: StatusCode,
    text: String,
    json: Option<Value>,
}

impl EditAttempt {
    fn rejects_model(&self) -> bool {
        let param_is_model = self
            .json
            .as_ref()
            .and_then(|json| json["error"]["param"].as_str())
            == Some("model");
        param_is_model || self.text.contains(REJECTED_MODEL_MARKER)
    }
}

impl LLMService {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.upstream_timeout).build()?;
        Ok(Self {
            api_key: config.openai_api_key.clone(),
            api_base: config.api_base.clone(),
            vision_model: config.vision_model.clone(),
            image_model: config.image_model.clone(),
            client,
        })
    }

    /// Fails with `server_misconfigured` before any network call when no
    /// credential is configured.
    pub fn ensure_configured(&self, detail: &str) -> Result<(), SkinError> {
        self.api_key().map(|_| ()).map_err(|_| SkinError::Misconfigured {
            detail: detail.to_string(),
        })
    }

    fn api_key(&self) -> Result<&str, SkinError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| SkinError::Misconfigured {
                detail: MISSING_KEY_DETAIL.to_string(),
            })
    }

    pub async fn precheck(&self, image: &UploadedImage) -> Result<PrecheckResult, SkinError> {
        let schema = json!({
            "pass": "boolean",
            "is_real_human_photo": "boolean",
            "looks_like_anime_or_character": "boolean",
            "face_count": "number",
            "frontal_face": "boolean",
            "occlusion_level": "low|medium|high",
            "blur_level": "low|medium|high",
            "lighting_quality": "low|medium|high",
            "issues": ["string"]
        });
        let user_text = format!(
            "아래 스키마로 판정해 주세요. 얼굴 분석용 사진이 아니면 pass=false 입니다.\n{}\n\
             규칙: 애니/캐릭터/일러스트/실사가 아니면 반드시 pass=false.",
            pretty(&schema)
        );

        let reply = self
            .chat_completion(
                0.0,
                "You are a strict image precheck validator for face analysis. Return JSON only.",
                user_text,
                &image.data_url(),
            )
            .await
            .map_err(|err| match err {
                SkinError::Upstream {
                    code,
                    status,
                    detail,
                    ..
                } => SkinError::Upstream {
                    code,
                    status,
                    detail: PRECHECK_UPSTREAM_DETAIL.to_string(),
                    raw_detail: Some(detail),
                },
                other => other,
            })?;

        normalizer::parse_precheck(&reply.content).map_err(|ParseError| {
            SkinError::InvalidModelOutput {
                detail: PRECHECK_PARSE_DETAIL.to_string(),
                pass: Some(false),
                raw: None,
            }
        })
    }

    pub async fn infer_profile(&self, image: &UploadedImage) -> Result<ProfileEstimate, SkinError> {
        let schema = json!({
            "age_band": "10s|20s|30s|40s|50s",
            "gender": "female|male",
            "skin_type_preference": "dry|oily|combination|unknown",
            "sensitivity_level": "low|medium|high"
        });
        let user_text = format!(
            "아래 JSON 스키마로만 응답해 주세요.\n{}\n\
             확신이 낮으면 skin_type_preference는 unknown, sensitivity_level은 medium을 우선 사용하세요.",
            pretty(&schema)
        );

        let reply = self
            .chat_completion(
                0.1,
                "You estimate optional profile fields from one face photo. \
                 Return strict JSON only. \
                 Use conservative guesses and avoid overconfident assumptions.",
                user_text,
                &image.data_url(),
            )
            .await?;

        normalizer::parse_profile(&reply.content).map_err(|ParseError| {
            SkinError::InvalidModelOutput {
                detail: "profile output parse failed".to_string(),
                pass: None,
                raw: None,
            }
        })
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, SkinError> {
        let survey = serde_json::to_string(&request.survey)
            .map_err(|e| SkinError::ImageProcessing(format!("Failed to encode survey: {}", e)))?;
        let user_text = format!(
            "아래 스키마로 얼굴 사진을 분석해 JSON으로 반환하세요.\n{}\n\
             참고 설문 정보: {}\n\
             주의: 의료 진단이 아니라 이미지 기반 추정치이며, 피부점수/이목구비점수 UI에서 사용할 값입니다. \
             설문 정보는 점수 해석/루틴 추천에만 보조적으로 반영하세요.",
            pretty(&analysis_schema_guide()),
            survey
        );

        debug!("analysis {} using {}", request.id, self.vision_model);
        let reply = self
            .chat_completion(0.1, ANALYSIS_SYSTEM_PROMPT, user_text, &request.image.data_url())
            .await?;

        normalizer::parse_analysis(&reply.content).map_err(|ParseError| {
            warn!("analysis {} returned unparseable output", request.id);
            SkinError::InvalidModelOutput {
                detail: "Model output was not valid JSON".to_string(),
                pass: None,
                raw: Some(reply.raw),
            }
        })
    }

    /// Classifies eye openness. Never fails: any problem yields `Unknown`.
    pub async fn detect_eye_state(&self, image_data_url: &str) -> EyeState {
        let reply = self
            .chat_completion(
                0.0,
                "Return only JSON with one field: eye_state=open|closed|unknown",
                "Classify whether eyes are open or closed.".to_string(),
                image_data_url,
            )
            .await;

        match reply {
            Ok(reply) => parse_eye_state(&reply.content),
            Err(err) => {
                warn!("eye-state detection degraded to unknown: {}", err);
                EyeState::Unknown
            }
        }
    }

    /// Calls the image-edit endpoint with the configured model, retrying once
    /// with `FALLBACK_IMAGE_MODEL` when the upstream rejects the model itself.
    pub async fn edit_image(
        &self,
        image_png: &[u8],
        mask_png: &[u8],
        prompt: &str,
    ) -> Result<EditedImage, SkinError> {
        let mut attempt = self
            .call_edits(&self.image_model, image_png, mask_png, prompt)
            .await?;

        if !attempt.status.is_success()
            && self.image_model != FALLBACK_IMAGE_MODEL
            && attempt.rejects_model()
        {
            warn!(
                "image model {} rejected ({}), retrying with {}",
                self.image_model, attempt.status, FALLBACK_IMAGE_MODEL
            );
            attempt = self
                .call_edits(FALLBACK_IMAGE_MODEL, image_png, mask_png, prompt)
                .await?;
        }

        if !attempt.status.is_success() {
            return Err(SkinError::Upstream {
                code: "openai_image_error",
                status: attempt.status.as_u16(),
                detail: attempt.text,
                raw_detail: None,
            });
        }

        let data = attempt.json.unwrap_or(Value::Null);
        let first = &data["data"][0];
        if let Some(b64) = first["b64_json"].as_str().filter(|s| !s.is_empty()) {
            return Ok(EditedImage::ImageDataUrl(format!(
                "data:image/png;base64,{}",
                b64
            )));
        }
        if let Some(url) = first["url"].as_str().filter(|s| !s.is_empty()) {
            return Ok(EditedImage::ImageUrl(url.to_string()));
        }
        Err(SkinError::InvalidImageOutput)
    }

    async fn call_edits(
        &self,
        model: &str,
        image_png: &[u8],
        mask_png: &[u8],
        prompt: &str,
    ) -> Result<EditAttempt, SkinError> {
        let api_key = self.api_key()?;
        let size = if model == FALLBACK_IMAGE_MODEL {
            "1024x1024"
        } else {
            "1024x1536"
        };

        let form = Form::new()
            .text("model", model.to_string())
            .text("prompt", prompt.to_string())
            .text("size", size)
            .text("response_format", "b64_json")
            .part("image", png_part(image_png, "input.png")?)
            .part("mask", png_part(mask_png, "mask.png")?);

        let response = self
            .client
            .post(format!("{}/images/edits", self.api_base))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        debug!("image edit with {} answered {}", model, status);

        Ok(EditAttempt {
            status,
            json: serde_json::from_str(&text).ok(),
            text,
        })
    }

    async fn chat_completion(
        &self,
        temperature: f64,
        system_prompt: &str,
        user_text: String,
        image_data_url: &str,
    ) -> Result<ChatReply, SkinError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&json!({
                "model": self.vision_model,
                "temperature": temperature,
                "response_format": { "type": "json_object" },
                "messages": [
                    {
                        "role": "system",
                        "content": system_prompt
                    },
                    {
                        "role": "user",
                        "content": [
                            {
                                "type": "text",
                                "text": user_text
                            },
                            {
                                "type": "image_url",
                                "image_url": { "url": image_data_url }
                            }
                        ]
                    }
                ]
            }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            warn!("chat completion failed with {}", status);
            return Err(SkinError::Upstream {
                code: "openai_error",
                status: status.as_u16(),
                detail: text,
                raw_detail: None,
            });
        }

        let raw: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let content = raw["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        debug!("chat completion with {} answered {}", self.vision_model, status);

        Ok(ChatReply { raw, content })
    }
}

fn parse_eye_state(content: &str) -> EyeState {
    let Ok(parsed) = serde_json::from_str::<Value>(content) else {
        return EyeState::Unknown;
    };
    match parsed["eye_state"]
        .as_str()
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("open") => EyeState::Open,
        Some("closed") => EyeState::Closed,
        _ => EyeState::Unknown,
    }
}

fn png_part(bytes: &[u8], file_name: &'static str) -> Result<Part, SkinError> {
    Part::bytes(bytes.to_vec())
        .file_name(file_name)
        .mime_str("image/png")
        .map_err(|e| SkinError::ImageProcessing(format!("Failed to build upload part: {}", e)))
}

fn transport_error(err: reqwest::Error) -> SkinError {
    if err.is_timeout() {
        SkinError::UpstreamTimeout(err.to_string())
    } else {
        SkinError::UpstreamUnreachable(err.to_string())
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

const ANALYSIS_SYSTEM_PROMPT: &str = "You are a conservative facial-skin scoring assistant. \
Return ONLY strict valid JSON. No markdown, no extra text. \
All scores are integers 0-100 where HIGHER means BETTER. \
0=very poor, 50=average/uncertain, 100=excellent. \
Avoid extreme values (0/100) unless very clear evidence. \
If evidence is weak, prefer 45-65. \
If a feature is hard to see, still provide a conservative estimate near 45-55. \
For care_plan.care_details with id=home, include focus_ingredients, avoid_ingredients, and lifestyle_tip. \
Also provide progress_timeline and ingredient_guide in Korean. \
For procedure_recommendations, provide realistic Korean-clinic style options and KRW price ranges per session. \
Prices must be approximate and conservative; include uncertainty in price_note.";

fn analysis_schema_guide() -> Value {
    let score = "0~100, 높을수록 양호";
    let reason = "문자열 근거";
    json!({
        "acne_score": score,
        "pore_score": score,
        "redness_score": score,
        "dark_circle_score": score,
        "wrinkle_eye_score": "0~100 또는 null, 높을수록 양호",
        "symmetry_score": score,
        "skin_type": "건성/지성/복합성/민감성/중성 중 하나",
        "skin_type_description": "피부 타입 해석 설명(1~2문장)",
        "analysis_summary": "분석 요약 한 줄",
        "focus_priority": ["acne|darkCircle|texture (우선순위 순서)"],
        "progress_timeline": [
            { "phase": "1주", "expectation": "예상 체감 변화", "focus": "집중 포인트" }
        ],
        "ingredient_guide": {
            "recommended": ["권장 성분1", "권장 성분2"],
            "avoid": ["주의 성분1"],
            "note": "성분 사용 메모"
        },
        "confidence": "0~100",
        "reason": {
            "acne": reason,
            "pores": reason,
            "redness": reason,
            "dark_circle": reason,
            "wrinkle_eye": reason,
            "symmetry": reason
        },
        "care_plan": {
            "acne": {
                "routine": ["문자열"],
                "care_details": [
                    {
                        "id": "home|massage|procedure",
                        "title": "홈케어|마사지|시술",
                        "summary": "한 줄 요약",
                        "period": "예상 기간",
                        "expected": "기대 개선",
                        "details": ["세부 항목 문자열"]
                    }
                ]
            },
            "darkCircle": "acne와 동일 구조",
            "texture": "acne와 동일 구조"
        },
        "procedure_recommendations": {
            "acne": [
                {
                    "name": "시술명",
                    "target": "개선 타겟",
                    "reason": "추천 근거",
                    "sessions": "권장 횟수 예: 3~5회",
                    "interval": "권장 주기 예: 2~4주 간격",
                    "downtime": "다운타임 예: 거의 없음/1~3일",
                    "price_krw_min": 50000,
                    "price_krw_max": 250000,
                    "price_note": "대략적 1회 비용(지역/병원별 상이)"
                }
            ],
            "darkCircle": "acne와 동일 구조",
            "texture": "acne와 동일 구조"
        }
    })
}
