// src/handlers.rs
use crate::services::image_processor::EDIT_CANVAS_SIZE;
use crate::services::{RegionMask, build_edit_prompt};
use crate::{AppState, errors::SkinError, models::*, normalizer};
use actix_multipart::{Multipart, MultipartError};
use actix_web::{Error, HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use log::info;
use std::collections::HashMap;
use uuid::Uuid;

const MISCONFIGURED_DETAIL: &str = "OPENAI_API_KEY is missing";
const IMAGE_REQUIRED_DETAIL: &str = "image is required";
const PRECHECK_MISCONFIGURED_DETAIL: &str = "서버 설정 오류: OPENAI_API_KEY가 없습니다.";
const PRECHECK_IMAGE_REQUIRED_DETAIL: &str = "이미지 파일이 필요합니다.";
const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Parts of a multipart upload. Only a part with a filename counts as a file.
#[derive(Debug, Default)]
struct UploadForm {
    image: Option<UploadedImage>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn take_image(&mut self, detail: &str) -> Result<UploadedImage, SkinError> {
        self.image.take().ok_or_else(|| SkinError::ImageRequired {
            detail: detail.to_string(),
        })
    }
}

async fn read_form(mut payload: Multipart) -> Result<UploadForm, SkinError> {
    let mut form = UploadForm::default();

    loop {
        let mut field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // A body that is not multipart at all simply carries no image.
            Err(MultipartError::NoContentType | MultipartError::ParseContentType) => break,
            Err(e) => return Err(SkinError::InvalidForm(e.to_string())),
        };

        let name = field.name().to_string();
        let is_file = field.content_disposition().get_filename().is_some();
        let mime_type = field
            .content_type()
            .map(|ct| ct.to_string())
            .filter(|ct| ct != "application/octet-stream")
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        let mut data = BytesMut::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| SkinError::InvalidForm(e.to_string()))?
        {
            data.extend_from_slice(&chunk);
        }

        if name == "image" {
            if is_file && !data.is_empty() {
                form.image = Some(UploadedImage {
                    bytes: data.freeze(),
                    mime_type,
                });
            }
        } else if !is_file {
            form.fields
                .insert(name, String::from_utf8_lossy(&data).into_owned());
        }
    }

    Ok(form)
}

/// Runs CPU-bound image work off the async workers.
async fn run_blocking<T, F>(job: F) -> Result<T, SkinError>
where
    F: FnOnce() -> Result<T, SkinError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| SkinError::ImageProcessing(format!("Image worker failed: {}", e)))?
}

pub async fn precheck(
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.llm_service
        .ensure_configured(PRECHECK_MISCONFIGURED_DETAIL)?;
    let mut form = read_form(payload).await?;
    let image = form.take_image(PRECHECK_IMAGE_REQUIRED_DETAIL)?;

    let request_id = Uuid::new_v4();
    info!("precheck {} ({}, {} bytes)", request_id, image.mime_type, image.bytes.len());

    let result = data.llm_service.precheck(&image).await?;
    info!("precheck {} pass={}", request_id, result.pass);

    Ok(HttpResponse::Ok().json(&result))
}

pub async fn infer_profile(
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.llm_service.ensure_configured(MISCONFIGURED_DETAIL)?;
    let mut form = read_form(payload).await?;
    let image = form.take_image(IMAGE_REQUIRED_DETAIL)?;

    let request_id = Uuid::new_v4();
    info!("profile {} ({} bytes)", request_id, image.bytes.len());

    let profile = data.llm_service.infer_profile(&image).await?;

    Ok(HttpResponse::Ok().json(&profile))
}

pub async fn analyze_skin(
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.llm_service.ensure_configured(MISCONFIGURED_DETAIL)?;
    let mut form = read_form(payload).await?;
    let image = form.take_image(IMAGE_REQUIRED_DETAIL)?;

    let request = AnalysisRequest {
        id: Uuid::new_v4(),
        survey: normalizer::normalize_survey(form.field("survey")),
        image,
    };
    info!(
        "analysis {} ({}, {} bytes)",
        request.id,
        request.image.mime_type,
        request.image.bytes.len()
    );

    let analysis = data.llm_service.analyze(&request).await?;

    Ok(HttpResponse::Ok().json(&analysis))
}

pub async fn simulate_after(
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.llm_service.ensure_configured(MISCONFIGURED_DETAIL)?;
    let mut form = read_form(payload).await?;
    let image = form.take_image(IMAGE_REQUIRED_DETAIL)?;

    let area = FocusArea::from_selector(form.field("tab").unwrap_or_default());
    let summary = form.field("analysis_summary").unwrap_or_default().to_string();
    let reasons = form
        .field("reason")
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
        .map(|value| normalizer::normalize_reasons(&value))
        .unwrap_or_default();

    let request_id = Uuid::new_v4();
    info!("after-simulate {} tab={}", request_id, area.as_key());

    let processor = data.image_processor.clone();
    let prepared = run_blocking(move || {
        processor.prepare_for_edit(&image.bytes, EDIT_CANVAS_SIZE)
    })
    .await?;

    // Eye state must be known before the prompt is assembled.
    let eye_state = data
        .llm_service
        .detect_eye_state(&data_url("image/png", &prepared))
        .await;
    info!("after-simulate {} eye_state={:?}", request_id, eye_state);

    let mask_png = run_blocking(move || RegionMask::for_focus(area, EDIT_CANVAS_SIZE).to_png()).await?;
    let prompt = build_edit_prompt(area, &summary, &reasons, eye_state);

    let edited = data
        .llm_service
        .edit_image(&prepared, &mask_png, &prompt)
        .await?;
    let output = SimulationOutput {
        prompt,
        mask_png,
        edited,
    };
    info!(
        "after-simulate {} done (prompt {} chars, mask {} bytes)",
        request_id,
        output.prompt.chars().count(),
        output.mask_png.len()
    );

    Ok(HttpResponse::Ok().json(&output.edited))
}

pub async fn client_config(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "operator_unlimited_mode": data.operator_unlimited_mode
    }))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
