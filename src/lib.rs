// src/lib.rs
use actix_web::web;
use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod services;

use crate::config::Config;
use crate::services::{ImageProcessor, LLMService};

#[derive(Clone)]
pub struct AppState {
    pub llm_service: Arc<LLMService>,
    pub image_processor: Arc<ImageProcessor>,
    pub operator_unlimited_mode: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            llm_service: Arc::new(LLMService::new(config)?),
            image_processor: Arc::new(ImageProcessor::new()),
            operator_unlimited_mode: config.operator_unlimited_mode,
        })
    }
}

/// Registers every route; shared by the binary and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/skin-precheck", web::post().to(handlers::precheck))
            .route("/skin-profile", web::post().to(handlers::infer_profile))
            .route("/skin-analyze", web::post().to(handlers::analyze_skin))
            .route("/after-simulate", web::post().to(handlers::simulate_after))
            .route("/config", web::get().to(handlers::client_config)),
    )
    .route("/health", web::get().to(handlers::health_check));
}
