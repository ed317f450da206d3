// src/services/mod.rs
pub mod image_processor;
pub mod llm_service;
pub mod mask_builder;
pub mod prompt_builder;

pub use image_processor::ImageProcessor;
pub use llm_service::LLMService;
pub use mask_builder::RegionMask;
pub use prompt_builder::build_edit_prompt;
