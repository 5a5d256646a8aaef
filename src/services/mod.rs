pub mod ai_service;
pub mod gemini; // Google Gemini multimodal service

pub use ai_service::NutritionEstimator;
pub use gemini::GeminiService;
