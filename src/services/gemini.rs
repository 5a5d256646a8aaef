use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::ai_service::NutritionEstimator;
use crate::config::GeminiConfig;
use crate::error::{FailureKind, InferenceFailure};
use crate::models::{ImagePayload, NutritionalEstimate, UserProfile};

/// (name, type, description) of every field the service must return.
const ESTIMATE_FIELDS: [(&str, &str, &str); 6] = [
    ("foodName", "STRING", "Nome do alimento identificado."),
    ("calories", "NUMBER", "Calorias estimadas em kcal."),
    ("protein", "NUMBER", "Proteínas estimadas em gramas."),
    ("carbohydrates", "NUMBER", "Carboidratos estimados em gramas."),
    ("grams", "NUMBER", "Peso total estimado em gramas."),
    ("feedback", "STRING", "Um breve feedback sobre o alimento."),
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Everything that can go wrong inside one call, before normalization.
#[derive(Debug, thiserror::Error)]
enum AdapterError {
    #[error("image read failed: {0}")]
    Read(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Gemini API error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("response does not match the schema: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response carried no text (reason: {})", .0.as_deref().unwrap_or("unknown"))]
    Empty(Option<String>),
    #[error("field `{0}` is negative or not finite")]
    InvalidField(&'static str),
}

impl AdapterError {
    fn kind(&self) -> FailureKind {
        match self {
            AdapterError::Read(_) => FailureKind::Encoding,
            AdapterError::Request(_) | AdapterError::Status { .. } => FailureKind::Transport,
            AdapterError::Json(_) | AdapterError::Empty(_) | AdapterError::InvalidField(_) => {
                FailureKind::Decoding
            }
        }
    }
}

pub struct GeminiService {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiService {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn analyze(
        &self,
        image: ImagePayload,
        profile: UserProfile,
    ) -> Result<NutritionalEstimate, AdapterError> {
        let mime_type = image.mime_type.clone();
        let encoded = encode_image(image)?;
        let request = build_request(&mime_type, encoded, profile);

        log::info!("🤖 Sending request to Gemini with model: {}", self.config.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        if !status.is_success() {
            let body = response.text().await?;
            return Err(AdapterError::Status { status, body });
        }

        let response_text = response.text().await?;
        log::debug!("📄 Raw Gemini response size: {} bytes", response_text.len());

        let text = candidate_text(&response_text)?;
        log::debug!("💬 Gemini response content: {}", text);

        decode_estimate(&text)
    }
}

#[async_trait::async_trait]
impl NutritionEstimator for GeminiService {
    async fn estimate(
        &self,
        image: ImagePayload,
        profile: UserProfile,
    ) -> Result<NutritionalEstimate, InferenceFailure> {
        log::info!("📸 Starting nutrition analysis for: {}", image.describe());

        match self.analyze(image, profile).await {
            Ok(estimate) => {
                log::info!(
                    "✅ Identified '{}' ({:.0} kcal)",
                    estimate.food_name,
                    estimate.calories
                );
                Ok(estimate)
            }
            Err(e) => {
                log::error!("❌ Gemini analysis failed [{}]: {}", e.kind(), e);
                Err(InferenceFailure::new(e.kind()))
            }
        }
    }
}

fn encode_image(image: ImagePayload) -> Result<String, AdapterError> {
    let bytes = image.into_bytes()?;
    let encoded = general_purpose::STANDARD.encode(&bytes);

    log::debug!("📊 Image size: {} bytes", bytes.len());
    log::debug!("🔄 Base64 encoded size: {} bytes", encoded.len());

    Ok(encoded)
}

fn build_prompt(profile: UserProfile) -> String {
    format!(
        "Analise a imagem deste alimento. Com base nos dados do usuário (Idade: {}, Peso: {}kg, Altura: {}cm), \
         estime as informações nutricionais.\n\
         Seja o mais preciso possível. Identifique o alimento e forneça os valores para calorias (kcal), \
         proteínas (g), carboidratos (g) e o peso total aproximado em gramas (g).\n\
         Forneça também um breve feedback sobre o alimento.\n\
         Se não conseguir identificar o alimento, forneça uma estimativa genérica para um item semelhante \
         ou indique que a identificação não foi possível em 'feedback'.",
        profile.age, profile.weight, profile.height
    )
}

fn response_schema() -> Value {
    let mut properties = Map::new();
    for (name, kind, description) in ESTIMATE_FIELDS {
        properties.insert(
            name.to_string(),
            json!({ "type": kind, "description": description }),
        );
    }
    let names: Vec<&str> = ESTIMATE_FIELDS.iter().map(|(name, _, _)| *name).collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": names,
        "propertyOrdering": names,
    })
}

fn build_request(mime_type: &str, encoded_image: String, profile: UserProfile) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.to_string(),
                        data: encoded_image,
                    },
                },
                Part::Text {
                    text: build_prompt(profile),
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
        },
    }
}

/// Concatenated text of the first candidate that has any.
fn candidate_text(raw: &str) -> Result<String, AdapterError> {
    let parsed: GenerateContentResponse = serde_json::from_str(raw)?;

    let block_reason = parsed.prompt_feedback.and_then(|f| f.block_reason);
    let mut finish_reason = None;

    for candidate in parsed.candidates {
        if finish_reason.is_none() {
            finish_reason = candidate.finish_reason.clone();
        }
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if !text.trim().is_empty() {
            return Ok(text);
        }
    }

    Err(AdapterError::Empty(block_reason.or(finish_reason)))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);

    // May open with a language tag (```json), on its own line or not
    inner
        .trim_start()
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim()
}

fn decode_estimate(text: &str) -> Result<NutritionalEstimate, AdapterError> {
    let estimate: NutritionalEstimate = serde_json::from_str(strip_code_fence(text))?;

    if let Some(field) = estimate.invalid_numeric_field() {
        return Err(AdapterError::InvalidField(field));
    }

    Ok(estimate)
}
