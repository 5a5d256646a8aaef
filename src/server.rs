use anyhow::{Context, Result};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::ProfileForm;
use crate::models::{mime_type_for, ImagePayload};
use crate::services::NutritionEstimator;

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const UPLOAD_TOO_LARGE_MESSAGE: &str = "A imagem é muito grande. Envie uma foto de até 20 MB.";
const MALFORMED_UPLOAD_MESSAGE: &str = "Não foi possível ler o formulário enviado.";

#[derive(Clone)]
pub struct AppState {
    estimator: Arc<dyn NutritionEstimator>,
}

pub fn create_router(estimator: Arc<dyn NutritionEstimator>) -> Router {
    let state = AppState { estimator };

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/analyze", post(analyze_handler))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
}

pub async fn serve(addr: &str, estimator: Arc<dyn NutritionEstimator>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server on {}", addr))?;

    log::info!("🌐 HTTP server listening on {}", addr);

    axum::serve(listener, create_router(estimator))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("❌ Failed to listen for Ctrl+C: {}", e);
            }
            log::info!("🛑 Shutting down HTTP server...");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}

struct Upload {
    form: ProfileForm,
    image: Option<ImagePayload>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, MultipartError> {
    let mut form = ProfileForm::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "age" => form.age = field.text().await?,
            "weight" => form.weight = field.text().await?,
            "height" => form.height = field.text().await?,
            "image" => {
                let mime_type = field
                    .content_type()
                    .filter(|ct| ct.starts_with("image/"))
                    .map(str::to_string)
                    .unwrap_or_else(|| mime_type_for(field.file_name().unwrap_or_default()).to_string());
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    image = Some(ImagePayload::from_bytes(bytes.to_vec(), mime_type));
                }
            }
            other => log::debug!("Ignoring multipart field: {}", other),
        }
    }

    Ok(Upload { form, image })
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn analyze_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            let status = e.status();
            log::warn!("⚠️ Rejected upload ({}): {}", status, e.body_text());
            let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                UPLOAD_TOO_LARGE_MESSAGE
            } else {
                MALFORMED_UPLOAD_MESSAGE
            };
            return error_response(status, message);
        }
    };

    let profile = match upload.form.submit() {
        Ok(profile) => profile,
        Err(e) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.message()),
    };

    let Some(image) = upload.image else {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Envie uma foto do alimento.");
    };

    match state.estimator.estimate(image, profile).await {
        Ok(estimate) => (StatusCode::OK, Json(estimate)).into_response(),
        Err(failure) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": failure.message(), "kind": failure.kind() })),
        )
            .into_response(),
    }
}

async fn root_handler() -> &'static str {
    "NutriScan AI - Sua calculadora de nutrientes inteligente. POST /analyze (multipart: age, weight, height, image)"
}

async fn health_check() -> &'static str {
    "OK"
}
