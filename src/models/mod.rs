use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Biometrics collected once per session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserProfile {
    pub age: u32,
    pub weight: f64,  // kg
    pub height: f64,  // cm
}

/// Structured result returned by the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionalEstimate {
    pub food_name: String,
    pub calories: f64,       // kcal
    pub protein: f64,        // g
    pub carbohydrates: f64,  // g
    pub grams: f64,          // total weight, g
    pub feedback: String,
}

impl NutritionalEstimate {
    /// Returns the name of the first numeric field that is negative or not finite.
    pub fn invalid_numeric_field(&self) -> Option<&'static str> {
        [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbohydrates", self.carbohydrates),
            ("grams", self.grams),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite() || *value < 0.0)
        .map(|(name, _)| name)
    }
}

#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Read when the image is encoded, not when the payload is built.
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// An image handed to a single inference call.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub source: ImageSource,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime_type = mime_type_for(&path.to_string_lossy()).to_string();
        Self {
            source: ImageSource::Path(path),
            mime_type,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            source: ImageSource::Bytes(bytes),
            mime_type: mime_type.into(),
        }
    }

    /// Consumes the payload into its raw bytes. For path sources this is the
    /// only file read.
    pub fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self.source {
            ImageSource::Path(path) => std::fs::read(path),
            ImageSource::Bytes(bytes) => Ok(bytes),
        }
    }

    pub fn describe(&self) -> String {
        match &self.source {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

/// MIME type from a file name extension, `image/jpeg` when unknown.
pub fn mime_type_for(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();
    let extension = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "gif" => "image/gif",
        _ => "image/jpeg", // default
    }
}
