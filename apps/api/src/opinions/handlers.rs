//! Axum route handlers for the Opinion API.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::catalog::{ModelCatalogSnapshot, ModelDescriptor, FLASH_TIER_MODEL};
use crate::models::student::{
    clamp_target_length, Opinions, StudentAttributes, DEFAULT_TARGET_LENGTH,
};
use crate::state::AppState;

pub const MAX_NAME_CHARS: usize = 5;
pub const MAX_CHARACTERISTICS_CHARS: usize = 40;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateOpinionsRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub good_subjects: Vec<String>,
    #[serde(default)]
    pub weak_subjects: Vec<String>,
    #[serde(default)]
    pub personality: Vec<String>,
    #[serde(default)]
    pub characteristics: Option<String>,
    /// Accepts any JSON number; rounded to whole characters before clamping.
    #[serde(default = "default_target_length")]
    pub target_length: f64,
    #[serde(default = "default_model_name")]
    pub model_name: String,
}

fn default_target_length() -> f64 {
    f64::from(DEFAULT_TARGET_LENGTH)
}

fn default_model_name() -> String {
    FLASH_TIER_MODEL.to_string()
}

#[derive(Debug, Serialize)]
pub struct GenerateOpinionsResponse {
    pub opinions: Opinions,
}

#[derive(Debug, Serialize)]
pub struct AvailableModelsResponse {
    pub models: Vec<ModelDescriptor>,
    pub degraded: bool,
    pub fetched_at: DateTime<Utc>,
}

impl From<&ModelCatalogSnapshot> for AvailableModelsResponse {
    fn from(snapshot: &ModelCatalogSnapshot) -> Self {
        Self {
            models: snapshot.models.clone(),
            degraded: snapshot.degraded,
            fetched_at: snapshot.fetched_at,
        }
    }
}

impl GenerateOpinionsRequest {
    /// Normalizes and validates the request into prompt-ready attributes.
    pub fn into_attributes(self) -> Result<(StudentAttributes, String), AppError> {
        let name = non_blank(self.name);
        let characteristics = non_blank(self.characteristics);

        if name
            .as_deref()
            .is_some_and(|n| n.chars().count() > MAX_NAME_CHARS)
        {
            return Err(AppError::Validation(format!(
                "이름은 {MAX_NAME_CHARS}자 이하로 입력해주세요."
            )));
        }
        if characteristics
            .as_deref()
            .is_some_and(|c| c.chars().count() > MAX_CHARACTERISTICS_CHARS)
        {
            return Err(AppError::Validation(format!(
                "특징은 {MAX_CHARACTERISTICS_CHARS}자 이하로 입력해주세요."
            )));
        }

        let good_subjects = dedup_trimmed(self.good_subjects);
        let weak_subjects = dedup_trimmed(self.weak_subjects);
        if let Some(overlap) = good_subjects.iter().find(|s| weak_subjects.contains(*s)) {
            return Err(AppError::Validation(format!(
                "'{overlap}' 과목이 잘하는 과목과 못하는 과목에 모두 포함되어 있습니다."
            )));
        }

        let attributes = StudentAttributes {
            name,
            good_subjects,
            weak_subjects,
            personality_traits: dedup_trimmed(self.personality),
            characteristics,
            target_length: clamp_target_length(
                self.target_length.round().clamp(0.0, f64::from(u32::MAX)) as u32,
            ),
        };

        if !attributes.has_content() {
            return Err(AppError::Validation(
                "최소 하나의 항목(이름, 잘하는 과목, 못하는 과목, 성격, 특징)은 입력해야 합니다."
                    .to_string(),
            ));
        }

        Ok((attributes, self.model_name))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trims entries, drops blanks and repeats, and keeps first-seen order.
fn dedup_trimmed(items: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !seen.iter().any(|s| s == item) {
            seen.push(item.to_string());
        }
    }
    seen
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/generate-opinions
///
/// Returns exactly five opinions for the described student, or a typed error.
pub async fn handle_generate_opinions(
    State(state): State<AppState>,
    Json(request): Json<GenerateOpinionsRequest>,
) -> Result<Json<GenerateOpinionsResponse>, AppError> {
    let (attributes, model_name) = request.into_attributes()?;
    let opinions = state
        .opinions
        .generate_opinions(&attributes, &model_name)
        .await?;
    Ok(Json(GenerateOpinionsResponse { opinions }))
}

/// GET /api/available-models
pub async fn handle_available_models(State(state): State<AppState>) -> Json<AvailableModelsResponse> {
    let snapshot = state.catalog.current().await;
    Json(AvailableModelsResponse::from(snapshot.as_ref()))
}

/// POST /api/available-models/refresh
///
/// Re-reads the provider's model list. Never fails; a degraded catalog is reported in the body.
pub async fn handle_refresh_models(State(state): State<AppState>) -> Json<AvailableModelsResponse> {
    let snapshot = state.catalog.refresh().await;
    Json(AvailableModelsResponse::from(snapshot.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> GenerateOpinionsRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_defaults_apply_for_missing_fields() {
        let req = request(serde_json::json!({ "good_subjects": ["수학"] }));
        assert_eq!(req.target_length, 75.0);
        assert_eq!(req.model_name, "gemini-2.5-flash");
        let (attrs, model) = req.into_attributes().unwrap();
        assert_eq!(attrs.good_subjects, vec!["수학"]);
        assert_eq!(model, "gemini-2.5-flash");
    }

    #[test]
    fn test_all_empty_request_is_rejected() {
        let req = request(serde_json::json!({
            "name": "  ",
            "good_subjects": [],
            "characteristics": null,
            "model_name": "gemini-2.5-flash"
        }));
        assert!(matches!(req.into_attributes(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_target_length_is_clamped() {
        let low = request(serde_json::json!({ "personality": ["밝음"], "target_length": -3 }));
        assert_eq!(low.into_attributes().unwrap().0.target_length, 50);
        let high = request(serde_json::json!({ "personality": ["밝음"], "target_length": 400 }));
        assert_eq!(high.into_attributes().unwrap().0.target_length, 100);
    }

    #[test]
    fn test_fractional_target_length_is_rounded() {
        let whole = request(serde_json::json!({ "personality": ["밝음"], "target_length": 75.0 }));
        assert_eq!(whole.into_attributes().unwrap().0.target_length, 75);
        let frac = request(serde_json::json!({ "personality": ["밝음"], "target_length": 80.6 }));
        assert_eq!(frac.into_attributes().unwrap().0.target_length, 81);
    }

    #[test]
    fn test_overlapping_subjects_are_rejected() {
        let req = request(serde_json::json!({
            "good_subjects": ["수학", "영어"],
            "weak_subjects": ["영어"]
        }));
        assert!(matches!(req.into_attributes(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_length_limits_count_characters_not_bytes() {
        let ok = request(serde_json::json!({ "name": "남궁민수호" }));
        assert!(ok.into_attributes().is_ok());
        let too_long = request(serde_json::json!({ "name": "남궁민수호랑" }));
        assert!(too_long.into_attributes().is_err());
        let long_note = request(serde_json::json!({ "characteristics": "가".repeat(41) }));
        assert!(long_note.into_attributes().is_err());
    }

    #[test]
    fn test_lists_are_trimmed_and_deduplicated() {
        let req = request(serde_json::json!({
            "personality": [" 성실함 ", "성실함", "", "리더십"]
        }));
        let (attrs, _) = req.into_attributes().unwrap();
        assert_eq!(attrs.personality_traits, vec!["성실함", "리더십"]);
    }
}
