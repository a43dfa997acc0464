//! `/predict` 处理器

use axum::{extract::State, response::Json};

use crate::common::auth;
use crate::error::GatewayError;
use crate::gateway::{AppState, NormalizedRequest};

use super::types::{Classification, PredictInput, PredictionResponse};

/// ANY /predict
///
/// 需要有效的 API Key；请求体中的任何问题都降级为默认值，
/// 只有认证失败（401）和分类器内部错误（500）会返回非 200
pub async fn predict(
    State(state): State<AppState>,
    request: NormalizedRequest,
) -> Result<Json<PredictionResponse>, GatewayError> {
    let provided = request.api_key.as_deref();
    if !auth::key_matches(provided, &state.config.api_key) {
        tracing::warn!(
            ip = %request.ip,
            key = %provided.map(auth::key_fingerprint).unwrap_or_else(|| "-".to_string()),
            "/predict 认证失败"
        );
        return Err(GatewayError::Unauthorized);
    }

    let input = PredictInput::from_body(&request.json_object());
    let classification = match input.audio(state.config.min_audio_length) {
        Some(audio) => state.classifier.classify(audio)?,
        None => Classification::unknown(),
    };

    tracing::info!(
        method = %request.method,
        ip = %request.ip,
        classifier = state.classifier.name(),
        prediction = ?classification.prediction,
        confidence = classification.confidence,
        language = %input.language,
        audio_format = %input.audio_format,
        "/predict 完成"
    );

    Ok(Json(PredictionResponse::new(classification, input)))
}
