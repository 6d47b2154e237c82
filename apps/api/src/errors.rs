use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::ProviderErrorKind;
use crate::opinions::error::OpinionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Opinion(#[from] OpinionError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, detail) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Opinion(OpinionError::ModelUnavailable) => {
                tracing::error!("No generative model available");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "MODEL_UNAVAILABLE",
                    "사용 가능한 모델이 없습니다. 잠시 후 다시 시도해주세요.".to_string(),
                )
            }
            AppError::Opinion(OpinionError::Provider(e)) => {
                tracing::error!("Provider error: {e}");
                match e.kind {
                    ProviderErrorKind::Transient => (
                        StatusCode::GATEWAY_TIMEOUT,
                        "PROVIDER_UNAVAILABLE",
                        "AI 서비스가 응답하지 않습니다. 잠시 후 다시 시도해주세요.".to_string(),
                    ),
                    ProviderErrorKind::Policy => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "CONTENT_BLOCKED",
                        "입력 내용이 AI 서비스 정책에 의해 차단되었습니다. 내용을 수정해주세요."
                            .to_string(),
                    ),
                    ProviderErrorKind::Quota => (
                        StatusCode::TOO_MANY_REQUESTS,
                        "QUOTA_EXCEEDED",
                        "요청 한도를 초과했습니다. 잠시 후 다시 시도해주세요.".to_string(),
                    ),
                    ProviderErrorKind::Rejected => (
                        StatusCode::BAD_GATEWAY,
                        "PROVIDER_ERROR",
                        "의견 생성 중 오류가 발생했습니다. 잠시 후 다시 시도해주세요.".to_string(),
                    ),
                }
            }
            AppError::Opinion(OpinionError::Parse(e)) => {
                tracing::error!("Parse error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UNPARSEABLE_RESPONSE",
                    "의견 생성 결과를 처리할 수 없습니다. 다시 시도해주세요.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "detail": detail,
            "code": code,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ProviderError;
    use crate::opinions::error::ParseError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_is_400_with_detail() {
        let response = AppError::Validation("bad input".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "bad input");
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_provider_kinds_map_to_distinct_statuses() {
        let cases = [
            (ProviderErrorKind::Transient, StatusCode::GATEWAY_TIMEOUT),
            (ProviderErrorKind::Policy, StatusCode::UNPROCESSABLE_ENTITY),
            (ProviderErrorKind::Quota, StatusCode::TOO_MANY_REQUESTS),
            (ProviderErrorKind::Rejected, StatusCode::BAD_GATEWAY),
        ];
        for (kind, status) in cases {
            let err = AppError::from(OpinionError::from(ProviderError::new(kind, "raw detail")));
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_parse_error_never_echoes_raw_text() {
        let err = AppError::from(OpinionError::from(ParseError {
            raw: "RAW PROVIDER TEXT".to_string(),
        }));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(!body.to_string().contains("RAW PROVIDER TEXT"));
    }
}
