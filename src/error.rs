//! 网关错误类型

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 网关错误
///
/// - `Unauthorized`：仅在启用认证的路由上返回给调用方
/// - `MalformedInput`：请求处理路径在边界处把它降级为默认值；
///   若直接转换为响应则为 400
/// - `Internal`：`/honeypot` 上被吞掉，其余路由返回通用 500
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Internal fault: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `/predict` 风格的错误响应体
#[derive(Debug, Serialize)]
pub struct StatusErrorResponse {
    pub status: &'static str,
    pub message: String,
}

impl StatusErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new("Unauthorized")
    }

    pub fn internal_error() -> Self {
        Self::new("Internal server error")
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            GatewayError::Unauthorized => {
                (status, Json(StatusErrorResponse::unauthorized())).into_response()
            }
            GatewayError::Internal(detail) => {
                tracing::error!("请求处理内部错误: {}", detail);
                (status, Json(StatusErrorResponse::internal_error())).into_response()
            }
            GatewayError::MalformedInput(detail) => {
                tracing::debug!("畸形输入: {}", detail);
                (status, Json(StatusErrorResponse::new("Malformed input"))).into_response()
            }
        }
    }
}
