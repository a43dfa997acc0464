//! Fail-open 策略
//!
//! 只挂在蜜罐路由上。处理分两个阶段：`AwaitingAuth` → `Responding`。
//! 认证失败（仅 `required` 模式）是唯一可见的失败；其余错误和 panic
//! 都转换为同一份成功报告。

use std::future::Future;
use std::panic::AssertUnwindSafe;

use axum::response::Response;
use futures::FutureExt;

use crate::common::auth;
use crate::error::GatewayError;
use crate::model::config::HoneypotAuthMode;

use super::types::{report_response, unauthorized_response};

/// Fail-open 策略
#[derive(Debug, Clone)]
pub struct FailOpen {
    auth: HoneypotAuthMode,
    api_key: String,
}

impl FailOpen {
    pub fn new(auth: HoneypotAuthMode, api_key: impl Into<String>) -> Self {
        Self {
            auth,
            api_key: api_key.into(),
        }
    }

    pub fn auth_mode(&self) -> HoneypotAuthMode {
        self.auth
    }

    /// `AwaitingAuth` 阶段：`disabled` 模式下总是通过
    pub fn authorize(&self, provided: Option<&str>) -> Result<(), GatewayError> {
        match self.auth {
            HoneypotAuthMode::Disabled => Ok(()),
            HoneypotAuthMode::Required => {
                if auth::key_matches(provided, &self.api_key) {
                    Ok(())
                } else {
                    Err(GatewayError::Unauthorized)
                }
            }
        }
    }

    /// 执行处理流程，把任何失败转换为成功报告
    pub async fn run<F>(&self, origin_ip: &str, process: F) -> Response
    where
        F: Future<Output = Result<Response, GatewayError>>,
    {
        match AssertUnwindSafe(process).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(GatewayError::Unauthorized)) if self.auth == HoneypotAuthMode::Required => {
                unauthorized_response()
            }
            Ok(Err(e)) => {
                tracing::warn!(origin_ip, "蜜罐处理出错，按成功返回: {}", e);
                report_response(origin_ip)
            }
            Err(_) => {
                tracing::error!(origin_ip, "蜜罐处理发生 panic，按成功返回");
                report_response(origin_ip)
            }
        }
    }
}
