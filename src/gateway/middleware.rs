//! 网关中间件：应用状态、CORS 预检与 panic 兜底

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Body,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use http::{HeaderValue, Method, Request, StatusCode, header};

use crate::error::StatusErrorResponse;
use crate::honeypot::FailOpen;
use crate::model::config::Config;
use crate::predict::classifier::{self, VoiceClassifier};

/// 应用共享状态
///
/// 启动后只读，请求之间不共享任何可变状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `/predict` 使用的分类器
    pub classifier: Arc<dyn VoiceClassifier>,
    /// 只挂在蜜罐路由上的 fail-open 策略
    pub honeypot: Arc<FailOpen>,
}

impl AppState {
    /// 按配置创建应用状态
    pub fn new(config: Config) -> Self {
        let classifier = classifier::build_classifier(&config);
        let honeypot = FailOpen::new(config.honeypot_auth, config.api_key.clone());
        Self {
            config: Arc::new(config),
            classifier,
            honeypot: Arc::new(honeypot),
        }
    }

    /// 替换分类器
    #[cfg(test)]
    pub fn with_classifier(mut self, classifier: Arc<dyn VoiceClassifier>) -> Self {
        self.classifier = classifier;
        self
    }
}

/// 预检请求中间件
///
/// 任意路由上的 `OPTIONS` 直接返回 200 和宽松的 CORS 头，不读取请求体
pub async fn preflight_middleware(request: Request<Body>, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        tracing::debug!(path = %request.uri().path(), "CORS 预检请求");
        return preflight_response();
    }
    next.run(request).await
}

/// 预检应答：`{"status":"OK"}` + CORS 头
pub fn preflight_response() -> Response {
    let mut response =
        (StatusCode::OK, Json(serde_json::json!({ "status": "OK" }))).into_response();

    let headers = response.headers_mut();
    let any = HeaderValue::from_static("*");
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, any.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, any.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, any);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// CORS 中间件层
///
/// 允许任意来源、方法和请求头。不设置 `allow_credentials`：
/// 它与通配来源同时出现时浏览器会拒绝响应
pub fn cors_layer() -> tower_http::cors::CorsLayer {
    use tower_http::cors::{Any, CorsLayer};

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 处理器 panic 时的兜底响应（通用 500 JSON），保证单个请求不会拖垮进程
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("请求处理发生 panic: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(StatusErrorResponse::internal_error()),
    )
        .into_response()
}
