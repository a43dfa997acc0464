//! 请求规范化
//!
//! 把原始请求整理为 `(method, path, api_key, ip, body)`，整个过程不会失败：
//! 请求体读取出错时保留已读到的部分，JSON 解析失败时视为空对象

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRef, FromRequest, Request},
    http::{HeaderMap, Method},
};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde_json::{Map, Value};

use crate::common::auth;
use crate::error::GatewayError;

use super::middleware::AppState;

/// 无法确定客户端地址时使用的占位值
pub const UNKNOWN_IP: &str = "unknown";

/// 解析客户端 IP
///
/// 优先级：`x-forwarded-for` 的第一个条目 → 直连对端地址 → `"unknown"`
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_IP.to_string(),
    }
}

/// 从请求扩展中取出直连对端地址（需以 `into_make_service_with_connect_info` 启动）
pub fn peer_addr(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// 排空后的请求体
#[derive(Debug, Clone, Default)]
pub struct DrainedBody {
    /// 保留下来的前缀（不超过上限）
    pub bytes: Bytes,
    /// 传输层上实际读到的总字节数
    pub total_len: usize,
    /// 超出上限或读取中途出错，`bytes` 不是完整请求体
    pub truncated: bool,
}

/// 完整排空请求体，只保留不超过 `keep_limit` 字节的前缀
///
/// 读取出错时停止并返回已读到的部分，不向上传播错误
pub async fn drain_body(body: Body, keep_limit: usize) -> DrainedBody {
    let mut stream = body.into_data_stream();
    let mut kept = BytesMut::new();
    let mut total_len = 0usize;
    let mut truncated = false;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!("读取请求体中断: {}", e);
                truncated = true;
                break;
            }
        };

        total_len += chunk.len();
        let room = keep_limit.saturating_sub(kept.len());
        if chunk.len() > room {
            truncated = true;
        }
        kept.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    DrainedBody {
        bytes: kept.freeze(),
        total_len,
        truncated,
    }
}

/// 把请求体解析为 JSON 对象
///
/// 空请求体视为空对象；非法 JSON 或非对象的 JSON 返回 `MalformedInput`
pub fn parse_json_object(bytes: &[u8]) -> Result<Map<String, Value>, GatewayError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(GatewayError::MalformedInput(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(GatewayError::MalformedInput(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 规范化后的请求
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub method: Method,
    pub path: String,
    pub api_key: Option<String>,
    pub ip: String,
    pub body: DrainedBody,
}

impl NormalizedRequest {
    /// 规范化请求，排空请求体并保留不超过 `body_limit` 字节
    pub async fn normalize(request: Request, body_limit: usize) -> Self {
        let ip = client_ip(request.headers(), peer_addr(&request));
        let api_key = auth::extract_api_key(request.headers());
        let (parts, body) = request.into_parts();
        let body = drain_body(body, body_limit).await;

        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            api_key,
            ip,
            body,
        }
    }

    /// 以宽松方式把请求体解析为 JSON 对象，任何问题都降级为空对象
    pub fn json_object(&self) -> Map<String, Value> {
        if self.body.truncated {
            tracing::debug!(
                path = %self.path,
                total_len = self.body.total_len,
                "请求体不完整，按空对象处理"
            );
            return Map::new();
        }

        match parse_json_object(&self.body.bytes) {
            Ok(map) => map,
            Err(e) => {
                tracing::debug!(path = %self.path, "请求体解析失败，按空对象处理: {}", e);
                Map::new()
            }
        }
    }
}

impl<S> FromRequest<S> for NormalizedRequest
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        Ok(Self::normalize(request, app.config.max_body_bytes).await)
    }
}
