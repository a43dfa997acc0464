//! `/honeypot` 处理器

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    response::Response,
};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::gateway::AppState;
use crate::gateway::request::{NormalizedRequest, client_ip, peer_addr};

use super::policy::FailOpen;
use super::types::report_response;

/// 蜜罐请求体只保留用于日志预览的前缀，其余部分排空丢弃
const KEPT_BODY_BYTES: usize = 4 * 1024;

#[cfg(feature = "sensitive-logs")]
const PREVIEW_BYTES: usize = 512;

/// ANY /honeypot
///
/// 接受任意方法和任意请求体，请求体内容不影响响应
pub async fn honeypot(State(state): State<AppState>, request: Request) -> Response {
    let origin_ip = client_ip(request.headers(), peer_addr(&request));
    let policy = Arc::clone(&state.honeypot);

    policy
        .run(&origin_ip, process(Arc::clone(&policy), request))
        .await
}

async fn process(policy: Arc<FailOpen>, request: Request) -> Result<Response, GatewayError> {
    // 先排空请求体，避免 401 时连接被重置
    let request = NormalizedRequest::normalize(request, KEPT_BODY_BYTES).await;

    policy.authorize(request.api_key.as_deref())?;

    let hit_id = Uuid::new_v4();
    tracing::info!(
        %hit_id,
        method = %request.method,
        path = %request.path,
        origin_ip = %request.ip,
        body_len = request.body.total_len,
        "蜜罐命中"
    );

    #[cfg(feature = "sensitive-logs")]
    tracing::info!(
        %hit_id,
        body = %crate::common::body_preview(&request.body.bytes, PREVIEW_BYTES),
        "蜜罐请求体预览"
    );

    Ok(report_response(&request.ip))
}
