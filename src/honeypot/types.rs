//! 蜜罐响应类型

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// 威胁分析（静态模板，只有来源 IP 随请求变化）
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThreatAnalysis {
    pub risk_level: &'static str,
    pub detected_patterns: Vec<&'static str>,
    pub origin_ip: String,
}

/// 提取到的意图
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractedData {
    pub intent: &'static str,
    pub action: &'static str,
}

/// 蜜罐成功响应
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThreatReport {
    pub status: &'static str,
    pub threat_analysis: ThreatAnalysis,
    pub extracted_data: ExtractedData,
}

impl ThreatReport {
    pub fn for_origin(origin_ip: impl Into<String>) -> Self {
        Self {
            status: "success",
            threat_analysis: ThreatAnalysis {
                risk_level: "high",
                detected_patterns: vec!["suspicious_content"],
                origin_ip: origin_ip.into(),
            },
            extracted_data: ExtractedData {
                intent: "scam_attempt",
                action: "flagged",
            },
        }
    }
}

/// 序列化失败时使用的响应体
const FALLBACK_REPORT: &str = r#"{"status":"success","threat_analysis":{"risk_level":"high","detected_patterns":["suspicious_content"],"origin_ip":"unknown"},"extracted_data":{"intent":"scam_attempt","action":"flagged"}}"#;

/// 构建 200 威胁报告响应，本身不会失败
pub fn report_response(origin_ip: &str) -> Response {
    let body = match serde_json::to_vec(&ThreatReport::for_origin(origin_ip)) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("序列化威胁报告失败，使用静态报告: {}", e);
            FALLBACK_REPORT.as_bytes().to_vec()
        }
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        body,
    )
        .into_response()
}

/// 蜜罐认证失败响应体
#[derive(Debug, Serialize)]
pub struct HoneypotErrorResponse {
    pub error: &'static str,
}

/// 401 `{"error":"Unauthorized Access"}`
pub fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(HoneypotErrorResponse {
            error: "Unauthorized Access",
        }),
    )
        .into_response()
}
