//! API Key 提取与校验

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// API Key 请求头名称（HeaderMap 查找本身不区分大小写）
pub const API_KEY_HEADER: &str = "x-api-key";

/// 从请求头中提取 API Key
///
/// 值会去除首尾空白；空值视为未提供
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 常量时间字符串比较，防止时序攻击
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// 校验调用方提供的 API Key 是否与配置一致，未提供视为不一致
pub fn key_matches(provided: Option<&str>, expected: &str) -> bool {
    match provided {
        Some(key) => constant_time_eq(key, expected),
        None => false,
    }
}

/// 计算 API Key 的短指纹，用于日志（不记录原始密钥）
pub fn key_fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..6])
}
