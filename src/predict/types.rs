//! `/predict` 请求与响应类型

use serde::Serialize;
use serde_json::{Map, Value};

/// 支持的音频格式
pub const SUPPORTED_FORMATS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a"];

const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_AUDIO_FORMAT: &str = "wav";

/// 分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Prediction {
    Human,
    #[serde(rename = "AI")]
    Ai,
    Unknown,
}

/// 分类器输出
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub prediction: Prediction,
    /// 位于 [0, 1]
    pub confidence: f64,
}

impl Classification {
    /// 没有可用音频时的结果
    pub fn unknown() -> Self {
        Self {
            prediction: Prediction::Unknown,
            confidence: 0.0,
        }
    }
}

/// 宽松解析后的预测输入
///
/// 缺失、非字符串或空字符串字段一律回退到默认值
#[derive(Debug, Clone, PartialEq)]
pub struct PredictInput {
    pub language: String,
    pub audio_format: String,
    pub audio_base64: Option<String>,
}

impl PredictInput {
    pub fn from_body(body: &Map<String, Value>) -> Self {
        let language = string_field(body, &["language"])
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string();

        let audio_format = string_field(body, &["audioFormat", "audio_format"])
            .map(normalize_format)
            .unwrap_or_else(|| DEFAULT_AUDIO_FORMAT.to_string());

        let audio_base64 =
            string_field(body, &["audioBase64", "audio_base64"]).map(str::to_string);

        Self {
            language,
            audio_format,
            audio_base64,
        }
    }

    /// 返回去除空白后长度不低于 `min_len` 的音频数据
    pub fn audio(&self, min_len: usize) -> Option<&str> {
        self.audio_base64
            .as_deref()
            .map(str::trim)
            .filter(|audio| !audio.is_empty() && audio.len() >= min_len)
    }
}

/// 按顺序取第一个非空字符串字段
fn string_field<'a>(body: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|v| !v.is_empty())
}

/// 音频格式统一为小写，不在支持列表中的回退为 `wav`
fn normalize_format(raw: &str) -> String {
    let format = raw.trim().to_ascii_lowercase();
    if SUPPORTED_FORMATS.contains(&format.as_str()) {
        format
    } else {
        tracing::debug!("不支持的音频格式 {:?}，回退为 {}", raw, DEFAULT_AUDIO_FORMAT);
        DEFAULT_AUDIO_FORMAT.to_string()
    }
}

/// `/predict` 成功响应
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub status: &'static str,
    pub prediction: Prediction,
    pub confidence: f64,
    pub language: String,
    pub audio_format: String,
}

impl PredictionResponse {
    pub fn new(classification: Classification, input: PredictInput) -> Self {
        Self {
            status: "success",
            prediction: classification.prediction,
            confidence: classification.confidence,
            language: input.language,
            audio_format: input.audio_format,
        }
    }
}
