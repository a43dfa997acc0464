//! 语音分类器
//!
//! 没有真实模型：`FixedClassifier` 返回固定结果，`SeededClassifier`
//! 以解码后的音频长度为种子生成可复现的伪随机结果

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};

use crate::error::GatewayError;
use crate::model::config::{ClassifierKind, Config};

use super::types::{Classification, Prediction};

/// 语音分类器
pub trait VoiceClassifier: Send + Sync {
    /// 分类器名称（用于日志）
    fn name(&self) -> &'static str;

    /// 对 base64 编码的音频做分类
    fn classify(&self, audio_base64: &str) -> Result<Classification, GatewayError>;
}

/// 按配置构建分类器
pub fn build_classifier(config: &Config) -> Arc<dyn VoiceClassifier> {
    match config.classifier {
        ClassifierKind::Fixed => Arc::new(FixedClassifier::new(config.fixed_confidence)),
        ClassifierKind::Seeded => Arc::new(SeededClassifier),
    }
}

/// 固定返回 `Human`
#[derive(Debug, Clone, Copy)]
pub struct FixedClassifier {
    confidence: f64,
}

impl FixedClassifier {
    pub fn new(confidence: f64) -> Self {
        Self {
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

impl VoiceClassifier for FixedClassifier {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn classify(&self, _audio_base64: &str) -> Result<Classification, GatewayError> {
        Ok(Classification {
            prediction: Prediction::Human,
            confidence: self.confidence,
        })
    }
}

/// AI 结果的置信度区间
const AI_CONFIDENCE: (f64, f64) = (0.75, 0.95);
/// Human 结果的置信度区间
const HUMAN_CONFIDENCE: (f64, f64) = (0.70, 0.90);

/// 以音频字节数为种子的伪随机分类器，相同输入总是得到相同结果
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededClassifier;

impl SeededClassifier {
    /// 计算种子：解码成功时取解码后的字节数，否则取原始文本长度
    fn seed(audio_base64: &str) -> u64 {
        let audio = audio_base64.trim();
        match general_purpose::STANDARD.decode(audio) {
            Ok(bytes) => bytes.len() as u64,
            Err(e) => {
                tracing::debug!("音频不是合法的 base64，按原始长度取种子: {}", e);
                audio.len() as u64
            }
        }
    }
}

impl VoiceClassifier for SeededClassifier {
    fn name(&self) -> &'static str {
        "seeded"
    }

    fn classify(&self, audio_base64: &str) -> Result<Classification, GatewayError> {
        let seed = Self::seed(audio_base64);
        let mut rng = fastrand::Rng::with_seed(seed);

        let (prediction, (low, high)) = if rng.bool() {
            (Prediction::Ai, AI_CONFIDENCE)
        } else {
            (Prediction::Human, HUMAN_CONFIDENCE)
        };
        let confidence = round2(low + rng.f64() * (high - low));

        tracing::debug!(seed, ?prediction, confidence, "伪随机分类完成");
        Ok(Classification {
            prediction,
            confidence,
        })
    }
}

/// 保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
