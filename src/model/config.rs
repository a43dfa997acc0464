use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// 蜜罐端点的认证模式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HoneypotAuthMode {
    /// 不做任何校验，保证始终成功
    #[default]
    Disabled,
    /// 缺少或错误的 API Key 返回 401
    Required,
}

impl FromStr for HoneypotAuthMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "false" => Ok(Self::Disabled),
            "required" | "on" | "true" => Ok(Self::Required),
            other => bail!("未知的蜜罐认证模式: {}", other),
        }
    }
}

/// 语音分类器类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    /// 固定返回 Human + 固定置信度
    #[default]
    Fixed,
    /// 以音频长度为种子的伪随机分类
    Seeded,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// 共享密钥，`x-api-key` 请求头需与之完全一致
    #[serde(default = "default_api_key")]
    pub api_key: String,

    #[serde(default)]
    pub honeypot_auth: HoneypotAuthMode,

    #[serde(default)]
    pub classifier: ClassifierKind,

    /// `fixed` 分类器使用的置信度
    #[serde(default = "default_fixed_confidence")]
    pub fixed_confidence: f64,

    /// 音频数据（去除空白后）的最小长度，低于该值视为无音频
    #[serde(default = "default_min_audio_length")]
    pub min_audio_length: usize,

    /// 单个请求体保留在内存中的最大字节数，超出部分只排空不保留
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// 根路径返回的服务名称
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_api_key() -> String {
    "guvi123".to_string()
}

fn default_fixed_confidence() -> f64 {
    0.89
}

fn default_min_audio_length() -> usize {
    4
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_service_name() -> String {
    "honeypot-gateway".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: default_api_key(),
            honeypot_auth: HoneypotAuthMode::default(),
            classifier: ClassifierKind::default(),
            fixed_confidence: default_fixed_confidence(),
            min_audio_length: default_min_audio_length(),
            max_body_bytes: default_max_body_bytes(),
            service_name: default_service_name(),
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置，文件不存在时返回默认配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }

    /// 应用环境变量覆盖（`PORT`、`API_KEY`、`HONEYPOT_AUTH`）
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// 使用给定的查找函数应用覆盖，非法值记录警告后忽略
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.port = p,
                Err(_) => tracing::warn!("忽略非法的 PORT 环境变量: {}", port),
            }
        }

        if let Some(key) = lookup("API_KEY") {
            let key = key.trim();
            if key.is_empty() {
                tracing::warn!("忽略空的 API_KEY 环境变量");
            } else {
                self.api_key = key.to_string();
            }
        }

        if let Some(mode) = lookup("HONEYPOT_AUTH") {
            match mode.parse::<HoneypotAuthMode>() {
                Ok(m) => self.honeypot_auth = m,
                Err(e) => tracing::warn!("忽略 HONEYPOT_AUTH 环境变量: {}", e),
            }
        }
    }

    /// 启动前校验配置
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            bail!("apiKey 不能为空");
        }
        if !(0.0..=1.0).contains(&self.fixed_confidence) {
            bail!(
                "fixedConfidence 必须位于 [0, 1] 区间，当前值: {}",
                self.fixed_confidence
            );
        }
        Ok(())
    }
}
