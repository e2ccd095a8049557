//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::collections::HashMap;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 生成服务配置
    #[serde(default)]
    pub generation: GenerationConfig,

    /// 评分服务配置
    #[serde(default)]
    pub scorer: ScorerConfig,

    /// 任务编排配置
    #[serde(default)]
    pub job: JobConfig,

    /// 叙事上下文配置
    #[serde(default)]
    pub narrative: NarrativeSettings,

    /// 认证配置
    #[serde(default)]
    pub auth: AuthConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5070
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite 连接串（sqlite:path?mode=rwc 或 sqlite::memory:）
    #[serde(default = "default_database_url")]
    pub url: String,

    /// 连接池大小
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite:data/scribel.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// 生成服务配置（OpenAI 兼容 chat completions 端点）
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// 基础 URL（含 /v1）
    #[serde(default = "default_llm_url")]
    pub url: String,

    /// 模型名
    #[serde(default = "default_model")]
    pub model: String,

    /// API Key（本地部署可为空）
    #[serde(default)]
    pub api_key: Option<String>,

    /// 请求超时时间（秒）
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// 采样温度
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// 输出 token 上限
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// 是否使用脚本化假客户端（开发/测试环境）
    #[serde(default)]
    pub use_fake: bool,
}

fn default_llm_url() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_model() -> String {
    "default".to_string()
}

fn default_generation_timeout() -> u64 {
    300
}

fn default_temperature() -> f32 {
    0.8
}

fn default_max_tokens() -> u32 {
    8192
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_generation_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            use_fake: false,
        }
    }
}

/// 评分服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ScorerConfig {
    /// 基础 URL（含 /v1），缺省复用生成服务地址
    #[serde(default)]
    pub url: Option<String>,

    /// 评委模型名，缺省复用生成模型
    #[serde(default)]
    pub model: Option<String>,

    /// API Key
    #[serde(default)]
    pub api_key: Option<String>,

    /// 请求超时时间（秒）
    #[serde(default = "default_scorer_timeout")]
    pub timeout_secs: u64,
}

fn default_scorer_timeout() -> u64 {
    120
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            url: None,
            model: None,
            api_key: None,
            timeout_secs: default_scorer_timeout(),
        }
    }
}

/// 任务编排配置
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// 最大并发任务数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// 单章质量重试上限（含首次尝试）
    #[serde(default = "default_quality_retries")]
    pub max_quality_retries: u32,

    /// 外部服务瞬时故障重试上限
    #[serde(default = "default_service_retries")]
    pub max_service_retries: u32,

    /// 服务重试退避起始值（毫秒）
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// 服务重试退避上限（毫秒）
    #[serde(default = "default_backoff_cap_ms")]
    pub retry_backoff_cap_ms: u64,
}

fn default_max_concurrent() -> usize {
    2
}

fn default_quality_retries() -> u32 {
    3
}

fn default_service_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_backoff_cap_ms() -> u64 {
    30_000
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_quality_retries: default_quality_retries(),
            max_service_retries: default_service_retries(),
            retry_backoff_ms: default_backoff_ms(),
            retry_backoff_cap_ms: default_backoff_cap_ms(),
        }
    }
}

/// 叙事上下文配置
#[derive(Debug, Clone, Deserialize)]
pub struct NarrativeSettings {
    /// 全文保留的近期章节数
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    /// 近期章节单章最大字符数
    #[serde(default = "default_excerpt_chars")]
    pub chapter_excerpt_chars: usize,

    /// 更早章节的摘要预算
    #[serde(default = "default_summary_chars")]
    pub summary_budget_chars: usize,

    /// 结尾标记列表（命中即提前完成任务）
    #[serde(default = "default_ending_markers")]
    pub ending_markers: Vec<String>,
}

fn default_recent_window() -> usize {
    3
}

fn default_excerpt_chars() -> usize {
    6000
}

fn default_summary_chars() -> usize {
    400
}

fn default_ending_markers() -> Vec<String> {
    crate::domain::narrative::NarrativeConfig::default().ending_markers
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            recent_window: default_recent_window(),
            chapter_excerpt_chars: default_excerpt_chars(),
            summary_budget_chars: default_summary_chars(),
            ending_markers: default_ending_markers(),
        }
    }
}

/// 认证配置
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// 认证模式："http"（外部身份提供方）或 "static"（静态令牌表，开发环境）
    #[serde(default = "default_auth_mode")]
    pub mode: String,

    /// userinfo 端点完整 URL（mode = "http" 时必填）
    #[serde(default)]
    pub userinfo_url: Option<String>,

    /// 请求超时时间（秒）
    #[serde(default = "default_auth_timeout")]
    pub timeout_secs: u64,

    /// 静态令牌表 token -> user_id（mode = "static" 时使用）
    #[serde(default)]
    pub static_tokens: HashMap<String, String>,
}

fn default_auth_mode() -> String {
    "static".to_string()
}

fn default_auth_timeout() -> u64 {
    5
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
            userinfo_url: None,
            timeout_secs: default_auth_timeout(),
            static_tokens: HashMap::new(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
