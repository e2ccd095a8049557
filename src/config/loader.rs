//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `SCRIBEL_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `SCRIBEL_SERVER__HOST=127.0.0.1`
/// - `SCRIBEL_SERVER__PORT=8080`
/// - `SCRIBEL_GENERATION__URL=http://llm-server:8000/v1`
/// - `SCRIBEL_DATABASE__URL=sqlite:/data/scribel.db?mode=rwc`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 2. 环境变量（最高优先级）
    // 前缀: SCRIBEL_
    // 层级分隔符: __ (双下划线)
    // 例如: SCRIBEL_GENERATION__MODEL=qwen2.5-72b
    builder = builder.add_source(
        Environment::with_prefix("SCRIBEL")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    // 默认值由 serde default 提供
    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.database.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database URL cannot be empty".to_string(),
        ));
    }

    if !config.generation.use_fake && config.generation.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Generation service URL cannot be empty".to_string(),
        ));
    }

    if config.job.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "job.max_concurrent cannot be 0".to_string(),
        ));
    }

    if config.job.max_quality_retries == 0 {
        return Err(ConfigError::ValidationError(
            "job.max_quality_retries cannot be 0".to_string(),
        ));
    }

    match config.auth.mode.as_str() {
        "static" => {}
        "http" => {
            if config.auth.userinfo_url.as_deref().unwrap_or("").is_empty() {
                return Err(ConfigError::ValidationError(
                    "auth.userinfo_url is required when auth.mode is \"http\"".to_string(),
                ));
            }
        }
        other => {
            return Err(ConfigError::ValidationError(format!(
                "Unknown auth.mode: {other}"
            )));
        }
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Database: {}", config.database.url);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Generation URL: {}", config.generation.url);
    tracing::info!("Generation Model: {}", config.generation.model);
    if config.generation.use_fake {
        tracing::info!("Generation: using scripted fake client");
    }
    tracing::info!(
        "Scorer URL: {}",
        config.scorer.url.as_deref().unwrap_or(&config.generation.url)
    );
    tracing::info!("Job Max Concurrent: {}", config.job.max_concurrent);
    tracing::info!("Job Quality Retries: {}", config.job.max_quality_retries);
    tracing::info!("Auth Mode: {}", config.auth.mode);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5070);
        assert_eq!(config.job.max_quality_retries, 3);
        assert!(config
            .narrative
            .ending_markers
            .iter()
            .any(|m| m == "the end"));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 6080

[narrative]
ending_markers = ["全剧终"]
"#,
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.server.port, 6080);
        assert_eq!(config.narrative.ending_markers, vec!["全剧终".to_string()]);
        // 未出现的字段落回默认值
        assert_eq!(config.narrative.recent_window, 3);
        assert_eq!(config.job.max_concurrent, 2);
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_http_auth_without_url() {
        let mut config = AppConfig::default();
        config.auth.mode = "http".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_unknown_auth_mode() {
        let mut config = AppConfig::default();
        config.auth.mode = "jwt".to_string();
        assert!(validate_config(&config).is_err());
    }
}
