//! YAML 配置读写
//!
//! 默认路径为 `~/.eval-client/config.yaml`。默认路径不存在时使用内置默认值，
//! 显式指定的路径不存在则报错。

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::path_utils::{collapse_tilde, expand_tilde};
use super::types::ClientConfig;

const CONFIG_DIR: &str = ".eval-client";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无法读写配置文件 {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("配置文件格式错误: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("配置无效: {0}")]
    Invalid(String),
}

/// 默认配置文件路径
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// 加载配置
///
/// # 参数
/// - `path`: 显式指定的配置路径（支持 `~`），None 时使用默认路径
pub fn load_config(path: Option<&str>) -> Result<ClientConfig, ConfigError> {
    let (path, explicit) = match path {
        Some(p) => (expand_tilde(p), true),
        None => (default_config_path(), false),
    };

    if !path.exists() {
        if explicit {
            return Err(ConfigError::Io {
                path: collapse_tilde(&path),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }
        tracing::debug!(
            "[CONFIG] 配置文件不存在，使用默认配置: {}",
            collapse_tilde(&path)
        );
        return Ok(ClientConfig::default());
    }

    let config = load_config_from(&path)?;
    tracing::info!("[CONFIG] 已加载配置: {}", collapse_tilde(&path));
    Ok(config)
}

/// 从指定文件加载并校验配置
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: collapse_tilde(path),
        source,
    })?;
    let config = parse_config(&content)?;
    Ok(config)
}

/// 解析 YAML 文本；空文档视为默认配置
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = if content.trim().is_empty() {
        ClientConfig::default()
    } else {
        serde_yaml::from_str(content)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// 保存配置到指定路径（自动创建父目录）
pub fn save_config(config: &ClientConfig, path: &Path) -> Result<(), ConfigError> {
    validate_config(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: collapse_tilde(parent),
            source,
        })?;
    }
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: collapse_tilde(path),
        source,
    })
}

pub fn validate_config(config: &ClientConfig) -> Result<(), ConfigError> {
    let base = url::Url::parse(&config.server.base_url)
        .map_err(|e| ConfigError::Invalid(format!("server.base_url: {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!(
            "server.base_url: unsupported scheme {}",
            base.scheme()
        )));
    }
    if config.polling.interval.is_zero() {
        return Err(ConfigError::Invalid(
            "polling.interval must be greater than zero".to_string(),
        ));
    }
    if config.polling.max_attempts == Some(0) {
        return Err(ConfigError::Invalid(
            "polling.max_attempts must be at least 1 (omit it to disable the limit)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_empty_document_is_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.polling.interval, Duration::from_secs(1));
        assert_eq!(config.polling.max_attempts, Some(600));
        assert_eq!(config.endpoints.execute_async, "/api/execute/async");
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let yaml = r#"
server:
  base_url: https://eval.example.com
polling:
  interval: 500ms
  max_attempts: ~
logging:
  level: debug
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.server.base_url, "https://eval.example.com");
        assert_eq!(config.server.request_timeout, Duration::from_secs(120));
        assert_eq!(config.polling.interval, Duration::from_millis(500));
        assert_eq!(config.polling.max_attempts, None);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.endpoints.upload, "/upload");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            parse_config("server:\n  base_url: not a url\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_config("server:\n  base_url: ftp://host\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_config("polling:\n  max_attempts: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_config("polling:\n  interval: soon\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.yaml");

        let mut config = ClientConfig::default();
        config.server.base_url = "http://10.0.0.5:9000".to_string();
        config.polling.interval = Duration::from_millis(1500);

        save_config(&config, &path).unwrap();
        let loaded = load_config(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.yaml");
        assert!(matches!(
            load_config(Some(path.to_str().unwrap())),
            Err(ConfigError::Io { .. })
        ));
    }
}
