//! 配置类型定义

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::duration::human;

/// 默认服务地址
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// 默认最大轮询次数（1 秒间隔下约 10 分钟）
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 600;

/// 客户端主配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerConfig,
    pub endpoints: EndpointConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

/// 服务端连接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务根地址（仅 origin，端点路径在 endpoints 中配置）
    pub base_url: String,
    /// 单次 HTTP 请求超时
    #[serde(with = "human")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// 端点路径
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub upload: String,
    pub execute_async: String,
    pub execute_sync: String,
    pub command: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            upload: "/upload".to_string(),
            execute_async: "/api/execute/async".to_string(),
            execute_sync: "/api/execute".to_string(),
            command: "/command".to_string(),
        }
    }
}

/// 轮询配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// 两次状态查询之间的间隔
    #[serde(with = "human")]
    pub interval: Duration,
    /// 最大查询次数，None 表示不限制
    pub max_attempts: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: Some(DEFAULT_MAX_POLL_ATTEMPTS),
        }
    }
}

impl PollingConfig {
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// 不限制轮询次数
    pub fn unbounded(interval: Duration) -> Self {
        Self::new(interval, None)
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace / debug / info / warn / error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
