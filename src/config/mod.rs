//! 配置管理模块
//!
//! 提供 YAML 配置文件支持，以及人类可读的时长字符串（如 `1s`、`500ms`）。
//! 命令行参数与环境变量在 `app` 层覆盖文件中的值。

pub mod duration;
mod path_utils;
mod types;
mod yaml;

pub use duration::{format_duration, parse_duration_string};
pub use path_utils::{collapse_tilde, contains_tilde, expand_tilde};
pub use types::{
    ClientConfig, EndpointConfig, LoggingConfig, PollingConfig, ServerConfig, DEFAULT_BASE_URL,
    DEFAULT_MAX_POLL_ATTEMPTS,
};
pub use yaml::{
    default_config_path, load_config, load_config_from, parse_config, save_config,
    validate_config, ConfigError,
};
