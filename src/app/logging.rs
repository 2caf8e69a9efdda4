//! 日志初始化

use std::str::FromStr;
use tracing::Level;

const LEVELS: [Level; 5] = [
    Level::ERROR,
    Level::WARN,
    Level::INFO,
    Level::DEBUG,
    Level::TRACE,
];

/// 计算最终日志级别：配置级别，每个 `-v` 提高一级
pub fn effective_level(configured: &str, verbose: u8) -> Level {
    let base = Level::from_str(configured.trim()).unwrap_or(Level::INFO);
    let index = LEVELS.iter().position(|l| *l == base).unwrap_or(2);
    let raised = (index + verbose as usize).min(LEVELS.len() - 1);
    LEVELS[raised]
}

/// 安装 stderr 日志输出；重复调用时保留已有的 subscriber
pub fn init_logging(configured: &str, verbose: u8) {
    let level = effective_level(configured, verbose);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
