//! 命令行参数
//!
//! 优先级：命令行 / 环境变量 > 配置文件 > 内置默认值。
//!
//! ```bash
//! eval-client "summarize this table" -f data.csv --session demo
//! EVAL_BASE_URL=http://10.0.0.5:8000 eval-client --mode sync "hello"
//! ```

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{parse_duration_string, ClientConfig, PollingConfig};

/// 执行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// 异步提交并轮询 (`/api/execute/async`)
    Async,
    /// 同步执行 (`/api/execute`)
    Sync,
    /// 旧版接口 (`/command`)
    Command,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "eval-client")]
#[command(about = "Submit a prompt to an EVAL execution server and show the answer")]
#[command(version)]
pub struct Cli {
    /// 提示词；省略时从标准输入读取
    pub prompt: Option<String>,

    /// 随提示词上传的文件（可重复）
    #[arg(short = 'f', long = "file")]
    pub files: Vec<PathBuf>,

    /// 会话 ID；省略时随机生成
    #[arg(short, long, env = "EVAL_SESSION")]
    pub session: Option<String>,

    /// 服务根地址，覆盖配置文件
    #[arg(long, env = "EVAL_BASE_URL")]
    pub base_url: Option<String>,

    /// 配置文件路径（默认 ~/.eval-client/config.yaml）
    #[arg(short, long, env = "EVAL_CONFIG")]
    pub config: Option<String>,

    #[arg(long, value_enum, default_value_t = Mode::Async)]
    pub mode: Mode,

    /// 轮询间隔，如 1s、500ms
    #[arg(long, value_parser = parse_interval)]
    pub interval: Option<Duration>,

    /// 最大轮询次数，0 表示不限制
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// 将结果文件下载到该目录
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// 提高日志级别（-v debug，-vv trace）
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    parse_duration_string(s).ok_or_else(|| format!("invalid duration: {s}"))
}

impl Cli {
    /// 用命令行参数覆盖配置
    pub fn apply_to(&self, config: &mut ClientConfig) {
        if let Some(base_url) = &self.base_url {
            config.server.base_url = base_url.clone();
        }
        if let Some(interval) = self.interval {
            config.polling.interval = interval;
        }
        match self.max_attempts {
            Some(0) => config.polling = PollingConfig::unbounded(config.polling.interval),
            Some(n) => config.polling.max_attempts = Some(n),
            None => {}
        }
    }
}
