//! EVAL 执行客户端
//!
//! 向 EVAL Agent 服务提交提示词，跟踪异步任务直至终态，并把中间动作与最终答案
//! 通过回调交付给调用方。

pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod render;
pub mod services;
pub mod session;

pub use config::{ClientConfig, PollingConfig};
pub use error::{ClientError, ErrorKind};
pub use providers::EvalApiClient;
pub use services::{
    CallbackHandler, ExecutionClient, ExecutionHandler, ExecutionState, ResultDownloader,
    UploadFile, Uploader,
};
