//! 客户端错误类型
//!
//! 所有失败对当前任务都是终态：不重试、不退避。
//! 错误信息面向最终用户，直接渲染为 `Error: <message>`。

use thiserror::Error;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 网络失败、非 200 响应、响应体无法解析
    Transport,
    /// 服务端报告任务执行失败 (FAILURE)
    Execution,
    /// 客户端主动终止（超出轮询上限、取消）
    Client,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "Transport"),
            Self::Execution => write!(f, "Execution"),
            Self::Client => write!(f, "Client"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// 非 200 响应，message 为响应体原文
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("status SUCCESS arrived without a result")]
    MissingResult,

    #[error("upload returned {actual} locations for {expected} files")]
    UploadMismatch { expected: usize, actual: usize },

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}", execution_failed_message(.detail))]
    ExecutionFailed { detail: Option<String> },

    #[error("gave up waiting after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    #[error("execution cancelled")]
    Cancelled,
}

impl ClientError {
    /// 由非 200 响应构造错误；响应体为空时退化为状态行
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let message = if body.trim().is_empty() {
            status.to_string()
        } else {
            body
        };
        Self::Status {
            status: status.as_u16(),
            message,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ExecutionFailed { .. } => ErrorKind::Execution,
            Self::PollTimeout { .. } | Self::Cancelled => ErrorKind::Client,
            _ => ErrorKind::Transport,
        }
    }
}

fn execution_failed_message(detail: &Option<String>) -> String {
    match detail.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => format!("Execution failed: {d}"),
        _ => "Execution failed".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_is_body_verbatim() {
        let err = ClientError::from_status(
            reqwest::StatusCode::BAD_REQUEST,
            "prompt too long".to_string(),
        );
        assert_eq!(err.to_string(), "prompt too long");
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_empty_body_falls_back_to_status_line() {
        let err = ClientError::from_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "  ".to_string(),
        );
        assert_eq!(err.to_string(), "500 Internal Server Error");
    }

    #[test]
    fn test_execution_failed_display() {
        assert_eq!(
            ClientError::ExecutionFailed { detail: None }.to_string(),
            "Execution failed"
        );
        assert_eq!(
            ClientError::ExecutionFailed {
                detail: Some("tool crashed".to_string())
            }
            .to_string(),
            "Execution failed: tool crashed"
        );
        assert_eq!(
            ClientError::ExecutionFailed { detail: None }.kind(),
            ErrorKind::Execution
        );
    }

    #[test]
    fn test_client_side_kinds() {
        assert_eq!(ClientError::Cancelled.kind(), ErrorKind::Client);
        assert_eq!(
            ClientError::PollTimeout { attempts: 3 }.kind(),
            ErrorKind::Client
        );
    }
}
