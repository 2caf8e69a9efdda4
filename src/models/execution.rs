//! EVAL 执行接口数据模型
//!
//! 覆盖异步执行（提交 + 轮询）、同步执行、旧版 `/command` 以及文件上传的请求/响应体。

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 执行请求（异步与同步端点共用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub prompt: String,
    pub session: String,
    #[serde(default)]
    pub files: Vec<String>,
}

impl ExecuteRequest {
    pub fn new(prompt: impl Into<String>, session: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session: session.into(),
            files,
        }
    }
}

/// 异步提交的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteAccepted {
    pub id: String,
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    LlmEnd,
    ToolEnd,
    Success,
    Failure,
    /// 未识别的状态字符串，按中间状态处理
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::LlmEnd => write!(f, "LLM_END"),
            Self::ToolEnd => write!(f, "TOOL_END"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// 执行结果：答案文本 + 产出文件引用（保持服务端顺序）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub answer: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// 中间进度信息（LLM_END / TOOL_END 携带）
///
/// 字段缺失或为 `null` 时取空串。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionInfo {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action_input: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub what_i_did: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub plan: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// 失败详情可能是字符串、对象或 null，统一转成文本
fn lenient_detail<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// 状态查询响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    /// 原样保留，只在 LLM_END / TOOL_END 时解析为 [`ActionInfo`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
    /// FAILURE 时服务端可选提供的失败详情
    #[serde(
        default,
        deserialize_with = "lenient_detail",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

impl JobStatusResponse {
    pub fn pending() -> Self {
        Self::with_status(JobStatus::Pending)
    }

    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            result: None,
            info: None,
            error: None,
        }
    }

    pub fn progress(status: JobStatus, info: ActionInfo) -> Self {
        Self {
            info: serde_json::to_value(info).ok(),
            ..Self::with_status(status)
        }
    }

    /// 解析进度信息；`info` 缺失或不是对象时返回 `None`
    pub fn action_info(&self) -> Option<ActionInfo> {
        let info = self.info.as_ref()?;
        match ActionInfo::deserialize(info) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!("[Execution] 忽略无法解析的 info: {}", e);
                None
            }
        }
    }

    pub fn success(answer: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            result: Some(ExecutionResult {
                answer: answer.into(),
                files,
            }),
            ..Self::with_status(JobStatus::Success)
        }
    }

    pub fn failure(detail: Option<String>) -> Self {
        Self {
            error: detail,
            ..Self::with_status(JobStatus::Failure)
        }
    }
}

/// 上传响应，urls 与提交文件一一对应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub urls: Vec<String>,
}

/// 旧版 `/command` 请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub query: String,
    pub key: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// 旧版 `/command` 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub response: String,
    #[serde(default)]
    pub files: Vec<String>,
}

impl From<CommandResponse> for ExecutionResult {
    fn from(resp: CommandResponse) -> Self {
        Self {
            answer: resp.response,
            files: resp.files,
        }
    }
}
