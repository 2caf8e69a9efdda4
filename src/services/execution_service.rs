//! 异步执行服务
//!
//! 驱动单个任务从提交到终态：
//!
//! ```text
//! Unstarted -> Submitting -> Polling -> { Succeeded | Failed | Errored }
//!                               ^  |
//!                               +--+  PENDING / LLM_END / TOOL_END
//! ```
//!
//! - 轮询为单一顺序循环：每次状态查询完成后才等待下一个 tick，请求不会重叠
//! - 终态回调 (`on_complete` / `on_error`) 恰好触发一次，随后恰好触发一次 `on_settle`
//! - 进入终态前先停止轮询；停止后到达的响应直接丢弃
//! - 回调分发由可重入锁串行化，回调内部可以安全调用 `cancel()` / `state()`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, ReentrantMutex};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::PollingConfig;
use crate::error::{ClientError, Result};
use crate::models::{ActionInfo, ExecuteRequest, ExecutionResult, JobStatus, JobStatusResponse};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// 任务后端：创建任务与查询状态
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// 提交任务，返回服务端分配的任务 ID
    async fn create_job(&self, request: &ExecuteRequest) -> Result<String>;

    /// 查询任务当前状态
    async fn job_status(&self, execution_id: &str) -> Result<JobStatusResponse>;
}

#[async_trait]
impl<T: JobBackend + ?Sized> JobBackend for Arc<T> {
    async fn create_job(&self, request: &ExecuteRequest) -> Result<String> {
        (**self).create_job(request).await
    }

    async fn job_status(&self, execution_id: &str) -> Result<JobStatusResponse> {
        (**self).job_status(execution_id).await
    }
}

/// 生命周期回调，由展示层实现
pub trait ExecutionHandler: Send + Sync {
    /// 任务成功，恰好一次
    fn on_complete(&self, answer: &str, files: &[String]);

    /// 任务失败（传输错误、FAILURE、超出轮询上限、取消），恰好一次
    fn on_error(&self, error: &ClientError);

    /// 终态回调之后触发，恰好一次
    fn on_settle(&self);

    fn on_llm_end(&self, _info: &ActionInfo) {}

    fn on_tool_end(&self, _info: &ActionInfo) {}
}

impl<T: ExecutionHandler + ?Sized> ExecutionHandler for Arc<T> {
    fn on_complete(&self, answer: &str, files: &[String]) {
        (**self).on_complete(answer, files)
    }

    fn on_error(&self, error: &ClientError) {
        (**self).on_error(error)
    }

    fn on_settle(&self) {
        (**self).on_settle()
    }

    fn on_llm_end(&self, info: &ActionInfo) {
        (**self).on_llm_end(info)
    }

    fn on_tool_end(&self, info: &ActionInfo) {
        (**self).on_tool_end(info)
    }
}

type CompleteFn = Box<dyn Fn(&str, &[String]) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&ClientError) + Send + Sync>;
type SettleFn = Box<dyn Fn() + Send + Sync>;
type ProgressFn = Box<dyn Fn(&ActionInfo) + Send + Sync>;

/// 基于闭包的回调集合
pub struct CallbackHandler {
    on_complete: CompleteFn,
    on_error: ErrorFn,
    on_settle: SettleFn,
    on_llm_end: Option<ProgressFn>,
    on_tool_end: Option<ProgressFn>,
}

impl CallbackHandler {
    pub fn new(
        on_complete: impl Fn(&str, &[String]) + Send + Sync + 'static,
        on_error: impl Fn(&ClientError) + Send + Sync + 'static,
        on_settle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_complete: Box::new(on_complete),
            on_error: Box::new(on_error),
            on_settle: Box::new(on_settle),
            on_llm_end: None,
            on_tool_end: None,
        }
    }

    pub fn on_llm_end(mut self, f: impl Fn(&ActionInfo) + Send + Sync + 'static) -> Self {
        self.on_llm_end = Some(Box::new(f));
        self
    }

    pub fn on_tool_end(mut self, f: impl Fn(&ActionInfo) + Send + Sync + 'static) -> Self {
        self.on_tool_end = Some(Box::new(f));
        self
    }
}

impl ExecutionHandler for CallbackHandler {
    fn on_complete(&self, answer: &str, files: &[String]) {
        (self.on_complete)(answer, files)
    }

    fn on_error(&self, error: &ClientError) {
        (self.on_error)(error)
    }

    fn on_settle(&self) {
        (self.on_settle)()
    }

    fn on_llm_end(&self, info: &ActionInfo) {
        if let Some(f) = &self.on_llm_end {
            f(info)
        }
    }

    fn on_tool_end(&self, info: &ActionInfo) {
        if let Some(f) = &self.on_tool_end {
            f(info)
        }
    }
}

/// 执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Unstarted,
    Submitting,
    Polling,
    /// 服务端返回 SUCCESS
    Succeeded,
    /// 服务端返回 FAILURE
    Failed,
    /// 传输错误、超出轮询上限或被取消
    Errored,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Errored)
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unstarted => write!(f, "Unstarted"),
            Self::Submitting => write!(f, "Submitting"),
            Self::Polling => write!(f, "Polling"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
            Self::Errored => write!(f, "Errored"),
        }
    }
}

/// 执行客户端的只读快照
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSnapshot {
    pub execution_id: Option<String>,
    pub state: ExecutionState,
    pub attempts: u32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct Inner {
    state: ExecutionState,
    attempts: u32,
    submitted_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

enum Settlement {
    Complete(ExecutionResult),
    Fail(ClientError),
}

impl Settlement {
    fn state(&self) -> ExecutionState {
        match self {
            Self::Complete(_) => ExecutionState::Succeeded,
            Self::Fail(ClientError::ExecutionFailed { .. }) => ExecutionState::Failed,
            Self::Fail(_) => ExecutionState::Errored,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PollStep {
    Continue,
    Stop,
}

/// 异步执行客户端（一个实例对应一个任务）
pub struct ExecutionClient<B, H> {
    backend: B,
    handler: H,
    polling: PollingConfig,
    execution_id: OnceLock<String>,
    inner: Mutex<Inner>,
    dispatch: ReentrantMutex<()>,
    stop: CancellationToken,
    poll_seq: AtomicU64,
}

impl<B: JobBackend, H: ExecutionHandler> ExecutionClient<B, H> {
    pub fn new(backend: B, handler: H, polling: PollingConfig) -> Self {
        Self {
            backend,
            handler,
            polling,
            execution_id: OnceLock::new(),
            inner: Mutex::new(Inner {
                state: ExecutionState::Unstarted,
                attempts: 0,
                submitted_at: None,
                finished_at: None,
            }),
            dispatch: ReentrantMutex::new(()),
            stop: CancellationToken::new(),
            poll_seq: AtomicU64::new(0),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn state(&self) -> ExecutionState {
        self.inner.lock().state
    }

    /// 服务端分配的任务 ID，提交成功后才有值
    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.get().map(String::as_str)
    }

    pub fn snapshot(&self) -> ExecutionSnapshot {
        let inner = self.inner.lock();
        ExecutionSnapshot {
            execution_id: self.execution_id.get().cloned(),
            state: inner.state,
            attempts: inner.attempts,
            submitted_at: inner.submitted_at,
            finished_at: inner.finished_at,
        }
    }

    /// 提交任务并轮询至终态，返回最终状态
    ///
    /// 所有结果通过回调交付；同一实例重复调用不会再次提交。
    pub async fn execute(&self, prompt: &str, session: &str, files: Vec<String>) -> ExecutionState {
        {
            let mut inner = self.inner.lock();
            if inner.state != ExecutionState::Unstarted {
                tracing::warn!(
                    state = %inner.state,
                    "[Execution] 客户端已启动过，忽略重复提交"
                );
                return inner.state;
            }
            inner.state = ExecutionState::Submitting;
            inner.submitted_at = Some(Utc::now());
        }

        let request = ExecuteRequest::new(prompt, session, files);
        let submitted = tokio::select! {
            biased;
            _ = self.stop.cancelled() => None,
            r = self.backend.create_job(&request) => Some(r),
        };
        let execution_id = match submitted {
            None => {
                tracing::info!("[Execution] 提交期间已取消，放弃等待响应");
                return self.state();
            }
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                tracing::warn!("[Execution] 提交任务失败: {}", e);
                self.settle(Settlement::Fail(e));
                return self.state();
            }
        };

        if !self.begin_polling(&execution_id) {
            return self.state();
        }

        self.poll_loop(&execution_id).await;
        self.state()
    }

    /// 取消任务：停止轮询，未结束时以 `Cancelled` 触发 on_error + on_settle
    ///
    /// 服务端任务不会被终止。重复调用无副作用。
    pub fn cancel(&self) {
        self.settle(Settlement::Fail(ClientError::Cancelled));
        self.stop_polling();
    }

    /// 停止轮询计时器，幂等，不触发任何回调
    pub(crate) fn stop_polling(&self) {
        if !self.stop.is_cancelled() {
            tracing::debug!(
                execution_id = ?self.execution_id(),
                "[Execution] 停止轮询"
            );
        }
        self.stop.cancel();
    }

    pub fn is_polling_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    fn begin_polling(&self, execution_id: &str) -> bool {
        // 提交期间若已被取消，仍记录 ID 以便排查
        let _ = self.execution_id.set(execution_id.to_string());

        let mut inner = self.inner.lock();
        if inner.state != ExecutionState::Submitting {
            tracing::info!(
                execution_id = %execution_id,
                state = %inner.state,
                "[Execution] 任务已在提交期间结束，不再轮询"
            );
            return false;
        }
        inner.state = ExecutionState::Polling;
        true
    }

    fn attempts(&self) -> u32 {
        self.inner.lock().attempts
    }

    async fn poll_loop(&self, execution_id: &str) {
        let period = self.polling.interval.max(MIN_POLL_INTERVAL);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            execution_id = %execution_id,
            interval_ms = period.as_millis() as u64,
            max_attempts = ?self.polling.max_attempts,
            "[Execution] 开始轮询任务状态"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if self.stop.is_cancelled() {
                break;
            }

            if let Some(max) = self.polling.max_attempts {
                if self.attempts() >= max {
                    tracing::warn!(
                        execution_id = %execution_id,
                        attempts = max,
                        "[Execution] 超出最大轮询次数"
                    );
                    self.settle(Settlement::Fail(ClientError::PollTimeout { attempts: max }));
                    break;
                }
            }

            if self.poll(execution_id).await == PollStep::Stop {
                break;
            }
        }
    }

    /// 单次轮询；所有错误在此处收敛为终态
    async fn poll(&self, execution_id: &str) -> PollStep {
        let seq = self.poll_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.lock().attempts += 1;

        let response = tokio::select! {
            biased;
            _ = self.stop.cancelled() => None,
            r = self.backend.job_status(execution_id) => Some(r),
        };

        let Some(response) = response.filter(|_| !self.stop.is_cancelled()) else {
            tracing::debug!(
                execution_id = %execution_id,
                seq,
                "[Execution] 轮询已停止，丢弃响应"
            );
            return PollStep::Stop;
        };

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(
                    execution_id = %execution_id,
                    seq,
                    "[Execution] 状态查询失败: {}",
                    e
                );
                self.settle(Settlement::Fail(e));
                return PollStep::Stop;
            }
        };

        tracing::debug!(
            execution_id = %execution_id,
            seq,
            status = %response.status,
            "[Execution] 任务状态"
        );

        match response.status {
            JobStatus::Pending => PollStep::Continue,
            JobStatus::LlmEnd | JobStatus::ToolEnd => {
                self.dispatch_progress(response.status, response.action_info().as_ref());
                PollStep::Continue
            }
            JobStatus::Success => {
                let settlement = match response.result {
                    Some(result) => Settlement::Complete(result),
                    None => Settlement::Fail(ClientError::MissingResult),
                };
                self.settle(settlement);
                PollStep::Stop
            }
            JobStatus::Failure => {
                self.settle(Settlement::Fail(ClientError::ExecutionFailed {
                    detail: response.error,
                }));
                PollStep::Stop
            }
            JobStatus::Unknown => {
                tracing::warn!(
                    execution_id = %execution_id,
                    seq,
                    "[Execution] 未识别的任务状态，继续轮询"
                );
                PollStep::Continue
            }
        }
    }

    fn dispatch_progress(&self, status: JobStatus, info: Option<&ActionInfo>) {
        let _guard = self.dispatch.lock();
        if self.state().is_terminal() {
            return;
        }
        let Some(info) = info else {
            tracing::warn!("[Execution] {} 响应缺少有效 info，跳过进度回调", status);
            return;
        };
        match status {
            JobStatus::LlmEnd => self.handler.on_llm_end(info),
            JobStatus::ToolEnd => self.handler.on_tool_end(info),
            _ => {}
        }
    }

    /// 进入终态：停止轮询，触发终态回调，再触发 on_settle
    fn settle(&self, settlement: Settlement) {
        let _guard = self.dispatch.lock();
        {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                return;
            }
            inner.state = settlement.state();
            inner.finished_at = Some(Utc::now());
        }

        self.stop_polling();

        match settlement {
            Settlement::Complete(result) => {
                tracing::info!(
                    execution_id = ?self.execution_id(),
                    files = result.files.len(),
                    "[Execution] 任务完成"
                );
                self.handler.on_complete(&result.answer, &result.files);
            }
            Settlement::Fail(error) => {
                tracing::warn!(
                    execution_id = ?self.execution_id(),
                    kind = %error.kind(),
                    "[Execution] 任务结束: {}",
                    error
                );
                self.handler.on_error(&error);
            }
        }
        self.handler.on_settle();
    }
}
