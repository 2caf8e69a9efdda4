//! EVAL API Provider
//!
//! 对执行服务各端点的薄封装：上传、异步提交、状态查询、同步执行、旧版 `/command`，
//! 以及结果文件下载。只有 HTTP 200 视为成功，其余状态以响应体原文作为错误信息。

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::{ClientConfig, EndpointConfig};
use crate::error::{ClientError, Result};
use crate::models::{
    CommandRequest, CommandResponse, ExecuteAccepted, ExecuteRequest, ExecutionResult,
    JobStatusResponse, UploadResponse,
};
use crate::services::execution_service::JobBackend;

/// EVAL API 客户端
#[derive(Debug, Clone)]
pub struct EvalApiClient {
    client: Client,
    base_url: Url,
    endpoints: EndpointConfig,
}

impl EvalApiClient {
    /// 按配置创建客户端（含请求超时）
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.server.request_timeout)
            .build()?;
        Self::with_client(client, &config.server.base_url, config.endpoints.clone())
    }

    pub fn with_client(client: Client, base_url: &str, endpoints: EndpointConfig) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            endpoints,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 将端点路径或结果文件引用解析为绝对地址；绝对 URL 原样返回
    pub fn resolve(&self, reference: &str) -> Result<Url> {
        Ok(self.base_url.join(reference)?)
    }

    fn status_url(&self, execution_id: &str) -> Result<Url> {
        let path = format!(
            "{}/{}",
            self.endpoints.execute_async.trim_end_matches('/'),
            urlencoding::encode(execution_id)
        );
        self.resolve(&path)
    }

    /// 读取响应体；非 200 时以响应体作为错误信息
    async fn read_body(resp: Response) -> Result<String> {
        let status = resp.status();
        let body = resp.text().await?;
        if status != StatusCode::OK {
            return Err(ClientError::from_status(status, body));
        }
        Ok(body)
    }

    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let body = Self::read_body(resp).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// 上传 multipart 表单，返回服务端分配的文件地址
    pub async fn upload(&self, form: Form) -> Result<Vec<String>> {
        let url = self.resolve(&self.endpoints.upload)?;
        let resp = self.client.post(url).multipart(form).send().await?;
        let data: UploadResponse = Self::read_json(resp).await?;
        Ok(data.urls)
    }

    /// 创建异步执行任务，返回任务 ID
    pub async fn submit_job(&self, request: &ExecuteRequest) -> Result<String> {
        let url = self.resolve(&self.endpoints.execute_async)?;
        let resp = self.client.post(url).json(request).send().await?;
        let accepted: ExecuteAccepted = Self::read_json(resp).await?;
        tracing::debug!(
            "[EvalApi] 任务已创建: id={}, session={}, files={}",
            accepted.id,
            request.session,
            request.files.len()
        );
        Ok(accepted.id)
    }

    /// 查询任务状态
    pub async fn fetch_job_status(&self, execution_id: &str) -> Result<JobStatusResponse> {
        let url = self.status_url(execution_id)?;
        let resp = self.client.get(url).send().await?;
        Self::read_json(resp).await
    }

    /// 同步执行，直接返回答案
    pub async fn execute_sync(&self, request: &ExecuteRequest) -> Result<ExecutionResult> {
        let url = self.resolve(&self.endpoints.execute_sync)?;
        let resp = self.client.post(url).json(request).send().await?;
        Self::read_json(resp).await
    }

    /// 旧版 `/command` 接口
    pub async fn command(&self, request: &CommandRequest) -> Result<CommandResponse> {
        let url = self.resolve(&self.endpoints.command)?;
        let resp = self.client.post(url).json(request).send().await?;
        Self::read_json(resp).await
    }

    /// 下载结果文件
    pub async fn download(&self, reference: &str) -> Result<Vec<u8>> {
        let url = self.resolve(reference)?;
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status, body));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl JobBackend for EvalApiClient {
    async fn create_job(&self, request: &ExecuteRequest) -> Result<String> {
        self.submit_job(request).await
    }

    async fn job_status(&self, execution_id: &str) -> Result<JobStatusResponse> {
        self.fetch_job_status(execution_id).await
    }
}
