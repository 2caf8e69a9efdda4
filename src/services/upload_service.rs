//! 文件上传服务
//!
//! 将本地文件提交到上传端点，换取服务端地址。整体视为原子步骤：
//! 任一文件读取或上传失败，整个调用返回错误。

use futures::future::try_join_all;
use reqwest::multipart::{Form, Part};
use std::path::PathBuf;

use crate::error::{ClientError, Result};
use crate::providers::EvalApiClient;

/// multipart 表单中文件字段名
const FILES_FIELD: &str = "files";

/// 待上传文件
#[derive(Debug, Clone)]
pub enum UploadFile {
    /// 本地路径，上传时读取
    Path(PathBuf),
    /// 内存数据
    Bytes { name: String, data: Vec<u8> },
}

impl UploadFile {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// 上传时使用的文件名
    pub fn file_name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "file".to_string()),
            Self::Bytes { name, .. } => name.clone(),
        }
    }

    async fn into_part(self) -> Result<Part> {
        let name = self.file_name();
        let data = match self {
            Self::Path(path) => tokio::fs::read(&path).await?,
            Self::Bytes { data, .. } => data,
        };
        Ok(Part::bytes(data).file_name(name))
    }
}

/// 上传服务
#[derive(Debug, Clone)]
pub struct Uploader {
    api: EvalApiClient,
}

impl Uploader {
    pub fn new(api: EvalApiClient) -> Self {
        Self { api }
    }

    /// 上传文件，返回与输入顺序一致的服务端地址
    ///
    /// 输入为空时不发出请求，直接返回空列表。
    pub async fn upload(&self, files: &[UploadFile]) -> Result<Vec<String>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let parts = try_join_all(files.iter().cloned().map(UploadFile::into_part)).await?;
        let form = parts
            .into_iter()
            .fold(Form::new(), |form, part| form.part(FILES_FIELD, part));

        tracing::info!("[Uploader] 上传 {} 个文件", files.len());
        let urls = self.api.upload(form).await?;

        if urls.len() != files.len() {
            tracing::warn!(
                "[Uploader] 上传结果数量不匹配: expected={}, actual={}",
                files.len(),
                urls.len()
            );
            return Err(ClientError::UploadMismatch {
                expected: files.len(),
                actual: urls.len(),
            });
        }

        Ok(urls)
    }
}
