//! 结果文件下载服务
//!
//! 将任务产出的文件引用下载到本地目录，文件名取引用的最后一段路径。

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::providers::EvalApiClient;
use crate::render::display_name;

/// 结果文件下载器
#[derive(Debug, Clone)]
pub struct ResultDownloader {
    api: EvalApiClient,
    target_dir: PathBuf,
}

impl ResultDownloader {
    pub fn new(api: EvalApiClient, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            target_dir: target_dir.into(),
        }
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// 按顺序下载全部文件，返回本地路径；遇到第一个失败即返回错误
    pub async fn download_all(&self, files: &[String]) -> Result<Vec<PathBuf>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        tokio::fs::create_dir_all(&self.target_dir).await?;

        let mut saved = Vec::with_capacity(files.len());
        for (index, reference) in files.iter().enumerate() {
            let data = self.api.download(reference).await?;
            let path = self.target_dir.join(local_file_name(reference, index));
            tokio::fs::write(&path, &data).await?;
            tracing::debug!(
                "[Downloader] 保存文件: {} -> {:?} ({} bytes)",
                reference,
                path,
                data.len()
            );
            saved.push(path);
        }

        tracing::info!(
            "[Downloader] 已下载 {} 个文件到 {:?}",
            saved.len(),
            self.target_dir
        );
        Ok(saved)
    }
}

/// 本地文件名：去掉查询串，只保留安全字符
fn local_file_name(reference: &str, index: usize) -> String {
    let without_query = reference.split(['?', '#']).next().unwrap_or(reference);
    let cleaned: String = display_name(without_query)
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        format!("file-{}", index + 1)
    } else {
        cleaned
    }
}
