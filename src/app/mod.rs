//! 命令行前端
//!
//! 串联 上传 -> 执行（异步 / 同步 / 旧版）-> 终端渲染 -> 可选的结果下载。

mod cli;
mod logging;

pub use cli::{Cli, Mode};
pub use logging::{effective_level, init_logging};

use anyhow::Context;
use parking_lot::Mutex;
use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::{load_config, validate_config, ClientConfig};
use crate::error::ClientError;
use crate::models::{ActionInfo, CommandRequest, ExecuteRequest, ExecutionResult};
use crate::providers::EvalApiClient;
use crate::render::{render_answer, render_error, ActionCard};
use crate::services::{
    ExecutionClient, ExecutionHandler, ResultDownloader, UploadFile, Uploader,
};
use crate::session::generate_session_id;

/// 终端渲染器：把执行回调写到输出流
pub struct TerminalRenderer<W> {
    out: Mutex<W>,
    cards: AtomicUsize,
    result: Mutex<Option<ExecutionResult>>,
    error: Mutex<Option<String>>,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            cards: AtomicUsize::new(0),
            result: Mutex::new(None),
            error: Mutex::new(None),
        }
    }

    pub fn result(&self) -> Option<ExecutionResult> {
        self.result.lock().clone()
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().clone()
    }

    pub fn with_output<R>(&self, f: impl FnOnce(&W) -> R) -> R {
        f(&self.out.lock())
    }

    fn write_block(&self, text: &str) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{text}").and_then(|_| out.flush()) {
            tracing::warn!("[CLI] 输出失败: {}", e);
        }
    }

    fn show_card(&self, info: &ActionInfo) {
        let index = self.cards.fetch_add(1, Ordering::SeqCst) + 1;
        self.write_block(&ActionCard::from_info(index, info).to_string());
    }
}

impl<W: Write + Send> ExecutionHandler for TerminalRenderer<W> {
    fn on_complete(&self, answer: &str, files: &[String]) {
        self.write_block(&render_answer(answer, files));
        *self.result.lock() = Some(ExecutionResult {
            answer: answer.to_string(),
            files: files.to_vec(),
        });
    }

    fn on_error(&self, error: &ClientError) {
        self.write_block(&render_error(&error.to_string()));
        *self.error.lock() = Some(error.to_string());
    }

    fn on_settle(&self) {
        tracing::debug!(
            "[CLI] 执行结束，共 {} 个动作",
            self.cards.load(Ordering::SeqCst)
        );
    }

    fn on_llm_end(&self, info: &ActionInfo) {
        self.show_card(info);
    }

    fn on_tool_end(&self, info: &ActionInfo) {
        self.show_card(info);
    }
}

/// 同步结果按与异步相同的回调契约交付
fn deliver(handler: &impl ExecutionHandler, outcome: Result<ExecutionResult, ClientError>) {
    match outcome {
        Ok(result) => handler.on_complete(&result.answer, &result.files),
        Err(e) => handler.on_error(&e),
    }
    handler.on_settle();
}

fn read_prompt(cli: &Cli) -> anyhow::Result<String> {
    match &cli.prompt {
        Some(prompt) => Ok(prompt.clone()),
        None => std::io::read_to_string(std::io::stdin()).context("读取标准输入失败"),
    }
}

/// CLI 入口
pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = load_config(cli.config.as_deref()).context("加载配置失败")?;
    cli.apply_to(&mut config);
    validate_config(&config).context("配置无效")?;
    init_logging(&config.logging.level, cli.verbose);

    let prompt = read_prompt(&cli)?;
    let renderer = Arc::new(TerminalRenderer::new(std::io::stdout()));
    let ok = execute(&cli, &config, &prompt, renderer).await?;
    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// 执行一次完整流程，返回是否成功
pub async fn execute<W: Write + Send + 'static>(
    cli: &Cli,
    config: &ClientConfig,
    prompt: &str,
    renderer: Arc<TerminalRenderer<W>>,
) -> anyhow::Result<bool> {
    let session = cli.session.clone().unwrap_or_else(generate_session_id);
    tracing::info!(
        session = %session,
        mode = ?cli.mode,
        files = cli.files.len(),
        "[CLI] 开始执行"
    );

    let api = EvalApiClient::new(config).context("创建 HTTP 客户端失败")?;

    let uploads: Vec<UploadFile> = cli.files.iter().map(UploadFile::path).collect();
    let files = match Uploader::new(api.clone()).upload(&uploads).await {
        Ok(files) => files,
        Err(e) => {
            deliver(renderer.as_ref(), Err(e));
            return Ok(false);
        }
    };

    match cli.mode {
        crate::app::Mode::Async => {
            let client = Arc::new(ExecutionClient::new(
                api.clone(),
                renderer.clone(),
                config.polling.clone(),
            ));
            let interrupt = {
                let client = client.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        client.cancel();
                    }
                })
            };
            client.execute(prompt, &session, files).await;
            interrupt.abort();
        }
        crate::app::Mode::Sync => {
            let request = ExecuteRequest::new(prompt, session.as_str(), files);
            deliver(renderer.as_ref(), api.execute_sync(&request).await);
        }
        crate::app::Mode::Command => {
            let request = CommandRequest {
                query: prompt.to_string(),
                key: session.clone(),
                files,
            };
            deliver(
                renderer.as_ref(),
                api.command(&request).await.map(ExecutionResult::from),
            );
        }
    }

    let Some(result) = renderer.result() else {
        return Ok(false);
    };

    if let Some(dir) = &cli.download_dir {
        let saved = ResultDownloader::new(api, dir)
            .download_all(&result.files)
            .await
            .context("下载结果文件失败")?;
        for path in saved {
            renderer.write_block(&format!("saved {}", path.display()));
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["eval-client"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn config_for(server: &MockServer, cli: &Cli) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.server.base_url = server.uri();
        config.polling.interval = Duration::from_millis(10);
        cli.apply_to(&mut config);
        config
    }

    fn output(renderer: &TerminalRenderer<Vec<u8>>) -> String {
        renderer.with_output(|buf| String::from_utf8_lossy(buf).to_string())
    }

    #[test]
    fn test_renderer_numbers_cards() {
        let renderer = TerminalRenderer::new(Vec::new());
        let info = ActionInfo {
            action: "Terminal".to_string(),
            ..Default::default()
        };
        renderer.on_llm_end(&info);
        renderer.on_tool_end(&info);

        let text = output(&renderer);
        assert!(text.contains("Action #1 - Terminal"));
        assert!(text.contains("Action #2 - Terminal"));
    }

    #[tokio::test]
    async fn test_async_flow_with_upload_and_download() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "urls": ["static/in.csv"]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/execute/async"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "j1" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/execute/async/j1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "TOOL_END",
                "info": { "action": "CsvReader", "plan": "- [x] read" }
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/execute/async/j1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "SUCCESS",
                "result": { "answer": "3 rows", "files": ["static/out.csv"] }
            })))
            .with_priority(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/static/out.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("n\n3\n"))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in.csv");
        std::fs::write(&input, "a\n1\n").unwrap();
        let download_dir = temp.path().join("out");

        let cli = cli(&[
            "-f",
            input.to_str().unwrap(),
            "--session",
            "s1",
            "--download-dir",
            download_dir.to_str().unwrap(),
            "count rows",
        ]);
        let config = config_for(&server, &cli);
        let renderer = Arc::new(TerminalRenderer::new(Vec::new()));

        let ok = execute(&cli, &config, "count rows", renderer.clone())
            .await
            .unwrap();

        assert!(ok);
        let text = output(&renderer);
        assert!(text.contains("Action #1 - CsvReader"));
        assert!(text.contains("3 rows"));
        assert!(text.contains("saved "));
        assert_eq!(
            std::fs::read_to_string(download_dir.join("out.csv")).unwrap(),
            "n\n3\n"
        );
    }

    #[tokio::test]
    async fn test_sync_mode_error_is_rendered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/execute"))
            .respond_with(ResponseTemplate::new(500).set_body_string("agent crashed"))
            .mount(&server)
            .await;

        let cli = cli(&["--mode", "sync", "hello"]);
        let config = config_for(&server, &cli);
        let renderer = Arc::new(TerminalRenderer::new(Vec::new()));

        let ok = execute(&cli, &config, "hello", renderer.clone())
            .await
            .unwrap();

        assert!(!ok);
        assert_eq!(renderer.error().as_deref(), Some("agent crashed"));
        assert!(output(&renderer).contains("Error: agent crashed"));
    }

    #[tokio::test]
    async fn test_command_mode_uses_legacy_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/command"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "legacy answer",
                "files": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cli = cli(&["--mode", "command", "-s", "key-1", "hi"]);
        let config = config_for(&server, &cli);
        let renderer = Arc::new(TerminalRenderer::new(Vec::new()));

        let ok = execute(&cli, &config, "hi", renderer.clone()).await.unwrap();

        assert!(ok);
        assert_eq!(renderer.result().unwrap().answer, "legacy answer");
    }

    #[tokio::test]
    async fn test_upload_error_skips_execution() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let input = temp.path().join("a.txt");
        std::fs::write(&input, "x").unwrap();

        let cli = cli(&["-f", input.to_str().unwrap(), "go"]);
        let config = config_for(&server, &cli);
        let renderer = Arc::new(TerminalRenderer::new(Vec::new()));

        let ok = execute(&cli, &config, "go", renderer.clone()).await.unwrap();

        assert!(!ok);
        assert!(output(&renderer).contains("Error: disk full"));
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }
}
