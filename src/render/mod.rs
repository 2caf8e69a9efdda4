//! 终端展示
//!
//! 执行服务本身不做任何渲染，这里提供 CLI 使用的纯文本格式化。

mod action_card;

pub use action_card::{parse_plan, ActionCard, PlanItem};

/// 文件引用的展示名：最后一个 `/` 之后的部分
pub fn display_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// 渲染答案与产出文件列表
pub fn render_answer(answer: &str, files: &[String]) -> String {
    let mut out = answer.trim_end().to_string();
    if !files.is_empty() {
        out.push_str("\n\nFiles:");
        for file in files {
            out.push_str(&format!("\n  {}  ({})", display_name(file), file));
        }
    }
    out
}

/// 渲染错误信息
pub fn render_error(message: &str) -> String {
    format!("Error: {message}")
}
