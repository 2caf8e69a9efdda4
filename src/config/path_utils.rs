//! 路径工具

use std::path::{Path, PathBuf};

/// 检查路径是否以 `~` 开头
pub fn contains_tilde(path: &str) -> bool {
    path == "~" || path.starts_with("~/") || path.starts_with("~\\")
}

/// 展开路径开头的 `~` 为用户主目录；无法获取主目录时原样返回
pub fn expand_tilde(path: &str) -> PathBuf {
    if !contains_tilde(path) {
        return PathBuf::from(path);
    }
    let Some(home) = dirs::home_dir() else {
        return PathBuf::from(path);
    };
    if path == "~" {
        return home;
    }
    home.join(&path[2..])
}

/// 将主目录前缀折叠回 `~`，用于日志展示
pub fn collapse_tilde(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path_untouched() {
        assert_eq!(expand_tilde("/etc/eval.yaml"), PathBuf::from("/etc/eval.yaml"));
        assert_eq!(expand_tilde("conf/a.yaml"), PathBuf::from("conf/a.yaml"));
        assert!(!contains_tilde("a~b"));
    }

    #[test]
    fn test_tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~"), home);
            assert_eq!(
                expand_tilde("~/.eval-client/config.yaml"),
                home.join(".eval-client/config.yaml")
            );
            assert_eq!(
                collapse_tilde(&home.join(".eval-client")),
                "~/.eval-client"
            );
        }
    }
}
