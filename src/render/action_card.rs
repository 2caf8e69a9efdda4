//! 动作卡片
//!
//! 将 LLM_END / TOOL_END 的进度信息整理为可读的卡片，计划文本解析为勾选清单。

use serde::Serialize;
use std::fmt;

use crate::models::ActionInfo;

/// 计划条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum PlanItem {
    /// `[ ] ...`
    Pending(String),
    /// `[x] ...`
    Done(String),
    /// 无勾选标记的普通条目
    Note(String),
}

impl PlanItem {
    pub fn text(&self) -> &str {
        match self {
            Self::Pending(t) | Self::Done(t) | Self::Note(t) => t,
        }
    }
}

/// 解析计划文本
///
/// 计划格式为以 `- ` 分隔的条目，例如 `- [x] 读取文件 - [ ] 画图`。
pub fn parse_plan(plan: &str) -> Vec<PlanItem> {
    plan.split("- ")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if let Some(rest) = p.strip_prefix("[ ]") {
                PlanItem::Pending(rest.trim().to_string())
            } else if let Some(rest) = p.strip_prefix("[x]") {
                PlanItem::Done(rest.trim().to_string())
            } else {
                PlanItem::Note(p.to_string())
            }
        })
        .collect()
}

/// 单个动作卡片
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionCard {
    pub index: usize,
    pub action: String,
    pub input: String,
    pub what_i_did: String,
    pub plan: Vec<PlanItem>,
    pub observation: Option<String>,
}

impl ActionCard {
    pub fn from_info(index: usize, info: &ActionInfo) -> Self {
        Self {
            index,
            action: info.action.clone(),
            input: info.action_input.clone(),
            what_i_did: info.what_i_did.clone(),
            plan: parse_plan(&info.plan),
            observation: info.observation.clone(),
        }
    }
}

impl fmt::Display for ActionCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Action #{} - {}", self.index, self.action)?;
        writeln!(f, "  Input:      {}", self.input)?;
        writeln!(f, "  What I Did: {}", self.what_i_did)?;

        if !self.plan.is_empty() {
            writeln!(f, "  Plan:")?;
            for item in &self.plan {
                match item {
                    PlanItem::Pending(t) => writeln!(f, "    [ ] {t}")?,
                    PlanItem::Done(t) => writeln!(f, "    [x] {t}")?,
                    PlanItem::Note(t) => writeln!(f, "        {t}")?,
                }
            }
        }

        if let Some(observation) = &self.observation {
            writeln!(f, "  Observation:")?;
            for line in observation.lines() {
                writeln!(f, "    {line}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_plan_checklist() {
        let items = parse_plan("- [x] read the csv - [ ] plot a chart - summarize");
        assert_eq!(
            items,
            vec![
                PlanItem::Done("read the csv".to_string()),
                PlanItem::Pending("plot a chart".to_string()),
                PlanItem::Note("summarize".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_plan_multiline_and_empty() {
        assert!(parse_plan("").is_empty());
        assert!(parse_plan("   - ").is_empty());

        let items = parse_plan("- [ ] one\n- [x] two\n");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], PlanItem::Pending("one".to_string()));
        assert_eq!(items[1], PlanItem::Done("two".to_string()));
    }

    #[test]
    fn test_card_display() {
        let info = ActionInfo {
            action: "Terminal".to_string(),
            action_input: "ls -la".to_string(),
            what_i_did: "listed the playground".to_string(),
            plan: "- [x] look - [ ] answer".to_string(),
            observation: Some("a.csv\nb.png".to_string()),
        };
        let text = ActionCard::from_info(1, &info).to_string();

        assert!(text.starts_with("Action #1 - Terminal\n"));
        assert!(text.contains("Input:      ls -la"));
        assert!(text.contains("    [x] look"));
        assert!(text.contains("    [ ] answer"));
        assert!(text.contains("    a.csv\n    b.png\n"));
    }

    #[test]
    fn test_card_without_observation() {
        let card = ActionCard::from_info(2, &ActionInfo::default());
        let text = card.to_string();
        assert!(!text.contains("Observation"));
        assert!(!text.contains("Plan:"));
    }

    proptest! {
        #[test]
        fn prop_plan_items_are_trimmed_and_non_empty(plan in "[- \\[\\]xa-z\n]{0,64}") {
            for item in parse_plan(&plan) {
                prop_assert_eq!(item.text(), item.text().trim());
                if let PlanItem::Note(text) = &item {
                    prop_assert!(!text.is_empty());
                }
            }
        }
    }
}
