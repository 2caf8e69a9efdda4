//! Duration 字符串解析
//!
//! 支持格式：
//! - "1.5s" -> 1.5 秒
//! - "1h16m0.667s" -> 1 小时 16 分钟 0.667 秒
//! - "500ms" -> 500 毫秒
//! - "2" -> 2 秒（无单位默认为秒）

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// 单位对应的毫秒数
fn unit_millis(unit: &str) -> Option<f64> {
    match unit {
        "h" => Some(3_600_000.0),
        "m" => Some(60_000.0),
        "s" | "" => Some(1_000.0),
        "ms" => Some(1.0),
        _ => None,
    }
}

/// 解析 Duration 字符串，解析失败或结果为 0 返回 None
///
/// 输入按 `<数字><单位>` 分段累加，末尾无单位的数字按秒计。
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let mut rest = compact.as_str();
    if rest.is_empty() {
        return None;
    }

    let mut millis = 0.0_f64;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_end == 0 {
            return None;
        }
        let (num, tail) = rest.split_at(num_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);

        millis += num.parse::<f64>().ok()? * unit_millis(unit)?;
        rest = next;
    }

    let millis = millis.round() as u64;
    (millis > 0).then(|| Duration::from_millis(millis))
}

/// 将 Duration 格式化为可被 [`parse_duration_string`] 读回的字符串
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}

/// serde 适配：`#[serde(with = "crate::config::duration::human")]`
pub mod human {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration_string(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_string() {
        // 秒
        assert_eq!(
            parse_duration_string("1.5s"),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(parse_duration_string("1s"), Some(Duration::from_secs(1)));

        // 分钟
        assert_eq!(parse_duration_string("5m"), Some(Duration::from_secs(300)));

        // 复合格式
        assert_eq!(
            parse_duration_string("1h16m0.667s"),
            Some(Duration::from_millis(4_560_667))
        );

        // 毫秒
        assert_eq!(
            parse_duration_string("250ms"),
            Some(Duration::from_millis(250))
        );

        // 无单位，允许空白
        assert_eq!(parse_duration_string("2"), Some(Duration::from_secs(2)));
        assert_eq!(
            parse_duration_string(" 1m 30s "),
            Some(Duration::from_secs(90))
        );

        // 无效输入
        assert_eq!(parse_duration_string(""), None);
        assert_eq!(parse_duration_string("invalid"), None);
        assert_eq!(parse_duration_string("0s"), None);
        assert_eq!(parse_duration_string("3d"), None);
        assert_eq!(parse_duration_string("ms"), None);
        assert_eq!(parse_duration_string("1..5s"), None);
    }

    #[test]
    fn test_format_round_trips_through_parser() {
        for d in [Duration::from_secs(1), Duration::from_millis(1500)] {
            assert_eq!(parse_duration_string(&format_duration(d)), Some(d));
        }
    }
}
